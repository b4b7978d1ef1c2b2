//! The context-binding middleware.

use crate::context::ScopedContext;
use crate::injector::Injector;
use crate::key::ServiceKey;
use ingress::{BoxFuture, Middleware, Next, PipelineResult};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Binds a fresh request scope to every context that passes through.
///
/// For each context it creates a request [`Injector`] under the container's
/// singleton scope, binds the context itself under the context token (visible
/// from that injector only), attaches the injector to the context and runs the
/// rest of the pipeline. Once the pipeline settles, successfully or not, the
/// scope is detached again and dropped with its scoped instances. Responses are
/// left untouched.
pub struct ScopeBinding<C> {
  singletons: Injector,
  token: ServiceKey,
  _context: PhantomData<fn() -> C>,
}

impl<C: ScopedContext> ScopeBinding<C> {
  pub(crate) fn new(singletons: Injector, token: ServiceKey) -> Self {
    Self {
      singletons,
      token,
      _context: PhantomData,
    }
  }

  /// Creates and attaches the request scope for `ctx` without running a pipeline.
  pub fn bind(&self, ctx: &Arc<C>) -> Injector {
    let scope = Injector::request_scope(&self.singletons, self.token.clone(), ctx);
    ctx.context_scope().replace(scope.clone());
    debug!(
      scope_id = scope.id(),
      context = %self.token,
      "bound request scope to context"
    );
    scope
  }
}

impl<C: ScopedContext> Middleware<C> for ScopeBinding<C> {
  fn handle(&self, ctx: Arc<C>, next: Next<C>) -> BoxFuture<'static, PipelineResult> {
    let scope_id = self.bind(&ctx).id();
    Box::pin(async move {
      let result = next.run(Arc::clone(&ctx)).await;
      ctx.context_scope().detach();
      trace!(scope_id, "detached request scope from context");
      result
    })
  }
}

impl<C> Clone for ScopeBinding<C> {
  fn clone(&self) -> Self {
    Self {
      singletons: self.singletons.clone(),
      token: self.token.clone(),
      _context: PhantomData,
    }
  }
}
