//! Attaching a resolution scope to a request context.

use crate::injector::Injector;
use parking_lot::RwLock;
use std::fmt;

/// The slot a request context keeps its current [`Injector`] in.
///
/// A fresh slot holds an empty root injector, so a context is usable before any
/// scope has been bound to it. The binding middleware replaces it per request.
pub struct ContextScope {
  current: RwLock<Injector>,
}

impl ContextScope {
  pub fn new() -> Self {
    Self::with_scope(Injector::empty())
  }

  pub fn with_scope(scope: Injector) -> Self {
    Self {
      current: RwLock::new(scope),
    }
  }

  /// The injector currently attached to the context.
  pub fn get(&self) -> Injector {
    self.current.read().clone()
  }

  /// Attaches `scope`, returning the one it replaces.
  pub fn replace(&self, scope: Injector) -> Injector {
    std::mem::replace(&mut *self.current.write(), scope)
  }

  /// Puts an empty injector back, returning the scope that was attached.
  ///
  /// Scoped services may hold the context itself, so an attached request scope
  /// keeps its context alive until it is detached.
  pub fn detach(&self) -> Injector {
    self.replace(Injector::empty())
  }
}

impl Default for ContextScope {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ContextScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ContextScope").field(&*self.current.read()).finish()
  }
}

/// A request context that carries a resolution scope.
///
/// ```
/// use ingress_di::{ContextScope, ScopedContext};
///
/// #[derive(Default)]
/// struct RequestContext {
///   scope: ContextScope,
/// }
///
/// impl ScopedContext for RequestContext {
///   fn context_scope(&self) -> &ContextScope {
///     &self.scope
///   }
/// }
/// ```
pub trait ScopedContext: Send + Sync + 'static {
  fn context_scope(&self) -> &ContextScope;

  /// The injector currently attached to this context.
  fn scope(&self) -> Injector {
    self.context_scope().get()
  }
}
