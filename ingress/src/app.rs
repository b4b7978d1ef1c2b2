//! The application object: a pipeline plus the start-up work of its addons.

use crate::middleware::{Middleware, PipelineResult};
use crate::pipeline::{Pipeline, PipelineBuilder};
use futures_util::future::{self, BoxFuture};
use std::sync::Arc;
use tracing::{debug, info};

/// A pluggable unit that can take part in an [`Ingress`] application.
///
/// Both hooks are optional. `register` runs when the addon is added and may
/// return asynchronous set-up work (opening a pool, finishing registrations)
/// which [`Ingress::start`] awaits before traffic is accepted. `middleware`
/// contributes a stage to the pipeline.
pub trait Addon<C>: Send + Sync {
  fn register(&self, _app: &mut Ingress<C>) -> Option<BoxFuture<'static, PipelineResult>> {
    None
  }

  fn middleware(&self) -> Option<Arc<dyn Middleware<C>>> {
    None
  }
}

/// Middleware pipeline together with the pending start-up work of its addons.
///
/// The surrounding server is expected to `start()` the application before it
/// begins dispatching contexts through [`Ingress::build`]'s pipeline.
pub struct Ingress<C> {
  builder: PipelineBuilder<C>,
  starting: Vec<BoxFuture<'static, PipelineResult>>,
}

impl<C: Send + Sync + 'static> Ingress<C> {
  pub fn new() -> Self {
    Self {
      builder: PipelineBuilder::new(),
      starting: Vec::new(),
    }
  }

  /// Appends a plain middleware stage.
  pub fn use_middleware(&mut self, middleware: impl Middleware<C>) -> &mut Self {
    self.builder.use_middleware(middleware);
    self
  }

  /// Adds an addon: its middleware (if any) is appended first, then its
  /// registration hook runs and any returned work is queued for [`start`](Self::start).
  pub fn use_addon<A: Addon<C> + ?Sized>(&mut self, addon: &A) -> &mut Self {
    if let Some(middleware) = addon.middleware() {
      self.builder.use_shared(middleware);
    }
    if let Some(work) = addon.register(self) {
      self.starting.push(work);
    }
    self
  }

  /// Number of addon start-up tasks not yet awaited.
  pub fn pending(&self) -> usize {
    self.starting.len()
  }

  /// Awaits every queued start-up task. Work queued later is awaited by the next call.
  ///
  /// The first failure is returned; the remaining queued work is dropped with it.
  pub async fn start(&mut self) -> PipelineResult {
    let pending = std::mem::take(&mut self.starting);
    debug!(addons = pending.len(), "awaiting addon start-up work");
    future::try_join_all(pending).await?;
    info!(stages = self.builder.len(), "ingress started");
    Ok(())
  }

  /// Snapshot of the current pipeline.
  pub fn build(&self) -> Pipeline<C> {
    self.builder.build()
  }

  /// Runs `ctx` through the current stages. Servers dispatching many requests
  /// should keep a [`build`](Self::build) snapshot instead.
  pub fn handle(&self, ctx: Arc<C>) -> BoxFuture<'static, PipelineResult> {
    self.build().handle(ctx)
  }
}

impl<C: Send + Sync + 'static> Default for Ingress<C> {
  fn default() -> Self {
    Self::new()
  }
}
