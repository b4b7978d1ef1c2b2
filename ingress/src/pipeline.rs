//! Composition of middleware into a runnable pipeline.

use crate::middleware::{Middleware, Next, PipelineResult};
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Collects middleware in registration order.
pub struct PipelineBuilder<C> {
  middleware: Vec<Arc<dyn Middleware<C>>>,
}

impl<C: Send + Sync + 'static> PipelineBuilder<C> {
  pub fn new() -> Self {
    Self {
      middleware: Vec::new(),
    }
  }

  /// Appends a stage to the end of the pipeline.
  pub fn use_middleware(&mut self, middleware: impl Middleware<C>) -> &mut Self {
    self.middleware.push(Arc::new(middleware));
    self
  }

  /// Appends an already shared stage.
  pub fn use_shared(&mut self, middleware: Arc<dyn Middleware<C>>) -> &mut Self {
    self.middleware.push(middleware);
    self
  }

  pub fn len(&self) -> usize {
    self.middleware.len()
  }

  pub fn is_empty(&self) -> bool {
    self.middleware.is_empty()
  }

  /// Freezes the current stages into a [`Pipeline`]. The builder stays usable.
  pub fn build(&self) -> Pipeline<C> {
    Pipeline {
      chain: self.middleware.iter().cloned().collect(),
    }
  }
}

impl<C: Send + Sync + 'static> Default for PipelineBuilder<C> {
  fn default() -> Self {
    Self::new()
  }
}

/// An immutable chain of middleware. Cloning is cheap.
pub struct Pipeline<C> {
  chain: Arc<[Arc<dyn Middleware<C>>]>,
}

impl<C: Send + Sync + 'static> Pipeline<C> {
  /// Runs every stage against `ctx`, starting from the first.
  pub fn handle(&self, ctx: Arc<C>) -> BoxFuture<'static, PipelineResult> {
    tracing::trace!(stages = self.chain.len(), "running pipeline");
    Next::new(Arc::clone(&self.chain)).run(ctx)
  }

  pub fn len(&self) -> usize {
    self.chain.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chain.is_empty()
  }
}

impl<C> Clone for Pipeline<C> {
  fn clone(&self) -> Self {
    Self {
      chain: Arc::clone(&self.chain),
    }
  }
}
