//! The middleware contract and the continuation that drives the remainder of a pipeline.

use futures_util::future::{self, BoxFuture};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The error type carried through a pipeline.
///
/// Any `std::error::Error + Send + Sync` converts into it with `?`, so a
/// middleware can propagate failures from the services it calls without
/// wrapping them first.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The outcome of a middleware, or of the remainder of a pipeline.
pub type PipelineResult = Result<(), BoxError>;

/// A single stage of a request pipeline.
///
/// A middleware receives the shared request context and a [`Next`] continuation.
/// Calling [`Next::run`] invokes every later stage; the returned future resolves
/// once they finish, carrying their success or failure. Not calling it
/// short-circuits the pipeline.
///
/// Closures of the shape `Fn(Arc<C>, Next<C>) -> impl Future<Output = PipelineResult>`
/// implement this trait directly.
pub trait Middleware<C>: Send + Sync + 'static {
  fn handle(&self, ctx: Arc<C>, next: Next<C>) -> BoxFuture<'static, PipelineResult>;
}

impl<C, F, Fut> Middleware<C> for F
where
  C: Send + Sync + 'static,
  F: Fn(Arc<C>, Next<C>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = PipelineResult> + Send + 'static,
{
  fn handle(&self, ctx: Arc<C>, next: Next<C>) -> BoxFuture<'static, PipelineResult> {
    Box::pin(self(ctx, next))
  }
}

/// The owned continuation handed to each middleware.
///
/// It points at a position inside an immutable, shared chain, so it can be moved
/// into a `'static` future and awaited after any number of suspension points.
pub struct Next<C> {
  chain: Arc<[Arc<dyn Middleware<C>>]>,
  position: usize,
}

impl<C: Send + Sync + 'static> Next<C> {
  pub(crate) fn new(chain: Arc<[Arc<dyn Middleware<C>>]>) -> Self {
    Self { chain, position: 0 }
  }

  /// A continuation with nothing left to run. Its future resolves to `Ok(())`.
  pub fn empty() -> Self {
    let chain: Arc<[Arc<dyn Middleware<C>>]> = Arc::new([]);
    Self::new(chain)
  }

  /// The number of stages this continuation will still invoke.
  pub fn remaining(&self) -> usize {
    self.chain.len().saturating_sub(self.position)
  }

  /// Runs the remainder of the pipeline against `ctx`.
  pub fn run(self, ctx: Arc<C>) -> BoxFuture<'static, PipelineResult> {
    match self.chain.get(self.position).cloned() {
      Some(middleware) => {
        let next = Next {
          chain: self.chain,
          position: self.position + 1,
        };
        middleware.handle(ctx, next)
      }
      None => Box::pin(future::ready(Ok(()))),
    }
  }
}

impl<C> Clone for Next<C> {
  fn clone(&self) -> Self {
    Self {
      chain: Arc::clone(&self.chain),
      position: self.position,
    }
  }
}

impl<C> fmt::Debug for Next<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Next")
      .field("position", &self.position)
      .field("len", &self.chain.len())
      .finish()
  }
}
