//! # Ingress
//!
//! A small, transport-agnostic request pipeline.
//!
//! A server owns an [`Ingress`] application, adds middleware and addons to it,
//! awaits [`Ingress::start`] and then pushes one shared context per inbound
//! request through the built [`Pipeline`]. Nothing here knows about sockets or
//! HTTP; the context type is whatever the server chooses.
//!
//! ## Quick Start
//!
//! ```
//! use ingress::{Ingress, Next, PipelineResult};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Context {
//!   hits: AtomicUsize,
//! }
//!
//! async fn count(ctx: Arc<Context>, next: Next<Context>) -> PipelineResult {
//!   ctx.hits.fetch_add(1, Ordering::SeqCst);
//!   next.run(ctx).await
//! }
//!
//! let mut app: Ingress<Context> = Ingress::new();
//! app.use_middleware(count).use_middleware(count);
//!
//! futures_executor::block_on(async {
//!   app.start().await.unwrap();
//!   let ctx = Arc::new(Context::default());
//!   app.build().handle(Arc::clone(&ctx)).await.unwrap();
//!   assert_eq!(ctx.hits.load(Ordering::SeqCst), 2);
//! });
//! ```

mod app;
mod middleware;
mod pipeline;

pub use app::{Addon, Ingress};
pub use futures_util::future::BoxFuture;
pub use middleware::{BoxError, Middleware, Next, PipelineResult};
pub use pipeline::{Pipeline, PipelineBuilder};
