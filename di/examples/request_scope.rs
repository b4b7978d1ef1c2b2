//! Serves a handful of simulated requests through a pipeline whose first stage
//! binds a request scope. Run with `RUST_LOG=ingress_di=trace` to watch scopes
//! being created and services constructed.

use ingress::{Ingress, Next, PipelineResult};
use ingress_di::{Container, ContainerOptions, ContextScope, Injectable, ScopedContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

static REQUEST_IDS: AtomicUsize = AtomicUsize::new(1);

#[derive(Default)]
struct RequestContext {
  scope: ContextScope,
  path: String,
}

impl ScopedContext for RequestContext {
  fn context_scope(&self) -> &ContextScope {
    &self.scope
  }
}

// Built once for the whole process.
struct ConnectionPool {
  url: &'static str,
}

impl Injectable for ConnectionPool {
  type Dependencies = ();

  fn construct((): ()) -> Self {
    println!("Opening connection pool...");
    ConnectionPool {
      url: "postgres://localhost/app",
    }
  }
}

// Built once per request.
struct RequestTracker {
  id: usize,
  request: Arc<RequestContext>,
  pool: Arc<ConnectionPool>,
}

impl Injectable for RequestTracker {
  type Dependencies = (Arc<RequestContext>, Arc<ConnectionPool>);

  fn construct((request, pool): Self::Dependencies) -> Self {
    RequestTracker {
      id: REQUEST_IDS.fetch_add(1, Ordering::SeqCst),
      request,
      pool,
    }
  }
}

async fn handler(ctx: Arc<RequestContext>, next: Next<RequestContext>) -> PipelineResult {
  let tracker = ctx.scope().get::<RequestTracker>()?;
  println!(
    "request #{} for {} using pool at {}",
    tracker.id, tracker.request.path, tracker.pool.url
  );
  next.run(ctx).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let container = Container::new(ContainerOptions::<RequestContext>::new().singleton::<ConnectionPool>())?;
  container.service::<RequestTracker>()?;

  let mut app: Ingress<RequestContext> = Ingress::new();
  app.use_addon(&container).use_middleware(handler);
  app.start().await?;

  let pipeline = app.build();
  for path in ["/", "/users", "/health"] {
    let ctx = Arc::new(RequestContext {
      scope: ContextScope::default(),
      path: path.to_string(),
    });
    pipeline.handle(ctx).await?;
  }
  Ok(())
}
