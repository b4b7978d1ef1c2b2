use futures_executor::block_on;
use ingress::{Addon, BoxError, BoxFuture, Ingress, Middleware, Next, PipelineBuilder, PipelineResult};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

// --- Test Fixtures ---

#[derive(Default)]
struct Context {
  trail: Mutex<Vec<&'static str>>,
}

impl Context {
  fn push(&self, step: &'static str) {
    self.trail.lock().push(step);
  }

  fn trail(&self) -> Vec<&'static str> {
    self.trail.lock().clone()
  }
}

fn step(name: &'static str) -> impl Middleware<Context> {
  move |ctx: Arc<Context>, next: Next<Context>| async move {
    ctx.push(name);
    let result = next.run(Arc::clone(&ctx)).await;
    ctx.push(name);
    result
  }
}

#[derive(Debug, Error)]
#[error("refused")]
struct Refused;

// --- Pipeline Tests ---

#[test]
fn test_middleware_runs_in_registration_order_and_unwinds() {
  // Arrange
  let mut builder: PipelineBuilder<Context> = PipelineBuilder::new();
  builder.use_middleware(step("outer")).use_middleware(step("inner"));
  let pipeline = builder.build();
  let ctx = Arc::new(Context::default());

  // Act
  block_on(pipeline.handle(Arc::clone(&ctx))).unwrap();

  // Assert
  assert_eq!(ctx.trail(), vec!["outer", "inner", "inner", "outer"]);
}

#[test]
fn test_stage_that_skips_next_short_circuits() {
  let mut builder: PipelineBuilder<Context> = PipelineBuilder::new();
  builder
    .use_middleware(|ctx: Arc<Context>, _next: Next<Context>| async move {
      ctx.push("gate");
      Ok::<(), BoxError>(())
    })
    .use_middleware(step("unreachable"));
  let ctx = Arc::new(Context::default());

  block_on(builder.build().handle(Arc::clone(&ctx))).unwrap();

  assert_eq!(ctx.trail(), vec!["gate"]);
}

#[test]
fn test_downstream_failure_rejects_the_whole_pipeline() {
  let mut builder: PipelineBuilder<Context> = PipelineBuilder::new();
  builder
    .use_middleware(step("outer"))
    .use_middleware(|_ctx: Arc<Context>, _next: Next<Context>| async move {
      let failure: PipelineResult = Err(Box::new(Refused));
      failure
    });
  let ctx = Arc::new(Context::default());

  let err = block_on(builder.build().handle(Arc::clone(&ctx))).unwrap_err();

  assert_eq!(err.to_string(), "refused");
  // The outer stage still observed the rejection on its way out.
  assert_eq!(ctx.trail(), vec!["outer", "outer"]);
}

#[test]
fn test_empty_continuation_resolves_immediately() {
  let next: Next<Context> = Next::empty();
  assert_eq!(next.remaining(), 0);
  assert!(block_on(next.run(Arc::new(Context::default()))).is_ok());
}

#[test]
fn test_built_pipeline_is_not_affected_by_later_registrations() {
  let mut builder: PipelineBuilder<Context> = PipelineBuilder::new();
  builder.use_middleware(step("first"));
  let snapshot = builder.build();
  builder.use_middleware(step("second"));

  assert_eq!(snapshot.len(), 1);
  assert_eq!(builder.build().len(), 2);
}

// --- Addon Tests ---

struct PoolAddon {
  opened: Arc<AtomicBool>,
}

impl Addon<Context> for PoolAddon {
  fn register(&self, _app: &mut Ingress<Context>) -> Option<BoxFuture<'static, PipelineResult>> {
    let opened = Arc::clone(&self.opened);
    Some(Box::pin(async move {
      opened.store(true, Ordering::SeqCst);
      Ok::<(), BoxError>(())
    }))
  }

  fn middleware(&self) -> Option<Arc<dyn Middleware<Context>>> {
    Some(Arc::new(step("pool")))
  }
}

struct BrokenAddon;

impl Addon<Context> for BrokenAddon {
  fn register(&self, _app: &mut Ingress<Context>) -> Option<BoxFuture<'static, PipelineResult>> {
    Some(Box::pin(async {
      let failure: PipelineResult = Err(Box::new(Refused));
      failure
    }))
  }
}

#[test]
fn test_start_awaits_addon_registration_work() {
  let opened = Arc::new(AtomicBool::new(false));
  let mut app: Ingress<Context> = Ingress::new();
  app.use_addon(&PoolAddon {
    opened: Arc::clone(&opened),
  });

  assert_eq!(app.pending(), 1);
  assert!(!opened.load(Ordering::SeqCst));

  block_on(app.start()).unwrap();

  assert!(opened.load(Ordering::SeqCst));
  assert_eq!(app.pending(), 0);
}

#[test]
fn test_addon_middleware_joins_the_pipeline() {
  let mut app: Ingress<Context> = Ingress::new();
  app
    .use_middleware(step("before"))
    .use_addon(&PoolAddon {
      opened: Arc::new(AtomicBool::new(false)),
    });
  let ctx = Arc::new(Context::default());

  block_on(async {
    app.start().await.unwrap();
    app.build().handle(Arc::clone(&ctx)).await.unwrap();
  });

  assert_eq!(ctx.trail(), vec!["before", "pool", "pool", "before"]);
}

#[test]
fn test_failed_addon_start_is_reported() {
  let mut app: Ingress<Context> = Ingress::new();
  app.use_addon(&BrokenAddon);

  let err = block_on(app.start()).unwrap_err();

  assert_eq!(err.to_string(), "refused");
}

#[test]
fn test_application_handles_contexts_directly() {
  let mut app: Ingress<Context> = Ingress::new();
  app.use_middleware(step("only"));
  let ctx = Arc::new(Context::default());

  block_on(app.handle(Arc::clone(&ctx))).unwrap();

  assert_eq!(ctx.trail(), vec!["only", "only"]);
}
