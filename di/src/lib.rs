//! # Ingress DI
//!
//! Request-scoped dependency injection for the `ingress` middleware pipeline.
//!
//! A [`Container`] owns a registry of services, one process-wide singleton
//! scope, and hands out a fresh request scope for every context that passes
//! through its middleware. Services declare their constructor dependencies as a
//! tuple type, so the dependency graph is known at registration time and
//! resolved recursively on first use.
//!
//! ## Core Concepts
//!
//! - **Lifetimes**: a [`Lifetime::Singleton`] service is built once per container
//!   and shared by every scope; a [`Lifetime::Scoped`] service is built once per
//!   request scope.
//! - **Injector**: a resolution scope with its own cache. Request scopes delegate
//!   singletons to the container's singleton scope.
//! - **Context token**: each request scope binds the live context under the
//!   context type's key, so services can depend on the request itself.
//! - **Middleware**: [`Container::middleware`] creates and attaches the scope;
//!   downstream code resolves through `ctx.scope()`.
//!
//! ## Quick Start
//!
//! ```
//! use ingress::{Ingress, Next, PipelineResult};
//! use ingress_di::{Container, ContainerOptions, ContextScope, Injectable, ScopedContext};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct RequestContext {
//!   scope: ContextScope,
//! }
//!
//! impl ScopedContext for RequestContext {
//!   fn context_scope(&self) -> &ContextScope {
//!     &self.scope
//!   }
//! }
//!
//! struct Settings {
//!   greeting: &'static str,
//! }
//!
//! impl Injectable for Settings {
//!   type Dependencies = ();
//!
//!   fn construct((): ()) -> Self {
//!     Settings { greeting: "hello" }
//!   }
//! }
//!
//! struct Greeter {
//!   settings: Arc<Settings>,
//!   request: Arc<RequestContext>,
//! }
//!
//! impl Injectable for Greeter {
//!   type Dependencies = (Arc<Settings>, Arc<RequestContext>);
//!
//!   fn construct((settings, request): Self::Dependencies) -> Self {
//!     Greeter { settings, request }
//!   }
//! }
//!
//! async fn greet(ctx: Arc<RequestContext>, next: Next<RequestContext>) -> PipelineResult {
//!   let greeter = ctx.scope().get::<Greeter>()?;
//!   assert_eq!(greeter.settings.greeting, "hello");
//!   assert!(Arc::ptr_eq(&greeter.request, &ctx));
//!   next.run(ctx).await
//! }
//!
//! let options = ContainerOptions::<RequestContext>::new().singleton::<Settings>();
//! let container = Container::new(options).unwrap();
//! container.service::<Greeter>().unwrap();
//!
//! let mut app: Ingress<RequestContext> = Ingress::new();
//! app.use_addon(&container).use_middleware(greet);
//!
//! futures_executor::block_on(async {
//!   app.start().await.unwrap();
//!   app.build().handle(Arc::new(RequestContext::default())).await.unwrap();
//! });
//! ```

mod config;
mod container;
mod context;
mod error;
mod injector;
mod key;
mod macros;
mod middleware;
mod registration;
mod registry;
mod resolution;

pub use config::ContainerConfig;
pub use container::{Container, ContainerOptions, ContainerState};
pub use context::{ContextScope, ScopedContext};
pub use error::{ConfigError, Error, RegistrationError, ResolveError, Result};
pub use injector::{Injector, ScopeKind};
pub use key::{Lifetime, ServiceKey};
pub use middleware::ScopeBinding;
pub use registration::{Dependencies, Injectable, Registration, ServiceOptions};
pub use registry::Registry;
pub use resolution::Instance;
