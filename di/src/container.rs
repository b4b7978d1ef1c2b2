//! The main `Container` struct and its associated methods.

use crate::config::ContainerConfig;
use crate::context::ScopedContext;
use crate::error::{Error, RegistrationError, ResolveError, Result};
use crate::injector::Injector;
use crate::key::{Lifetime, ServiceKey};
use crate::middleware::ScopeBinding;
use crate::registration::{Dependencies, Injectable, Registration, ServiceOptions};
use crate::registry::Registry;
use futures_util::future::BoxFuture;
use ingress::{Addon, BoxError, Ingress, Middleware, PipelineResult};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const UNSTARTED: u8 = 0;
const STARTING: u8 = 1;
const STARTED: u8 = 2;

/// Where a [`Container`] is in its start-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
  Unstarted,
  /// `start()` is awaiting deferred registration work.
  Starting,
  Started,
}

/// Construction options for a [`Container`] whose request contexts are `C`.
pub struct ContainerOptions<C> {
  context_name: Option<String>,
  singletons: Vec<Registration>,
  config: ContainerConfig,
  _context: PhantomData<fn() -> C>,
}

impl<C: ScopedContext> ContainerOptions<C> {
  /// The context token defaults to the unnamed key of `C`.
  pub fn new() -> Self {
    Self {
      context_name: None,
      singletons: Vec::new(),
      config: ContainerConfig::default(),
      _context: PhantomData,
    }
  }

  /// Binds contexts under a named key of `C`. Takes precedence over the
  /// configuration's `context_name`.
  ///
  /// Declared dependencies always use unnamed keys, so with a named token no
  /// service can take the context as a constructor dependency. Resolve it with
  /// `get_named` from the request scope instead.
  pub fn context_name(mut self, name: impl Into<String>) -> Self {
    self.context_name = Some(name.into());
    self
  }

  /// Registers `T` as a singleton when the container is created.
  pub fn singleton<T: Injectable>(mut self) -> Self {
    self
      .singletons
      .push(Registration::injectable::<T>(Lifetime::Singleton));
    self
  }

  pub fn config(mut self, config: ContainerConfig) -> Self {
    self.config = config;
    self
  }
}

impl<C: ScopedContext> Default for ContainerOptions<C> {
  fn default() -> Self {
    Self::new()
  }
}

struct ContainerInner {
  registry: Arc<Registry>,
  singletons: Injector,
  context_token: ServiceKey,
  eager: Vec<ServiceKey>,
  config: ContainerConfig,
  state: AtomicU8,
  deferred: Mutex<VecDeque<BoxFuture<'static, Registration>>>,
}

/// Owns a registry, the process-wide singleton scope, and hands out one fresh
/// request scope per context.
///
/// `Container` is a cheap handle; clones share all state. Independent
/// containers never share registrations or instances.
pub struct Container<C> {
  inner: Arc<ContainerInner>,
  _context: PhantomData<fn() -> C>,
}

impl<C: ScopedContext> Container<C> {
  /// Creates a container and registers the up-front singletons.
  pub fn new(options: ContainerOptions<C>) -> Result<Self, RegistrationError> {
    let ContainerOptions {
      context_name,
      singletons,
      config,
      ..
    } = options;

    let context_token = match context_name.as_deref().or(config.context_name.as_deref()) {
      Some(name) => ServiceKey::named::<C>(name),
      None => ServiceKey::of::<C>(),
    };

    let registry = Arc::new(Registry::new());
    let mut eager = Vec::with_capacity(singletons.len());
    for registration in singletons {
      eager.push(registration.key().clone());
      registry.register(registration)?;
    }

    let singleton_scope = Injector::singleton_scope(Arc::clone(&registry), context_token.clone());
    debug!(
      context = %context_token,
      singletons = eager.len(),
      "created container"
    );

    Ok(Self {
      inner: Arc::new(ContainerInner {
        registry,
        singletons: singleton_scope,
        context_token,
        eager,
        config,
        state: AtomicU8::new(UNSTARTED),
        deferred: Mutex::new(VecDeque::new()),
      }),
      _context: PhantomData,
    })
  }

  pub fn context_token(&self) -> &ServiceKey {
    &self.inner.context_token
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.inner.config
  }

  pub fn registry(&self) -> &Registry {
    &self.inner.registry
  }

  /// The process-wide scope singletons are constructed and cached in.
  pub fn singletons(&self) -> &Injector {
    &self.inner.singletons
  }

  pub fn state(&self) -> ContainerState {
    match self.inner.state.load(Ordering::Acquire) {
      UNSTARTED => ContainerState::Unstarted,
      STARTING => ContainerState::Starting,
      _ => ContainerState::Started,
    }
  }

  // --- Registration ---

  pub fn register(&self, registration: Registration) -> Result<(), RegistrationError> {
    self.inner.registry.register(registration)
  }

  /// Marks `T` as a scoped service (the bare `Service` marker).
  pub fn service<T: Injectable>(&self) -> Result<(), RegistrationError> {
    self.service_with::<T>(ServiceOptions::default())
  }

  /// Marks `T` as a singleton service (the bare `SingletonService` marker).
  pub fn singleton_service<T: Injectable>(&self) -> Result<(), RegistrationError> {
    self.singleton_service_with::<T>(ServiceOptions::default())
  }

  /// The invoked `Service(options)` marker. Scoped unless the options say otherwise.
  pub fn service_with<T: Injectable>(&self, options: ServiceOptions) -> Result<(), RegistrationError> {
    self.register_injectable::<T>(Lifetime::Scoped, options)
  }

  /// The invoked `SingletonService(options)` marker.
  pub fn singleton_service_with<T: Injectable>(
    &self,
    options: ServiceOptions,
  ) -> Result<(), RegistrationError> {
    self.register_injectable::<T>(Lifetime::Singleton, options)
  }

  fn register_injectable<T: Injectable>(
    &self,
    default_lifetime: Lifetime,
    options: ServiceOptions,
  ) -> Result<(), RegistrationError> {
    let mut registration = Registration::injectable::<T>(options.lifetime.unwrap_or(default_lifetime));
    if let Some(name) = &options.name {
      registration = registration.named(name);
    }
    self.register(registration)
  }

  pub fn register_singleton<T, D, F>(&self, factory: F) -> Result<(), RegistrationError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> T + Send + Sync + 'static,
  {
    self.register(Registration::singleton(factory))
  }

  pub fn register_scoped<T, D, F>(&self, factory: F) -> Result<(), RegistrationError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> T + Send + Sync + 'static,
  {
    self.register(Registration::scoped(factory))
  }

  pub fn register_instance<T: Any + Send + Sync>(&self, value: T) -> Result<(), RegistrationError> {
    self.register(Registration::instance(value))
  }

  /// Queues asynchronous registration work. `start()` awaits it, in queue
  /// order, and registers what it produces.
  pub fn register_deferred<F>(&self, work: F)
  where
    F: Future<Output = Registration> + Send + 'static,
  {
    self.inner.deferred.lock().push_back(Box::pin(work));
  }

  // --- Resolution ---

  /// Resolves `T` through the singleton scope.
  ///
  /// Scoped services and the context token are not available here and fail
  /// with [`ResolveError::UnresolvableOutsideScope`].
  pub fn get<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
    self.inner.singletons.get::<T>()
  }

  pub fn get_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
    self.inner.singletons.get_named::<T>(name)
  }

  // --- Scopes ---

  /// The middleware that binds a request scope to each context.
  pub fn middleware(&self) -> ScopeBinding<C> {
    ScopeBinding::new(self.inner.singletons.clone(), self.inner.context_token.clone())
  }

  /// Creates and attaches a request scope for `ctx` outside of any pipeline.
  ///
  /// A scoped service holding `Arc<C>` keeps the context alive for as long as
  /// the scope stays attached. Callers detach it with
  /// [`ContextScope::detach`](crate::ContextScope::detach) once they are done.
  pub fn scope_for(&self, ctx: &Arc<C>) -> Injector {
    self.middleware().bind(ctx)
  }

  // --- Lifecycle ---

  /// Finishes registration: awaits deferred work, validates the graph, freezes
  /// the registry and, if configured, constructs the up-front singletons.
  ///
  /// Calling it again, or while a previous call is still in flight, is a no-op.
  /// On failure the container returns to `Unstarted`. Deferred work that was not
  /// reached stays queued for the next call; the registration that failed is
  /// dropped with its error.
  pub async fn start(&self) -> Result<()> {
    if self
      .inner
      .state
      .compare_exchange(UNSTARTED, STARTING, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      debug!(state = ?self.state(), "container start already requested");
      return Ok(());
    }

    let result = self.run_start().await;
    let next = if result.is_ok() { STARTED } else { UNSTARTED };
    self.inner.state.store(next, Ordering::Release);
    result
  }

  async fn run_start(&self) -> Result<()> {
    let queued = self.inner.deferred.lock().len();
    debug!(deferred = queued, "awaiting deferred registrations");
    while let Some(work) = self.next_deferred() {
      let registration = work.await;
      self.inner.registry.register(registration)?;
    }

    self.validate()?;
    self.inner.registry.freeze();

    if self.inner.config.eager_singletons {
      for key in &self.inner.eager {
        self.inner.singletons.get_key(key)?;
      }
    }

    info!(
      services = self.inner.registry.len(),
      eager = self.inner.config.eager_singletons,
      "container started"
    );
    Ok(())
  }

  // The queue lock is never held across an `.await`.
  fn next_deferred(&self) -> Option<BoxFuture<'static, Registration>> {
    self.inner.deferred.lock().pop_front()
  }

  fn validate(&self) -> Result<()> {
    // Cycles fail regardless of strictness: two threads entering one from
    // opposite ends would block on each other's slot.
    if let Some(cycle) = self.inner.registry.find_cycle() {
      return Err(Error::Resolve(ResolveError::CircularDependency { cycle }));
    }

    let strict = self.inner.config.strict_dependencies;
    let token = &self.inner.context_token;

    for registration in self.inner.registry.registrations() {
      for dependency in registration.dependencies() {
        let provider = self.inner.registry.get(dependency);
        if provider.is_none() && dependency != token {
          if strict {
            return Err(Error::Resolve(ResolveError::UnregisteredService {
              key: dependency.clone(),
              chain: vec![registration.key().clone()],
            }));
          }
          warn!(
            service = %registration.key(),
            dependency = %dependency,
            "dependency has no registration"
          );
          continue;
        }

        let request_only = dependency == token
          || provider.is_some_and(|provider| provider.lifetime() == Lifetime::Scoped);
        if registration.lifetime() == Lifetime::Singleton && request_only {
          if strict {
            return Err(Error::Resolve(ResolveError::UnresolvableOutsideScope {
              key: dependency.clone(),
            }));
          }
          warn!(
            service = %registration.key(),
            dependency = %dependency,
            "singleton depends on a request-scoped service"
          );
        }
      }
    }
    Ok(())
  }
}

impl<C> Clone for Container<C> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      _context: PhantomData,
    }
  }
}

impl<C: ScopedContext> Addon<C> for Container<C> {
  fn register(&self, _app: &mut Ingress<C>) -> Option<BoxFuture<'static, PipelineResult>> {
    let container = self.clone();
    Some(Box::pin(async move {
      container.start().await.map_err(BoxError::from)
    }))
  }

  fn middleware(&self) -> Option<Arc<dyn Middleware<C>>> {
    Some(Arc::new(Container::<C>::middleware(self)))
  }
}
