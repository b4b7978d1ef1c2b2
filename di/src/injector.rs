//! Resolution scopes.

use crate::error::{ResolveError, Result};
use crate::key::{Lifetime, ServiceKey};
use crate::registration::Registration;
use crate::registry::Registry;
use crate::resolution::{downcast, erase, resolution_chain, Instance, ResolutionGuard};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

type Binding = Box<dyn Fn() -> Option<Instance> + Send + Sync>;

/// The role an [`Injector`] plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
  /// A standalone injector that constructs every lifetime itself.
  Root,
  /// A container's process-wide scope. Refuses scoped lifetimes.
  Singleton,
  /// A per-context scope. Delegates singleton lifetimes to its parent.
  Request,
}

struct InjectorInner {
  id: u64,
  kind: ScopeKind,
  registry: Arc<Registry>,
  parent: Option<Injector>,
  // Keys this scope must never construct (the context token of a singleton scope).
  reserved: Option<ServiceKey>,
  bindings: HashMap<ServiceKey, Binding>,
  cache: DashMap<ServiceKey, Arc<OnceCell<Instance>>>,
}

/// A resolution scope: produces instances by key, caching them by lifetime.
///
/// `Injector` is a cheap handle; clones share the same cache.
#[derive(Clone)]
pub struct Injector {
  inner: Arc<InjectorInner>,
}

impl Injector {
  fn from_parts(
    kind: ScopeKind,
    registry: Arc<Registry>,
    parent: Option<Injector>,
    reserved: Option<ServiceKey>,
    bindings: HashMap<ServiceKey, Binding>,
  ) -> Self {
    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    debug!(
      scope_id = id,
      kind = ?kind,
      parent_id = parent.as_ref().map(Injector::id),
      "creating injector"
    );
    Self {
      inner: Arc::new(InjectorInner {
        id,
        kind,
        registry,
        parent,
        reserved,
        bindings,
        cache: DashMap::new(),
      }),
    }
  }

  /// Creates a standalone root injector over an ad-hoc set of registrations.
  ///
  /// The injector owns a private, frozen registry; both lifetimes are cached in
  /// the injector itself. A cyclic set of registrations is rejected here with
  /// [`ResolveError::CircularDependency`].
  pub fn resolve_and_create<I>(registrations: I) -> Result<Self>
  where
    I: IntoIterator<Item = Registration>,
  {
    let registry = Registry::new();
    for registration in registrations {
      registry.register(registration)?;
    }
    if let Some(cycle) = registry.find_cycle() {
      return Err(ResolveError::CircularDependency { cycle }.into());
    }
    registry.freeze();
    Ok(Self::from_parts(
      ScopeKind::Root,
      Arc::new(registry),
      None,
      None,
      HashMap::new(),
    ))
  }

  /// A root injector with no registrations.
  pub fn empty() -> Self {
    let registry = Registry::new();
    registry.freeze();
    Self::from_parts(ScopeKind::Root, Arc::new(registry), None, None, HashMap::new())
  }

  pub(crate) fn singleton_scope(registry: Arc<Registry>, context_token: ServiceKey) -> Self {
    Self::from_parts(
      ScopeKind::Singleton,
      registry,
      None,
      Some(context_token),
      HashMap::new(),
    )
  }

  /// A request scope under `parent`, with `context` bound to `token`.
  ///
  /// The context is held weakly: the context owns its scope, not the other way round.
  pub(crate) fn request_scope<C>(parent: &Injector, token: ServiceKey, context: &Arc<C>) -> Self
  where
    C: Any + Send + Sync,
  {
    let context = Arc::downgrade(context);
    let binding: Binding = Box::new(move || context.upgrade().map(erase));
    let mut bindings = HashMap::with_capacity(1);
    bindings.insert(token, binding);
    Self::from_parts(
      ScopeKind::Request,
      Arc::clone(&parent.inner.registry),
      Some(parent.clone()),
      None,
      bindings,
    )
  }

  /// A process-unique id, used to correlate log events.
  pub fn id(&self) -> u64 {
    self.inner.id
  }

  pub fn kind(&self) -> ScopeKind {
    self.inner.kind
  }

  /// The scope singleton lifetimes are delegated to, if any.
  pub fn parent(&self) -> Option<&Injector> {
    self.inner.parent.as_ref()
  }

  /// Whether two handles refer to the same scope.
  pub fn ptr_eq(&self, other: &Injector) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  // --- Resolution ---

  /// Resolves the unnamed service `T`.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
    self.get_typed(ServiceKey::of::<T>())
  }

  /// Resolves the service `T` registered under `name`.
  pub fn get_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
    self.get_typed(ServiceKey::named::<T>(name))
  }

  fn get_typed<T: ?Sized + Any + Send + Sync>(&self, key: ServiceKey) -> Result<Arc<T>, ResolveError> {
    let instance = self.get_key(&key)?;
    downcast::<T>(&instance, &key)
  }

  /// Resolves a service by key, returning the type-erased instance.
  ///
  /// 1. A bound key (the context token) or an already cached instance is returned as is.
  /// 2. A singleton lifetime requested from a request scope is delegated to the parent.
  /// 3. A scoped lifetime requested from a container's singleton scope is refused.
  /// 4. Anything else is constructed here: dependencies are resolved through this
  ///    same injector, strictly left to right, and the result is cached.
  pub fn get_key(&self, key: &ServiceKey) -> Result<Instance, ResolveError> {
    if let Some(binding) = self.inner.bindings.get(key) {
      return binding().ok_or_else(|| ResolveError::ContextReleased { key: key.clone() });
    }
    if let Some(instance) = self.cached(key) {
      return Ok(instance);
    }
    if self.inner.reserved.as_ref() == Some(key) {
      return Err(ResolveError::UnresolvableOutsideScope { key: key.clone() });
    }

    let registration = self
      .inner
      .registry
      .get(key)
      .ok_or_else(|| ResolveError::UnregisteredService {
        key: key.clone(),
        chain: resolution_chain(),
      })?;

    match (self.inner.kind, registration.lifetime()) {
      (ScopeKind::Request, Lifetime::Singleton) => {
        if let Some(parent) = &self.inner.parent {
          return parent.get_key(key);
        }
      }
      (ScopeKind::Singleton, Lifetime::Scoped) => {
        return Err(ResolveError::UnresolvableOutsideScope { key: key.clone() });
      }
      _ => {}
    }

    self.construct(key, &registration)
  }

  fn cached(&self, key: &ServiceKey) -> Option<Instance> {
    self
      .inner
      .cache
      .get(key)
      .and_then(|cell| cell.get().cloned())
  }

  fn construct(&self, key: &ServiceKey, registration: &Registration) -> Result<Instance, ResolveError> {
    // The cycle check must precede the cell: re-entering `get_or_try_init`
    // for the same cell on one thread would block forever.
    let _guard = ResolutionGuard::enter(key)?;

    // Clone the cell out so no map shard stays locked while dependencies resolve.
    let cell = Arc::clone(self.inner.cache.entry(key.clone()).or_default().value());

    cell
      .get_or_try_init(|| {
        trace!(
          scope_id = self.inner.id,
          service = %key,
          lifetime = %registration.lifetime(),
          "constructing service"
        );
        let mut resolved = Vec::with_capacity(registration.dependencies().len());
        for dependency in registration.dependencies() {
          resolved.push(self.get_key(dependency)?);
        }
        registration.construct(resolved)
      })
      .cloned()
  }

  // --- Introspection ---

  pub fn has<T: ?Sized + Any>(&self) -> bool {
    self.has_key(&ServiceKey::of::<T>())
  }

  pub fn has_named<T: ?Sized + Any>(&self, name: &str) -> bool {
    self.has_key(&ServiceKey::named::<T>(name))
  }

  /// Whether `key` is bound, cached, or registered with a lifetime this scope
  /// can resolve. Does not construct anything.
  pub fn has_key(&self, key: &ServiceKey) -> bool {
    if self.inner.bindings.contains_key(key) || self.cached(key).is_some() {
      return true;
    }
    if self.inner.reserved.as_ref() == Some(key) {
      return false;
    }
    match self.inner.registry.get(key) {
      Some(registration) => {
        !(self.inner.kind == ScopeKind::Singleton && registration.lifetime() == Lifetime::Scoped)
      }
      None => false,
    }
  }
}

impl Default for Injector {
  fn default() -> Self {
    Self::empty()
  }
}

impl fmt::Debug for Injector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injector")
      .field("id", &self.inner.id)
      .field("kind", &self.inner.kind)
      .field("cached", &self.inner.cache.len())
      .finish_non_exhaustive()
  }
}
