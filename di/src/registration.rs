//! Construction metadata: what a service depends on, how long it lives and how
//! it is built.

use crate::error::ResolveError;
use crate::key::{Lifetime, ServiceKey};
use crate::resolution::{downcast, erase, Instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Factory = Box<dyn Fn(&ServiceKey, Vec<Instance>) -> Result<Instance, ResolveError> + Send + Sync>;

/// An ordered list of constructor dependencies.
///
/// Implemented for `()` and for tuples of up to eight `Arc<T>`. The tuple type
/// doubles as the declaration: its element types become the registration's
/// dependency keys, in order, so the factory's parameters and the resolved
/// instances can never drift apart.
pub trait Dependencies: Sized + 'static {
  /// The keys to resolve, in construction order.
  fn keys() -> Vec<ServiceKey>;

  /// Rebuilds the typed tuple from instances resolved for [`keys`](Self::keys).
  fn from_instances(owner: &ServiceKey, instances: Vec<Instance>) -> Result<Self, ResolveError>;
}

impl Dependencies for () {
  fn keys() -> Vec<ServiceKey> {
    Vec::new()
  }

  fn from_instances(_owner: &ServiceKey, _instances: Vec<Instance>) -> Result<Self, ResolveError> {
    Ok(())
  }
}

macro_rules! impl_dependencies {
  ($($dep:ident),+) => {
    impl<$($dep),+> Dependencies for ($(Arc<$dep>,)+)
    where
      $($dep: ?Sized + Any + Send + Sync,)+
    {
      fn keys() -> Vec<ServiceKey> {
        vec![$(ServiceKey::of::<$dep>()),+]
      }

      fn from_instances(owner: &ServiceKey, instances: Vec<Instance>) -> Result<Self, ResolveError> {
        let mut instances = instances.into_iter();
        Ok(($(
          {
            let instance = instances.next().ok_or_else(|| ResolveError::TypeMismatch {
              key: owner.clone(),
              expected: std::any::type_name::<$dep>(),
            })?;
            downcast::<$dep>(&instance, &ServiceKey::of::<$dep>())?
          },
        )+))
      }
    }
  };
}

impl_dependencies!(A);
impl_dependencies!(A, B);
impl_dependencies!(A, B, C);
impl_dependencies!(A, B, C, D);
impl_dependencies!(A, B, C, D, E);
impl_dependencies!(A, B, C, D, E, F);
impl_dependencies!(A, B, C, D, E, F, G);
impl_dependencies!(A, B, C, D, E, F, G, H);

/// A type that knows how to build itself from its declared dependencies.
///
/// This is the opt-in for the container's marker-style helpers
/// (`service`, `singleton_service` and their `_with` forms).
///
/// ```
/// use ingress_di::Injectable;
/// use std::sync::Arc;
///
/// struct Config;
/// struct Repository {
///   config: Arc<Config>,
/// }
///
/// impl Injectable for Repository {
///   type Dependencies = (Arc<Config>,);
///
///   fn construct((config,): Self::Dependencies) -> Self {
///     Repository { config }
///   }
/// }
/// ```
pub trait Injectable: Any + Send + Sync + Sized {
  type Dependencies: Dependencies;

  fn construct(dependencies: Self::Dependencies) -> Self;
}

/// Options for the invoked registration forms.
///
/// `ServiceOptions::default()` is the invoked-with-no-arguments form and behaves
/// like the bare marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOptions {
  pub lifetime: Option<Lifetime>,
  pub name: Option<String>,
}

impl ServiceOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overrides the lifetime implied by the marker.
  pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
    self.lifetime = Some(lifetime);
    self
  }

  /// Registers under a named key instead of the type's unnamed key.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }
}

/// The static description needed to construct a service.
pub struct Registration {
  key: ServiceKey,
  lifetime: Lifetime,
  dependencies: Vec<ServiceKey>,
  factory: Factory,
}

impl Registration {
  /// Registers `T` built by `factory` from the dependencies `D`.
  pub fn new<T, D, F>(lifetime: Lifetime, factory: F) -> Self
  where
    T: Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> T + Send + Sync + 'static,
  {
    Self::shared::<T, D, _>(lifetime, move |dependencies| Arc::new(factory(dependencies)))
  }

  /// Like [`new`](Self::new), for factories that hand back an `Arc<T>`.
  ///
  /// This is the form for trait objects: register `dyn Trait` with a factory
  /// returning `Arc<dyn Trait>`.
  pub fn shared<T, D, F>(lifetime: Lifetime, factory: F) -> Self
  where
    T: ?Sized + Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> Arc<T> + Send + Sync + 'static,
  {
    Self {
      key: ServiceKey::of::<T>(),
      lifetime,
      dependencies: D::keys(),
      factory: Box::new(move |key: &ServiceKey, instances: Vec<Instance>| {
        let dependencies = D::from_instances(key, instances)?;
        Ok(erase(factory(dependencies)))
      }),
    }
  }

  pub fn singleton<T, D, F>(factory: F) -> Self
  where
    T: Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> T + Send + Sync + 'static,
  {
    Self::new(Lifetime::Singleton, factory)
  }

  pub fn scoped<T, D, F>(factory: F) -> Self
  where
    T: Any + Send + Sync,
    D: Dependencies,
    F: Fn(D) -> T + Send + Sync + 'static,
  {
    Self::new(Lifetime::Scoped, factory)
  }

  /// Registers an [`Injectable`] type with the given lifetime.
  pub fn injectable<T: Injectable>(lifetime: Lifetime) -> Self {
    Self::new::<T, T::Dependencies, _>(lifetime, T::construct)
  }

  /// A pre-built singleton. Every resolution hands out the same allocation.
  pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
    let value = Arc::new(value);
    Self::shared::<T, (), _>(Lifetime::Singleton, move |()| Arc::clone(&value))
  }

  /// Moves the registration to a named key.
  pub fn named(mut self, name: &str) -> Self {
    self.key = self.key.with_name(name);
    self
  }

  pub fn key(&self) -> &ServiceKey {
    &self.key
  }

  pub fn lifetime(&self) -> Lifetime {
    self.lifetime
  }

  pub fn dependencies(&self) -> &[ServiceKey] {
    &self.dependencies
  }

  pub(crate) fn construct(&self, instances: Vec<Instance>) -> Result<Instance, ResolveError> {
    (self.factory)(&self.key, instances)
  }
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("key", &self.key)
      .field("lifetime", &self.lifetime)
      .field("dependencies", &self.dependencies)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Config;
  struct Cache;
  struct Repository {
    _config: Arc<Config>,
    _cache: Arc<Cache>,
  }

  #[test]
  fn dependency_keys_follow_tuple_order() {
    let registration =
      Registration::scoped(|(config, cache): (Arc<Config>, Arc<Cache>)| Repository {
        _config: config,
        _cache: cache,
      });

    assert_eq!(
      registration.dependencies(),
      &[ServiceKey::of::<Config>(), ServiceKey::of::<Cache>()]
    );
    assert_eq!(registration.key(), &ServiceKey::of::<Repository>());
    assert_eq!(registration.lifetime(), Lifetime::Scoped);
  }

  #[test]
  fn factory_rejects_instances_of_the_wrong_type() {
    let registration = Registration::scoped(|(config,): (Arc<Config>,)| Repository {
      _config: config,
      _cache: Arc::new(Cache),
    });

    let wrong = erase(Arc::new(Cache));
    let err = registration.construct(vec![wrong]).unwrap_err();
    assert!(matches!(err, ResolveError::TypeMismatch { .. }));
  }

  #[test]
  fn named_registration_keeps_type_identity() {
    let registration = Registration::instance(Config).named("primary");
    assert_eq!(registration.key(), &ServiceKey::named::<Config>("primary"));
    assert_eq!(registration.lifetime(), Lifetime::Singleton);
  }
}
