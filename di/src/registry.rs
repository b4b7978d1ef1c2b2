//! The registry: service keys mapped to their construction metadata.

use crate::error::{RegistrationError, ResolveError};
use crate::key::ServiceKey;
use crate::registration::Registration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Accumulates registrations before a container starts.
///
/// Registration takes `&self` so services can be registered from anywhere that
/// can see the container. Once frozen, the registry rejects further changes.
#[derive(Default)]
pub struct Registry {
  entries: DashMap<ServiceKey, Arc<Registration>>,
  frozen: AtomicBool,
}

impl Registry {
  /// Creates a new, empty `Registry`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores a registration.
  ///
  /// Re-registering a key with the same lifetime replaces the previous entry;
  /// the last registration wins. A different lifetime is a conflict.
  pub fn register(&self, registration: Registration) -> Result<(), RegistrationError> {
    if self.is_frozen() {
      return Err(RegistrationError::RegistryFrozen {
        key: registration.key().clone(),
      });
    }

    trace!(
      service = %registration.key(),
      lifetime = %registration.lifetime(),
      dependencies = registration.dependencies().len(),
      "registering service"
    );

    match self.entries.entry(registration.key().clone()) {
      Entry::Occupied(mut occupied) => {
        let existing = occupied.get().lifetime();
        if existing != registration.lifetime() {
          return Err(RegistrationError::DuplicateRegistration {
            key: registration.key().clone(),
            existing,
            requested: registration.lifetime(),
          });
        }
        occupied.insert(Arc::new(registration));
      }
      Entry::Vacant(vacant) => {
        vacant.insert(Arc::new(registration));
      }
    }
    Ok(())
  }

  /// Returns the registration for `key`.
  pub fn lookup(&self, key: &ServiceKey) -> Result<Arc<Registration>, ResolveError> {
    self
      .get(key)
      .ok_or_else(|| ResolveError::UnregisteredService {
        key: key.clone(),
        chain: Vec::new(),
      })
  }

  pub(crate) fn get(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
    self.entries.get(key).map(|entry| Arc::clone(entry.value()))
  }

  pub fn contains(&self, key: &ServiceKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// A snapshot of every registration, in no particular order.
  pub fn registrations(&self) -> Vec<Arc<Registration>> {
    self
      .entries
      .iter()
      .map(|entry| Arc::clone(entry.value()))
      .collect()
  }

  /// Searches the registered graph for a dependency cycle.
  ///
  /// Returns the first cycle found, starting and ending with the same key.
  /// Dependencies with no registration end the walk.
  pub fn find_cycle(&self) -> Option<Vec<ServiceKey>> {
    let mut finished = HashSet::new();
    let mut path = Vec::new();
    self
      .registrations()
      .iter()
      .find_map(|registration| self.walk(registration.key(), &mut path, &mut finished))
  }

  fn walk(
    &self,
    key: &ServiceKey,
    path: &mut Vec<ServiceKey>,
    finished: &mut HashSet<ServiceKey>,
  ) -> Option<Vec<ServiceKey>> {
    if finished.contains(key) {
      return None;
    }
    if let Some(start) = path.iter().position(|entry| entry == key) {
      let mut cycle = path[start..].to_vec();
      cycle.push(key.clone());
      return Some(cycle);
    }
    let registration = self.get(key)?;

    path.push(key.clone());
    for dependency in registration.dependencies() {
      if let Some(cycle) = self.walk(dependency, path, finished) {
        return Some(cycle);
      }
    }
    path.pop();
    finished.insert(key.clone());
    None
  }

  pub fn freeze(&self) {
    self.frozen.store(true, Ordering::Release);
  }

  pub fn is_frozen(&self) -> bool {
    self.frozen.load(Ordering::Acquire)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::key::Lifetime;

  struct Clock;

  #[test]
  fn lookup_of_missing_key_is_unregistered() {
    let registry = Registry::new();
    let err = registry.lookup(&ServiceKey::of::<Clock>()).unwrap_err();
    assert!(matches!(err, ResolveError::UnregisteredService { .. }));
  }

  #[test]
  fn same_lifetime_reregistration_replaces_the_entry() {
    let registry = Registry::new();
    registry.register(Registration::singleton(|()| Clock)).unwrap();
    registry.register(Registration::singleton(|()| Clock)).unwrap();
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn conflicting_lifetime_is_rejected() {
    let registry = Registry::new();
    registry.register(Registration::singleton(|()| Clock)).unwrap();

    let err = registry
      .register(Registration::scoped(|()| Clock))
      .unwrap_err();

    match err {
      RegistrationError::DuplicateRegistration {
        existing,
        requested,
        ..
      } => {
        assert_eq!(existing, Lifetime::Singleton);
        assert_eq!(requested, Lifetime::Scoped);
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
      registry.lookup(&ServiceKey::of::<Clock>()).unwrap().lifetime(),
      Lifetime::Singleton
    );
  }

  struct Upstream {
    _downstream: Arc<Downstream>,
  }
  struct Downstream {
    _upstream: Arc<Upstream>,
  }

  #[test]
  fn find_cycle_reports_a_closed_path() {
    let registry = Registry::new();
    registry.register(Registration::instance(Clock)).unwrap();
    assert_eq!(registry.find_cycle(), None);

    registry
      .register(Registration::singleton(|(downstream,): (Arc<Downstream>,)| Upstream {
        _downstream: downstream,
      }))
      .unwrap();
    registry
      .register(Registration::scoped(|(upstream,): (Arc<Upstream>,)| Downstream {
        _upstream: upstream,
      }))
      .unwrap();

    let cycle = registry.find_cycle().unwrap();
    assert_eq!(cycle.len(), 3);
    assert_eq!(cycle.first(), cycle.last());
    assert!(cycle.contains(&ServiceKey::of::<Upstream>()));
    assert!(cycle.contains(&ServiceKey::of::<Downstream>()));
  }

  #[test]
  fn find_cycle_ignores_unregistered_dependencies() {
    let registry = Registry::new();
    registry
      .register(Registration::scoped(|(_upstream,): (Arc<Upstream>,)| Clock))
      .unwrap();
    assert_eq!(registry.find_cycle(), None);
  }

  #[test]
  fn frozen_registry_rejects_registrations() {
    let registry = Registry::new();
    registry.freeze();
    let err = registry.register(Registration::instance(Clock)).unwrap_err();
    assert!(matches!(err, RegistrationError::RegistryFrozen { .. }));
    assert!(registry.is_empty());
  }
}
