//! Resolution plumbing shared by registrations and injectors: the erased
//! instance type and the per-thread construction stack.

use crate::error::ResolveError;
use crate::key::ServiceKey;
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

/// A type-erased service instance.
///
/// The erased value is always an `Arc<T>` for the service type `T`, which lets
/// unsized services (trait objects) share the same storage as concrete ones and
/// keeps every handle handed out pointing at the same allocation.
pub type Instance = Arc<dyn Any + Send + Sync>;

thread_local! {
  // Services currently under construction on this thread, outermost first.
  // Factories are synchronous, so the stack is always empty at an `.await`.
  static RESOLVING_STACK: RefCell<Vec<ServiceKey>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard that marks a service as under construction.
///
/// Entering a key that is already on the stack is a circular dependency and
/// fails with the cycle instead of recursing. Dropping the guard pops the key.
pub(crate) struct ResolutionGuard {
  _private: (),
}

impl ResolutionGuard {
  pub(crate) fn enter(key: &ServiceKey) -> Result<Self, ResolveError> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(start) = stack.iter().position(|entry| entry == key) {
        let mut cycle = stack[start..].to_vec();
        cycle.push(key.clone());
        return Err(ResolveError::CircularDependency { cycle });
      }
      stack.push(key.clone());
      Ok(Self { _private: () })
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      stack.borrow_mut().pop();
    });
  }
}

/// Snapshot of the services under construction on this thread.
pub(crate) fn resolution_chain() -> Vec<ServiceKey> {
  RESOLVING_STACK.with(|stack| stack.borrow().clone())
}

pub(crate) fn erase<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Instance {
  Arc::new(value)
}

pub(crate) fn downcast<T: ?Sized + Any + Send + Sync>(
  instance: &Instance,
  key: &ServiceKey,
) -> Result<Arc<T>, ResolveError> {
  instance
    .downcast_ref::<Arc<T>>()
    .cloned()
    .ok_or_else(|| ResolveError::TypeMismatch {
      key: key.clone(),
      expected: std::any::type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Outer;
  struct Inner;

  #[test]
  fn guard_reports_the_cycle_from_its_first_occurrence() {
    let outer = ServiceKey::of::<Outer>();
    let inner = ServiceKey::of::<Inner>();

    let _outer = ResolutionGuard::enter(&outer).unwrap();
    let _inner = ResolutionGuard::enter(&inner).unwrap();

    match ResolutionGuard::enter(&outer) {
      Err(ResolveError::CircularDependency { cycle }) => {
        assert_eq!(cycle, vec![outer.clone(), inner.clone(), outer.clone()]);
      }
      other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn dropping_the_guard_pops_the_stack() {
    let outer = ServiceKey::of::<Outer>();
    {
      let _guard = ResolutionGuard::enter(&outer).unwrap();
      assert_eq!(resolution_chain(), vec![outer.clone()]);
    }
    assert!(resolution_chain().is_empty());
    assert!(ResolutionGuard::enter(&outer).is_ok());
  }

  #[test]
  fn erased_instances_downcast_to_the_same_allocation() {
    let value = Arc::new(String::from("shared"));
    let instance = erase(Arc::clone(&value));
    let key = ServiceKey::of::<String>();

    let back = downcast::<String>(&instance, &key).unwrap();
    assert!(Arc::ptr_eq(&value, &back));
    assert!(downcast::<u32>(&instance, &key).is_err());
  }
}
