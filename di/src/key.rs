//! Service identifiers and lifetimes.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identifies a service inside a registry.
///
/// Equality and hashing use the type's identity (`TypeId`) plus an optional
/// name, so two structurally identical types never collide. The type name is
/// carried for diagnostics only.
#[derive(Clone)]
pub struct ServiceKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Arc<str>>,
}

impl ServiceKey {
  /// The unnamed key for `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: None,
    }
  }

  /// A named key for `T`. Several registrations of the same type can coexist
  /// under different names.
  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self::of::<T>().with_name(name)
  }

  /// The same type identity under a different name.
  pub fn with_name(mut self, name: &str) -> Self {
    self.name = Some(Arc::from(name));
    self
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl PartialEq for ServiceKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.name.hash(state);
  }
}

impl fmt::Debug for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_name, name),
      None => write!(f, "Key({})", self.type_name),
    }
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}[\"{}\"]", self.type_name, name),
      None => f.write_str(self.type_name),
    }
  }
}

/// How long a constructed instance is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
  /// One instance per container, shared by every scope.
  Singleton,
  /// One instance per request scope.
  Scoped,
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifetime::Singleton => f.write_str("singleton"),
      Lifetime::Scoped => f.write_str("scoped"),
    }
  }
}
