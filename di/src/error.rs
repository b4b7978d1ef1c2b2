use crate::key::{Lifetime, ServiceKey};
use thiserror::Error;

/// Errors raised while resolving a service.
///
/// Resolution errors are never retried: the registration graph does not change
/// between attempts, so the same request would fail the same way.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("service `{key}` is not registered{}", required_by(.chain))]
  UnregisteredService {
    key: ServiceKey,
    /// Services under construction when the lookup failed, outermost first.
    chain: Vec<ServiceKey>,
  },

  #[error("circular dependency detected: {}", join(.cycle))]
  CircularDependency {
    /// The cycle, starting and ending with the same key.
    cycle: Vec<ServiceKey>,
  },

  #[error("scoped service `{key}` cannot be resolved outside a request scope")]
  UnresolvableOutsideScope { key: ServiceKey },

  #[error("the context bound to `{key}` has already been released")]
  ContextReleased { key: ServiceKey },

  #[error("instance registered for `{key}` is not a `{expected}`")]
  TypeMismatch {
    key: ServiceKey,
    expected: &'static str,
  },
}

/// Errors raised while registering a service.
#[derive(Debug, Error)]
pub enum RegistrationError {
  #[error("service `{key}` is already registered as {existing}, cannot re-register it as {requested}")]
  DuplicateRegistration {
    key: ServiceKey,
    existing: Lifetime,
    requested: Lifetime,
  },

  #[error("cannot register `{key}`: the registry is frozen once the container has started")]
  RegistryFrozen { key: ServiceKey },
}

/// Errors raised while loading a [`ContainerConfig`](crate::ContainerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read container configuration: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse container configuration: {0}")]
  Parse(#[from] serde_yaml::Error),
}

/// The umbrella error type for `ingress_di`.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Registration(#[from] RegistrationError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

/// A specialized `Result` type for `ingress_di` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

fn join(keys: &[ServiceKey]) -> String {
  keys
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" -> ")
}

fn required_by(chain: &[ServiceKey]) -> String {
  if chain.is_empty() {
    String::new()
  } else {
    format!(" (required by {})", join(chain))
  }
}
