//! Externally supplied container settings.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Behavioural switches for a [`Container`](crate::Container), loadable from YAML.
///
/// ```yaml
/// context_name: request
/// eager_singletons: true
/// strict_dependencies: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
  /// Names the context token. Unnamed by default.
  #[serde(default)]
  pub context_name: Option<String>,
  /// Construct the up-front singletons during `start()` instead of on first use.
  #[serde(default)]
  pub eager_singletons: bool,
  /// Fail `start()` when a registration depends on a key nothing provides, or
  /// when a singleton depends on something that only exists per request.
  /// When off, these are logged as warnings.
  #[serde(default)]
  pub strict_dependencies: bool,
}

impl ContainerConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
    Ok(serde_yaml::from_str(source)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&source)
  }
}
