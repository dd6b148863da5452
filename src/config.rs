//! Configuration for container defaults.
//!
//! A [`ContainerConfig`] carries the defaults new registrations inherit and
//! the adapter lookup order. It can be built in code, read from environment
//! variables, or (with the `config` feature) parsed from JSON.

use std::collections::HashMap;
use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult, Owner, ReuseScope};

/// Prefix used by [`ContainerConfig::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_CONTAINER";

/// Container defaults
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, ContainerConfig, Owner, ReuseScope};
///
/// let config = ContainerConfig {
///     default_reuse: ReuseScope::None,
///     default_owner: Owner::External,
///     check_adapter_first: false,
/// };
///
/// let container = Container::with_config(config);
/// assert_eq!(container.default_reuse(), ReuseScope::None);
/// assert_eq!(container.default_owner(), Owner::External);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Reuse scope given to new registrations
    pub default_reuse: ReuseScope,
    /// Owner given to new registrations
    pub default_owner: Owner,
    /// Ask the adapter before the container hierarchy
    pub check_adapter_first: bool,
}

impl ContainerConfig {
    /// Load configuration from a config source, falling back to defaults for missing keys
    pub fn load(source: &dyn ConfigSource) -> DiResult<Self> {
        let mut config = Self::default();
        if let Some(value) = source.get("default_reuse") {
            config.default_reuse = value.parse()?;
        }
        if let Some(value) = source.get("default_owner") {
            config.default_owner = value.parse()?;
        }
        if let Some(value) = source.get("check_adapter_first") {
            config.check_adapter_first = parse_bool(&value)?;
        }
        Ok(config)
    }

    /// Reads `FERROUS_CONTAINER_DEFAULT_REUSE`, `FERROUS_CONTAINER_DEFAULT_OWNER`
    /// and `FERROUS_CONTAINER_CHECK_ADAPTER_FIRST`.
    pub fn from_env() -> DiResult<Self> {
        Self::load(&EnvironmentConfigSource::with_prefix(ENV_PREFIX))
    }

    /// Parses a JSON object such as `{"default_reuse": "container"}`.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DiError::Configuration(format!("invalid JSON configuration: {}", e)))
    }
}

fn parse_bool(value: &str) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DiError::Configuration(format!("'{}' is not a boolean", other))),
    }
}

/// Source of raw configuration values
pub trait ConfigSource: Send + Sync {
    /// Raw value for `key`, if the source has one.
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        let env_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(env_key).ok()
    }
}

/// In-memory configuration source
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// JSON file configuration source
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    values: HashMap<String, serde_json::Value>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    /// Reads and parses the JSON object at `path`.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parses a JSON object.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> DiResult<Self> {
        let values = serde_json::from_str(json)
            .map_err(|e| DiError::Configuration(format!("invalid JSON configuration: {}", e)))?;
        Ok(Self { values })
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_container_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.default_reuse, ReuseScope::Hierarchy);
        assert_eq!(config.default_owner, Owner::Container);
        assert!(!config.check_adapter_first);
    }

    #[test]
    fn loads_from_map_source() {
        let source = MapConfigSource::new()
            .set("default_reuse", "container")
            .set("default_owner", "external")
            .set("check_adapter_first", "yes");

        let config = ContainerConfig::load(&source).unwrap();
        assert_eq!(config.default_reuse, ReuseScope::Container);
        assert_eq!(config.default_owner, Owner::External);
        assert!(config.check_adapter_first);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let source = MapConfigSource::new().set("check_adapter_first", "maybe");
        assert!(matches!(ContainerConfig::load(&source), Err(DiError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn reads_prefixed_environment_variables() {
        env::set_var("FERROUS_CONTAINER_DEFAULT_REUSE", "none");
        let config = ContainerConfig::from_env();
        env::remove_var("FERROUS_CONTAINER_DEFAULT_REUSE");

        assert_eq!(config.unwrap().default_reuse, ReuseScope::None);
    }

    #[test]
    #[serial]
    fn missing_environment_falls_back_to_defaults() {
        env::remove_var("FERROUS_CONTAINER_DEFAULT_OWNER");
        let config = ContainerConfig::from_env().unwrap();
        assert_eq!(config.default_owner, Owner::Container);
    }

    #[cfg(feature = "config")]
    #[test]
    fn parses_json() {
        let config = ContainerConfig::from_json_str(r#"{"default_reuse": "request"}"#).unwrap();
        assert_eq!(config.default_reuse, ReuseScope::Request);
        assert_eq!(config.default_owner, Owner::Container);

        let source = JsonConfigSource::from_str(r#"{"check_adapter_first": true}"#).unwrap();
        assert!(ContainerConfig::load(&source).unwrap().check_adapter_first);
    }
}
