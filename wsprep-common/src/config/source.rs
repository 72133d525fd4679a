//! Source tracking for configuration values.

use serde::Serialize;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default, the variable was not set.
    Default,
    /// Read from a named variable.
    Environment,
}

/// A configuration value together with its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigSource,
    /// Full variable name when the value came from the environment.
    pub env_var: Option<String>,
}

impl<T> Sourced<T> {
    pub fn from_env(value: T, env_var: String) -> Self {
        Self {
            value,
            source: ConfigSource::Environment,
            env_var: Some(env_var),
        }
    }

    pub fn default_value(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
            env_var: None,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
