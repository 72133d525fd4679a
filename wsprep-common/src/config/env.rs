//! Environment variable parsing with type safety.
//!
//! Provides a type-safe parser for runner variables with validation, error
//! collection, and source tracking. The parser reads through a [`VarSource`]
//! so callers decide whether values come from the process environment or an
//! explicit map.

use super::source::Sourced;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Lookup of named configuration values.
pub trait VarSource {
    /// Value of `name`, or `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: VarSource + ?Sized> VarSource for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// Invalid value for a variable.
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    /// Invalid log level.
    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// Type-safe environment variable parser.
///
/// Collects errors during parsing so all issues can be reported at once.
pub struct EnvParser<'a> {
    source: &'a dyn VarSource,
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl<'a> EnvParser<'a> {
    /// Create a new parser with the RUNNER_ prefix.
    pub fn new(source: &'a dyn VarSource) -> Self {
        Self::with_prefix(source, "RUNNER_")
    }

    /// Create a parser for a different variable family.
    pub fn with_prefix(source: &'a dyn VarSource, prefix: &'static str) -> Self {
        Self {
            source,
            prefix,
            errors: Vec::new(),
        }
    }

    /// Get all accumulated errors.
    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take ownership of errors.
    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Get the full variable name with prefix.
    pub fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Get a string value with default.
    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.source.var(&var_name) {
            Some(value) => Sourced::from_env(value, var_name),
            None => Sourced::default_value(default.to_string()),
        }
    }

    /// Get a boolean value with default.
    ///
    /// Accepts: 1, true, yes, on (for true)
    ///          0, false, no, off, "" (for false)
    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let var_name = self.var_name(name);
        match self.source.var(&var_name) {
            Some(value) => {
                let parsed = match value.trim().to_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" | "" => false,
                    _ => {
                        self.errors.push(EnvError::InvalidValue {
                            var: var_name.clone(),
                            expected: "boolean (true/false/1/0/yes/no)".to_string(),
                            value: value.clone(),
                        });
                        default
                    }
                };
                Sourced::from_env(parsed, var_name)
            }
            None => Sourced::default_value(default),
        }
    }

    /// Get a path value with ~ expansion.
    pub fn get_path(&mut self, name: &str, default: &str) -> Sourced<PathBuf> {
        let var_name = self.var_name(name);
        match self.source.var(&var_name) {
            Some(value) => Sourced::from_env(expand_home(&value), var_name),
            None => Sourced::default_value(expand_home(default)),
        }
    }

    /// Get a log level value with validation.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.source.var(&var_name) {
            Some(value) => {
                let lower = value.to_lowercase();
                match lower.as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                        Sourced::from_env(lower, var_name)
                    }
                    _ => {
                        self.errors.push(EnvError::InvalidLogLevel {
                            var: var_name.clone(),
                            value: value.clone(),
                        });
                        Sourced::from_env(default.to_string(), var_name)
                    }
                }
            }
            None => Sourced::default_value(default.to_string()),
        }
    }
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(stripped) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(value)
}
