//! Configuration for wsprep.
//!
//! Values come from a [`VarSource`] handed in by the caller, never from
//! global state read inside pipeline stages:
//! - [`EnvParser`] parses typed values and collects every error
//! - [`Sourced`] records where each value came from
//! - [`ResolvedParameters`] is the immutable snapshot consumed by the pipeline

pub mod env;
pub mod params;
pub mod source;

pub use env::{EnvError, EnvParser, ProcessEnv, VarSource};
pub use params::{ConfigError, GitCredentials, ResolvedParameters, StorageSettings};
pub use source::{ConfigSource, Sourced};
