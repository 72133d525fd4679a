//! Shared types and utilities for wsprep.
//!
//! This crate holds the execution data model exchanged with the executor,
//! the runner configuration snapshot, secret masking and logging setup.

#![forbid(unsafe_code)]

pub mod config;
pub mod logging;
pub mod types;
pub mod util;

pub use config::{
    ConfigError, ConfigSource, EnvError, EnvParser, GitCredentials, ProcessEnv,
    ResolvedParameters, Sourced, StorageSettings, VarSource,
};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use types::{
    ArtifactRequest, ExecutionRequest, ExecutionResult, ExecutionStatus, Repository, TestContent,
};
pub use util::{MASK, mask_secret, mask_sensitive_command, mask_url_credentials};
