//! Logging setup shared by wsprep binaries.
//!
//! Logs always go to stderr: stdout is reserved for the execution result
//! document consumed by the executor.

use crate::config::{EnvError, EnvParser, VarSource};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl LogConfig {
    /// Read `WSPREP_LOG_LEVEL` and `WSPREP_LOG_FORMAT`, falling back to
    /// `default_level` and pretty output.
    ///
    /// Malformed values fall back to the defaults; the parse errors are
    /// returned so the caller can report them once logging is up.
    pub fn from_env(source: &dyn VarSource, default_level: &str) -> (Self, Vec<EnvError>) {
        let mut parser = EnvParser::with_prefix(source, "WSPREP_");
        let level = parser.get_log_level("LOG_LEVEL", default_level).into_inner();
        let format = match parser.get_string("LOG_FORMAT", "pretty").value.as_str() {
            "json" => LogFormat::Json,
            "pretty" | "" => LogFormat::Pretty,
            other => {
                let var = parser.var_name("LOG_FORMAT");
                let mut errors = parser.take_errors();
                errors.push(EnvError::InvalidValue {
                    var,
                    expected: "pretty or json".to_string(),
                    value: other.to_string(),
                });
                return (Self { level, format: LogFormat::Pretty }, errors);
            }
        };
        let errors = parser.take_errors();
        (Self { level, format }, errors)
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }
}

/// Install the global subscriber.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
}
