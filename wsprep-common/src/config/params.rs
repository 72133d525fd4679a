//! Runner parameters resolved once per execution.

use super::env::{EnvError, EnvParser, VarSource};
use crate::util::mask_secret;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not read environment variables: {}", join_errors(.errors))]
pub struct ConfigError {
    pub errors: Vec<EnvError>,
}

fn join_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Object store connection settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageSettings {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub location: String,
    pub token: String,
    pub ssl: bool,
}

impl StorageSettings {
    /// Placement only runs when an endpoint is configured.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &mask_secret(&self.access_key_id))
            .field("secret_access_key", &mask_secret(&self.secret_access_key))
            .field("location", &self.location)
            .field("token", &mask_secret(&self.token))
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Credentials injected into git content descriptors.
#[derive(Clone, PartialEq, Eq)]
pub struct GitCredentials {
    pub username: String,
    pub token: String,
}

impl GitCredentials {
    /// Both parts must be present; a half-configured pair injects nothing.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let token = token.into();
        if username.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self { username, token })
    }
}

impl std::fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCredentials")
            .field("username", &self.username)
            .field("token", &mask_secret(&self.token))
            .finish()
    }
}

/// Immutable snapshot of the runner configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedParameters {
    storage: StorageSettings,
    git_username: String,
    git_token: String,
    data_dir: PathBuf,
}

impl ResolvedParameters {
    /// Read every `RUNNER_*` variable from `source`.
    ///
    /// Unset values default to empty/false. All malformed values are reported
    /// together.
    pub fn resolve(source: &dyn VarSource) -> Result<Self, ConfigError> {
        let mut parser = EnvParser::new(source);

        let storage = StorageSettings {
            endpoint: parser.get_string("ENDPOINT", "").into_inner(),
            access_key_id: parser.get_string("ACCESSKEYID", "").into_inner(),
            secret_access_key: parser.get_string("SECRETACCESSKEY", "").into_inner(),
            location: parser.get_string("LOCATION", "").into_inner(),
            token: parser.get_string("TOKEN", "").into_inner(),
            ssl: parser.get_bool("SSL", false).into_inner(),
        };
        let git_username = parser.get_string("GITUSERNAME", "").into_inner();
        let git_token = parser.get_string("GITTOKEN", "").into_inner();
        let data_dir = parser.get_path("DATADIR", "").into_inner();

        if parser.has_errors() {
            return Err(ConfigError {
                errors: parser.take_errors(),
            });
        }

        Ok(Self {
            storage,
            git_username,
            git_token,
            data_dir,
        })
    }

    /// Build a snapshot directly, bypassing variable lookup.
    pub fn new(
        storage: StorageSettings,
        git_username: impl Into<String>,
        git_token: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            git_username: git_username.into(),
            git_token: git_token.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub fn git_credentials(&self) -> Option<GitCredentials> {
        GitCredentials::new(self.git_username.as_str(), self.git_token.as_str())
    }

    /// Workspace directory; an empty value means the current directory.
    pub fn workspace(&self) -> &Path {
        if self.data_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.data_dir
        }
    }

    /// Log every parameter, masking secrets.
    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            info!("{}", line);
        }
    }

    /// `NAME="value"` lines as logged by [`Self::log_summary`].
    pub fn summary_lines(&self) -> Vec<String> {
        let s = &self.storage;
        vec![
            format!("RUNNER_ENDPOINT=\"{}\"", s.endpoint),
            format!("RUNNER_ACCESSKEYID=\"{}\"", mask_secret(&s.access_key_id)),
            format!(
                "RUNNER_SECRETACCESSKEY=\"{}\"",
                mask_secret(&s.secret_access_key)
            ),
            format!("RUNNER_LOCATION=\"{}\"", s.location),
            format!("RUNNER_TOKEN=\"{}\"", mask_secret(&s.token)),
            format!("RUNNER_SSL={}", s.ssl),
            format!("RUNNER_GITUSERNAME=\"{}\"", self.git_username),
            format!("RUNNER_GITTOKEN=\"{}\"", mask_secret(&self.git_token)),
            format!("RUNNER_DATADIR=\"{}\"", self.workspace().display()),
        ]
    }
}

impl std::fmt::Debug for ResolvedParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedParameters")
            .field("storage", &self.storage)
            .field("git_username", &self.git_username)
            .field("git_token", &mask_secret(&self.git_token))
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
