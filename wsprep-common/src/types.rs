//! Execution types shared between the initializer and the executor.
//!
//! Field names follow the executor's JSON contract (camelCase), so a request
//! produced by the scheduler deserializes without translation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One test run as handed to the initializer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Execution identifier.
    #[serde(default)]
    pub id: String,
    /// Human-readable execution name.
    #[serde(default)]
    pub name: String,
    /// Name of the test this execution belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// Where the test's source material comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TestContent>,
    /// Inline variables payload written to `params-file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_file: Option<String>,
    /// Object store bucket holding uploads for this execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    /// Artifact volume that the executor writes into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_request: Option<ArtifactRequest>,
}

impl ExecutionRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: TestContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_variables_file(mut self, payload: impl Into<String>) -> Self {
        self.variables_file = Some(payload.into());
        self
    }

    pub fn with_uploads(mut self, test_name: impl Into<String>, bucket: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self.bucket_name = Some(bucket.into());
        self
    }

    pub fn with_artifact_mount(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_request = Some(ArtifactRequest {
            storage_class_name: None,
            volume_mount_path: path.into(),
        });
        self
    }

    /// Variables payload, only when it carries data.
    pub fn variables_payload(&self) -> Option<&str> {
        self.variables_file.as_deref().filter(|v| !v.is_empty())
    }

    /// Artifact mount directory, if the execution requested one.
    pub fn artifact_mount_path(&self) -> Option<&std::path::Path> {
        self.artifact_request
            .as_ref()
            .map(|a| a.volume_mount_path.as_path())
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Repository reference when the content is a git variant.
    pub fn repository_mut(&mut self) -> Option<&mut Repository> {
        match self.content.as_mut()? {
            TestContent::Git { repository } => Some(repository),
            TestContent::String { .. } | TestContent::FileUri { .. } => None,
        }
    }
}

/// Tagged description of a test's source material.
///
/// The executor distinguishes `git-file` and `git-dir` only by how the
/// repository path is interpreted, so all three git tags share one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TestContent {
    /// Test source passed inline.
    #[serde(rename = "string")]
    String { data: String },
    /// Test source referenced by URI.
    #[serde(rename = "file-uri")]
    FileUri { uri: String },
    /// Test source living in a git repository.
    #[serde(rename = "git", alias = "git-file", alias = "git-dir")]
    Git { repository: Repository },
}

impl TestContent {
    pub fn string(data: impl Into<String>) -> Self {
        Self::String { data: data.into() }
    }

    pub fn file_uri(uri: impl Into<String>) -> Self {
        Self::FileUri { uri: uri.into() }
    }

    pub fn git(repository: Repository) -> Self {
        Self::Git { repository }
    }

    /// Short label used in progress logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::FileUri { .. } => "file-uri",
            Self::Git { .. } => "git",
        }
    }
}

/// Git repository reference.
///
/// `username` and `token` are empty in requests coming from the scheduler and
/// filled in by credential injection.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Path inside the repository holding the test (file or directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub token: String,
}

impl Repository {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.token.is_empty()
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("uri", &crate::util::mask_url_credentials(&self.uri))
            .field("branch", &self.branch)
            .field("commit", &self.commit)
            .field("path", &self.path)
            .field("working_dir", &self.working_dir)
            .field("username", &self.username)
            .field("token", &crate::util::mask_secret(&self.token))
            .finish()
    }
}

/// Artifact volume requested by the execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(default)]
    pub volume_mount_path: PathBuf,
}

/// Execution status values understood by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    /// Reported by a successful initialization: the test itself has not run yet.
    Running,
    Passed,
    Failed,
    Aborted,
    Timeout,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// Terminal output of the initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: String,
    /// Local path the test content was materialized at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,
}

impl ExecutionResult {
    /// Result handed to the executor once the workspace is ready.
    pub fn pending(content_path: impl Into<PathBuf>) -> Self {
        let content_path = content_path.into();
        Self {
            status: ExecutionStatus::Running,
            output: format!(
                "Initialization successful, test content at {}",
                content_path.display()
            ),
            content_path: Some(content_path),
        }
    }

    /// Result reported when initialization aborted.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            output: output.into(),
            content_path: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }
}
