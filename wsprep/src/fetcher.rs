//! Test content materialization.
//!
//! The pipeline only depends on [`ContentFetcher`]. [`WorkspaceFetcher`] is
//! the stock implementation: it writes inline content, copies local file
//! references and shallow-clones git repositories into the workspace.

use crate::process::{CommandError, CommandRunner};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use wsprep_common::{Repository, TestContent, mask_url_credentials};

/// File name used for inline and file-reference content.
pub const CONTENT_FILE_NAME: &str = "test-content";

/// Directory name git content is cloned into.
pub const REPOSITORY_DIR_NAME: &str = "repo";

/// Errors that can occur while fetching test content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported content URI: {0}")]
    UnsupportedUri(String),

    #[error("git checkout failed: {0}")]
    Git(#[from] CommandError),

    #[error("path {} not found in repository", path.display())]
    MissingPath { path: PathBuf },
}

/// Resolves a content descriptor into a local path.
pub trait ContentFetcher {
    /// Materialize `content` under `workspace` and return where it landed.
    fn fetch(&self, content: Option<&TestContent>, workspace: &Path) -> Result<PathBuf, FetchError>;
}

/// Default fetcher writing into the workspace directory.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFetcher<R> {
    runner: R,
}

impl<R: CommandRunner> WorkspaceFetcher<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn fetch_string(&self, data: &str, workspace: &Path) -> Result<PathBuf, FetchError> {
        let path = workspace.join(CONTENT_FILE_NAME);
        fs::write(&path, data).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn fetch_file_uri(&self, uri: &str, workspace: &Path) -> Result<PathBuf, FetchError> {
        let source_path = match uri.strip_prefix("file://") {
            Some(local) => PathBuf::from(local),
            None if uri.contains("://") => return Err(FetchError::UnsupportedUri(uri.to_string())),
            None => PathBuf::from(uri),
        };

        let path = workspace.join(CONTENT_FILE_NAME);
        fs::copy(&source_path, &path).map_err(|source| FetchError::Io {
            path: source_path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn fetch_git(&self, repository: &Repository, workspace: &Path) -> Result<PathBuf, FetchError> {
        let repo_dir = workspace.join(REPOSITORY_DIR_NAME);
        if repo_dir.exists() {
            debug!("Removing stale checkout at {}", repo_dir.display());
            fs::remove_dir_all(&repo_dir).map_err(|source| FetchError::Io {
                path: repo_dir.clone(),
                source,
            })?;
        }

        let url = authenticated_url(repository);
        let mut args = vec!["clone".to_string()];
        // A pinned commit may be anywhere in history, so only shallow-clone branch tips.
        if repository.commit.is_none() {
            args.extend(["--depth".to_string(), "1".to_string()]);
        }
        if let Some(branch) = repository.branch.as_deref().filter(|b| !b.is_empty()) {
            args.extend(["--branch".to_string(), branch.to_string()]);
        }
        args.push(url);
        args.push(REPOSITORY_DIR_NAME.to_string());

        info!(
            "Cloning {} into {}",
            mask_url_credentials(&repository.uri),
            repo_dir.display()
        );
        self.runner.run(workspace, "git", &args)?;

        if let Some(commit) = repository.commit.as_deref().filter(|c| !c.is_empty()) {
            info!("Checking out commit {}", commit);
            self.runner.run(
                &repo_dir,
                "git",
                &["checkout".to_string(), commit.to_string()],
            )?;
        }

        match repository.path.as_deref().filter(|p| !p.is_empty()) {
            Some(sub_path) => {
                let path = repo_dir.join(sub_path);
                if !path.exists() {
                    return Err(FetchError::MissingPath {
                        path: PathBuf::from(sub_path),
                    });
                }
                Ok(path)
            }
            None => Ok(repo_dir),
        }
    }
}

impl<R: CommandRunner> ContentFetcher for WorkspaceFetcher<R> {
    fn fetch(&self, content: Option<&TestContent>, workspace: &Path) -> Result<PathBuf, FetchError> {
        match content {
            None => {
                debug!("No test content, using workspace {}", workspace.display());
                Ok(workspace.to_path_buf())
            }
            Some(TestContent::String { data }) => self.fetch_string(data, workspace),
            Some(TestContent::FileUri { uri }) => self.fetch_file_uri(uri, workspace),
            Some(TestContent::Git { repository }) => self.fetch_git(repository, workspace),
        }
    }
}

/// Embed the repository's credentials into an http(s) clone URL.
///
/// Both userinfo parts are percent-encoded so reserved characters in a token
/// cannot change where the URL points.
/// Non-http URLs (ssh, local paths) are returned unchanged.
pub fn authenticated_url(repository: &Repository) -> String {
    let uri = repository.uri.as_str();
    if !repository.has_credentials() {
        return uri.to_string();
    }

    let Some(scheme_end) = uri.find("://") else {
        warn!("Cannot embed credentials into non-URL repository {}", uri);
        return uri.to_string();
    };
    let scheme = &uri[..scheme_end];
    if scheme != "http" && scheme != "https" {
        warn!(
            "Cannot embed credentials into {} URL {}",
            scheme,
            mask_url_credentials(uri)
        );
        return uri.to_string();
    }

    let rest = &uri[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    // Drop any userinfo already present in the URL.
    let host_and_path = match rest[..authority_end].rfind('@') {
        Some(at) => &rest[at + 1..],
        None => rest,
    };

    format!(
        "{}://{}:{}@{}",
        scheme,
        urlencoding::encode(&repository.username),
        urlencoding::encode(&repository.token),
        host_and_path
    )
}
