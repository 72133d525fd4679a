//! Placement of previously uploaded objects into the workspace.
//!
//! Uploads live in two buckets per execution: the test bucket
//! (`test-<test name>`) and the execution bucket. Every object key becomes a
//! path relative to the workspace.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use wsprep_common::StorageSettings;

/// Errors that can occur while placing uploads.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("unsupported object store endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("object store root {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("could not place {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid bucket name: {0:?}")]
    InvalidBucket(String),

    #[error("could not list bucket: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Bucket holding uploads attached to a test definition.
pub fn test_bucket_name(test_name: &str) -> String {
    format!("test-{}", test_name)
}

/// A bucket name must be a single plain path component.
fn validate_bucket_name(bucket: &str) -> Result<(), PlacementError> {
    let mut components = Path::new(bucket).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == bucket => Ok(()),
        _ => Err(PlacementError::InvalidBucket(bucket.to_string())),
    }
}

/// Downloads uploaded objects into the workspace.
pub trait ObjectPlacer {
    /// Place every object from the test and execution buckets.
    ///
    /// Returns the number of objects written.
    fn place_files(
        &self,
        test_name: Option<&str>,
        bucket: Option<&str>,
        workspace: &Path,
    ) -> Result<usize, PlacementError>;
}

/// Builds a placer for the configured object store.
pub trait PlacerFactory {
    fn create(&self, settings: &StorageSettings) -> Result<Box<dyn ObjectPlacer>, PlacementError>;
}

/// Factory for the stores this build can reach directly.
///
/// Accepts `file://` URLs and absolute paths; network endpoints are reported
/// as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPlacerFactory;

impl PlacerFactory for DefaultPlacerFactory {
    fn create(&self, settings: &StorageSettings) -> Result<Box<dyn ObjectPlacer>, PlacementError> {
        let endpoint = settings.endpoint.as_str();
        let root = match endpoint.strip_prefix("file://") {
            Some(local) => PathBuf::from(local),
            None if Path::new(endpoint).is_absolute() => PathBuf::from(endpoint),
            None => return Err(PlacementError::UnsupportedEndpoint(endpoint.to_string())),
        };
        if settings.ssl {
            debug!("Ignoring TLS flag for local object store {}", root.display());
        }
        Ok(Box::new(FsObjectStore::open(root)?))
    }
}

/// Object store laid out as `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PlacementError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PlacementError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    fn place_bucket(&self, bucket: &str, workspace: &Path) -> Result<usize, PlacementError> {
        validate_bucket_name(bucket)?;
        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.is_dir() {
            debug!("Bucket {} is empty", bucket);
            return Ok(0);
        }

        let mut placed = 0;
        for entry in WalkDir::new(&bucket_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(key) = entry.path().strip_prefix(&bucket_dir) else {
                continue;
            };
            let target = workspace.join(key);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| PlacementError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(entry.path(), &target).map_err(|source| PlacementError::Io {
                path: target.clone(),
                source,
            })?;
            debug!("Placed {}/{} at {}", bucket, key.display(), target.display());
            placed += 1;
        }
        Ok(placed)
    }
}

impl ObjectPlacer for FsObjectStore {
    fn place_files(
        &self,
        test_name: Option<&str>,
        bucket: Option<&str>,
        workspace: &Path,
    ) -> Result<usize, PlacementError> {
        let buckets = test_name
            .filter(|n| !n.is_empty())
            .map(test_bucket_name)
            .into_iter()
            .chain(bucket.filter(|b| !b.is_empty()).map(str::to_string));

        let mut placed = 0;
        for bucket in buckets {
            let count = self.place_bucket(&bucket, workspace)?;
            info!("Placed {} object(s) from bucket {}", count, bucket);
            placed += count;
        }
        Ok(placed)
    }
}
