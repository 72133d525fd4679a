//! Inline variables payload persistence.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Fixed name of the variables file inside the workspace.
pub const VARIABLES_FILE_NAME: &str = "params-file";

/// The variables file could not be written.
#[derive(Debug, Error)]
#[error("could not create variables file {}: {source}", path.display())]
pub struct WorkspaceWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write `payload` verbatim to `<workspace>/params-file`.
///
/// The file is created readable and writable by everyone (subject to the
/// process umask) and truncated if it already exists.
pub fn write_variables_file(workspace: &Path, payload: &str) -> Result<PathBuf, WorkspaceWriteError> {
    let path = workspace.join(VARIABLES_FILE_NAME);
    info!("Creating variables file {}", path.display());

    let write = || -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o666);
        }
        let mut file = options.open(&path)?;
        file.write_all(payload.as_bytes())?;
        file.sync_all()
    };

    match write() {
        Ok(()) => Ok(path),
        Err(source) => Err(WorkspaceWriteError { path, source }),
    }
}
