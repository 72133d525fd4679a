//! Workspace permission normalization.
//!
//! The executor may run under a different UID than the initializer, and the
//! volume ownership is decided by the container runtime. Permissions are
//! therefore opened up with `chmod -R 777 .` run inside each directory rather
//! than by touching modes from this process.

use crate::process::{CommandError, CommandRunner};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Permissions could not be changed on a directory.
#[derive(Debug, Error)]
#[error("could not chmod {}: {source}", dir.display())]
pub struct PermissionError {
    pub dir: PathBuf,
    #[source]
    pub source: CommandError,
}

fn chmod_args() -> Vec<String> {
    vec!["-R".to_string(), "777".to_string(), ".".to_string()]
}

/// Recursively grant read/write/execute to everyone on `dir`.
pub fn normalize_permissions(runner: &dyn CommandRunner, dir: &Path) -> Result<(), PermissionError> {
    info!("Setting up access to files in {}", dir.display());
    runner
        .run(dir, "chmod", &chmod_args())
        .map(|_| ())
        .map_err(|source| PermissionError {
            dir: dir.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, SystemRunner};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(PathBuf, String, Vec<String>)>>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
            self.calls
                .borrow_mut()
                .push((dir.to_path_buf(), program.to_string(), args.to_vec()));
            Ok(CommandOutput::default())
        }
    }

    #[test]
    fn test_runs_recursive_chmod_in_dir() {
        let runner = Recorder::default();
        normalize_permissions(&runner, Path::new("/data")).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (dir, program, args) = &calls[0];
        assert_eq!(dir, Path::new("/data"));
        assert_eq!(program, "chmod");
        assert_eq!(args, &vec!["-R", "777", "."]);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_chmod_opens_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let file = nested.join("script.sh");
        std::fs::write(&file, "echo hi").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o600)).unwrap();

        normalize_permissions(&SystemRunner, dir.path()).unwrap();

        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o777);
    }

    #[test]
    fn test_missing_dir_is_permission_error() {
        let err = normalize_permissions(&SystemRunner, Path::new("/definitely/not/here/wsprep"))
            .unwrap_err();
        assert_eq!(err.dir, Path::new("/definitely/not/here/wsprep"));
        assert!(err.to_string().contains("could not chmod"));
    }
}
