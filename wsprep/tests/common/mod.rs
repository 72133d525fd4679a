//! Shared fixtures and collaborator doubles for pipeline tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt};
use wsprep::{
    CommandError, CommandOutput, CommandRunner, ContentFetcher, FetchError, ObjectPlacer,
    PlacementError, PlacerFactory,
};
use wsprep_common::{StorageSettings, TestContent};

pub fn init_test_logging() {
    let _ = fmt()
        .with_test_writer()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("wsprep=debug".parse().unwrap()),
        )
        .try_init();
}

/// Temporary workspace plus the variables pointing the pipeline at it.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub vars: HashMap<String, String>,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut vars = HashMap::new();
        vars.insert(
            "RUNNER_DATADIR".to_string(),
            dir.path().display().to_string(),
        );
        Self { dir, vars }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

/// Fetcher returning a fixed path and recording what it was asked for.
#[derive(Clone, Default)]
pub struct StubFetcher {
    pub seen: Rc<RefCell<Vec<Option<TestContent>>>>,
    pub path: PathBuf,
    pub fail: bool,
}

impl StubFetcher {
    pub fn returning(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl ContentFetcher for StubFetcher {
    fn fetch(&self, content: Option<&TestContent>, _workspace: &Path) -> Result<PathBuf, FetchError> {
        self.seen.borrow_mut().push(content.cloned());
        if self.fail {
            return Err(FetchError::UnsupportedUri("s3://nowhere/test.json".to_string()));
        }
        Ok(self.path.clone())
    }
}

/// Runner recording every directory it was asked to run in.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub dirs: Rc<RefCell<Vec<PathBuf>>>,
    pub fail_in: Vec<PathBuf>,
}

impl RecordingRunner {
    pub fn failing_in(dir: impl Into<PathBuf>) -> Self {
        Self {
            fail_in: vec![dir.into()],
            ..Self::default()
        }
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, dir: &Path, program: &str, _args: &[String]) -> Result<CommandOutput, CommandError> {
        self.dirs.borrow_mut().push(dir.to_path_buf());
        if self.fail_in.iter().any(|d| d == dir) {
            return Err(CommandError::Failed {
                program: program.to_string(),
                exit_code: Some(1),
                stderr: "Operation not permitted".to_string(),
            });
        }
        Ok(CommandOutput::default())
    }
}

/// Placer factory counting placements; optionally every placement fails.
#[derive(Clone, Default)]
pub struct StubPlacers {
    pub placements: Rc<Cell<usize>>,
    pub fail: bool,
}

impl StubPlacers {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn placements(&self) -> usize {
        self.placements.get()
    }
}

struct StubPlacer {
    placements: Rc<Cell<usize>>,
    fail: bool,
}

impl ObjectPlacer for StubPlacer {
    fn place_files(
        &self,
        _test_name: Option<&str>,
        _bucket: Option<&str>,
        _workspace: &Path,
    ) -> Result<usize, PlacementError> {
        self.placements.set(self.placements.get() + 1);
        if self.fail {
            return Err(PlacementError::Io {
                path: PathBuf::from("uploads/data.csv"),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        Ok(1)
    }
}

impl PlacerFactory for StubPlacers {
    fn create(&self, _settings: &StorageSettings) -> Result<Box<dyn ObjectPlacer>, PlacementError> {
        Ok(Box::new(StubPlacer {
            placements: Rc::clone(&self.placements),
            fail: self.fail,
        }))
    }
}
