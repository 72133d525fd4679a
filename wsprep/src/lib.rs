//! wsprep - workspace initializer for test executors.
//!
//! Prepares the executor's workspace before the test process starts: injects
//! git credentials, writes the variables file, fetches the test content,
//! places uploaded objects and opens up permissions for a possibly
//! different-UID executor.

#![forbid(unsafe_code)]

pub mod credentials;
pub mod fetcher;
pub mod permissions;
pub mod pipeline;
pub mod placer;
pub mod process;
pub mod variables;

pub use fetcher::{ContentFetcher, FetchError, WorkspaceFetcher};
pub use permissions::PermissionError;
pub use pipeline::{Completion, InitError, InitPipeline, PipelineState, Stage, StageOutcome, StageReport};
pub use placer::{DefaultPlacerFactory, FsObjectStore, ObjectPlacer, PlacementError, PlacerFactory};
pub use process::{CommandError, CommandOutput, CommandRunner, SystemRunner};
pub use variables::{VARIABLES_FILE_NAME, WorkspaceWriteError};
