//! Execution initialization pipeline.
//!
//! Runs the preparation stages strictly in order:
//!
//! 1. parameter resolution (fatal)
//! 2. git credential injection
//! 3. variables file write, when a payload is present (fatal)
//! 4. content fetch (fatal)
//! 5. object placement, when an endpoint is configured (best-effort)
//! 6. permission normalization of the workspace, then the artifact mount
//!    (best-effort, each directory attempted independently)
//!
//! Earlier runner revisions aborted on placement and chmod failures. Those
//! stages are now best-effort: their failures are logged and recorded in the
//! [`StageReport`]s, and the run still reports success.

use crate::credentials::inject_git_credentials;
use crate::fetcher::{ContentFetcher, FetchError, WorkspaceFetcher};
use crate::permissions::normalize_permissions;
use crate::placer::{DefaultPlacerFactory, PlacerFactory};
use crate::process::{CommandRunner, SystemRunner};
use crate::variables::{WorkspaceWriteError, write_variables_file};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use wsprep_common::{ConfigError, ExecutionRequest, ExecutionResult, ResolvedParameters, VarSource};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ParameterResolution,
    CredentialInjection,
    VariablesFile,
    ContentFetch,
    ObjectPlacement,
    WorkspacePermissions,
    ArtifactPermissions,
}

impl Stage {
    /// Whether a failure in this stage aborts the run.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::ParameterResolution | Self::VariablesFile | Self::ContentFetch
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ParameterResolution => "parameter resolution",
            Self::CredentialInjection => "credential injection",
            Self::VariablesFile => "variables file",
            Self::ContentFetch => "content fetch",
            Self::ObjectPlacement => "object placement",
            Self::WorkspacePermissions => "workspace permissions",
            Self::ArtifactPermissions => "artifact permissions",
        };
        f.write_str(label)
    }
}

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    ParametersLoaded,
    ContentReady,
    FinalizingPermissions,
    Done(Completion),
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure(Stage),
}

/// What happened in a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The stage had nothing to do for this request.
    Skipped,
    /// A best-effort stage failed; the message is the logged cause.
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// A fatal stage failed.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("parameter resolution failed: {0}")]
    Configuration(#[source] ConfigError),

    #[error("variables file write failed: {0}")]
    VariablesFile(#[source] WorkspaceWriteError),

    #[error("content fetch failed: {0}")]
    ContentFetch(#[source] FetchError),
}

impl InitError {
    /// Stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::ParameterResolution,
            Self::VariablesFile(_) => Stage::VariablesFile,
            Self::ContentFetch(_) => Stage::ContentFetch,
        }
    }

    /// Result document reported to the executor for this failure.
    pub fn to_result(&self) -> ExecutionResult {
        ExecutionResult::failed(self.to_string())
    }
}

/// Prepares the workspace for one execution at a time.
pub struct InitPipeline {
    source: Box<dyn VarSource>,
    fetcher: Box<dyn ContentFetcher>,
    placers: Box<dyn PlacerFactory>,
    runner: Box<dyn CommandRunner>,
    state: PipelineState,
    report: Vec<StageReport>,
}

impl InitPipeline {
    /// Pipeline with the stock collaborators, reading parameters from `source`.
    pub fn new(source: impl VarSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            fetcher: Box::new(WorkspaceFetcher::new(SystemRunner)),
            placers: Box::new(DefaultPlacerFactory),
            runner: Box::new(SystemRunner),
            state: PipelineState::Initializing,
            report: Vec::new(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl ContentFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_placer_factory(mut self, placers: impl PlacerFactory + 'static) -> Self {
        self.placers = Box::new(placers);
        self
    }

    /// Runner used for permission normalization.
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Per-stage outcomes of the last run, in execution order.
    pub fn report(&self) -> &[StageReport] {
        &self.report
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.report
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Prepare the workspace for `request`.
    ///
    /// The request's repository credentials are updated in place before the
    /// content is fetched.
    pub fn run(&mut self, request: &mut ExecutionRequest) -> Result<ExecutionResult, InitError> {
        self.report.clear();
        self.transition(PipelineState::Initializing);
        info!("Initializing...");

        info!("Reading environment variables for runner setup...");
        let params = ResolvedParameters::resolve(self.source.as_ref())
            .map_err(|e| self.fail(InitError::Configuration(e)))?;
        info!("Environment variables read successfully");
        params.log_summary();
        self.record(Stage::ParameterResolution, StageOutcome::Completed);
        self.transition(PipelineState::ParametersLoaded);

        let credentials = params.git_credentials();
        let injected = inject_git_credentials(request, credentials.as_ref());
        self.record(Stage::CredentialInjection, completed_if(injected));

        let workspace = params.workspace();

        match request.variables_payload() {
            Some(payload) => {
                info!("Creating variables file...");
                write_variables_file(workspace, payload)
                    .map_err(|e| self.fail(InitError::VariablesFile(e)))?;
                info!("Variables file created");
                self.record(Stage::VariablesFile, StageOutcome::Completed);
            }
            None => self.record(Stage::VariablesFile, StageOutcome::Skipped),
        }

        let kind = request.content.as_ref().map_or("none", |c| c.kind());
        info!("Fetching test content from {}...", kind);
        let content_path = self
            .fetcher
            .fetch(request.content.as_ref(), workspace)
            .map_err(|e| self.fail(InitError::ContentFetch(e)))?;
        info!("Test content fetched to path {}", content_path.display());
        self.record(Stage::ContentFetch, StageOutcome::Completed);
        self.transition(PipelineState::ContentReady);

        self.place_uploads(&params, request, workspace);

        self.transition(PipelineState::FinalizingPermissions);
        let outcome = self.open_permissions(workspace, "data");
        self.record(Stage::WorkspacePermissions, outcome);
        let outcome = match request.artifact_mount_path() {
            Some(dir) => self.open_permissions(dir, "artifacts"),
            None => StageOutcome::Skipped,
        };
        self.record(Stage::ArtifactPermissions, outcome);
        info!("Access to files enabled");

        self.transition(PipelineState::Done(Completion::Success));
        info!("Initialization successful");
        Ok(ExecutionResult::pending(content_path))
    }

    fn place_uploads(
        &mut self,
        params: &ResolvedParameters,
        request: &ExecutionRequest,
        workspace: &Path,
    ) {
        let storage = params.storage();
        if !storage.is_configured() {
            debug!("No object store endpoint configured, skipping uploads");
            self.record(Stage::ObjectPlacement, StageOutcome::Skipped);
            return;
        }

        info!("Fetching uploads from object store {}...", storage.endpoint);
        let placed = self.placers.create(storage).and_then(|placer| {
            placer.place_files(
                request.test_name.as_deref(),
                request.bucket_name.as_deref(),
                workspace,
            )
        });
        let outcome = match placed {
            Ok(count) => {
                info!("Placing uploads succeeded ({} object(s))", count);
                StageOutcome::Completed
            }
            Err(e) => {
                warn!("could not place bucket: {}", e);
                StageOutcome::Degraded(e.to_string())
            }
        };
        self.record(Stage::ObjectPlacement, outcome);
    }

    fn open_permissions(&self, dir: &Path, label: &str) -> StageOutcome {
        match normalize_permissions(self.runner.as_ref(), dir) {
            Ok(()) => StageOutcome::Completed,
            Err(e) => {
                warn!("could not chmod for {} dir: {}", label, e);
                StageOutcome::Degraded(e.to_string())
            }
        }
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        debug!("Stage {}: {:?}", stage, outcome);
        self.report.push(StageReport { stage, outcome });
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: InitError) -> InitError {
        let stage = error.stage();
        warn!("Initialization failed in {} stage: {}", stage, error);
        self.transition(PipelineState::Done(Completion::Failure(stage)));
        error
    }
}

fn completed_if(done: bool) -> StageOutcome {
    if done {
        StageOutcome::Completed
    } else {
        StageOutcome::Skipped
    }
}
