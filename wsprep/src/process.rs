//! External command execution.
//!
//! Stages that shell out (permission changes, git checkouts) go through the
//! [`CommandRunner`] trait so tests can record or fail invocations without
//! spawning processes.

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;
use wsprep_common::mask_sensitive_command;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start {program} in {dir}: {source}")]
    Spawn {
        program: String,
        dir: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.exit_code))]
    Failed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a program with arguments in a working directory.
pub trait CommandRunner {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

/// Runs commands with `std::process::Command`, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        debug!(
            "Running `{}` in {}",
            mask_sensitive_command(program, args),
            dir.display()
        );

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                dir: dir.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(CommandError::Failed {
                program: program.to_string(),
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}
