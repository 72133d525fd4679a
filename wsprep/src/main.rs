//! wsprep - Workspace Initializer
//!
//! Runs once per execution, before the test executor starts, and prints the
//! execution result document on stdout.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use wsprep::InitPipeline;
use wsprep_common::{ExecutionRequest, LogConfig, ProcessEnv, ResolvedParameters, init_logging};

#[derive(Parser)]
#[command(name = "wsprep")]
#[command(author, version, about = "wsprep - prepares the workspace for a test execution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the workspace for an execution
    Run {
        /// Execution request JSON file, or `-` for stdin
        #[arg(short, long, env = "WSPREP_EXECUTION_FILE", default_value = "-")]
        execution: PathBuf,
    },

    /// Resolve the runner parameters and print them with secrets masked
    Params,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut log_config, log_errors) = LogConfig::from_env(&ProcessEnv, "info");
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    init_logging(&log_config)?;
    for e in log_errors {
        warn!("Ignoring logging setting: {}", e);
    }

    match cli.command {
        Commands::Run { execution } => {
            let mut request = read_request(&execution)?;
            let mut pipeline = InitPipeline::new(ProcessEnv);
            match pipeline.run(&mut request) {
                Ok(result) => {
                    println!("{}", serde_json::to_string(&result)?);
                    Ok(())
                }
                Err(err) => {
                    error!("{}", err);
                    println!("{}", serde_json::to_string(&err.to_result())?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Params => {
            let params = ResolvedParameters::resolve(&ProcessEnv)?;
            for line in params.summary_lines() {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

fn read_request(path: &Path) -> Result<ExecutionRequest> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read execution request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read execution request {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Failed to parse execution request JSON")
}
