// crates/orchestrator-cli/src/main.rs
// ============================================================================
// Module: Orchestrator CLI Entry Point
// Description: Parses arguments, initializes logging, assembles the layered
//              config, and dispatches to a subcommand.
// Purpose: The single binary that wraps the core/exec/regression/analysis
//          crates into a test orchestrator a CI pipeline actually invokes.
// Dependencies: clap, orchestrator_core::TestSetConfig, crate::{commands,
//               cli_config, logging, output}
// ============================================================================

//! ## Overview
//! Global flags select the manifest, status file, config file, and logging
//! posture; the subcommand itself carries any stage-specific flags,
//! including a `ConfigOverrides` flatten where CLI overrides apply. Every
//! path here ends at [`std::process::ExitCode`] -- success is `0`, a
//! blocking failure or an input error is `1`, matching the two-valued exit
//! policy every stage agrees on.

mod cli_config;
mod commands;
mod error;
mod git;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use orchestrator_core::TestSetConfig;

use crate::error::CliError;
use crate::error::CliResult;
use crate::logging::LogFormat;
use crate::output::write_error_line;

/// A test orchestrator for large polyglot repositories.
#[derive(Debug, Parser)]
#[command(name = "orchestrator", version, about)]
struct Cli {
    /// Path to the test manifest.
    #[arg(long, global = true, default_value = "orchestrator.manifest.json")]
    manifest: PathBuf,
    /// Path to the persisted lifecycle status file.
    #[arg(long, global = true, default_value = "orchestrator_status.json")]
    status_file: PathBuf,
    /// Path to an optional JSON config file.
    #[arg(long, global = true, default_value = "orchestrator.config.json")]
    config: PathBuf,
    /// Increases log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Log event encoding.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Executes a stage: regression, converge, or max.
    Run(commands::run::RunArgs),
    /// Runs the burn-in sweep for newly-promoted tests.
    Sweep(commands::sweep::SweepArgs),
    /// Inspects or edits the lifecycle status file.
    Status(commands::status::StatusArgs),
    /// Builds or incrementally updates the co-occurrence graph.
    Graph(commands::graph::GraphArgs),
    /// Dry-runs the regression test selector.
    Select(commands::select::SelectArgs),
    /// Re-evaluates stored measurements through their judgement executables.
    Rejudge(commands::rejudge::RejudgeArgs),
}

async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let config = TestSetConfig::load(&cli.config);

    let exit_code = match &cli.command {
        Commands::Run(args) => {
            commands::run::execute(&cli.manifest, &cli.status_file, config, args).await?
        }
        Commands::Sweep(args) => {
            commands::sweep::execute(&cli.manifest, &cli.status_file, config, args).await?
        }
        Commands::Status(args) => commands::status::execute(&cli.status_file, args)?,
        Commands::Graph(args) => commands::graph::execute(args).await?,
        Commands::Select(args) => commands::select::execute(&cli.manifest, config, args).await?,
        Commands::Rejudge(args) => commands::rejudge::execute(&cli.manifest, args).await?,
    };

    if exit_code == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn emit_error(err: &CliError) -> ExitCode {
    let _ = write_error_line(&format!("error: {err}"));
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}
