// crates/orchestrator-cli/src/commands/sweep.rs
// ============================================================================
// Module: Sweep Command
// Description: Drives the burn-in sweep for newly-promoted tests.
// Dependencies: orchestrator_{core,exec}, crate::output
// ============================================================================

//! ## Overview
//! Runs every test currently in `burning_in` (or a named subset) until each
//! either accepts into `stable`, rejects into `flaky`, or exhausts its sweep
//! budget. The sweep itself owns saving after every run, so a crash mid-sweep
//! loses no completed history.

use std::path::Path;
use std::time::Duration;

use clap::Args;
use orchestrator_core::Dag;
use orchestrator_core::Manifest;
use orchestrator_core::TestSetConfig;
use orchestrator_core::status::StatusStore;
use orchestrator_exec::burnin::SweepOutcome;
use orchestrator_exec::burnin::sweep;
use serde::Serialize;

use crate::error::CliResult;
use crate::output::OutputFormat;
use crate::output::write_json;
use crate::output::write_line;

/// Flags for the `sweep` subcommand.
#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Restrict the sweep to these test names; omit to sweep every
    /// `burning_in` test.
    #[arg(long)]
    pub test: Vec<String>,
    /// Per-test subprocess timeout, in seconds.
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
    /// Output report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct SweepReport {
    promoted_stable: Vec<String>,
    demoted_flaky: Vec<String>,
    undecided: Vec<String>,
}

/// Runs the `sweep` subcommand, returning the process exit code.
pub async fn execute(
    manifest_path: &Path,
    status_path: &Path,
    config: TestSetConfig,
    args: &SweepArgs,
) -> CliResult<i32> {
    let manifest = Manifest::load(manifest_path)?;
    let mut dag = Dag::from_manifest(&manifest);
    dag.remove_disabled();
    let mut store = StatusStore::load(status_path);

    let outcomes = sweep(
        &dag,
        &mut store,
        &config,
        status_path,
        &args.test,
        Duration::from_secs(args.timeout_secs),
    )
    .await?;

    let mut report = SweepReport {
        promoted_stable: Vec::new(),
        demoted_flaky: Vec::new(),
        undecided: Vec::new(),
    };
    for (name, outcome) in outcomes {
        match outcome {
            SweepOutcome::PromotedStable => report.promoted_stable.push(name),
            SweepOutcome::DemotedFlaky => report.demoted_flaky.push(name),
            SweepOutcome::Undecided => report.undecided.push(name),
        }
    }

    render(&report, args.format)?;
    let exit_code = if report.demoted_flaky.is_empty() { 0 } else { 1 };
    Ok(exit_code)
}

fn render(report: &SweepReport, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return write_json(report);
    }

    write_line(&format!(
        "promoted to stable: {}",
        if report.promoted_stable.is_empty() {
            "none".to_string()
        } else {
            report.promoted_stable.join(", ")
        }
    ))?;
    write_line(&format!(
        "demoted to flaky: {}",
        if report.demoted_flaky.is_empty() {
            "none".to_string()
        } else {
            report.demoted_flaky.join(", ")
        }
    ))?;
    write_line(&format!(
        "undecided: {}",
        if report.undecided.is_empty() {
            "none".to_string()
        } else {
            report.undecided.join(", ")
        }
    ))
}

