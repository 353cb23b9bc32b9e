// crates/orchestrator-cli/src/commands/rejudge.rs
// ============================================================================
// Module: Rejudge Command
// Description: Re-evaluates stored measurements through each test's
//              judgement executable, without re-running the test itself.
// Dependencies: orchestrator_{core,analysis}, crate::output
// ============================================================================

//! ## Overview
//! Judgement outcomes never drive lifecycle transitions; this command is
//! purely a reporting surface over `orchestrator_analysis::judgement`, which
//! keeps `judgement_error` deliberately outside the status store.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use orchestrator_analysis::JudgementStatus;
use orchestrator_analysis::execute_judgement;
use orchestrator_analysis::find_rejudgeable_tests;
use orchestrator_core::Dag;
use orchestrator_core::Manifest;
use serde::Serialize;

use crate::error::CliResult;
use crate::output::OutputFormat;
use crate::output::write_json;
use crate::output::write_line;

/// Flags for the `rejudge` subcommand.
#[derive(Debug, Args)]
pub struct RejudgeArgs {
    /// Restrict to these test names; omit to rejudge every test with stored
    /// measurements and a configured judgement executable.
    #[arg(long)]
    pub test: Vec<String>,
    /// Directory containing persisted measurement files.
    #[arg(long, default_value = "orchestrator_measurements")]
    pub output_dir: PathBuf,
    /// Per-judgement subprocess timeout, in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
    /// Output report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct RejudgeEntry {
    name: String,
    status: &'static str,
    reason: String,
    exit_code: Option<i32>,
}

/// Runs the `rejudge` subcommand, returning the process exit code.
pub async fn execute(manifest_path: &Path, args: &RejudgeArgs) -> CliResult<i32> {
    let manifest = Manifest::load(manifest_path)?;
    let dag = Dag::from_manifest(&manifest);
    let timeout = Duration::from_secs(args.timeout_secs);

    let targets = if args.test.is_empty() {
        find_rejudgeable_tests(&dag, &args.output_dir)
    } else {
        args.test.clone()
    };

    let mut entries = Vec::with_capacity(targets.len());
    let mut had_error = false;
    for name in &targets {
        let result = execute_judgement(&dag, name, &args.output_dir, timeout).await;
        let status = match result.status {
            JudgementStatus::Passed => "passed",
            JudgementStatus::Failed => "failed",
            JudgementStatus::Skipped => "skipped",
            JudgementStatus::JudgementError => {
                had_error = true;
                "judgement_error"
            }
        };
        if result.status == JudgementStatus::Failed {
            had_error = true;
        }
        entries.push(RejudgeEntry {
            name: name.clone(),
            status,
            reason: result.reason,
            exit_code: result.exit_code,
        });
    }

    if args.format == OutputFormat::Json {
        write_json(&entries)?;
    } else {
        for entry in &entries {
            write_line(&format!("{}: {} ({})", entry.name, entry.status, entry.reason))?;
        }
    }

    Ok(if had_error { 1 } else { 0 })
}
