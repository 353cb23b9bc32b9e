// crates/orchestrator-cli/src/commands/status.rs
// ============================================================================
// Module: Status Command
// Description: Inspects and administratively edits the lifecycle status file.
// Dependencies: orchestrator_core::status, crate::output
// ============================================================================

//! ## Overview
//! `show` lists every tracked test grouped by lifecycle state; `set` performs
//! an administrative override (the only way a test reaches `disabled` other
//! than the manifest's own `disabled` flag, and the only way to force a test
//! back to `new` or `stable` outside the state machine); `history` dumps a
//! single test's run history, newest first.

use std::path::Path;

use clap::Args;
use clap::Subcommand;
use orchestrator_core::status::StatusStore;
use serde::Serialize;

use crate::error::CliError;
use crate::error::CliResult;
use crate::output::OutputFormat;
use crate::output::write_json;
use crate::output::write_line;

/// Flags for the `status` subcommand.
#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub action: StatusAction,
    /// Output report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

/// Status subcommand actions.
#[derive(Debug, Subcommand)]
pub enum StatusAction {
    /// Lists every tracked test grouped by lifecycle state.
    Show,
    /// Overrides a single test's lifecycle state.
    Set {
        /// Test name.
        name: String,
        /// Target state: `new`, `burning_in`, `stable`, `flaky`, or
        /// `disabled`.
        state: String,
        /// Also clears the test's run history.
        #[arg(long)]
        clear_history: bool,
    },
    /// Removes a test's tracked entry entirely.
    Remove {
        /// Test name.
        name: String,
    },
    /// Prints a single test's run history, newest first.
    History {
        /// Test name.
        name: String,
    },
}

#[derive(Debug, Serialize)]
struct StatusShowReport {
    new: Vec<String>,
    burning_in: Vec<String>,
    stable: Vec<String>,
    flaky: Vec<String>,
    disabled: Vec<String>,
}

/// Runs the `status` subcommand, returning the process exit code.
pub fn execute(status_path: &Path, args: &StatusArgs) -> CliResult<i32> {
    let mut store = StatusStore::load(status_path);

    match &args.action {
        StatusAction::Show => show(&store, args.format)?,
        StatusAction::Set {
            name,
            state,
            clear_history,
        } => {
            store.set_test_state_named(name, state, *clear_history)?;
            store.save()?;
            write_line(&format!("{name}: set to {state}"))?;
        }
        StatusAction::Remove { name } => {
            store.remove_test(name);
            store.save()?;
            write_line(&format!("{name}: removed"))?;
        }
        StatusAction::History { name } => history(&store, name, args.format)?,
    }

    Ok(0)
}

fn show(store: &StatusStore, format: OutputFormat) -> CliResult<()> {
    use orchestrator_core::status::LifecycleState;

    let report = StatusShowReport {
        new: store.get_tests_by_state(LifecycleState::New),
        burning_in: store.get_tests_by_state(LifecycleState::BurningIn),
        stable: store.get_tests_by_state(LifecycleState::Stable),
        flaky: store.get_tests_by_state(LifecycleState::Flaky),
        disabled: store.get_tests_by_state(LifecycleState::Disabled),
    };

    if format == OutputFormat::Json {
        return write_json(&report);
    }

    write_line(&format!("new: {}", report.new.join(", ")))?;
    write_line(&format!("burning_in: {}", report.burning_in.join(", ")))?;
    write_line(&format!("stable: {}", report.stable.join(", ")))?;
    write_line(&format!("flaky: {}", report.flaky.join(", ")))?;
    write_line(&format!("disabled: {}", report.disabled.join(", ")))
}

fn history(store: &StatusStore, name: &str, format: OutputFormat) -> CliResult<()> {
    let entry = store
        .get_test_entry(name)
        .ok_or_else(|| CliError::UnknownTest(name.to_string()))?;

    if format == OutputFormat::Json {
        return write_json(entry);
    }

    write_line(&format!("state: {:?}", entry.state))?;
    for run in &entry.history {
        write_line(&format!(
            "  passed={} commit={} target_hash={}",
            run.passed,
            run.commit.as_deref().unwrap_or("-"),
            run.target_hash.as_deref().unwrap_or("-"),
        ))?;
    }
    Ok(())
}
