// crates/orchestrator-exec/src/burnin.rs
// ============================================================================
// Module: Burn-in Sweep
// Description: Drives `burning_in` tests through SPRT to stable or flaky.
// Purpose: Give newly-added or reinstated tests a bounded probation period
//          with crash-recoverable progress.
// Dependencies: orchestrator_core::{status, sprt}, crate::{subprocess, executor}
// ============================================================================

//! ## Overview
//! `save()` is called after every single run, so re-invoking the sweep after
//! a crash resumes exactly where the aggregate history left off -- no test
//! is re-run more than once per sweep iteration, and no history is lost.

use std::path::Path;
use std::time::Duration;

use orchestrator_core::Dag;
use orchestrator_core::TestSetConfig;
use orchestrator_core::sprt::SprtDecision;
use orchestrator_core::sprt::sprt_evaluate_default_margin;
use orchestrator_core::status::LifecycleState;
use orchestrator_core::status::StatusStore;
use tracing::info;
use tracing::warn;

use crate::error::ExecError;
use crate::subprocess;

/// Hard cap on sweep iterations, independent of how many tests remain
/// undecided; guards against a pathological config never reaching a verdict.
pub const MAX_ITERATIONS: u32 = 200;

/// Outcome of a single swept test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// SPRT accepted; the test is now `stable`.
    PromotedStable,
    /// SPRT rejected; the test is now `flaky`.
    DemotedFlaky,
    /// The sweep budget was exhausted before a decision was reached.
    Undecided,
}

/// Runs the burn-in sweep. If `scope` is non-empty, only those names (that
/// are also currently `burning_in`) are swept; otherwise every `burning_in`
/// test is swept.
///
/// # Errors
///
/// Returns [`ExecError::Core`] if the status store cannot be saved.
pub async fn sweep(
    dag: &Dag,
    store: &mut StatusStore,
    config: &TestSetConfig,
    status_path: &Path,
    scope: &[String],
    timeout: Duration,
) -> Result<Vec<(String, SweepOutcome)>, ExecError> {
    let mut targets: Vec<String> = store.get_tests_by_state(LifecycleState::BurningIn);
    if !scope.is_empty() {
        let scope_set: std::collections::BTreeSet<&str> =
            scope.iter().map(String::as_str).collect();
        targets.retain(|name| scope_set.contains(name.as_str()));
    }
    targets.sort();

    let mut outcomes = Vec::new();
    let mut undecided: std::collections::BTreeSet<String> = targets.iter().cloned().collect();

    for iteration in 0..MAX_ITERATIONS {
        if undecided.is_empty() {
            break;
        }
        info!(iteration, remaining = undecided.len(), "burn-in sweep iteration");

        let round: Vec<String> = undecided.iter().cloned().collect();
        for name in round {
            let Some(node) = dag.node(&name) else {
                undecided.remove(&name);
                continue;
            };
            let outcome = subprocess::run(&node.executable, timeout).await;
            store.record_run(&name, outcome.passed(), None, None);
            store.save()?;

            let Some(entry) = store.get_test_entry(&name) else {
                continue;
            };
            let runs = u64::try_from(entry.runs()).unwrap_or(u64::MAX);
            let passes = u64::try_from(entry.passes()).unwrap_or(u64::MAX);
            match sprt_evaluate_default_margin(
                runs,
                passes,
                config.min_reliability,
                config.statistical_significance,
            ) {
                SprtDecision::Accept => {
                    store.set_test_state(&name, LifecycleState::Stable, false);
                    store.save()?;
                    outcomes.push((name.clone(), SweepOutcome::PromotedStable));
                    undecided.remove(&name);
                }
                SprtDecision::Reject => {
                    store.set_test_state(&name, LifecycleState::Flaky, false);
                    store.save()?;
                    outcomes.push((name.clone(), SweepOutcome::DemotedFlaky));
                    undecided.remove(&name);
                }
                SprtDecision::Continue => {}
            }
        }
    }

    if !undecided.is_empty() {
        warn!(
            remaining = undecided.len(),
            status_path = %status_path.display(),
            "burn-in sweep exhausted its iteration budget with tests still undecided"
        );
        for name in undecided {
            outcomes.push((name, SweepOutcome::Undecided));
        }
    }

    Ok(outcomes)
}
