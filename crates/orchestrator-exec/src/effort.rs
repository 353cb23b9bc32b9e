// crates/orchestrator-exec/src/effort.rs
// ============================================================================
// Module: Effort Runner
// Description: Converge/max rerun loop classifying tests as flake/true
//              failure/true pass/undecided.
// Purpose: Spend a bounded rerun budget distinguishing genuine regressions
//          from flaky failures after an initial run.
// Dependencies: orchestrator_core::{sprt, status}, crate::subprocess
// ============================================================================

//! ## Overview
//! Target-hash pooling lets reruns on an unchanged build input accumulate
//! evidence across sessions: the pooled `(runs, passes)` seed starts from
//! every prior same-hash history entry, then the initial run and each rerun
//! add to it in place.

use std::collections::HashMap;
use std::time::Duration;

use orchestrator_core::Dag;
use orchestrator_core::TestResult;
use orchestrator_core::TestSetConfig;
use orchestrator_core::sprt::SprtDecision;
use orchestrator_core::sprt::sprt_evaluate_default_margin;
use orchestrator_core::status::StatusStore;
use tracing::debug;

use crate::subprocess;

/// Which tests the effort runner reruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffortTarget {
    /// Only initially-failing (and executed) tests.
    Converge,
    /// Every test in the initial result set.
    Max,
}

/// Final classification assigned to a test by the effort runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Failed initially but SPRT now accepts reliability: a flake.
    Flake,
    /// SPRT rejects reliability: a genuine regression.
    TrueFail,
    /// Passed initially and SPRT accepts reliability.
    TruePass,
    /// Rerun budget exhausted before a decision.
    Undecided,
}

/// Per-test effort-runner outcome.
#[derive(Debug, Clone)]
pub struct EffortClassification {
    /// Test name.
    pub name: String,
    /// Final classification.
    pub classification: Classification,
    /// The SPRT decision that produced the classification, if the test was
    /// actually targeted (`None` for inherited, non-targeted tests).
    pub sprt_decision: Option<SprtDecision>,
    /// Number of reruns actually performed.
    pub reruns: u32,
}

fn initial_passed(result: &TestResult) -> bool {
    result.status.counts_as_passed()
}

fn is_candidate(result: &TestResult, target: EffortTarget) -> bool {
    match target {
        EffortTarget::Converge => result.status.did_execute() && !result.status.counts_as_passed(),
        EffortTarget::Max => result.status.did_execute(),
    }
}

fn classify(initial_pass: bool, decision: SprtDecision) -> Classification {
    match (initial_pass, decision) {
        (false, SprtDecision::Accept) | (true, SprtDecision::Reject) => Classification::Flake,
        (false, SprtDecision::Reject) => Classification::TrueFail,
        (true, SprtDecision::Accept) => Classification::TruePass,
        (_, SprtDecision::Continue) => Classification::Undecided,
    }
}

/// Runs the effort loop over `initial_results`, reusing the node executables
/// from `dag`. `target_hashes` maps test name to an opaque build-input hash;
/// tests present in the map have their pooled evidence seeded from prior
/// same-hash history. A target absent from `dag` is skipped entirely.
pub async fn run_effort(
    dag: &Dag,
    store: &mut StatusStore,
    config: &TestSetConfig,
    initial_results: &[TestResult],
    target: EffortTarget,
    commit: Option<String>,
    target_hashes: &HashMap<String, String>,
    timeout: Duration,
) -> Vec<EffortClassification> {
    let mut outcomes = Vec::with_capacity(initial_results.len());

    for result in initial_results {
        if !is_candidate(result, target) {
            if result.status.did_execute() {
                outcomes.push(EffortClassification {
                    name: result.name.clone(),
                    classification: if initial_passed(result) {
                        Classification::TruePass
                    } else {
                        Classification::TrueFail
                    },
                    sprt_decision: None,
                    reruns: 0,
                });
            }
            continue;
        }

        let Some(node) = dag.node(&result.name) else {
            continue;
        };
        let initial_pass = initial_passed(result);
        let target_hash = target_hashes.get(&result.name).cloned();

        let (mut runs, mut passes) = match &target_hash {
            Some(hash) => {
                let history = store.get_same_hash_history(&result.name, hash);
                let runs = u64::try_from(history.len()).unwrap_or(u64::MAX);
                let passes = u64::try_from(history.iter().filter(|e| e.passed).count())
                    .unwrap_or(u64::MAX);
                (runs, passes)
            }
            None => (0, 0),
        };
        runs += 1;
        passes += u64::from(initial_pass);

        let mut reruns: u32 = 0;
        let mut decision = sprt_evaluate_default_margin(
            runs,
            passes,
            config.min_reliability,
            config.statistical_significance,
        );

        while decision == SprtDecision::Continue && reruns < config.max_reruns {
            let outcome = subprocess::run(&node.executable, timeout).await;
            store.record_run(
                &result.name,
                outcome.passed(),
                commit.clone(),
                target_hash.clone(),
            );
            runs += 1;
            passes += u64::from(outcome.passed());
            reruns += 1;
            decision = sprt_evaluate_default_margin(
                runs,
                passes,
                config.min_reliability,
                config.statistical_significance,
            );
        }

        debug!(
            test = %result.name,
            reruns,
            ?decision,
            "effort runner reached a decision"
        );
        outcomes.push(EffortClassification {
            name: result.name.clone(),
            classification: classify(initial_pass, decision),
            sprt_decision: Some(decision),
            reruns,
        });
    }

    outcomes
}
