// crates/orchestrator-exec/src/result_processor.rs
// ============================================================================
// Module: Result Processor
// Description: Applies a single TestResult to the lifecycle state machine.
// Purpose: Drive new/burning_in/stable/flaky transitions from SPRT and
//          demotion decisions, after every executor run.
// Dependencies: orchestrator_core::{status, sprt}
// ============================================================================

//! ## Overview
//! Called once per non-`dependencies_failed` [`TestResult`] after an
//! executor run. The lifecycle lookup happens *before* [`StatusStore::record_run`]
//! so a never-before-seen test is told apart from one explicitly `stable`.

use orchestrator_core::TestResult;
use orchestrator_core::TestSetConfig;
use orchestrator_core::sprt::DemotionDecision;
use orchestrator_core::sprt::SprtDecision;
use orchestrator_core::sprt::demotion_evaluate;
use orchestrator_core::sprt::sprt_evaluate_default_margin;
use orchestrator_core::status::LifecycleState;
use orchestrator_core::status::StatusStore;
use tracing::debug;

/// Applies `result` to `store`'s lifecycle state for its test, recording the
/// run and transitioning state per the table in the module overview.
/// `dependencies_failed` results are skipped entirely (the test never ran).
pub fn apply_result(
    store: &mut StatusStore,
    result: &TestResult,
    config: &TestSetConfig,
    commit: Option<String>,
    target_hash: Option<String>,
) {
    if !result.status.did_execute() {
        return;
    }

    let prior_state = store.get_test_entry(&result.name).map(|entry| entry.state);
    if prior_state == Some(LifecycleState::Disabled) {
        return;
    }

    let passed = result.status.counts_as_passed();
    store.record_run(&result.name, passed, commit, target_hash);

    match prior_state {
        Some(LifecycleState::BurningIn) => apply_burning_in(store, &result.name, config),
        Some(LifecycleState::Stable) if !passed => apply_demotion(store, &result.name, config),
        Some(LifecycleState::Stable) | None => {
            // `stable` (explicit) or `null` (never observed): passing is a
            // no-op, and a failure with no prior entry does not trigger
            // demotion (default-stable tests don't accrue history yet).
        }
        Some(LifecycleState::Flaky | LifecycleState::New | LifecycleState::Disabled) => {
            // Recorded only; no state transition (disabled is unreachable
            // here, already short-circuited above, but completes the match).
        }
    }
}

fn apply_burning_in(store: &mut StatusStore, name: &str, config: &TestSetConfig) {
    let Some(entry) = store.get_test_entry(name) else {
        return;
    };
    let runs = entry.runs() as u64;
    let passes = entry.passes() as u64;
    let decision = sprt_evaluate_default_margin(
        runs,
        passes,
        config.min_reliability,
        config.statistical_significance,
    );
    match decision {
        SprtDecision::Accept => {
            debug!(test = name, "burn-in accepted; promoting to stable");
            store.set_test_state(name, LifecycleState::Stable, false);
        }
        SprtDecision::Reject => {
            debug!(test = name, "burn-in rejected; demoting to flaky");
            store.set_test_state(name, LifecycleState::Flaky, false);
        }
        SprtDecision::Continue => {}
    }
}

fn apply_demotion(store: &mut StatusStore, name: &str, config: &TestSetConfig) {
    let Some(entry) = store.get_test_entry(name) else {
        return;
    };
    let decision = demotion_evaluate(
        &entry.history,
        config.min_reliability,
        config.statistical_significance,
    );
    match decision {
        DemotionDecision::Demote => {
            debug!(test = name, "demotion confirmed; moving to flaky");
            store.set_test_state(name, LifecycleState::Flaky, false);
        }
        DemotionDecision::Retain => {
            debug!(test = name, "demotion check retained stability");
        }
        DemotionDecision::Inconclusive => {
            debug!(test = name, "demotion inconclusive; re-entering burn-in");
            store.set_test_state(name, LifecycleState::BurningIn, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use orchestrator_core::TestStatus;

    use super::*;

    fn passing_result(name: &str) -> TestResult {
        TestResult {
            name: name.to_string(),
            assertion: "holds".to_string(),
            status: TestStatus::Passed,
            duration: 0.1,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    fn failing_result(name: &str) -> TestResult {
        TestResult {
            status: TestStatus::Failed,
            exit_code: Some(1),
            ..passing_result(name)
        }
    }

    #[test]
    fn dependencies_failed_is_skipped() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let config = TestSetConfig::default();
        let result = TestResult::dependencies_failed("t", "holds");
        apply_result(&mut store, &result, &config, None, None);
        assert!(store.get_test_entry("t").is_none());
    }

    #[test]
    fn disabled_test_is_ignored_entirely() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        store.set_test_state("t", LifecycleState::Disabled, false);
        let config = TestSetConfig::default();
        apply_result(&mut store, &passing_result("t"), &config, None, None);
        assert_eq!(store.get_test_history("t").len(), 0);
    }

    #[test]
    fn burning_in_accepts_after_enough_passes() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        store.set_test_state("t", LifecycleState::BurningIn, false);
        let config = TestSetConfig::default();
        for _ in 0..29 {
            store.record_run("t", true, None, None);
        }
        apply_result(&mut store, &passing_result("t"), &config, None, None);
        assert_eq!(store.get_test_state("t"), LifecycleState::Stable);
    }

    #[test]
    fn stable_failure_triggers_demotion_path() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        store.set_test_state("t", LifecycleState::Stable, false);
        let config = TestSetConfig::default();
        for _ in 0..19 {
            store.record_run("t", false, None, None);
        }
        apply_result(&mut store, &failing_result("t"), &config, None, None);
        assert_eq!(store.get_test_state("t"), LifecycleState::Flaky);
    }

    #[test]
    fn never_observed_failure_does_not_demote() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let config = TestSetConfig::default();
        apply_result(&mut store, &failing_result("t"), &config, None, None);
        assert_eq!(store.get_test_state("t"), LifecycleState::New);
        assert_eq!(store.get_test_history("t").len(), 1);
    }
}
