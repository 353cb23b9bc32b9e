// crates/orchestrator-exec/src/exitcode.rs
// ============================================================================
// Module: Exit-Code Policy
// Description: Lifecycle-aware (regression) vs lifecycle-unaware (converge,
//              max) blocking classification and final process exit code.
// Purpose: Turn a batch of effort-runner classifications into a single
//          pass/fail signal plus a human-readable blocking/warning report.
// Dependencies: orchestrator_core::status, crate::effort
// ============================================================================

//! ## Overview
//! Three stage modes drive three different notions of "blocking":
//! `converge` and `max` are lifecycle-unaware -- a flake blocks regardless of
//! how reliable the test has historically been -- while `regression` is
//! lifecycle-aware: a flaky, burning-in, new, or disabled test's failure is
//! downgraded to a warning rather than a build-breaking result, on the theory
//! that the lifecycle machinery has already flagged it as unreliable.

use orchestrator_core::status::LifecycleState;
use orchestrator_core::status::StatusStore;

use crate::effort::Classification;
use crate::effort::EffortClassification;

/// Stage mode under which exit-code classification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    /// Regression-selection stage: lifecycle-aware blocking.
    Regression,
    /// Converge-effort stage: lifecycle-unaware blocking.
    Converge,
    /// Max-effort stage: lifecycle-unaware blocking.
    Max,
}

impl StageMode {
    fn is_lifecycle_aware(self) -> bool {
        matches!(self, Self::Regression)
    }
}

/// Whether a single test's classification blocks the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    /// The test's classification fails the run.
    Blocking,
    /// The test's classification is recorded but does not fail the run.
    NonBlocking,
}

fn is_converge_blocking(classification: Classification) -> bool {
    matches!(
        classification,
        Classification::TrueFail | Classification::Flake | Classification::Undecided
    )
}

fn is_regression_blocking(classification: Classification) -> bool {
    matches!(
        classification,
        Classification::TrueFail | Classification::Undecided
    )
}

fn is_non_blocking_state(state: LifecycleState) -> bool {
    matches!(
        state,
        LifecycleState::Flaky
            | LifecycleState::BurningIn
            | LifecycleState::New
            | LifecycleState::Disabled
    )
}

/// Classifies whether a single test's outcome blocks the run under `mode`.
///
/// In lifecycle-aware (`regression`) mode, a test whose lifecycle state is
/// `flaky`, `burning_in`, `new`, or `disabled` never blocks, regardless of
/// its classification. In lifecycle-unaware modes (`converge`, `max`), the
/// lifecycle state plays no part: `flake` and `undecided` block alongside
/// `true_fail`.
#[must_use]
pub fn classify_test_blocking(
    classification: Classification,
    lifecycle_state: LifecycleState,
    mode: StageMode,
) -> Blocking {
    if mode.is_lifecycle_aware() && is_non_blocking_state(lifecycle_state) {
        return Blocking::NonBlocking;
    }

    let blocks = match mode {
        StageMode::Regression => is_regression_blocking(classification),
        StageMode::Converge | StageMode::Max => is_converge_blocking(classification),
    };

    if blocks {
        Blocking::Blocking
    } else {
        Blocking::NonBlocking
    }
}

/// Aggregate exit-code computation over a batch of classifications.
#[derive(Debug, Clone)]
pub struct ExitCodeSummary {
    /// Process exit code: `0` if nothing blocks, `1` otherwise.
    pub exit_code: i32,
    /// Names of tests whose classification blocked the run.
    pub blocking_tests: Vec<String>,
    /// Names of tests whose classification was downgraded to non-blocking.
    pub non_blocking_tests: Vec<String>,
    /// Human-readable notices for every downgrade from blocking to
    /// non-blocking, so a stable test classified as a flake is still
    /// visible in the report.
    pub warnings: Vec<String>,
}

/// Computes the exit-code summary for a batch of effort-runner outcomes.
///
/// A test absent from `store` (never seen before) is treated as lifecycle
/// state `stable` for the purposes of this computation, matching
/// [`StatusStore::get_test_state`]'s own default.
#[must_use]
pub fn compute_exit_code(
    classifications: &[EffortClassification],
    store: &StatusStore,
    mode: StageMode,
) -> ExitCodeSummary {
    let mut blocking_tests = Vec::new();
    let mut non_blocking_tests = Vec::new();
    let mut warnings = Vec::new();

    for outcome in classifications {
        let lifecycle_state = store.get_test_state(&outcome.name);
        let would_block_unaware = is_converge_blocking(outcome.classification);
        match classify_test_blocking(outcome.classification, lifecycle_state, mode) {
            Blocking::Blocking => blocking_tests.push(outcome.name.clone()),
            Blocking::NonBlocking => {
                non_blocking_tests.push(outcome.name.clone());
                if mode.is_lifecycle_aware()
                    && lifecycle_state == LifecycleState::Stable
                    && outcome.classification == Classification::Flake
                    && would_block_unaware
                {
                    warnings.push(format!(
                        "{}: stable test classified as flake (non-blocking in regression mode)",
                        outcome.name
                    ));
                }
            }
        }
    }

    let exit_code = if blocking_tests.is_empty() { 0 } else { 1 };

    ExitCodeSummary {
        exit_code,
        blocking_tests,
        non_blocking_tests,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_for(name: &str, classification: Classification) -> EffortClassification {
        EffortClassification {
            name: name.to_string(),
            classification,
            sprt_decision: None,
            reruns: 0,
        }
    }

    #[test]
    fn regression_mode_downgrades_flaky_state() {
        let blocking = classify_test_blocking(
            Classification::Flake,
            LifecycleState::Flaky,
            StageMode::Regression,
        );
        assert_eq!(blocking, Blocking::NonBlocking);
    }

    #[test]
    fn converge_mode_blocks_flake_regardless_of_state() {
        let blocking = classify_test_blocking(
            Classification::Flake,
            LifecycleState::Flaky,
            StageMode::Converge,
        );
        assert_eq!(blocking, Blocking::Blocking);
    }

    #[test]
    fn regression_mode_blocks_stable_true_fail() {
        let blocking = classify_test_blocking(
            Classification::TrueFail,
            LifecycleState::Stable,
            StageMode::Regression,
        );
        assert_eq!(blocking, Blocking::Blocking);
    }

    #[test]
    fn true_pass_never_blocks() {
        for mode in [StageMode::Regression, StageMode::Converge, StageMode::Max] {
            let blocking =
                classify_test_blocking(Classification::TruePass, LifecycleState::Stable, mode);
            assert_eq!(blocking, Blocking::NonBlocking);
        }
    }

    #[test]
    fn summary_exit_code_zero_when_nothing_blocks() {
        let store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let classifications = vec![classification_for("a", Classification::TruePass)];
        let summary = compute_exit_code(&classifications, &store, StageMode::Converge);
        assert_eq!(summary.exit_code, 0);
        assert!(summary.blocking_tests.is_empty());
    }

    #[test]
    fn summary_warns_on_stable_flake_downgrade() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        store.set_test_state("a", LifecycleState::Stable, false);
        let classifications = vec![classification_for("a", Classification::Flake)];
        let summary = compute_exit_code(&classifications, &store, StageMode::Regression);
        assert_eq!(summary.exit_code, 0);
        assert_eq!(summary.non_blocking_tests, vec!["a".to_string()]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("stable test classified as flake"));
    }

    #[test]
    fn summary_blocks_on_undecided_in_regression_mode() {
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        store.set_test_state("a", LifecycleState::Stable, false);
        let classifications = vec![classification_for("a", Classification::Undecided)];
        let summary = compute_exit_code(&classifications, &store, StageMode::Regression);
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.blocking_tests, vec!["a".to_string()]);
    }
}
