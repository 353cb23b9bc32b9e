// crates/orchestrator-core/src/result.rs
// ============================================================================
// Module: Test Result Model
// Description: Per-node execution outcome and the five-state status enum.
// Purpose: Give the executor, result processor, and exit-code policy a
//          shared, closed vocabulary for test outcomes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `TestStatus` is deliberately closed: the combined statuses only ever
//! arise from the parallel diagnostic scheduler's race-condition handling
//! (see `orchestrator-exec`), never from direct construction elsewhere.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Status
// ============================================================================

/// The outcome of running (or not running) a single test node.
///
/// # Invariants
/// - `PassedDependenciesFailed` and `FailedDependenciesFailed` only arise in
///   the parallel diagnostic scheduler, when a dependency fails after this
///   test has already been dispatched.
/// - Any variant whose name contains "failed" (including the combined ones)
///   counts toward the executor's failure budget, except `DependenciesFailed`
///   alone, which does not (the test never ran).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The test executed and its exit code indicated success.
    Passed,
    /// The test executed and its exit code indicated failure.
    Failed,
    /// The test did not execute because a dependency failed first
    /// (diagnostic mode only).
    DependenciesFailed,
    /// The test passed, but a dependency was later observed to have failed
    /// after this test was dispatched (parallel diagnostic race).
    #[serde(rename = "passed+dependencies_failed")]
    PassedDependenciesFailed,
    /// The test failed, and a dependency was also observed to have failed
    /// after this test was dispatched (parallel diagnostic race).
    #[serde(rename = "failed+dependencies_failed")]
    FailedDependenciesFailed,
}

impl TestStatus {
    /// Returns whether this status counts toward the failure budget.
    #[must_use]
    pub fn counts_as_failure(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::PassedDependenciesFailed | Self::FailedDependenciesFailed
        )
    }

    /// Returns whether the node actually executed (as opposed to being
    /// short-circuited by dependency propagation).
    #[must_use]
    pub fn did_execute(self) -> bool {
        !matches!(self, Self::DependenciesFailed)
    }

    /// Returns whether this status should be treated as a pass for
    /// lifecycle and SPRT bookkeeping purposes.
    #[must_use]
    pub fn counts_as_passed(self) -> bool {
        matches!(self, Self::Passed | Self::PassedDependenciesFailed)
    }
}

// ============================================================================
// SECTION: Result
// ============================================================================

/// The result of executing (or skipping) a single test node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name, matching the DAG node name.
    pub name: String,
    /// Assertion copied from the test node, for reporting.
    pub assertion: String,
    /// Outcome classification.
    pub status: TestStatus,
    /// Wall-clock duration of the run, in seconds.
    pub duration: f64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code, if the test executed. `-1` is used for
    /// synthetic failures (missing executable, timeout, OS error).
    pub exit_code: Option<i32>,
}

impl TestResult {
    /// Builds a `dependencies_failed` result for a node that was
    /// short-circuited without executing.
    #[must_use]
    pub fn dependencies_failed(name: &str, assertion: &str) -> Self {
        Self {
            name: name.to_string(),
            assertion: assertion.to_string(),
            status: TestStatus::DependenciesFailed,
            duration: 0.0,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
        }
    }
}
