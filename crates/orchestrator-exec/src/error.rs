// crates/orchestrator-exec/src/error.rs
// ============================================================================
// Module: Executor Errors
// Description: Error taxonomy for the executor, sweep, and effort runner.
// Purpose: Surface DAG-ordering failures without panicking; per-test failures
//          never reach this type (they become `TestResult`s instead).
// Dependencies: orchestrator_core::DagError, thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by the executor, burn-in sweep, and effort runner.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The DAG could not be ordered because it contains a cycle.
    #[error(transparent)]
    Dag(#[from] orchestrator_core::DagError),
    /// A status-store save failed (disk full, permissions, etc).
    #[error(transparent)]
    Core(#[from] orchestrator_core::CoreError),
}
