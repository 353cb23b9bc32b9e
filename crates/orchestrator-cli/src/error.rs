// crates/orchestrator-cli/src/error.rs
// ============================================================================
// Module: CLI Errors
// Description: Unifies the per-crate error enums into one type the command
//              dispatcher can translate into a process exit code.
// Purpose: Give `main` a single `Result` to match on; every subcommand
//          function returns `CliResult<T>`.
// Dependencies: orchestrator_{core,exec,regression,analysis}, thiserror
// ============================================================================

//! ## Overview
//! Per the error taxonomy, only input errors (class 1) reach this type as a
//! terminal `Err` from `main`; test-execution, judgement, and external-tool
//! failures are handled within their own subsystems and never propagate here.

use thiserror::Error;

/// Errors that can terminate the CLI with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// A core I/O, manifest, or lifecycle-state error.
    #[error(transparent)]
    Core(#[from] orchestrator_core::CoreError),
    /// A DAG-ordering or status-save error from the executor.
    #[error(transparent)]
    Exec(#[from] orchestrator_exec::ExecError),
    /// A co-occurrence graph persistence error.
    #[error(transparent)]
    Regression(#[from] orchestrator_regression::RegressionError),
    /// A measurement-store persistence error.
    #[error(transparent)]
    Analysis(#[from] orchestrator_analysis::AnalysisError),
    /// A test name named on the command line is not present in the manifest.
    #[error("unknown test: {0}")]
    UnknownTest(String),
    /// A file could not be read or written outside the subsystems above
    /// (e.g. a selection or graph report written to an explicit `--output`).
    #[error("io error at {path}: {source}")]
    Io {
        /// Path of the file that could not be accessed.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for fallible CLI operations.
pub type CliResult<T> = Result<T, CliError>;
