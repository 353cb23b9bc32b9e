// crates/orchestrator-regression/src/error.rs
// ============================================================================
// Module: Regression Errors
// Description: Error taxonomy for the co-occurrence graph builder.
// Purpose: Surface only genuinely fatal conditions (graph I/O); `git log`
//          invocation failures degrade to empty results per the external-tool
//          error class, never reaching this type.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while building or persisting a co-occurrence graph.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// A graph file could not be read or written.
    #[error("io error on {path}: {source}")]
    Io {
        /// Path of the file that could not be accessed.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// `git log` exited with a non-zero status.
    #[error("git log failed: {stderr}")]
    GitLog {
        /// Captured stderr from the failed invocation.
        stderr: String,
    },
}
