// crates/orchestrator-analysis/src/error.rs
// ============================================================================
// Module: Analysis Errors
// Description: Error taxonomy for the measurement store.
// Purpose: Surface only genuinely fatal conditions (measurement file I/O);
//          judgement and target-hash failures degrade to typed statuses or
//          empty maps instead, per the external-tool error class.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while persisting or loading stored measurements.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A measurement file could not be read or written.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path of the file that could not be accessed.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}
