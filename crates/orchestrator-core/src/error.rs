// crates/orchestrator-core/src/error.rs
// ============================================================================
// Module: Core Errors
// Description: Error taxonomy for manifest, status, and config I/O.
// Purpose: Give callers stable, matchable variants instead of raw I/O errors.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Errors that escape the manifest, status-store, and config loaders. Per the
//! error handling design, status-file and config-file corruption never
//! surface as `CoreError` -- those paths degrade to an empty/default state
//! and are logged by the caller instead. `CoreError` is reserved for input
//! errors that are genuinely fatal to a run (missing manifest, invalid JSON
//! in the manifest, an unknown lifecycle state passed to `set_test_state`).

use thiserror::Error;

/// Errors raised by the manifest, status store, and config loaders.
///
/// # Invariants
/// - Variants are stable for programmatic handling by the CLI's exit-code path.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Failed to read or write a file.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path of the file involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest JSON failed to parse.
    #[error("invalid manifest json: {0}")]
    InvalidManifest(serde_json::Error),
    /// `set_test_state` was called with a state outside `LifecycleState`.
    #[error("unknown lifecycle state: {0}")]
    UnknownState(String),
    /// A test name referenced by a caller is not present in the manifest.
    #[error("unknown test: {0}")]
    UnknownTest(String),
}
