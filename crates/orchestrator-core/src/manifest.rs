// crates/orchestrator-core/src/manifest.rs
// ============================================================================
// Module: Manifest Loading
// Description: Deserializes the declarative test manifest into DAG input.
// Purpose: Provide a forward-compatible reader for `test_set`/`test_set_tests`.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The manifest is the only externally authored input the core reads
//! directly. Unknown keys are ignored rather than rejected, so that newer
//! manifest producers do not break older orchestrator binaries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Top-level `test_set` metadata block.
///
/// # Invariants
/// - `name` is informational only; it does not participate in DAG identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestSetInfo {
    /// Human-readable name of the test set.
    #[serde(default)]
    pub name: String,
    /// Free-text assertion describing the test set's purpose.
    #[serde(default)]
    pub assertion: String,
    /// Optional requirement tag linking the set to external tracking.
    #[serde(default)]
    pub requirement_id: Option<String>,
    /// Optional explicit test name list (informational; the DAG is built
    /// from `test_set_tests` regardless).
    #[serde(default)]
    pub tests: Option<Vec<String>>,
    /// Optional named subsets of tests (informational).
    #[serde(default)]
    pub subsets: Option<BTreeMap<String, Vec<String>>>,
}

/// A single test entry as authored in `test_set_tests`.
///
/// # Invariants
/// - `depends_on` names may reference tests absent from the manifest; such
///   entries are tolerated and silently dropped during DAG construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTest {
    /// Free-text claim the test is expected to establish.
    pub assertion: String,
    /// Path-like executable invoked to run the test.
    pub executable: String,
    /// Ordered list of dependency test names.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Optional requirement tag.
    #[serde(default)]
    pub requirement_id: Option<String>,
    /// Optional secondary executable used to re-evaluate stored measurements.
    #[serde(default)]
    pub judgement_executable: Option<String>,
    /// Whether the test is administratively disabled.
    #[serde(default)]
    pub disabled: bool,
}

/// Parsed manifest: test-set metadata plus the named test entries.
///
/// # Invariants
/// - Keys of `test_set_tests` are the canonical test names used everywhere
///   else in the system (status store, DAG, results).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Test-set metadata.
    #[serde(default)]
    pub test_set: TestSetInfo,
    /// Named test entries, keyed by test name.
    #[serde(default)]
    pub test_set_tests: BTreeMap<String, ManifestTest>,
}

impl Manifest {
    /// Loads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the file cannot be read, or
    /// [`CoreError::InvalidManifest`] when the contents are not valid JSON
    /// matching the manifest schema. Unlike the status and config files, a
    /// malformed manifest is a fatal input error (see error taxonomy class 1).
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(CoreError::InvalidManifest)
    }
}
