// crates/orchestrator-core/src/status.rs
// ============================================================================
// Module: Status Store
// Description: Persistent per-test lifecycle state and bounded run history.
// Purpose: Give the burn-in sweep, result processor, and effort runner a
//          single source of truth for test reliability state across runs.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The status store is the only component that owns cross-run state. A
//! single orchestrator process owns the status file for the duration of a
//! run; concurrent processes are not supported. Loading a corrupt or empty
//! file resets to an empty document rather than failing -- see the error
//! handling design's status-file corruption policy.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::CoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of history entries retained per test.
pub const HISTORY_CAP: usize = 200;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle state of a single test.
///
/// # Invariants
/// - `Disabled` is externally controlled; it is never entered by SPRT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Never observed before; awaiting its first classification.
    New,
    /// In the probationary burn-in loop.
    BurningIn,
    /// SPRT has accepted the reliability hypothesis.
    Stable,
    /// SPRT has rejected the reliability hypothesis (or demotion fired).
    Flaky,
    /// Administratively disabled; excluded from execution and SPRT.
    Disabled,
}

/// A single recorded run outcome.
///
/// # Invariants
/// - History is prepend-only (newest-first) and capped at [`HISTORY_CAP`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Whether the run passed.
    pub passed: bool,
    /// Commit the run was attributed to, if known.
    pub commit: Option<String>,
    /// Opaque build-input hash for the run, if known.
    pub target_hash: Option<String>,
}

/// Persisted state for a single test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Run history, newest-first.
    pub history: Vec<HistoryEntry>,
    /// ISO-8601 timestamp of the last mutation.
    pub last_updated: String,
}

impl StatusEntry {
    fn new_default(now: &str) -> Self {
        Self {
            state: LifecycleState::New,
            history: Vec::new(),
            last_updated: now.to_string(),
        }
    }

    /// Number of recorded runs.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.history.len()
    }

    /// Number of recorded passes.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.history.iter().filter(|entry| entry.passed).count()
    }
}

/// On-disk document shape: `{"tests": {<name>: StatusEntry}}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StatusDocument {
    #[serde(default)]
    tests: BTreeMap<String, StatusEntry>,
}

/// Persistent per-test lifecycle store.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
    document: StatusDocument,
}

fn now_iso8601() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

impl StatusStore {
    /// Loads the status store from `path`. A missing, empty, or corrupt
    /// file resets to an empty document; this never errors.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let document = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<StatusDocument>(&raw).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            document,
        }
    }

    /// Writes the entire document atomically (temp file + rename), so a
    /// crash never leaves a partially-written status file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the temp file or rename fails.
    pub fn save(&self) -> Result<(), CoreError> {
        let serialized =
            serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| "{}".to_string());
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| CoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        tmp.write_all(serialized.as_bytes())
            .map_err(|source| CoreError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        tmp.persist(&self.path)
            .map_err(|err| CoreError::Io {
                path: self.path.display().to_string(),
                source: err.error,
            })?;
        Ok(())
    }

    /// Returns the lifecycle state for `name`. A test absent from the store
    /// behaves as `Stable` for gate decisions; callers that need "new"
    /// semantics for transitions should use [`Self::get_test_entry`] instead.
    #[must_use]
    pub fn get_test_state(&self, name: &str) -> LifecycleState {
        self.document
            .tests
            .get(name)
            .map_or(LifecycleState::Stable, |entry| entry.state)
    }

    /// Returns the full entry for `name`, if the test has been observed.
    #[must_use]
    pub fn get_test_entry(&self, name: &str) -> Option<&StatusEntry> {
        self.document.tests.get(name)
    }

    /// Returns every test name currently in `state`.
    #[must_use]
    pub fn get_tests_by_state(&self, state: LifecycleState) -> Vec<String> {
        self.document
            .tests
            .iter()
            .filter(|(_, entry)| entry.state == state)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the history for `name`, newest-first.
    #[must_use]
    pub fn get_test_history(&self, name: &str) -> &[HistoryEntry] {
        self.document
            .tests
            .get(name)
            .map_or(&[], |entry| entry.history.as_slice())
    }

    /// Returns history entries for `name` whose `target_hash` matches
    /// `target_hash`, used for cross-session evidence pooling.
    #[must_use]
    pub fn get_same_hash_history(&self, name: &str, target_hash: &str) -> Vec<HistoryEntry> {
        self.get_test_history(name)
            .iter()
            .filter(|entry| entry.target_hash.as_deref() == Some(target_hash))
            .cloned()
            .collect()
    }

    /// Sets the lifecycle state for `name`, creating the entry if absent.
    ///
    /// # Errors
    ///
    /// Always succeeds for any [`LifecycleState`] value; the
    /// [`CoreError::UnknownState`] variant exists for callers that parse a
    /// state from an untyped string (e.g. CLI flags) before calling this.
    pub fn set_test_state(&mut self, name: &str, state: LifecycleState, clear_history: bool) {
        let now = now_iso8601();
        let entry = self
            .document
            .tests
            .entry(name.to_string())
            .or_insert_with(|| StatusEntry::new_default(&now));
        entry.state = state;
        if clear_history {
            entry.history.clear();
        }
        entry.last_updated = now;
    }

    /// Sets the lifecycle state for `name` from an untyped string, as used
    /// by CLI flags and manifest-driven disable lists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownState`] when `state` is not one of
    /// `new`, `burning_in`, `stable`, `flaky`, `disabled`.
    pub fn set_test_state_named(
        &mut self,
        name: &str,
        state: &str,
        clear_history: bool,
    ) -> Result<(), CoreError> {
        let parsed = match state {
            "new" => LifecycleState::New,
            "burning_in" => LifecycleState::BurningIn,
            "stable" => LifecycleState::Stable,
            "flaky" => LifecycleState::Flaky,
            "disabled" => LifecycleState::Disabled,
            other => return Err(CoreError::UnknownState(other.to_string())),
        };
        self.set_test_state(name, parsed, clear_history);
        Ok(())
    }

    /// Records a single run outcome for `name`, prepending to history and
    /// truncating at [`HISTORY_CAP`]. Creates a `new` entry if `name` has
    /// never been observed.
    pub fn record_run(
        &mut self,
        name: &str,
        passed: bool,
        commit: Option<String>,
        target_hash: Option<String>,
    ) {
        let now = now_iso8601();
        let entry = self
            .document
            .tests
            .entry(name.to_string())
            .or_insert_with(|| StatusEntry::new_default(&now));
        entry.history.insert(
            0,
            HistoryEntry {
                passed,
                commit,
                target_hash,
            },
        );
        entry.history.truncate(HISTORY_CAP);
        entry.last_updated = now;
    }

    /// Removes a test's entry entirely.
    pub fn remove_test(&mut self, name: &str) {
        self.document.tests.remove(name);
    }

    /// Returns every known test name with its entry.
    #[must_use]
    pub fn get_all_tests(&self) -> &BTreeMap<String, StatusEntry> {
        &self.document.tests
    }
}
