// crates/orchestrator-analysis/src/measurements.rs
// ============================================================================
// Module: Measurement Store
// Description: Persists and loads per-test measurement lists as sanitized-
//              filename JSON documents.
// Purpose: Give the judgement runner a durable, filename-safe home for a
//          test's structured measurements, independent of its label syntax.
// Dependencies: serde, serde_json, crate::log_parser::Measurement
// ============================================================================

//! ## Overview
//! `_label_to_filename` must be injective over alphanumeric-safe labels so
//! the round trip in the testable-properties list holds: two distinct
//! labels built only from `[A-Za-z0-9_-]` characters never collide on disk.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::AnalysisError;

/// On-disk document shape for a single test's stored measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMeasurements {
    /// The test label these measurements were recorded for.
    pub test_label: String,
    /// Raw measurement entries, each a `{name, value, block}`-shaped JSON
    /// object as produced by [`crate::log_parser::parse_test_output`].
    pub measurements: Vec<Value>,
}

/// Converts a test label to a filesystem-safe stem: every character outside
/// `[A-Za-z0-9_-]` becomes `_`, then leading/trailing underscores are
/// stripped.
#[must_use]
pub fn label_to_filename(test_label: &str) -> String {
    let replaced: String = test_label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    replaced.trim_matches('_').to_string()
}

pub(crate) fn measurement_path(test_label: &str, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.json", label_to_filename(test_label)))
}

/// Persists `measurements` for `test_label` as a JSON file under
/// `output_dir`, creating the directory if needed and overwriting any
/// existing file for the same label.
///
/// # Errors
///
/// Returns [`AnalysisError::Io`] if the directory cannot be created or the
/// file cannot be written.
pub fn store_measurements(
    test_label: &str,
    measurements: &[Value],
    output_dir: &Path,
) -> Result<PathBuf, AnalysisError> {
    std::fs::create_dir_all(output_dir).map_err(|source| AnalysisError::Io {
        path: output_dir.display().to_string(),
        source,
    })?;

    let path = measurement_path(test_label, output_dir);
    let document = StoredMeasurements {
        test_label: test_label.to_string(),
        measurements: measurements.to_vec(),
    };
    let body = serde_json::to_string_pretty(&document).unwrap_or_default();
    std::fs::write(&path, body + "\n").map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

/// Loads stored measurements for `test_label` from `output_dir`. Returns
/// `None` if no measurement file exists for the label, or its contents are
/// not valid JSON matching [`StoredMeasurements`].
#[must_use]
pub fn load_measurements(test_label: &str, output_dir: &Path) -> Option<StoredMeasurements> {
    let path = measurement_path(test_label, output_dir);
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_bazel_label() {
        assert_eq!(label_to_filename("//test:a"), "test_a");
    }

    #[test]
    fn strips_leading_and_trailing_underscores() {
        assert_eq!(label_to_filename("//:a"), "a");
    }

    #[test]
    fn preserves_hyphen_and_underscore() {
        assert_eq!(label_to_filename("my-test_name"), "my-test_name");
    }

    #[test]
    fn alphanumeric_labels_never_collide() {
        assert_ne!(label_to_filename("//a:b"), label_to_filename("//a:c"));
        assert_ne!(label_to_filename("//a/b:c"), label_to_filename("//a:b:c"));
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let measurements = vec![serde_json::json!({"name": "latency_ms", "value": 12.5})];
        store_measurements("//test:a", &measurements, dir.path()).expect("store succeeds");

        let loaded = load_measurements("//test:a", dir.path()).expect("load succeeds");
        assert_eq!(loaded.test_label, "//test:a");
        assert_eq!(loaded.measurements, measurements);
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_measurements("//test:nonexistent", dir.path()).is_none());
    }
}
