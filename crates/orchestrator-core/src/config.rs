// crates/orchestrator-core/src/config.rs
// ============================================================================
// Module: Test-Set Configuration
// Description: Immutable run configuration with layered defaults.
// Purpose: Give every subsystem a single, explicit-field configuration type
//          instead of the source's keyword-argument dynamic config.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `TestSetConfig` is assembled by the CLI from three layers (lowest to
//! highest precedence): compiled-in defaults, an optional JSON config file,
//! and explicit CLI flag overrides. This module owns only the defaults and
//! the file-layer merge; flag-layer merging lives in `orchestrator-cli`
//! (the only crate that knows about `clap`).

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Immutable configuration for a single orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSetConfig {
    /// `p0`: minimum acceptable true pass rate for a reliable test.
    pub min_reliability: f64,
    /// `1 - alpha`: target statistical significance for SPRT and E-value
    /// decisions.
    pub statistical_significance: f64,
    /// Regression-selector cap, as a fraction of stable tests.
    pub max_test_percentage: f64,
    /// Regression-selector bounded-BFS hop limit.
    pub max_hops: u32,
    /// Per-test rerun cap for the effort runner and hifi evaluator.
    pub max_reruns: u32,
    /// Optional cap on total failures before the executor stops dispatching.
    pub max_failures: Option<u32>,
    /// Optional cap on concurrent test invocations; `None` defaults to the
    /// host's logical CPU count at executor construction time.
    pub max_parallel: Option<u32>,
}

impl Default for TestSetConfig {
    fn default() -> Self {
        Self {
            min_reliability: 0.99,
            statistical_significance: 0.95,
            max_test_percentage: 0.10,
            max_hops: 2,
            max_reruns: 100,
            max_failures: None,
            max_parallel: None,
        }
    }
}

impl TestSetConfig {
    /// `alpha = 1 - statistical_significance`, the error budget SPRT and
    /// E-value computations are parameterized on.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        1.0 - self.statistical_significance
    }

    /// Loads a config file, filling any key missing from the document with
    /// the compiled-in default for that field. A missing or corrupt file
    /// resets to all defaults -- this never errors, matching the status-file
    /// corruption policy.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = TestSetConfig::default();
        assert!((config.min_reliability - 0.99).abs() < f64::EPSILON);
        assert!((config.statistical_significance - 0.95).abs() < f64::EPSILON);
        assert!((config.max_test_percentage - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.max_hops, 2);
        assert_eq!(config.max_reruns, 100);
        assert!(config.max_failures.is_none());
        assert!(config.max_parallel.is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = TestSetConfig::load(Path::new("/nonexistent/orchestrator.config.json"));
        assert_eq!(config, TestSetConfig::default());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orchestrator.config.json");
        fs::write(&path, b"{not json").expect("write");
        let config = TestSetConfig::load(&path);
        assert_eq!(config, TestSetConfig::default());
    }

    #[test]
    fn partial_file_fills_missing_keys_from_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orchestrator.config.json");
        fs::write(&path, br#"{"max_hops": 5}"#).expect("write");
        let config = TestSetConfig::load(&path);
        assert_eq!(config.max_hops, 5);
        assert!((config.min_reliability - 0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn alpha_is_complement_of_significance() {
        let config = TestSetConfig::default();
        assert!((config.alpha() - 0.05).abs() < f64::EPSILON);
    }
}
