// crates/orchestrator-analysis/src/judgement.rs
// ============================================================================
// Module: Judgement Runner
// Description: Re-evaluates a test's stored measurements through its
//              judgement executable, without re-running the test itself.
// Dependencies: orchestrator_core::Dag, crate::{measurements, log_parser},
//               tokio::process
// ============================================================================

//! ## Overview
//! A judgement outcome is deliberately kept out of the lifecycle state
//! machine: `judgement_error` exists precisely so that a broken judgement
//! tool (missing binary, timeout, bad output) never masquerades as a test
//! regression. Only execution-produced `TestResult`s drive SPRT and
//! lifecycle transitions; this module's [`JudgementStatus`] is a parallel,
//! report-only vocabulary.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use orchestrator_core::Dag;
use tokio::process::Command;

use crate::log_parser::ParsedOutput;
use crate::log_parser::parse_test_output;
use crate::measurements::load_measurements;
use crate::measurements::measurement_path;

/// Default timeout for a judgement executable invocation.
pub const DEFAULT_JUDGEMENT_TIMEOUT_SECS: u64 = 60;

/// Outcome status of a single judgement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgementStatus {
    /// The judgement executable exited zero.
    Passed,
    /// The judgement executable exited non-zero.
    Failed,
    /// No judgement executable configured, or no stored measurements.
    Skipped,
    /// The judgement executable could not be run or its result could not be
    /// trusted (missing binary, timeout, spawn error).
    JudgementError,
}

/// Result of a single [`execute_judgement`] call.
#[derive(Debug, Clone)]
pub struct JudgementResult {
    /// The outcome status.
    pub status: JudgementStatus,
    /// Human-readable reason, populated for every non-`Passed` status.
    pub reason: String,
    /// Path of the measurement file consulted, if one was found.
    pub measurements_file: Option<PathBuf>,
    /// Structured stdout from the judgement executable, if it ran.
    pub judgement_output: Option<ParsedOutput>,
    /// Process exit code, if the executable actually ran.
    pub exit_code: Option<i32>,
}

impl JudgementResult {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: JudgementStatus::Skipped,
            reason: reason.into(),
            measurements_file: None,
            judgement_output: None,
            exit_code: None,
        }
    }

    fn judgement_error(reason: impl Into<String>, measurements_file: PathBuf) -> Self {
        Self {
            status: JudgementStatus::JudgementError,
            reason: reason.into(),
            measurements_file: Some(measurements_file),
            judgement_output: None,
            exit_code: None,
        }
    }
}

/// Re-judges `test_name` by loading its stored measurements from
/// `output_dir` and invoking its `judgement_executable` (looked up on
/// `dag`) with the measurement file path as its sole argument, bounded by
/// `timeout`.
///
/// A test absent from `dag`, one with no `judgement_executable`, or one
/// with no stored measurements is reported as [`JudgementStatus::Skipped`]
/// rather than an error -- re-judgement eligibility is informational, not a
/// precondition failure.
pub async fn execute_judgement(
    dag: &Dag,
    test_name: &str,
    output_dir: &Path,
    timeout: Duration,
) -> JudgementResult {
    let Some(node) = dag.node(test_name) else {
        return JudgementResult::skipped(format!("test '{test_name}' not found in manifest"));
    };

    let Some(judgement_executable) = node.judgement_executable.as_deref() else {
        return JudgementResult::skipped("no judgement target configured");
    };

    if load_measurements(test_name, output_dir).is_none() {
        return JudgementResult::skipped("no stored measurements available");
    }
    let measurement_file = measurement_path(test_name, output_dir);

    let started = Instant::now();
    let spawned = Command::new(judgement_executable)
        .arg(&measurement_file)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            return JudgementResult::judgement_error(
                format!("judgement executable not found: {judgement_executable}: {err}"),
                measurement_file,
            );
        }
    };

    let waited = tokio::time::timeout(timeout, child.wait_with_output()).await;
    let output = match waited {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            return JudgementResult::judgement_error(
                format!("os error while waiting on judgement: {err}"),
                measurement_file,
            );
        }
        Err(_elapsed) => {
            return JudgementResult::judgement_error(
                format!("judgement timed out after {:.1}s", timeout.as_secs_f64()),
                measurement_file,
            );
        }
    };
    let _ = started.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let judgement_output = parse_test_output(&stdout);
    let exit_code = output.status.code();
    let passed = exit_code == Some(0);

    JudgementResult {
        status: if passed {
            JudgementStatus::Passed
        } else {
            JudgementStatus::Failed
        },
        reason: if passed {
            String::new()
        } else {
            format!("exit code {}", exit_code.map_or(-1, |c| c))
        },
        measurements_file: Some(measurement_file),
        judgement_output: Some(judgement_output),
        exit_code,
    }
}

/// Returns every non-disabled node in `dag` carrying a `judgement_executable`
/// and having stored measurements under `output_dir`, used by the CLI's
/// `rejudge` subcommand to discover what it can act on.
#[must_use]
pub fn find_rejudgeable_tests(dag: &Dag, output_dir: &Path) -> Vec<String> {
    dag.names()
        .into_iter()
        .filter(|name| {
            dag.node(name).is_some_and(|node| {
                !node.disabled
                    && node.judgement_executable.is_some()
                    && load_measurements(name, output_dir).is_some()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use orchestrator_core::Manifest;
    use orchestrator_core::manifest::ManifestTest;

    use super::*;
    use crate::measurements::store_measurements;

    fn manifest_with_judgement(name: &str, judgement_executable: Option<&str>) -> Manifest {
        let mut manifest = Manifest::default();
        manifest.test_set_tests.insert(
            name.to_string(),
            ManifestTest {
                assertion: format!("{name} holds"),
                executable: "/bin/true".to_string(),
                depends_on: Vec::new(),
                requirement_id: None,
                judgement_executable: judgement_executable.map(str::to_string),
                disabled: false,
            },
        );
        manifest
    }

    #[tokio::test]
    async fn missing_judgement_executable_is_skipped() {
        let manifest = manifest_with_judgement("t", None);
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        let result = execute_judgement(&dag, "t", dir.path(), Duration::from_secs(5)).await;
        assert_eq!(result.status, JudgementStatus::Skipped);
    }

    #[tokio::test]
    async fn unknown_test_is_skipped() {
        let manifest = Manifest::default();
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        let result = execute_judgement(&dag, "nope", dir.path(), Duration::from_secs(5)).await;
        assert_eq!(result.status, JudgementStatus::Skipped);
    }

    #[tokio::test]
    async fn missing_measurements_is_skipped() {
        let manifest = manifest_with_judgement("t", Some("/bin/true"));
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        let result = execute_judgement(&dag, "t", dir.path(), Duration::from_secs(5)).await;
        assert_eq!(result.status, JudgementStatus::Skipped);
    }

    #[tokio::test]
    async fn passing_judgement_executable_reports_passed() {
        let manifest = manifest_with_judgement("t", Some("/bin/true"));
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        store_measurements("t", &[], dir.path()).expect("store succeeds");

        let result = execute_judgement(&dag, "t", dir.path(), Duration::from_secs(5)).await;
        assert_eq!(result.status, JudgementStatus::Passed);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn missing_judgement_binary_is_judgement_error() {
        let manifest = manifest_with_judgement("t", Some("/nonexistent/judge"));
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        store_measurements("t", &[], dir.path()).expect("store succeeds");

        let result = execute_judgement(&dag, "t", dir.path(), Duration::from_secs(5)).await;
        assert_eq!(result.status, JudgementStatus::JudgementError);
    }

    #[test]
    fn find_rejudgeable_tests_requires_executable_and_measurements() {
        let mut manifest = manifest_with_judgement("a", Some("/bin/true"));
        manifest.test_set_tests.insert(
            "b".to_string(),
            ManifestTest {
                assertion: "b holds".to_string(),
                executable: "/bin/true".to_string(),
                depends_on: Vec::new(),
                requirement_id: None,
                judgement_executable: None,
                disabled: false,
            },
        );
        let dag = Dag::from_manifest(&manifest);
        let dir = tempfile::tempdir().expect("tempdir");
        store_measurements("a", &[], dir.path()).expect("store succeeds");

        let eligible = find_rejudgeable_tests(&dag, dir.path());
        assert_eq!(eligible, vec!["a".to_string()]);
    }
}
