// crates/orchestrator-exec/src/subprocess.rs
// ============================================================================
// Module: Subprocess Runner
// Description: The `run(executable, args, timeout)` collaborator.
// Purpose: Spawn a test executable, capture stdout/stderr, and enforce a
//          wall-clock timeout, classifying any spawn/timeout/OS failure as a
//          synthetic failed outcome rather than propagating an error.
// Dependencies: tokio::process
// ============================================================================

//! ## Overview
//! The distilled spec treats `run()` as an opaque collaborator; this crate
//! implements it in full atop `tokio::process::Command` so the same async
//! runtime drives both the sequential and parallel executors. Every failure
//! mode (missing executable, OS error, timeout) is folded into a `Outcome`
//! carrying a synthetic stderr message and exit code `-1`, matching the
//! executor's contract that `run()` never panics and never leaves a test
//! without a result.

use std::time::Duration;
use std::time::Instant;

use tokio::process::Command;
use tokio::time::error::Elapsed;

/// Default per-test execution timeout (seconds), used when the caller does
/// not override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default judgement-executable timeout (seconds).
pub const DEFAULT_JUDGEMENT_TIMEOUT_SECS: u64 = 60;

/// Outcome of running a subprocess to completion or timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Process exit code; `-1` for synthetic failures (missing executable,
    /// timeout, OS error).
    pub exit_code: i32,
    /// Captured standard output (empty on synthetic failures).
    pub stdout: String,
    /// Captured standard error (synthetic explanation on synthetic failures).
    pub stderr: String,
    /// Wall-clock duration of the invocation attempt, in seconds.
    pub duration: f64,
}

impl Outcome {
    /// Whether the exit code indicates a passing test (`0`).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    fn synthetic(message: String, duration: Duration) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: message,
            duration: duration.as_secs_f64(),
        }
    }
}

/// Spawns `executable` with no additional arguments, captures stdout/stderr,
/// and kills the child if it exceeds `timeout`. Never returns an `Err`: a
/// missing executable, OS spawn error, or timeout all fold into a synthetic
/// [`Outcome`] with exit code `-1`.
pub async fn run(executable: &str, timeout: Duration) -> Outcome {
    let started = Instant::now();
    let spawned = Command::new(executable)
        .kill_on_drop(true)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            return Outcome::synthetic(
                format!("failed to spawn `{executable}`: {err}"),
                started.elapsed(),
            );
        }
    };

    let waited: Result<std::io::Result<std::process::Output>, Elapsed> =
        tokio::time::timeout(timeout, child.wait_with_output()).await;

    match waited {
        Ok(Ok(output)) => Outcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed().as_secs_f64(),
        },
        Ok(Err(err)) => Outcome::synthetic(
            format!("os error while waiting on `{executable}`: {err}"),
            started.elapsed(),
        ),
        Err(_) => Outcome::synthetic(
            format!(
                "`{executable}` timed out after {:.1}s",
                timeout.as_secs_f64()
            ),
            started.elapsed(),
        ),
    }
}
