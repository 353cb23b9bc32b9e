// crates/orchestrator-cli/src/git.rs
// ============================================================================
// Module: Git Context Resolver
// Description: Thin wrappers over `git diff`, `git rev-parse`, and
//              `git status` used to resolve run context for the CLI.
// Purpose: Give the `select` and `run` subcommands the current commit and
//          changed-file set without hand-rolling process plumbing per call
//          site; `graph`'s own `git log` invocation lives in
//          `orchestrator-regression` since the graph builder owns that format.
// Dependencies: tokio::process
// ============================================================================

//! ## Overview
//! Every function here degrades to an empty/`None` result on any failure
//! (missing `git`, non-zero exit, not a repository) rather than propagating
//! an error, matching the external-tool error class: a missing git context
//! disables regression selection and context resolution, it does not abort
//! the run.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::warn;

const GIT_TIMEOUT_SECS: u64 = 30;

async fn run_git(repo_root: &Path, args: &[&str]) -> Option<String> {
    let mut command = Command::new("git");
    command.arg("-C").arg(repo_root).args(args);

    let output = match tokio::time::timeout(
        Duration::from_secs(GIT_TIMEOUT_SECS),
        command.output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            warn!(error = %err, "git not found in PATH");
            return None;
        }
        Err(_elapsed) => {
            warn!(args = ?args, "git invocation timed out");
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            args = ?args,
            exit_code = output.status.code().unwrap_or(-1),
            "git invocation failed"
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Returns the current `HEAD` commit hash, or `None` if `git` is
/// unavailable or the working directory is not a repository.
pub async fn current_commit(repo_root: &Path) -> Option<String> {
    run_git(repo_root, &["rev-parse", "HEAD"]).await
}

/// Returns `true` if the working tree has any uncommitted changes
/// (tracked or untracked), `false` if clean, and `None` if `git status`
/// could not be determined.
pub async fn has_uncommitted_changes(repo_root: &Path) -> Option<bool> {
    let status = run_git(repo_root, &["status", "--porcelain"]).await?;
    Some(!status.is_empty())
}

/// Returns file paths changed between `base` and `HEAD` (`git diff
/// --name-only <base>...HEAD`), or an empty list if `git` is unavailable,
/// the diff fails, or the output is empty.
pub async fn changed_files(repo_root: &Path, base: &str) -> Vec<String> {
    let Some(output) = run_git(
        repo_root,
        &["diff", "--name-only", &format!("{base}...HEAD")],
    )
    .await
    else {
        return Vec::new();
    };
    output.lines().map(str::to_string).collect()
}
