// crates/orchestrator-cli/src/commands/graph.rs
// ============================================================================
// Module: Graph Command
// Description: Builds or incrementally updates the co-occurrence graph.
// Dependencies: orchestrator_regression::cooccurrence, crate::output
// ============================================================================

//! ## Overview
//! Wraps `git log --name-only` over a bounded window, classifies each touched
//! path as source or test, and folds the result into a persisted
//! [`orchestrator_regression::CoOccurrenceGraph`]. Passing an existing graph
//! path that already parses resumes from its watermark commit instead of
//! rescanning full history.

use std::path::PathBuf;

use clap::Args;
use orchestrator_regression::ClassificationConfig;
use orchestrator_regression::build_graph;
use orchestrator_regression::load_graph;
use orchestrator_regression::parse_git_log;
use orchestrator_regression::run_git_log;
use orchestrator_regression::save_graph;

use crate::error::CliResult;
use crate::output::write_line;

/// Flags for the `graph` subcommand.
#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Repository root to read `git log` from.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Output graph path; also read as the existing graph for an
    /// incremental update.
    #[arg(long, default_value = "orchestrator_graph.json")]
    pub graph: PathBuf,
    /// Maximum number of commits to fold in on a full (non-incremental)
    /// build.
    #[arg(long, default_value_t = 5000)]
    pub max_history: u32,
}

/// Runs the `graph` subcommand, returning the process exit code.
pub async fn execute(args: &GraphArgs) -> CliResult<i32> {
    let existing = load_graph(&args.graph);
    let since_commit = existing.as_ref().and_then(|g| g.metadata.last_commit.clone());

    let log_output = run_git_log(&args.repo, args.max_history, since_commit.as_deref()).await?;
    let commits = parse_git_log(&log_output);
    let config = ClassificationConfig::default();
    let graph = build_graph(&commits, &config, existing);

    save_graph(&graph, &args.graph)?;

    write_line(&format!(
        "{} commit(s) folded in, {} total analyzed",
        commits.len(),
        graph.metadata.total_commits_analyzed
    ))?;
    Ok(0)
}
