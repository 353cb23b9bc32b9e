// crates/orchestrator-cli/src/commands/select.rs
// ============================================================================
// Module: Select Command
// Description: Dry-runs the regression test selector without executing
//              anything.
// Dependencies: orchestrator_{core,regression}, crate::{git, output}
// ============================================================================

//! ## Overview
//! Reports exactly what `run --stage regression` would choose to execute,
//! for inspection or CI preview, without spawning a single test subprocess.

use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use orchestrator_core::Dag;
use orchestrator_core::Manifest;
use orchestrator_core::TestSetConfig;
use orchestrator_regression::CoOccurrenceGraph;
use orchestrator_regression::RegressionConfig;
use orchestrator_regression::cooccurrence::GraphMetadata;
use orchestrator_regression::load_graph;
use orchestrator_regression::select_regression_tests;
use serde::Serialize;

use crate::cli_config::ConfigOverrides;
use crate::cli_config::apply_overrides;
use crate::error::CliResult;
use crate::git;
use crate::output::OutputFormat;
use crate::output::write_json;
use crate::output::write_line;

/// Flags for the `select` subcommand.
#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Repository root used to resolve changed files.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Base ref the selector diffs changed files against.
    #[arg(long, default_value = "HEAD~1")]
    pub base: String,
    /// Co-occurrence graph path consulted by the selector.
    #[arg(long, default_value = "orchestrator_graph.json")]
    pub graph: PathBuf,
    /// Output report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Serialize)]
struct SelectReport {
    changed_files: Vec<String>,
    selected_tests: Vec<String>,
    total_stable_tests: usize,
    fallback_used: bool,
    scores: std::collections::BTreeMap<String, f64>,
    selection_reason: std::collections::BTreeMap<String, String>,
}

fn empty_graph() -> CoOccurrenceGraph {
    CoOccurrenceGraph {
        metadata: GraphMetadata {
            built_at: String::new(),
            last_commit: None,
            total_commits_analyzed: 0,
            source_extensions: Vec::new(),
            test_patterns: Vec::new(),
        },
        file_commits: std::collections::BTreeMap::new(),
        commit_files: std::collections::BTreeMap::new(),
    }
}

/// Runs the `select` subcommand, returning the process exit code.
pub async fn execute(
    manifest_path: &Path,
    config: TestSetConfig,
    args: &SelectArgs,
) -> CliResult<i32> {
    let config = apply_overrides(config, &args.overrides);
    let manifest = Manifest::load(manifest_path)?;
    let mut dag = Dag::from_manifest(&manifest);
    dag.remove_disabled();

    let changed = git::changed_files(&args.repo, &args.base).await;
    let graph = load_graph(&args.graph).unwrap_or_else(empty_graph);
    let regression_config = RegressionConfig {
        max_test_percentage: config.max_test_percentage,
        max_hops: config.max_hops,
        ..RegressionConfig::default()
    };
    let selection = select_regression_tests(&changed, &graph, &dag, &regression_config);
    let report = SelectReport {
        changed_files: selection.changed_files,
        selected_tests: selection.selected_tests,
        total_stable_tests: selection.total_stable_tests,
        fallback_used: selection.fallback_used,
        scores: selection.scores,
        selection_reason: selection.selection_reason,
    };

    if args.format == OutputFormat::Json {
        write_json(&report)?;
        return Ok(0);
    }

    write_line(&format!("changed files: {}", report.changed_files.len()))?;
    write_line(&format!(
        "selected {} of {} stable test(s)",
        report.selected_tests.len(),
        report.total_stable_tests,
    ))?;
    if report.fallback_used {
        write_line("fallback to all tests: yes")?;
    }
    for name in &report.selected_tests {
        let score = report.scores.get(name).copied().unwrap_or(0.0);
        let reason = report
            .selection_reason
            .get(name)
            .map_or("", String::as_str);
        write_line(&format!("  {name} (score={score:.4}): {reason}"))?;
    }
    Ok(0)
}
