// crates/orchestrator-cli/src/commands/run.rs
// ============================================================================
// Module: Run Command
// Description: Executes a stage (regression/converge/max) end to end.
// Purpose: Compose manifest load, disabled-state sync, optional regression
//          selection, execution, lifecycle update, effort-runner reruns, and
//          exit-code computation into the single control flow the `run`
//          subcommand exposes.
// Dependencies: orchestrator_{core,exec,regression,analysis}, crate::{git,
//               cli_config, output}
// ============================================================================

//! ## Overview
//! Mirrors the control-flow paragraph: manifest load -> DAG construction ->
//! disabled-state sync -> (regression only) selector filtering -> executor
//! -> result processor -> effort runner -> exit-code policy. `regression` and
//! `converge` both target initially-failing tests only (`EffortTarget::Converge`);
//! `max` reruns every test. Only the blocking rule (lifecycle-aware vs not)
//! differs between `regression` and `converge`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use clap::ValueEnum;
use orchestrator_analysis::compute_target_hashes;
use orchestrator_core::Dag;
use orchestrator_core::Manifest;
use orchestrator_core::TestSetConfig;
use orchestrator_core::manifest::ManifestTest;
use orchestrator_core::status::LifecycleState;
use orchestrator_core::status::StatusStore;
use orchestrator_exec::ExecutionMode;
use orchestrator_exec::ExecutorOptions;
use orchestrator_exec::default_invoker;
use orchestrator_exec::effort::EffortTarget;
use orchestrator_exec::effort::run_effort;
use orchestrator_exec::exitcode::StageMode;
use orchestrator_exec::exitcode::compute_exit_code;
use orchestrator_exec::execute_parallel;
use orchestrator_exec::execute_sequential;
use orchestrator_regression::RegressionConfig;
use orchestrator_regression::load_graph;
use orchestrator_regression::select_regression_tests;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::cli_config::ConfigOverrides;
use crate::cli_config::apply_overrides;
use crate::error::CliResult;
use crate::git;
use crate::output::OutputFormat;
use crate::output::write_json;
use crate::output::write_line;

/// Which stage the `run` subcommand executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Regression-selector-filtered, lifecycle-aware blocking.
    Regression,
    /// Full test set, lifecycle-unaware blocking, initial failures only.
    Converge,
    /// Full test set, lifecycle-unaware blocking, every test rerun.
    Max,
}

/// Flags for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Stage to execute.
    #[arg(long, value_enum, default_value_t = Stage::Regression)]
    pub stage: Stage,
    /// Ordering mode: leaves-first dependency gating, or roots-first
    /// run-everything.
    #[arg(long, value_enum, default_value_t = ModeArg::Diagnostic)]
    pub mode: ModeArg,
    /// Run the executor under bounded parallelism instead of sequentially.
    #[arg(long)]
    pub parallel: bool,
    /// Per-test subprocess timeout, in seconds.
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
    /// Repository root used to resolve the current commit and changed files.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Base ref the regression selector diffs changed files against.
    #[arg(long, default_value = "HEAD~1")]
    pub base: String,
    /// Co-occurrence graph path consulted by the regression selector.
    #[arg(long, default_value = "orchestrator_graph.json")]
    pub graph: PathBuf,
    /// Bazel workspace directory used for target-hash pooling; omit to
    /// disable pooling entirely.
    #[arg(long)]
    pub bazel_workspace: Option<PathBuf>,
    /// Output report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Ordering mode, mirroring [`ExecutionMode`] for clap's derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Leaves-first; a dependency failure short-circuits dependents.
    Diagnostic,
    /// Roots-first; every non-disabled test runs regardless of deps.
    Detection,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Diagnostic => Self::Diagnostic,
            ModeArg::Detection => Self::Detection,
        }
    }
}

/// Machine-readable report for a single `run` invocation.
#[derive(Debug, Serialize)]
struct RunReport {
    exit_code: i32,
    blocking_tests: Vec<String>,
    non_blocking_tests: Vec<String>,
    warnings: Vec<String>,
    selected_tests: Option<Vec<String>>,
}

fn sync_disabled_state(store: &mut StatusStore, manifest: &Manifest) {
    for (name, test) in &manifest.test_set_tests {
        if test.disabled && store.get_test_state(name) != LifecycleState::Disabled {
            store.set_test_state(name, LifecycleState::Disabled, false);
        }
    }
}

/// Names of tests the status store (rather than the manifest) marks
/// disabled, e.g. via `status set <name> disabled`. Disabling is
/// externally controlled "via CLI or manifest" per the lifecycle
/// invariants, so both sources must exclude a test from execution.
fn externally_disabled(store: &StatusStore, manifest: &Manifest) -> BTreeSet<String> {
    manifest
        .test_set_tests
        .keys()
        .filter(|name| store.get_test_state(name) == LifecycleState::Disabled)
        .cloned()
        .collect()
}

fn filter_manifest(manifest: &Manifest, names: &[String]) -> Manifest {
    let keep: std::collections::BTreeSet<&str> = names.iter().map(String::as_str).collect();
    let test_set_tests: BTreeMap<String, ManifestTest> = manifest
        .test_set_tests
        .iter()
        .filter(|(name, _)| keep.contains(name.as_str()))
        .map(|(name, test)| (name.clone(), test.clone()))
        .collect();
    Manifest {
        test_set: manifest.test_set.clone(),
        test_set_tests,
    }
}

/// Runs the `run` subcommand end to end, returning the process exit code.
pub async fn execute(
    manifest_path: &Path,
    status_path: &Path,
    config: TestSetConfig,
    args: &RunArgs,
) -> CliResult<i32> {
    let config = apply_overrides(config, &args.overrides);
    let manifest = Manifest::load(manifest_path)?;
    let mut store = StatusStore::load(status_path);
    sync_disabled_state(&mut store, &manifest);

    let external_disabled = externally_disabled(&store, &manifest);
    let mut dag = Dag::from_manifest(&manifest);
    dag.mark_disabled(&external_disabled);
    dag.remove_disabled();

    let mut selected_tests = None;
    if args.stage == Stage::Regression {
        let changed = git::changed_files(&args.repo, &args.base).await;
        let graph = load_graph(&args.graph).unwrap_or_else(|| {
            warn!(path = %args.graph.display(), "no co-occurrence graph found; regression selection will fall back to all tests");
            orchestrator_regression::CoOccurrenceGraph {
                metadata: orchestrator_regression::cooccurrence::GraphMetadata {
                    built_at: String::new(),
                    last_commit: None,
                    total_commits_analyzed: 0,
                    source_extensions: Vec::new(),
                    test_patterns: Vec::new(),
                },
                file_commits: BTreeMap::new(),
                commit_files: BTreeMap::new(),
            }
        });
        let regression_config = RegressionConfig {
            max_test_percentage: config.max_test_percentage,
            max_hops: config.max_hops,
            ..RegressionConfig::default()
        };
        let selection = select_regression_tests(&changed, &graph, &dag, &regression_config);
        info!(
            selected = selection.selected_tests.len(),
            total = selection.total_stable_tests,
            fallback = selection.fallback_used,
            "regression selector chose a test subset"
        );
        let sub_manifest = filter_manifest(&manifest, &selection.selected_tests);
        dag = Dag::from_manifest(&sub_manifest);
        dag.mark_disabled(&external_disabled);
        dag.remove_disabled();
        selected_tests = Some(selection.selected_tests);
    }

    let timeout = Duration::from_secs(args.timeout_secs);
    let options = ExecutorOptions {
        mode: args.mode.into(),
        timeout,
        max_failures: config.max_failures.map(u64::from),
    };
    let invoker = default_invoker(timeout);
    let results = if args.parallel {
        let max_parallel = config.max_parallel.map_or_else(
            || std::thread::available_parallelism().map_or(4, std::num::NonZero::get),
            |n| n as usize,
        );
        execute_parallel(&dag, &options, max_parallel, &invoker).await?
    } else {
        execute_sequential(&dag, &options, &invoker).await?
    };

    let commit = git::current_commit(&args.repo).await;
    let labels: Vec<String> = results.iter().map(|r| r.name.clone()).collect();
    let target_hashes = match &args.bazel_workspace {
        Some(workspace) => compute_target_hashes(&labels, workspace, timeout).await,
        None => HashMap::new(),
    };

    for result in &results {
        orchestrator_exec::result_processor::apply_result(
            &mut store,
            result,
            &config,
            commit.clone(),
            target_hashes.get(&result.name).cloned(),
        );
    }

    let effort_target = match args.stage {
        Stage::Regression | Stage::Converge => EffortTarget::Converge,
        Stage::Max => EffortTarget::Max,
    };
    let classifications = run_effort(
        &dag,
        &mut store,
        &config,
        &results,
        effort_target,
        commit,
        &target_hashes,
        timeout,
    )
    .await;

    let stage_mode = match args.stage {
        Stage::Regression => StageMode::Regression,
        Stage::Converge => StageMode::Converge,
        Stage::Max => StageMode::Max,
    };
    let summary = compute_exit_code(&classifications, &store, stage_mode);
    store.save()?;

    let report = RunReport {
        exit_code: summary.exit_code,
        blocking_tests: summary.blocking_tests,
        non_blocking_tests: summary.non_blocking_tests,
        warnings: summary.warnings,
        selected_tests,
    };
    render(&report, args.format)?;

    Ok(report.exit_code)
}

fn render(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return write_json(report);
    }

    if let Some(selected) = &report.selected_tests {
        write_line(&format!("selected {} test(s)", selected.len()))?;
    }
    if report.blocking_tests.is_empty() {
        write_line("no blocking failures")?;
    } else {
        write_line(&format!("blocking: {}", report.blocking_tests.join(", ")))?;
    }
    if !report.non_blocking_tests.is_empty() {
        write_line(&format!(
            "non-blocking: {}",
            report.non_blocking_tests.join(", ")
        ))?;
    }
    for warning in &report.warnings {
        write_line(&format!("warning: {warning}"))?;
    }
    write_line(&format!("exit code: {}", report.exit_code))
}
