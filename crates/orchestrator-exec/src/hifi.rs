// crates/orchestrator-exec/src/hifi.rs
// ============================================================================
// Module: HiFi Evaluator
// Description: Rerun-until-verdict loop over a target test set's E-values.
// Purpose: Reach a GREEN/RED test-set verdict restricted to the current
//          commit, spending a bounded number of full reruns of the target
//          set to do so.
// Dependencies: orchestrator_core::evalue, crate::subprocess
// ============================================================================

//! ## Overview
//! Unlike the effort runner (per-test SPRT, cross-commit pooling allowed),
//! the hifi evaluator always isolates evidence to the single current commit
//! and reasons about the whole target set's combined verdict, not individual
//! tests.

use std::time::Duration;

use orchestrator_core::Dag;
use orchestrator_core::TestSetConfig;
use orchestrator_core::evalue::TestSetVerdict;
use orchestrator_core::evalue::Verdict;
use orchestrator_core::evalue::hifi_evalue;
use orchestrator_core::evalue::test_set_verdict;
use orchestrator_core::status::StatusStore;
use tracing::info;

use crate::subprocess;

/// Runs the hifi loop over `targets` (test names), rerunning every
/// non-disabled target once per iteration until a GREEN or RED verdict is
/// reached or `config.max_reruns` iterations elapse.
pub async fn evaluate(
    dag: &Dag,
    store: &mut StatusStore,
    config: &TestSetConfig,
    targets: &[String],
    commit: &str,
    alpha_set: f64,
    beta_set: f64,
    timeout: Duration,
) -> TestSetVerdict {
    let mut verdict = verdict_for(store, targets, commit, config, alpha_set, beta_set);

    let mut iteration = 0;
    while matches!(verdict.verdict, Verdict::Undecided) && iteration < config.max_reruns {
        iteration += 1;
        info!(iteration, commit, "hifi evaluator rerunning target set");

        for name in targets {
            let Some(node) = dag.node(name) else { continue };
            if node.disabled {
                continue;
            }
            let outcome = subprocess::run(&node.executable, timeout).await;
            store.record_run(name, outcome.passed(), Some(commit.to_string()), None);
        }

        verdict = verdict_for(store, targets, commit, config, alpha_set, beta_set);
    }

    verdict
}

fn verdict_for(
    store: &StatusStore,
    targets: &[String],
    commit: &str,
    config: &TestSetConfig,
    alpha_set: f64,
    beta_set: f64,
) -> TestSetVerdict {
    let evalues: Vec<(String, orchestrator_core::evalue::TestEvalue)> = targets
        .iter()
        .map(|name| {
            let history = store.get_test_history(name);
            (
                name.clone(),
                hifi_evalue(history, commit, config.min_reliability),
            )
        })
        .collect();
    test_set_verdict(&evalues, alpha_set, beta_set)
}

#[cfg(test)]
mod tests {
    use orchestrator_core::Manifest;
    use orchestrator_core::manifest::ManifestTest;

    use super::*;

    fn manifest_with(name: &str, executable: &str) -> Manifest {
        let mut manifest = Manifest::default();
        manifest.test_set_tests.insert(
            name.to_string(),
            ManifestTest {
                assertion: format!("{name} holds"),
                executable: executable.to_string(),
                depends_on: Vec::new(),
                requirement_id: None,
                judgement_executable: None,
                disabled: false,
            },
        );
        manifest
    }

    #[tokio::test]
    async fn always_passing_target_converges_green() {
        let manifest = manifest_with("t", "/bin/true");
        let dag = Dag::from_manifest(&manifest);
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let config = TestSetConfig::default();

        let verdict = evaluate(
            &dag,
            &mut store,
            &config,
            &["t".to_string()],
            "commit-a",
            0.05,
            0.05,
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(verdict.verdict, Verdict::Green);
    }

    #[tokio::test]
    async fn always_failing_target_converges_red() {
        let manifest = manifest_with("t", "/bin/false");
        let dag = Dag::from_manifest(&manifest);
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let config = TestSetConfig::default();

        let verdict = evaluate(
            &dag,
            &mut store,
            &config,
            &["t".to_string()],
            "commit-a",
            0.05,
            0.05,
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(verdict.verdict, Verdict::Red);
    }

    #[tokio::test]
    async fn empty_target_set_is_vacuously_green() {
        let manifest = Manifest::default();
        let dag = Dag::from_manifest(&manifest);
        let mut store = StatusStore::load(std::path::Path::new("/nonexistent/status.json"));
        let config = TestSetConfig::default();

        let verdict = evaluate(
            &dag,
            &mut store,
            &config,
            &[],
            "commit-a",
            0.05,
            0.05,
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(verdict.verdict, Verdict::Green);
    }
}
