// crates/orchestrator-regression/src/selector.rs
// ============================================================================
// Module: Regression Selector
// Description: Bounded-BFS co-occurrence scoring with dependency closure and
//              fallback-to-all-tests.
// Purpose: Pick the smallest test subset likely to catch a regression caused
//          by a set of changed files, without ever dropping below a minimum
//          safety margin.
// Dependencies: orchestrator_core::Dag, crate::cooccurrence, time
// ============================================================================

//! ## Overview
//! Scoring walks the co-occurrence graph outward from the changed files in
//! hops: each hop's contribution is `decay_per_hop.powi(hop) * recency`,
//! where recency is an exponential half-life decay on the touching commit's
//! age. The candidate pool is every test named in the DAG -- a full
//! lifecycle-state filter (burning-in/disabled exclusion) is future work the
//! upstream algorithm also defers; see the crate's design notes.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use orchestrator_core::Dag;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cooccurrence::CoOccurrenceGraph;

/// Default source file extensions considered "changed" for selection
/// purposes; mirrors [`crate::cooccurrence::DEFAULT_SOURCE_EXTENSIONS`].
const DEFAULT_SOURCE_EXTENSIONS: &[&str] =
    &[".py", ".java", ".cc", ".go", ".rs", ".ts", ".js", ".bzl"];

/// Unparseable commit timestamps are treated as exactly one year old.
const DEFAULT_AGE_DAYS: f64 = 365.0;

/// Tuning knobs for the regression selector.
#[derive(Debug, Clone)]
pub struct RegressionConfig {
    /// Upper bound on the fraction of candidate tests selected by
    /// co-occurrence scoring (before dependency closure and fallback).
    pub max_test_percentage: f64,
    /// Maximum number of hops walked outward from the changed files.
    pub max_hops: u32,
    /// Per-hop score multiplier; hop `k` contributes `decay_per_hop^k`.
    pub decay_per_hop: f64,
    /// Half-life, in days, of the recency weight applied to a commit's age.
    pub recency_half_life_days: f64,
    /// Minimum selected-test count; below this, fallback selects every test.
    pub min_tests: usize,
    /// Extensions (dot-prefixed) treated as source when seeding the
    /// frontier from `changed_files`.
    pub source_extensions: Vec<String>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            max_test_percentage: 0.10,
            max_hops: 2,
            decay_per_hop: 0.5,
            recency_half_life_days: 180.0,
            min_tests: 3,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Output of a single regression selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Final selected test names, including dependency closure and any
    /// fallback additions.
    pub selected_tests: Vec<String>,
    /// Co-occurrence score per selected test (`0.0` for closure/fallback
    /// additions).
    pub scores: BTreeMap<String, f64>,
    /// Human-readable reason each selected test was included.
    pub selection_reason: BTreeMap<String, String>,
    /// Whether the minimum-test-count fallback fired.
    pub fallback_used: bool,
    /// Total number of candidate tests considered (every DAG node).
    pub total_stable_tests: usize,
    /// The changed-file list this selection was computed from.
    pub changed_files: Vec<String>,
}

fn days_since(timestamp: &str) -> f64 {
    let normalized = timestamp.replace('Z', "+00:00");
    let Ok(parsed) = OffsetDateTime::parse(&normalized, &Rfc3339) else {
        return DEFAULT_AGE_DAYS;
    };
    let delta = OffsetDateTime::now_utc() - parsed;
    (delta.whole_seconds() as f64 / 86_400.0).max(0.0)
}

fn recency_weight(age_days: f64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 1.0;
    }
    (-0.693 * age_days / half_life_days).exp()
}

/// Resolves a test file path to a DAG test name, trying three strategies in
/// order: an exact substring match against the node's `executable`, an
/// exact match of the file's stem against the test name, then a loose
/// substring-of-name match on the stem.
#[must_use]
pub fn resolve_test_label(test_file_path: &str, dag: &Dag) -> Option<String> {
    for name in dag.names() {
        let Some(node) = dag.node(&name) else {
            continue;
        };
        if !node.executable.is_empty() && node.executable.contains(test_file_path) {
            return Some(name);
        }
    }

    let stem = std::path::Path::new(test_file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(test_file_path);

    if dag.node(stem).is_some() {
        return Some(stem.to_string());
    }

    if stem.is_empty() {
        return None;
    }

    dag.names().into_iter().find(|name| name.contains(stem))
}

/// Extends `selected` with every test transitively reachable through
/// `depends_on` edges present in `dag`, so the returned set is
/// self-contained.
#[must_use]
pub fn add_dependency_closure(selected: &[String], dag: &Dag) -> Vec<String> {
    let mut closure: BTreeSet<String> = selected.iter().cloned().collect();
    let mut queue: VecDeque<String> = selected.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        for dep in dag.get_dependencies(&name) {
            if dag.node(dep).is_some() && closure.insert(dep.clone()) {
                queue.push_back(dep.clone());
            }
        }
    }

    closure.into_iter().collect()
}

/// Selects a regression-testing subset for `changed_files` against `graph`
/// and `dag`, per the module overview's bounded-BFS algorithm. Determinism:
/// the same `(changed_files, graph, dag, config)` always produce the same
/// result.
#[must_use]
pub fn select_regression_tests(
    changed_files: &[String],
    graph: &CoOccurrenceGraph,
    dag: &Dag,
    config: &RegressionConfig,
) -> SelectionResult {
    let all_candidates: BTreeSet<String> = dag.names().into_iter().collect();
    let max_tests = 1.max((all_candidates.len() as f64 * config.max_test_percentage).ceil() as usize);

    let mut candidate_scores: BTreeMap<String, f64> = BTreeMap::new();
    let mut selection_reason: BTreeMap<String, String> = BTreeMap::new();

    let mut visited_files: BTreeSet<String> = BTreeSet::new();
    let mut frontier_files: BTreeSet<String> = BTreeSet::new();
    for file in changed_files {
        if config
            .source_extensions
            .iter()
            .any(|ext| file.ends_with(ext.as_str()))
        {
            frontier_files.insert(file.clone());
        }
    }
    visited_files.clone_from(&frontier_files);

    for hop in 0..=config.max_hops {
        let hop_decay = config.decay_per_hop.powi(i32::try_from(hop).unwrap_or(i32::MAX));
        let mut new_source_files: BTreeSet<String> = BTreeSet::new();

        let mut related_commits: BTreeSet<String> = BTreeSet::new();
        for file in &frontier_files {
            if let Some(entries) = graph.file_commits.get(file) {
                for entry in entries {
                    related_commits.insert(entry.commit.clone());
                }
            }
        }

        for commit_hash in &related_commits {
            let Some(commit_data) = graph.commit_files.get(commit_hash) else {
                continue;
            };
            let age_days = days_since(&commit_data.timestamp);
            let recency = recency_weight(age_days, config.recency_half_life_days);

            for test_file in &commit_data.test_files {
                let Some(label) = resolve_test_label(test_file, dag) else {
                    continue;
                };
                if !all_candidates.contains(&label) {
                    continue;
                }
                let score = hop_decay * recency;
                *candidate_scores.entry(label.clone()).or_insert(0.0) += score;
                selection_reason
                    .entry(label)
                    .or_insert_with(|| format!("co-occurrence hop {hop}"));
            }

            for source_file in &commit_data.source_files {
                if !visited_files.contains(source_file) {
                    new_source_files.insert(source_file.clone());
                }
            }
        }

        if candidate_scores.len() >= max_tests || new_source_files.is_empty() {
            break;
        }

        visited_files.extend(new_source_files.iter().cloned());
        frontier_files = new_source_files;
    }

    let mut ranked: Vec<(String, f64)> = candidate_scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_tests);

    let selected: Vec<String> = ranked.iter().map(|(name, _)| name.clone()).collect();
    let mut scores: BTreeMap<String, f64> = ranked.into_iter().collect();

    let selected_with_deps = add_dependency_closure(&selected, dag);
    for dep in &selected_with_deps {
        scores.entry(dep.clone()).or_insert(0.0);
        selection_reason
            .entry(dep.clone())
            .or_insert_with(|| "dependency closure".to_string());
    }

    let mut final_selected: Vec<String> = selected_with_deps;
    let mut fallback_used = false;
    if final_selected.len() < config.min_tests && !all_candidates.is_empty() {
        fallback_used = true;
        let mut already: BTreeSet<String> = final_selected.iter().cloned().collect();
        for name in &all_candidates {
            if already.insert(name.clone()) {
                final_selected.push(name.clone());
                scores.entry(name.clone()).or_insert(0.0);
                selection_reason
                    .entry(name.clone())
                    .or_insert_with(|| "fallback (insufficient co-occurrence)".to_string());
            }
        }
    }

    let final_set: BTreeSet<String> = final_selected.iter().cloned().collect();
    selection_reason.retain(|name, _| final_set.contains(name));
    scores.retain(|name, _| final_set.contains(name));

    SelectionResult {
        selected_tests: final_selected,
        scores,
        selection_reason,
        fallback_used,
        total_stable_tests: all_candidates.len(),
        changed_files: changed_files.to_vec(),
    }
}
