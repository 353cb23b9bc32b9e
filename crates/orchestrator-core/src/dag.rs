// crates/orchestrator-core/src/dag.rs
// ============================================================================
// Module: DAG Model
// Description: Test dependency graph, topological orderings, cycle detection.
// Purpose: Provide the two execution orderings (diagnostic, detection) that
//          the executor walks, and the disabled-pruning used before a run.
// Dependencies: crate::manifest
// ============================================================================

//! ## Overview
//! The DAG is immutable after construction except for `remove_disabled`,
//! which is applied once before a run to drop administratively disabled
//! tests. Reverse edges (`dependents`) are always derived, never authored,
//! so the two directions cannot drift out of sync.
//!
//! # Invariants
//! - Acyclic: enforced on every ordering operation, not on construction --
//!   a manifest may describe a cycle; the error surfaces only when an
//!   ordering is requested.
//! - `depends_on` entries naming a test absent from the manifest are
//!   tolerated: they are dropped from ordering computations rather than
//!   rejected, so manifests may evolve incrementally.
//! - Among nodes ready at the same step, orderings break ties by test name
//!   (ascending) for full determinism.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::manifest::Manifest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by DAG ordering operations.
///
/// # Invariants
/// - `Cycle.path` contains every node in the cycle and ends where it begins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DagError {
    /// A cycle was found among `depends_on` edges.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle {
        /// The concrete cycle path, first node repeated at the end.
        path: Vec<String>,
    },
}

// ============================================================================
// SECTION: Node
// ============================================================================

/// A single test node in the dependency graph.
///
/// # Invariants
/// - `dependents` is derived: it always equals the set of nodes whose
///   `depends_on` names this node, and is recomputed on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNode {
    /// Unique test name.
    pub name: String,
    /// Free-text assertion the test is expected to establish.
    pub assertion: String,
    /// Path-like executable invoked to run the test.
    pub executable: String,
    /// Ordered list of dependency test names (may include unknown names).
    pub depends_on: Vec<String>,
    /// Optional requirement tag.
    pub requirement_id: Option<String>,
    /// Optional secondary executable for measurement re-judgement.
    pub judgement_executable: Option<String>,
    /// Whether the test is administratively disabled.
    pub disabled: bool,
    /// Derived reverse edges: names of tests that depend on this one.
    pub dependents: Vec<String>,
}

// ============================================================================
// SECTION: DAG
// ============================================================================

/// The full test dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    nodes: BTreeMap<String, TestNode>,
}

impl Dag {
    /// Builds a DAG from a parsed manifest. Unknown `depends_on` names are
    /// kept on the node (for fidelity) but ignored by ordering operations.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut nodes: BTreeMap<String, TestNode> = manifest
            .test_set_tests
            .iter()
            .map(|(name, test)| {
                (
                    name.clone(),
                    TestNode {
                        name: name.clone(),
                        assertion: test.assertion.clone(),
                        executable: test.executable.clone(),
                        depends_on: test.depends_on.clone(),
                        requirement_id: test.requirement_id.clone(),
                        judgement_executable: test.judgement_executable.clone(),
                        disabled: test.disabled,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();
        Self::recompute_dependents(&mut nodes);
        Self { nodes }
    }

    /// Recomputes every node's `dependents` from the current `depends_on`
    /// edges. Unknown dependency names are skipped.
    fn recompute_dependents(nodes: &mut BTreeMap<String, TestNode>) {
        for node in nodes.values_mut() {
            node.dependents.clear();
        }
        let edges: Vec<(String, String)> = nodes
            .values()
            .flat_map(|node| {
                node.depends_on
                    .iter()
                    .filter(|dep| nodes.contains_key(dep.as_str()))
                    .map(move |dep| (dep.clone(), node.name.clone()))
            })
            .collect();
        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(dependent);
            }
        }
        for node in nodes.values_mut() {
            node.dependents.sort();
        }
    }

    /// Returns the node for `name`, if present.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&TestNode> {
        self.nodes.get(name)
    }

    /// Returns every node name, in canonical (ascending) order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the raw dependency names of `name` (may include unknowns).
    #[must_use]
    pub fn get_dependencies(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map_or(&[], |node| node.depends_on.as_slice())
    }

    /// Returns the derived dependents of `name`.
    #[must_use]
    pub fn get_dependents(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map_or(&[], |node| node.dependents.as_slice())
    }

    /// Marks the named nodes disabled, in addition to whatever the manifest
    /// already carried. Used to fold externally controlled (status-store)
    /// disables into the graph before `remove_disabled` prunes it.
    pub fn mark_disabled(&mut self, names: &BTreeSet<String>) {
        for name in names {
            if let Some(node) = self.nodes.get_mut(name.as_str()) {
                node.disabled = true;
            }
        }
    }

    /// Drops every disabled node, scrubbing it from the remaining nodes'
    /// `depends_on` and `dependents` lists.
    pub fn remove_disabled(&mut self) {
        let disabled: BTreeSet<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.disabled)
            .map(|(name, _)| name.clone())
            .collect();
        if disabled.is_empty() {
            return;
        }
        self.nodes.retain(|name, _| !disabled.contains(name));
        for node in self.nodes.values_mut() {
            node.depends_on.retain(|dep| !disabled.contains(dep));
        }
        Self::recompute_dependents(&mut self.nodes);
    }

    /// Leaves-first topological order (Kahn's algorithm). This is the
    /// **diagnostic** order.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Cycle`] when the dependency graph is cyclic.
    pub fn topological_sort_leaves_first(&self) -> Result<Vec<String>, DagError> {
        let mut remaining: BTreeMap<String, usize> = BTreeMap::new();
        for (name, node) in &self.nodes {
            let count = node
                .depends_on
                .iter()
                .filter(|dep| self.nodes.contains_key(dep.as_str()))
                .count();
            remaining.insert(name.clone(), count);
        }

        let mut ready: BTreeSet<String> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.clone())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(name) = ready.iter().next().cloned() {
            ready.remove(&name);
            order.push(name.clone());
            if let Some(node) = self.nodes.get(&name) {
                for dependent in &node.dependents {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(dependent.clone());
                        }
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            return Err(self.cycle_error());
        }
        Ok(order)
    }

    /// Roots-first BFS order. This is the **detection** order: every test
    /// runs regardless of dependency outcomes, surfacing highest-level
    /// failures first.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Cycle`] when the dependency graph is cyclic.
    pub fn bfs_roots_first(&self) -> Result<Vec<String>, DagError> {
        let roots: BTreeSet<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.dependents.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for root in &roots {
            if visited.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(name) = queue.pop_front() {
            order.push(name.clone());
            if let Some(node) = self.nodes.get(&name) {
                let mut deps: Vec<&String> = node
                    .depends_on
                    .iter()
                    .filter(|dep| self.nodes.contains_key(dep.as_str()))
                    .collect();
                deps.sort();
                for dep in deps {
                    if visited.insert(dep.clone()) {
                        queue.push_back(dep.clone());
                    }
                }
            }
        }

        // Disconnected-but-acyclic remainders are appended; a genuinely
        // unreachable non-empty remainder implies a cycle (every node in it
        // has a dependent, so none of them qualified as a root).
        let remainder: Vec<String> = self
            .nodes
            .keys()
            .filter(|name| !visited.contains(*name))
            .cloned()
            .collect();
        if remainder.is_empty() {
            return Ok(order);
        }
        if let Some(err) = self.detect_cycle() {
            return Err(err);
        }
        order.extend(remainder);
        Ok(order)
    }

    fn cycle_error(&self) -> DagError {
        self.detect_cycle().unwrap_or(DagError::Cycle {
            path: self.nodes.keys().cloned().collect(),
        })
    }

    /// Three-color DFS cycle detection. Returns the first concrete cycle
    /// path found, visiting candidate start nodes in ascending name order
    /// for determinism.
    fn detect_cycle(&self) -> Option<DagError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: BTreeMap<&str, Color> = self
            .nodes
            .keys()
            .map(|name| (name.as_str(), Color::White))
            .collect();
        let mut stack: Vec<String> = Vec::new();

        fn visit<'a>(
            name: &'a str,
            nodes: &'a BTreeMap<String, TestNode>,
            colors: &mut BTreeMap<&'a str, Color>,
            stack: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            colors.insert(name, Color::Gray);
            stack.push(name.to_string());
            if let Some(node) = nodes.get(name) {
                let mut deps: Vec<&str> = node
                    .depends_on
                    .iter()
                    .filter(|dep| nodes.contains_key(dep.as_str()))
                    .map(String::as_str)
                    .collect();
                deps.sort_unstable();
                for dep in deps {
                    match colors.get(dep).copied() {
                        Some(Color::Gray) => {
                            let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                            let mut path: Vec<String> = stack[start..].to_vec();
                            path.push(dep.to_string());
                            return Some(path);
                        }
                        Some(Color::White) => {
                            if let Some(path) = visit(dep, nodes, colors, stack) {
                                return Some(path);
                            }
                        }
                        _ => {}
                    }
                }
            }
            stack.pop();
            colors.insert(name, Color::Black);
            None
        }

        let names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        for name in names {
            if colors.get(name).copied() == Some(Color::White) {
                if let Some(path) = visit(name, &self.nodes, &mut colors, &mut stack) {
                    return Some(DagError::Cycle { path });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestTest;

    fn manifest_with(edges: &[(&str, &[&str])]) -> Manifest {
        let mut manifest = Manifest::default();
        for (name, deps) in edges {
            manifest.test_set_tests.insert(
                (*name).to_string(),
                ManifestTest {
                    assertion: format!("{name} holds"),
                    executable: format!("bin/{name}"),
                    depends_on: deps.iter().map(|d| (*d).to_string()).collect(),
                    requirement_id: None,
                    judgement_executable: None,
                    disabled: false,
                },
            );
        }
        manifest
    }

    #[test]
    fn leaves_first_respects_chain() {
        let manifest = manifest_with(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let dag = Dag::from_manifest(&manifest);
        let order = dag.topological_sort_leaves_first().expect("acyclic");
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn roots_first_runs_every_node_regardless_of_chain() {
        let manifest = manifest_with(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let dag = Dag::from_manifest(&manifest);
        let order = dag.bfs_roots_first().expect("acyclic");
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_orders_dependents_before_roots() {
        let manifest = manifest_with(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);
        let dag = Dag::from_manifest(&manifest);
        let order = dag.topological_sort_leaves_first().expect("acyclic");
        let pos = |n: &str| order.iter().position(|x| x == n).expect("present");
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn cycle_is_detected_with_concrete_path() {
        let manifest = manifest_with(&[("a", &["b"]), ("b", &["a"])]);
        let dag = Dag::from_manifest(&manifest);
        let err = dag.topological_sort_leaves_first().expect_err("cyclic");
        match err {
            DagError::Cycle { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"a".to_string()));
                assert!(path.contains(&"b".to_string()));
            }
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let manifest = manifest_with(&[("a", &["a"])]);
        let dag = Dag::from_manifest(&manifest);
        assert!(dag.topological_sort_leaves_first().is_err());
    }

    #[test]
    fn missing_dependency_is_tolerated() {
        let manifest = manifest_with(&[("a", &["ghost"])]);
        let dag = Dag::from_manifest(&manifest);
        let order = dag.topological_sort_leaves_first().expect("acyclic");
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn remove_disabled_scrubs_edges() {
        let mut manifest = manifest_with(&[("a", &[]), ("b", &["a"])]);
        manifest.test_set_tests.get_mut("a").expect("a").disabled = true;
        let mut dag = Dag::from_manifest(&manifest);
        dag.remove_disabled();
        assert!(dag.node("a").is_none());
        assert!(dag.get_dependencies("b").is_empty());
    }

    proptest::proptest! {
        /// For any DAG whose edges only point from a higher-numbered node to
        /// a lower-numbered one (so it is acyclic by construction), every
        /// dependency must sort strictly before its dependent in leaves-first
        /// order.
        #[test]
        fn leaves_first_always_orders_dependencies_before_dependents(
            edges in proptest::collection::vec((1usize..20, 0usize..20), 0..40),
        ) {
            let node_count = 20;
            let names: Vec<String> = (0..node_count).map(|i| format!("n{i}")).collect();
            let mut deps: Vec<Vec<&str>> = vec![Vec::new(); node_count];
            for (from, to) in edges {
                if to < from {
                    deps[from].push(names[to].as_str());
                }
            }
            let edge_refs: Vec<(&str, &[&str])> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_str(), deps[i].as_slice()))
                .collect();
            let manifest = manifest_with(&edge_refs);
            let dag = Dag::from_manifest(&manifest);
            let order = dag.topological_sort_leaves_first().expect("acyclic by construction");
            let position = |n: &str| order.iter().position(|x| x == n).expect("present");
            for (i, name) in names.iter().enumerate() {
                for dep in &deps[i] {
                    proptest::prop_assert!(position(dep) < position(name));
                }
            }
        }
    }
}
