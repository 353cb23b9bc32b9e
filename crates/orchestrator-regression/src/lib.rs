// crates/orchestrator-regression/src/lib.rs
// ============================================================================
// Module: Orchestrator Regression Library
// Description: Public API surface for the co-occurrence graph and regression
//              test selector.
// Purpose: Turn a changed-file set into a minimal, dependency-closed set of
//          tests to run, backed by historical file<->test co-occurrence.
// Dependencies: orchestrator_core, crate::{cooccurrence, selector}
// ============================================================================

//! ## Overview
//! The co-occurrence graph is built from `git log` history and answers "what
//! test files tend to change alongside this source file"; the selector turns
//! that into a concrete, dependency-closed list of tests to run for a given
//! changed-file set, falling back to the full test suite when the graph has
//! no signal at all.

pub mod cooccurrence;
pub mod error;
pub mod selector;

pub use cooccurrence::ClassificationConfig;
pub use cooccurrence::CoOccurrenceGraph;
pub use cooccurrence::FileClass;
pub use cooccurrence::ParsedCommit;
pub use cooccurrence::build_graph;
pub use cooccurrence::classify_file;
pub use cooccurrence::load_graph;
pub use cooccurrence::parse_git_log;
pub use cooccurrence::run_git_log;
pub use cooccurrence::save_graph;
pub use error::RegressionError;
pub use selector::RegressionConfig;
pub use selector::SelectionResult;
pub use selector::add_dependency_closure;
pub use selector::resolve_test_label;
pub use selector::select_regression_tests;
