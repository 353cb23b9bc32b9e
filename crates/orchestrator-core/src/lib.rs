// crates/orchestrator-core/src/lib.rs
// ============================================================================
// Module: Orchestrator Core Library
// Description: Public API surface for the test orchestrator core.
// Purpose: Expose the manifest, DAG, lifecycle, and evidence types shared by
//          every other orchestrator crate.
// Dependencies: crate::{config, dag, evalue, manifest, result, sprt, status}
// ============================================================================

//! ## Overview
//! Orchestrator core provides the DAG model, persisted lifecycle state, and
//! statistical decision primitives (SPRT, E-values) that the executor,
//! regression selector, and CLI build on. It owns no subprocess execution and
//! no git invocation; those live in `orchestrator-exec` and
//! `orchestrator-regression` respectively.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod dag;
pub mod error;
pub mod evalue;
pub mod manifest;
pub mod result;
pub mod sprt;
pub mod status;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::TestSetConfig;
pub use dag::Dag;
pub use dag::DagError;
pub use dag::TestNode;
pub use error::CoreError;
pub use evalue::TestEvalue;
pub use evalue::TestSetVerdict;
pub use evalue::Verdict;
pub use manifest::Manifest;
pub use manifest::ManifestTest;
pub use result::TestResult;
pub use result::TestStatus;
pub use sprt::SprtDecision;
pub use sprt::sprt_evaluate;
pub use status::HISTORY_CAP;
pub use status::HistoryEntry;
pub use status::LifecycleState;
pub use status::StatusEntry;
pub use status::StatusStore;
