// crates/orchestrator-analysis/src/lib.rs
// ============================================================================
// Module: Orchestrator Analysis Library
// Description: Public API surface for sentinel log parsing, measurement
//              persistence, judgement re-evaluation, and target hashing.
// Purpose: Implement the collaborators the distilled core treats as opaque
//          (`[TST]` log parsing, Bazel action-graph hashing) in full, so a
//          complete orchestrator binary needs no external stand-ins.
// Dependencies: orchestrator_core, crate::{log_parser, measurements,
//               judgement, target_hash}
// ============================================================================

//! ## Overview
//! These four collaborators sit downstream of a test run: the log parser
//! turns a test's stdout into structured data, the measurement store
//! persists that data across processes, the judgement runner re-evaluates
//! it without re-executing the test, and the target hash resolver gives
//! the effort runner a stationarity marker for cross-session pooling. None
//! of them participate in the lifecycle state machine directly.

pub mod error;
pub mod judgement;
pub mod log_parser;
pub mod measurements;
pub mod target_hash;

pub use error::AnalysisError;
pub use judgement::JudgementResult;
pub use judgement::JudgementStatus;
pub use judgement::execute_judgement;
pub use judgement::find_rejudgeable_tests;
pub use log_parser::ParsedOutput;
pub use log_parser::parse_test_output;
pub use measurements::StoredMeasurements;
pub use measurements::label_to_filename;
pub use measurements::load_measurements;
pub use measurements::store_measurements;
pub use target_hash::compute_target_hashes;
