// crates/orchestrator-exec/src/lib.rs
// ============================================================================
// Module: Orchestrator Execution Library
// Description: Public API surface for running, sweeping, and gating tests.
// Purpose: Host the subprocess collaborator, DAG executor, burn-in sweep,
//          result processor, effort runner, hifi evaluator, and exit-code
//          policy that together turn a `Dag` into a pass/fail decision.
// Dependencies: orchestrator_core, tokio
// ============================================================================

//! ## Overview
//! This crate owns every stateful, I/O-touching piece of a run: spawning
//! test subprocesses, walking the DAG under bounded concurrency, applying
//! lifecycle transitions to the status store, and deciding the final exit
//! code. `orchestrator-core` stays pure (DAG, SPRT, E-values, status
//! persistence); this crate is where those primitives are driven against
//! real executables and real wall-clock time.

pub mod burnin;
pub mod effort;
pub mod error;
pub mod executor;
pub mod exitcode;
pub mod hifi;
pub mod result_processor;
pub mod subprocess;

pub use error::ExecError;
pub use executor::ExecutionMode;
pub use executor::ExecutorOptions;
pub use executor::Invoker;
pub use executor::default_invoker;
pub use executor::execute_parallel;
pub use executor::execute_sequential;
pub use exitcode::Blocking;
pub use exitcode::ExitCodeSummary;
pub use exitcode::StageMode;
pub use exitcode::classify_test_blocking;
pub use exitcode::compute_exit_code;
