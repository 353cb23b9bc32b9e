// crates/orchestrator-cli/src/logging.rs
// ============================================================================
// Module: Logging Initialization
// Description: Initializes the single process-wide tracing subscriber.
// Purpose: Give the CLI entry point the sole place that calls `.init()`;
//          every other crate only emits `tracing` events.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! Verbosity is controlled by `-v`/`--verbose` repetition count, layered
//! under `RUST_LOG` when that variable is set (the standard env-filter
//! precedence). Text mode is the default; JSON mode mirrors the dual
//! text/JSON posture the manifest and status file formats already have.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Selects the log event encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text, one event per line.
    Text,
    /// Newline-delimited JSON, one event per line.
    Json,
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initializes the global tracing subscriber. Must be called exactly once,
/// before any other component emits a log event.
pub fn init(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    match format {
        LogFormat::Text => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_zero_defaults_to_warn() {
        assert_eq!(default_directive(0), "warn");
    }

    #[test]
    fn high_verbosity_saturates_to_trace() {
        assert_eq!(default_directive(9), "trace");
    }
}
