// crates/orchestrator-cli/src/output.rs
// ============================================================================
// Module: Output Writer
// Description: Thin stdout/stderr writers used by every subcommand.
// Purpose: Route all user-facing output through `std::io::Write` explicitly,
//          since the workspace lint table denies `print_stdout`/`print_stderr`.
// Dependencies: serde::Serialize, serde_json
// ============================================================================

use std::io::Write as _;

use serde::Serialize;

use crate::error::CliError;
use crate::error::CliResult;

/// Selects whether a subcommand renders its report as human-readable text
/// or as a single JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, line-oriented text.
    Text,
    /// A single pretty-printed JSON document.
    Json,
}

/// Writes `line` to stdout followed by a newline.
pub fn write_line(line: &str) -> CliResult<()> {
    writeln!(std::io::stdout(), "{line}").map_err(|source| CliError::Io {
        path: "<stdout>".to_string(),
        source,
    })
}

/// Writes `value` to stdout as pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    write_line(&body)
}

/// Writes `message` to stderr followed by a newline.
pub fn write_error_line(message: &str) -> std::io::Result<()> {
    writeln!(std::io::stderr(), "{message}")
}
