// crates/orchestrator-analysis/src/log_parser.rs
// ============================================================================
// Module: Sentinel Log Parser
// Description: Parses `[TST] <json>` sentinel lines from test stdout.
// Purpose: Turn a test's raw stdout into typed blocks, features,
//          measurements, results, and errors, tolerating unknown event
//          types and malformed lines for forward compatibility.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `phase`/`block_start` events open a named block that becomes the
//! "current block" context for every untyped entry that follows, until a
//! `block_end` clears it. A block named `rigging` marks harness self-checks
//! rather than product assertions: an error recorded under that block is a
//! rigging failure, not a test failure, and is reported separately so a
//! judgement or CI layer can tell the two apart without re-running the test.

use serde_json::Value;

/// Literal prefix marking a structured log line.
pub const SENTINEL: &str = "[TST] ";

/// A `feature` event, tagged with the block open when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Feature name as emitted by the test.
    pub name: String,
    /// Name of the block open when this feature was recorded, if any.
    pub block: Option<String>,
}

/// A `measurement` event, tagged with the block open when it was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Measurement name as emitted by the test.
    pub name: String,
    /// Raw JSON value of the measurement, if present.
    pub value: Option<Value>,
    /// Name of the block open when this measurement was recorded, if any.
    pub block: Option<String>,
}

/// A `result` event, normalized from either the `{name, passed}` shape or
/// the `{status, message}` shape into one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    /// Normalized status string (`"passed"`, `"failed"`, or the emitter's
    /// own `status` value when the entry used that shape).
    pub status: String,
    /// Human-readable message, empty when the entry only carried a name.
    pub message: String,
    /// Name of the block open when this result was recorded, if any.
    pub block: Option<String>,
}

/// An `error` event, tagged with the block open when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Human-readable error message.
    pub message: String,
    /// Name of the block open when this error was recorded, if any.
    pub block: Option<String>,
}

/// The parsed structure of a single test's stdout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    /// Names of blocks opened, in the order they were opened.
    pub block_sequence: Vec<String>,
    /// Every `feature` event.
    pub features: Vec<Feature>,
    /// Every `measurement` event.
    pub measurements: Vec<Measurement>,
    /// Every `result` event, normalized.
    pub results: Vec<ResultEntry>,
    /// Every `error` event.
    pub errors: Vec<ErrorEntry>,
    /// Lines that did not carry the sentinel prefix, in order.
    pub plain_output: Vec<String>,
    /// Diagnostics for malformed or unrecognized sentinel lines.
    pub warnings: Vec<String>,
}

/// Name of the block under which a harness self-check runs, as opposed to a
/// product assertion.
const RIGGING_BLOCK: &str = "rigging";

impl ParsedOutput {
    /// Whether any error was recorded under the rigging block: the harness
    /// itself failed, rather than the test's own assertions.
    #[must_use]
    pub fn has_rigging_failure(&self) -> bool {
        self.errors
            .iter()
            .any(|error| error.block.as_deref() == Some(RIGGING_BLOCK))
    }

    /// Names of features recorded under the rigging block.
    #[must_use]
    pub fn rigging_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|feature| feature.block.as_deref() == Some(RIGGING_BLOCK))
            .map(|feature| feature.name.clone())
            .collect()
    }
}

fn normalize_result(entry: &serde_json::Map<String, Value>, block: Option<String>) -> ResultEntry {
    if let Some(name) = entry.get("name").and_then(Value::as_str) {
        let status = match entry.get("passed").and_then(Value::as_bool) {
            Some(true) => "passed",
            Some(false) => "failed",
            None => "unknown",
        };
        return ResultEntry {
            status: status.to_string(),
            message: name.to_string(),
            block,
        };
    }

    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    ResultEntry {
        status,
        message,
        block,
    }
}

fn string_field(entry: &serde_json::Map<String, Value>, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parses `stdout` into a [`ParsedOutput`], scanning line by line for the
/// `[TST] ` sentinel prefix. Non-sentinel lines are preserved verbatim in
/// `plain_output`; malformed or untyped sentinel lines are recorded in
/// `warnings` and otherwise skipped; unrecognized `type` values are skipped
/// silently, matching the forward-compatibility contract for new sentinel
/// types.
#[must_use]
pub fn parse_test_output(stdout: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let mut current_block: Option<String> = None;

    for line in stdout.lines() {
        let Some(json_str) = line.strip_prefix(SENTINEL) else {
            parsed.plain_output.push(line.to_string());
            continue;
        };

        let entry: Value = match serde_json::from_str(json_str) {
            Ok(value) => value,
            Err(_) => {
                parsed
                    .warnings
                    .push(format!("malformed [TST] line, skipping: {line}"));
                continue;
            }
        };

        let Value::Object(entry) = entry else {
            parsed
                .warnings
                .push(format!("[TST] line is not a JSON object, skipping: {line}"));
            continue;
        };

        let Some(event_type) = entry.get("type").and_then(Value::as_str) else {
            parsed
                .warnings
                .push(format!("[TST] line missing type field, skipping: {line}"));
            continue;
        };

        match event_type {
            "phase" | "block_start" => {
                if let Some(block) = entry.get("block").and_then(Value::as_str) {
                    current_block = Some(block.to_string());
                    parsed.block_sequence.push(block.to_string());
                }
            }
            "block_end" => current_block = None,
            "feature" => parsed.features.push(Feature {
                name: string_field(&entry, "name"),
                block: current_block.clone(),
            }),
            "measurement" => parsed.measurements.push(Measurement {
                name: string_field(&entry, "name"),
                value: entry.get("value").cloned(),
                block: current_block.clone(),
            }),
            "result" => parsed
                .results
                .push(normalize_result(&entry, current_block.clone())),
            "error" => parsed.errors.push(ErrorEntry {
                message: string_field(&entry, "message"),
                block: current_block.clone(),
            }),
            _ => {
                // Unrecognized event type: forward-compatible no-op.
            }
        }
    }

    parsed
}
