// crates/orchestrator-analysis/src/target_hash.rs
// ============================================================================
// Module: Target Hash Resolver
// Description: Wraps `bazel aquery --output=jsonproto` to compute per-test
//              build-input hashes.
// Purpose: Give the effort runner a stationarity marker for cross-session
//          evidence pooling; degrades to an empty map on any tool failure.
// Dependencies: sha2, serde_json, tokio::process
// ============================================================================

//! ## Overview
//! A target hash captures the test binary, transitive runtime dependencies,
//! testing tools, and build configuration: two runs with the same hash are
//! valid same-conditions samples for SPRT pooling. Per the external-tool
//! error class, any failure to invoke or parse `bazel aquery` -- missing
//! binary, non-zero exit, malformed JSON -- degrades to an empty result map
//! rather than propagating an error; callers must treat a label's absence
//! from the map as "pooling disabled for this test", never as fatal.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tokio::process::Command;
use tracing::warn;

/// Default timeout for the `bazel aquery` subprocess.
pub const DEFAULT_AQUERY_TIMEOUT_SECS: u64 = 60;

/// Length, in hex characters, of the truncated composite hash.
const HASH_PREFIX_LEN: usize = 16;

fn build_query_expr(labels: &[String]) -> String {
    labels.join(" + ")
}

async fn run_aquery(workspace_dir: &Path, query_expr: &str, timeout: Duration) -> Option<Value> {
    let mut command = Command::new("bazel");
    command
        .current_dir(workspace_dir)
        .arg("aquery")
        .arg("--output=jsonproto")
        .arg(query_expr);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            warn!(error = %err, "bazel not found in PATH, skipping target hash computation");
            return None;
        }
        Err(_elapsed) => {
            warn!("bazel aquery timed out, skipping target hash computation");
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            exit_code = output.status.code().unwrap_or(-1),
            "bazel aquery failed, skipping target hash computation"
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Some(Value::Object(serde_json::Map::new()));
    }

    match serde_json::from_str(&stdout) {
        Ok(value) => Some(value),
        Err(_err) => {
            warn!("failed to parse bazel aquery JSON output, skipping target hash computation");
            None
        }
    }
}

fn extract_hashes(aquery_result: &Value, labels: &[String]) -> HashMap<String, String> {
    let label_set: std::collections::HashSet<&str> =
        labels.iter().map(String::as_str).collect();

    let mut targets_by_id: HashMap<String, String> = HashMap::new();
    if let Some(targets) = aquery_result.get("targets").and_then(Value::as_array) {
        for target in targets {
            let Some(label) = target.get("label").and_then(Value::as_str) else {
                continue;
            };
            let id = target
                .get("id")
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .unwrap_or_default();
            targets_by_id.insert(id, label.to_string());
        }
    }

    let mut digests_by_label: HashMap<String, Vec<String>> = HashMap::new();
    if let Some(actions) = aquery_result.get("actions").and_then(Value::as_array) {
        for action in actions {
            let target_id = action
                .get("targetId")
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .unwrap_or_default();
            let Some(label) = targets_by_id.get(&target_id) else {
                continue;
            };
            if !label_set.contains(label.as_str()) {
                continue;
            }
            let Some(action_key) = action.get("actionKey").and_then(Value::as_str) else {
                continue;
            };
            digests_by_label
                .entry(label.clone())
                .or_default()
                .push(action_key.to_string());
        }
    }

    let mut result = HashMap::new();
    for label in labels {
        let Some(digests) = digests_by_label.get_mut(label) else {
            continue;
        };
        digests.sort();
        let mut hasher = Sha256::new();
        hasher.update(digests.join("\n").as_bytes());
        let full_hex = format!("{:x}", hasher.finalize());
        result.insert(label.clone(), full_hex[..HASH_PREFIX_LEN].to_string());
    }
    result
}

/// Computes a content hash per label in `test_labels` by batch-querying
/// `bazel aquery --output=jsonproto` under `workspace_dir`. Labels whose
/// actions cannot be found in the aquery output are simply absent from the
/// returned map. Any tool-level failure -- `bazel` missing, non-zero exit,
/// malformed JSON, or a timeout -- degrades to an empty map.
pub async fn compute_target_hashes(
    test_labels: &[String],
    workspace_dir: &Path,
    timeout: Duration,
) -> HashMap<String, String> {
    if test_labels.is_empty() {
        return HashMap::new();
    }

    let query_expr = build_query_expr(test_labels);
    let Some(aquery_result) = run_aquery(workspace_dir, &query_expr, timeout).await else {
        return HashMap::new();
    };

    extract_hashes(&aquery_result, test_labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_label_query_expr_is_bare_label() {
        assert_eq!(build_query_expr(&["//test:a".to_string()]), "//test:a");
    }

    #[test]
    fn multi_label_query_expr_unions_with_plus() {
        assert_eq!(
            build_query_expr(&["//test:a".to_string(), "//test:b".to_string()]),
            "//test:a + //test:b"
        );
    }

    #[test]
    fn extract_hashes_is_deterministic_under_digest_reordering() {
        let result_a = serde_json::json!({
            "targets": [{"id": "1", "label": "//test:a"}],
            "actions": [
                {"targetId": "1", "actionKey": "zzz"},
                {"targetId": "1", "actionKey": "aaa"},
            ],
        });
        let result_b = serde_json::json!({
            "targets": [{"id": "1", "label": "//test:a"}],
            "actions": [
                {"targetId": "1", "actionKey": "aaa"},
                {"targetId": "1", "actionKey": "zzz"},
            ],
        });
        let labels = vec!["//test:a".to_string()];
        assert_eq!(
            extract_hashes(&result_a, &labels),
            extract_hashes(&result_b, &labels)
        );
    }

    #[test]
    fn extract_hashes_omits_labels_with_no_actions() {
        let result = serde_json::json!({"targets": [], "actions": []});
        let labels = vec!["//test:a".to_string()];
        assert!(extract_hashes(&result, &labels).is_empty());
    }

    #[test]
    fn extract_hashes_produces_sixteen_hex_chars() {
        let result = serde_json::json!({
            "targets": [{"id": "1", "label": "//test:a"}],
            "actions": [{"targetId": "1", "actionKey": "digest"}],
        });
        let labels = vec!["//test:a".to_string()];
        let hashes = extract_hashes(&result, &labels);
        assert_eq!(hashes["//test:a"].len(), 16);
    }

    #[tokio::test]
    async fn empty_label_list_short_circuits() {
        let hashes = compute_target_hashes(
            &[],
            Path::new("."),
            Duration::from_secs(DEFAULT_AQUERY_TIMEOUT_SECS),
        )
        .await;
        assert!(hashes.is_empty());
    }
}
