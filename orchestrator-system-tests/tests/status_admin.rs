// orchestrator-system-tests/tests/status_admin.rs
// ============================================================================
// Suite: Status Admin Command
// Description: Exercises `orchestrator status` show/set/remove/history
//              against a real status file on disk.
// ============================================================================

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::cli::cli_binary;
use helpers::cli::run_cli;
use helpers::fixtures::simple_workspace;

#[test]
fn set_then_show_reflects_new_state() {
    let Some(binary) = cli_binary() else {
        eprintln!("skipping: orchestrator binary unavailable");
        return;
    };
    let workspace = simple_workspace();

    let set_output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "set",
            "always_pass",
            "disabled",
        ],
    )
    .expect("run orchestrator status set");
    assert!(set_output.status.success());

    let show_output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "show",
            "--format",
            "json",
        ],
    )
    .expect("run orchestrator status show");
    assert!(show_output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&show_output.stdout).expect("status report is valid json");
    let disabled = report["disabled"].as_array().expect("disabled array");
    assert!(disabled.iter().any(|v| v == "always_pass"));
    let stable = report["stable"].as_array().expect("stable array");
    assert!(!stable.iter().any(|v| v == "always_pass"));
}

#[test]
fn set_unknown_state_fails_with_nonzero_exit() {
    let Some(binary) = cli_binary() else {
        eprintln!("skipping: orchestrator binary unavailable");
        return;
    };
    let workspace = simple_workspace();

    let output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "set",
            "always_pass",
            "quarantined",
        ],
    )
    .expect("run orchestrator status set");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("quarantined"), "stderr: {stderr}");
}

#[test]
fn remove_then_show_omits_test_everywhere() {
    let Some(binary) = cli_binary() else {
        eprintln!("skipping: orchestrator binary unavailable");
        return;
    };
    let workspace = simple_workspace();

    let set_output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "set",
            "always_pass",
            "flaky",
        ],
    )
    .expect("run orchestrator status set");
    assert!(set_output.status.success());

    let remove_output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "remove",
            "always_pass",
        ],
    )
    .expect("run orchestrator status remove");
    assert!(remove_output.status.success());

    let show_output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "show",
            "--format",
            "json",
        ],
    )
    .expect("run orchestrator status show");
    let report: serde_json::Value =
        serde_json::from_slice(&show_output.stdout).expect("status report is valid json");
    for state in ["new", "burning_in", "stable", "flaky", "disabled"] {
        let names = report[state].as_array().expect("state array");
        assert!(
            !names.iter().any(|v| v == "always_pass"),
            "removed test must not reappear under {state}"
        );
    }
}

#[test]
fn history_on_unknown_test_fails_with_nonzero_exit() {
    let Some(binary) = cli_binary() else {
        eprintln!("skipping: orchestrator binary unavailable");
        return;
    };
    let workspace = simple_workspace();

    let output = run_cli(
        &binary,
        &[
            "--status-file",
            workspace.status_path.to_str().expect("utf8 path"),
            "status",
            "history",
            "never_seen",
        ],
    )
    .expect("run orchestrator status history");

    assert!(!output.status.success());
}
