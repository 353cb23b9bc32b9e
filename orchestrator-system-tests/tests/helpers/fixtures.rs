// orchestrator-system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Manifest/Script Fixtures
// Description: Builds a throwaway manifest plus pass/fail test scripts.
// Purpose: Give every system-test suite a cheap, self-contained workspace.
// Dependencies: std::fs, tempfile, serde_json
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

/// A disposable workspace holding a manifest, a status file path, and the
/// test-script executables the manifest points at.
pub struct Workspace {
    pub dir: TempDir,
    pub manifest_path: PathBuf,
    pub status_path: PathBuf,
}

impl Workspace {
    /// Path to a file relative to the workspace root.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn write_script(path: &Path, exit_code: i32) {
    fs::write(path, format!("#!/bin/sh\nexit {exit_code}\n")).expect("write fixture script");
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("set script permissions");
}

/// Builds a workspace with three tests: `always_pass` and `always_fail` have
/// no dependencies; `depends_on_pass` depends on `always_pass`.
pub fn simple_workspace() -> Workspace {
    let dir = TempDir::new().expect("create workspace tempdir");

    let pass_script = dir.path().join("pass.sh");
    let fail_script = dir.path().join("fail.sh");
    write_script(&pass_script, 0);
    write_script(&fail_script, 1);

    let mut tests = BTreeMap::new();
    tests.insert(
        "always_pass".to_string(),
        json!({
            "assertion": "always exits zero",
            "executable": pass_script.display().to_string(),
        }),
    );
    tests.insert(
        "always_fail".to_string(),
        json!({
            "assertion": "always exits non-zero",
            "executable": fail_script.display().to_string(),
        }),
    );
    tests.insert(
        "depends_on_pass".to_string(),
        json!({
            "assertion": "runs only once its dependency has passed",
            "executable": pass_script.display().to_string(),
            "depends_on": ["always_pass"],
        }),
    );

    let manifest = json!({
        "test_set": { "name": "fixture" },
        "test_set_tests": tests,
    });

    let manifest_path = dir.path().join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest).expect("serialize manifest"))
        .expect("write manifest");

    let status_path = dir.path().join("status.json");

    Workspace {
        dir,
        manifest_path,
        status_path,
    }
}
