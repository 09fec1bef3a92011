//! Error-path smoke tests: each exit code class (spec.md §6) reached through
//! the `kpt` binary at least once.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn kpt_output(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_kpt"))
        .args(args)
        .output()
        .expect("failed to execute kpt");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn malformed_kptfile_is_a_validation_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Kptfile"), "not: [valid, yaml:").unwrap();

    let (_stdout, stderr, code) = kpt_output(&["render", dir.path().to_str().unwrap()]);
    assert_eq!(code, 1, "stderr: {stderr}");
}

#[test]
fn exec_function_without_allow_exec_is_capability_denied() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Kptfile"),
        "apiVersion: kpt.dev/v1\n\
kind: Kptfile\n\
metadata:\n  name: demo\n\
pipeline:\n  mutators:\n    - exec: ./local-fn\n",
    )
    .unwrap();

    let (_stdout, stderr, code) = kpt_output(&["render", dir.path().to_str().unwrap()]);
    assert_eq!(code, 1, "stderr: {stderr}");
    assert!(stderr.contains("allow-exec") || stderr.contains("capability"));
}

#[test]
fn render_of_a_package_with_only_a_manifest_still_succeeds() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Kptfile"),
        "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: empty\n",
    )
    .unwrap();

    let (stdout, stderr, code) = kpt_output(&["render", dir.path().to_str().unwrap()]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("kind: Kptfile"));
}
