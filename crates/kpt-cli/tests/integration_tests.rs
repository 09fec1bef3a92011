//! End-to-end smoke tests driving the `kpt` binary directly, grounded on the
//! donor's `Command::new(env!("CARGO_BIN_EXE_..."))` harness pattern.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn kpt(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kpt"))
        .args(args)
        .output()
        .expect("failed to execute kpt")
}

fn minimal_package() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Kptfile"),
        "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: demo\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("deployment.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
    )
    .unwrap();
    dir
}

#[test]
fn render_prints_flattened_resources() {
    let pkg = minimal_package();
    let output = kpt(&["render", pkg.path().to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kind: Deployment"));
}

#[test]
fn render_write_updates_the_package_in_place() {
    let pkg = minimal_package();
    let output = kpt(&["render", "--write", pkg.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let on_disk = fs::read_to_string(pkg.path().join("deployment.yaml")).unwrap();
    assert!(on_disk.contains("kind: Deployment"));
}

#[test]
fn render_on_missing_package_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let output = kpt(&["render", dir.path().join("missing").to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn cache_list_seeds_and_publishes_a_revision() {
    let pkg = minimal_package();
    let output = kpt(&[
        "cache-list",
        pkg.path().to_str().unwrap(),
        "--package-path",
        "demo",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lifecycle=Published"));
    assert!(stdout.contains("latest:"));
}
