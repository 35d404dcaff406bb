//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::{Command, Output};

fn run_mocktape(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_mocktape");
    Command::new(bin)
        .args(args)
        .env_remove("MOCKTAPE_LOG_LEVEL")
        .env_remove("MOCKTAPE_PATH")
        .output()
        .expect("failed to run mocktape binary")
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn compare_ignores_noise_paths() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.json", r#"{"id":7,"createdAt":"2024-01-01T00:00:00Z"}"#);
    let b = write(dir.path(), "b.json", r#"{"id":7,"createdAt":"2024-02-02T00:00:00Z"}"#);

    let output = run_mocktape(&["compare", &a, &b, "--noise", "createdAt"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("PASSED"));

    let output = run_mocktape(&["compare", &a, &b]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAILED"));
}

#[test]
fn compare_reports_type_mismatch_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.json", "{}");
    let b = write(dir.path(), "b.json", "[]");
    let output = run_mocktape(&["compare", &a, &b]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn sets_on_empty_root() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_mocktape(&["sets", "--path", dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No test sets found"));
}

#[test]
fn inspect_skips_unsupported_kinds() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "test-set-0/mocks.yaml",
        "---
version: api.keploy.io/v1beta1
kind: Generic
name: mock-0
spec:
  metadata: {}
  requests: []
  responses: []
  created: 0
---
version: api.keploy.io/v1beta1
kind: Kafka
name: mock-1
spec: {}
",
    );
    let output = run_mocktape(&["inspect", "test-set-0", "--path", dir.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("test-set-0: 1 mocks, 0 test cases"));
    assert!(stdout.contains("mock-0"));
    assert!(!stdout.contains("mock-1"));
}

#[test]
fn invalid_log_level_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_mocktape"))
        .args(["sets", "--path", dir.path().to_str().unwrap()])
        .env("MOCKTAPE_LOG_LEVEL", "loud")
        .output()
        .expect("failed to run mocktape binary");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid configuration"));
}

#[test]
fn help_lists_subcommands() {
    let output = run_mocktape(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("compare"));
}
