//! End-to-end tests for the rulec binary.

use std::path::Path;
use std::process::{Command, Output};

fn rulec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rulec"))
        .args(args)
        .output()
        .expect("failed to run rulec")
}

fn write_source(dir: &Path, contents: &str) -> String {
    let path = dir.join("rules.txt");
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

// ==================== Success ====================

#[test]
fn test_compile_prints_pretty_json() {
    // GIVEN
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "cap web id 1 accept dport 443; ;\ndrop;\n");

    // WHEN
    let output = rulec(&[&path]);

    // THEN
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\n  \"rules\": ["), "stdout: {}", stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["rules"][0]["type"], "ACTION_DROP");
    assert_eq!(value["caps"][0]["name"], "web");
    assert_eq!(value["caps"][0]["rules"][0]["type"], "MATCH_IP_DEST_PORT_RANGE");
}

#[test]
fn test_compact_output_is_one_line() {
    // GIVEN
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "accept ipsrc 10.0.0.0/8;");

    // WHEN
    let output = rulec(&["--compact", &path]);

    // THEN
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end().lines().count(), 1);
    assert!(stdout.contains("\"ip\":\"10.0.0.0/8\""), "stdout: {}", stdout);
}

// ==================== Failure ====================

#[test]
fn test_compile_error_reports_position() {
    // GIVEN
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "accept;\ncap c1 id 1 accept; cap c1 id 2 drop;\n");

    // WHEN
    let output = rulec(&[&path]);

    // THEN
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.starts_with("2 25: Multiple definition of capability name 'c1'"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_missing_file_fails() {
    // GIVEN
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");

    // WHEN
    let output = rulec(&[path.to_str().unwrap()]);

    // THEN
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"), "stderr: {}", stderr);
}
