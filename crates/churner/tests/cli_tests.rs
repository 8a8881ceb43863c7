//! CLI integration tests
//!
//! Only startup validation is exercised here; none of these reach the
//! Docker daemon.

use std::process::Command;

fn churner() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_container-churner"));
    for var in ["CHURN_IMAGE", "CHURN_RATIO", "CHURN_FREQ"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help() {
    let output = churner().arg("--help").output().expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("--image"), "Should show image flag");
    assert!(stdout.contains("--freq"), "Should show freq flag");
    assert!(stdout.contains("--ratio"), "Should show ratio flag");
}

#[test]
fn test_cli_version() {
    let output = churner()
        .arg("--version")
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("container-churner"), "Should show binary name");
}

#[test]
fn test_missing_image_prints_usage_and_fails() {
    let output = churner().output().expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("Usage"), "Should print usage");
}

#[test]
fn test_malformed_ratio_fails_before_start() {
    let output = churner()
        .args(["--image", "app:v1", "--ratio", "1:2:3"])
        .output()
        .expect("Failed to execute command");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("ratio"), "Should mention the ratio: {}", stderr);
}

#[test]
fn test_malformed_frequency_fails_before_start() {
    let output = churner()
        .args(["--image", "app:v1", "--freq", "soon"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
