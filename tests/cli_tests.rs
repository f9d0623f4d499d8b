//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the jobhub-executor binary
fn executor_cmd() -> Command {
    Command::cargo_bin("jobhub-executor").unwrap()
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    executor_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("JobHub Executor"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    executor_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobhub-executor"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Git Hash"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    executor_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobhub-executor"));
}

#[test]
fn test_unknown_command_fails() {
    executor_cmd()
        .arg("bogus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_help() {
    executor_cmd()
        .arg("config")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_config_show_defaults() {
    // With no config file on the search path inside an empty temp dir,
    // show renders the built-in defaults.
    let temp_dir = tempfile::TempDir::new().unwrap();

    executor_cmd()
        .current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path())
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("[executor]"))
        .stdout(predicate::str::contains("[center]"))
        .stdout(predicate::str::contains("bind_port = 9999"));
}

#[test]
fn test_run_with_missing_config_fails() {
    executor_cmd()
        .arg("run")
        .arg("--config")
        .arg("/nonexistent/executor.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}
