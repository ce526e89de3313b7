//! Integration tests for the `holebridge` binary.
//!
//! Argument parsing, help output and configuration errors, all without
//! a broker or a Pi-hole installation.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command with env isolation: no broker variables, no user
/// config, and an environment file that does not exist.
fn holebridge_cmd(dir: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("holebridge");
    cmd.env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("MQTT_SERVER")
        .env_remove("MQTT_PORT")
        .env_remove("MQTT_USER")
        .env_remove("MQTT_PASSWORD")
        .env_remove("HOLEBRIDGE_MQTT__HOST")
        .env_remove("HOLEBRIDGE_POLL_INTERVAL_SECS")
        .arg("--env-file")
        .arg(dir.path().join("environment"));
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = cargo_bin_cmd!("holebridge").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_subcommands() {
    cargo_bin_cmd!("holebridge")
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("run")
                .and(predicate::str::contains("inspect"))
                .and(predicate::str::contains("--env-file")),
        );
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("holebridge")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    cargo_bin_cmd!("holebridge")
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_run_help_shows_interval() {
    cargo_bin_cmd!("holebridge")
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--interval"));
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_run_without_broker_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    holebridge_cmd(&dir)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mqtt.host"));
}

#[test]
fn test_zero_interval_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("environment"), "MQTT_SERVER=broker.invalid\n").unwrap();
    holebridge_cmd(&dir)
        .args(["run", "--interval", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("poll_interval_secs"));
}

#[test]
fn test_missing_config_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    holebridge_cmd(&dir)
        .arg("--config")
        .arg(&missing)
        .arg("run")
        .assert()
        .code(2);
}

#[test]
fn test_malformed_port_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("environment"),
        "MQTT_SERVER=broker.invalid\nMQTT_PORT=not-a-port\n",
    )
    .unwrap();
    holebridge_cmd(&dir).arg("run").assert().code(2);
}
