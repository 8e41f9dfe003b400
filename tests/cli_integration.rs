//! Integration tests for the command line.

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn gateway() -> Command {
    let mut cmd = Command::new(cargo_bin("birda-gateway"));
    cmd.env_remove("BIRDA_CONFIG");
    cmd
}

#[test]
fn test_help_lists_options() {
    gateway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--backend-url"))
        .stdout(predicate::str::contains("--max-upload-bytes"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_path_honors_explicit_file() {
    gateway()
        .args(["config", "path", "--config", "/tmp/birda-gateway-test/config.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/birda-gateway-test/config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.toml");

    gateway()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    gateway()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[server]"))
        .stdout(predicate::str::contains("port = 5000"));
}

#[test]
fn test_invalid_confidence_rejected() {
    gateway()
        .args(["--min-confidence", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence must be between"));
}

#[test]
fn test_missing_explicit_config_fails() {
    gateway()
        .args(["--config", "/nonexistent/birda-gateway.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_invalid_backend_url_fails_validation() {
    gateway()
        .args(["--backend-url", "ftp://example.com", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_config_path_from_environment() {
    gateway()
        .env("BIRDA_CONFIG", "/tmp/birda-gateway-env/config.toml")
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/birda-gateway-env/config.toml"));
}

#[test]
fn test_invalid_confidence_from_environment_rejected() {
    gateway()
        .env("BIRDA_MIN_CONFIDENCE", "2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence must be between"));
}
