//! Smoke tests for the bread-probe CLI
//!
//! None of these reach a browser: every run case fails before launch.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn bread_probe() -> Command {
    let mut cmd = Command::cargo_bin("bread-probe").expect("bread-probe binary should exist");
    cmd.env_remove("BREAD_BASE_URL")
        .env_remove("BREAD_HEADED")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    bread_probe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    bread_probe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_fails() {
    bread_probe().assert().failure();
}

#[test]
fn test_run_help_mentions_base_url() {
    bread_probe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--creation-mode"));
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_prints_every_scenario() {
    bread_probe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("crud"))
        .stdout(predicate::str::contains("negative"))
        .stdout(predicate::str::contains("registration"));
}

// ============================================================================
// Run: failures before launch
// ============================================================================

#[test]
fn test_run_filter_matching_nothing_fails() {
    bread_probe()
        .args(["run", "--filter", "checkout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scenario matches"));
}

#[test]
fn test_run_rejects_non_http_base_url() {
    bread_probe()
        .args(["run", "--base-url", "ftp://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_rejects_zero_jobs() {
    bread_probe()
        .args(["run", "--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jobs must be at least 1"));
}

#[test]
fn test_run_rejects_malformed_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bread.yaml");
    fs::write(&path, "base_url: [not, a, string\n").unwrap();

    bread_probe()
        .args(["run", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_rejects_unknown_invalid_inputs_policy() {
    bread_probe()
        .args(["run", "--invalid-inputs", "lenient"])
        .assert()
        .failure();
}

#[test]
fn test_env_base_url_is_validated() {
    bread_probe()
        .env("BREAD_BASE_URL", "localhost:8000")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("http://"));
}
