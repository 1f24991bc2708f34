//! Smoke tests to verify command module wiring

use assert_cmd::Command;
use predicates::prelude::*;

/// Command with a scrubbed environment so host configuration (env vars,
/// `.env` files, `~/.replctl`) can't leak into the test.
fn scrubbed(tmp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("replctl").unwrap();
    cmd.env_clear()
        .env("HOME", tmp.path())
        .current_dir(tmp.path());
    cmd
}

// === Help wiring ===

#[test]
fn test_verify_help() {
    let mut cmd = Command::cargo_bin("replctl").unwrap();
    cmd.arg("verify").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Seconds to wait for replication"));
}

#[test]
fn test_dump_help() {
    let mut cmd = Command::cargo_bin("replctl").unwrap();
    cmd.arg("dump").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Probe table name"));
}

#[test]
fn test_check_help() {
    let mut cmd = Command::cargo_bin("replctl").unwrap();
    cmd.arg("check").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("round-trip"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = Command::cargo_bin("replctl").unwrap();
    cmd.arg("completions").arg("bash");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("replctl"));
}

// === Missing configuration is named, field by field ===

#[test]
fn test_verify_names_missing_settings_for_both_endpoints() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cmd = scrubbed(&tmp);
    cmd.arg("verify");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("PRIMARY_SERVER"))
        .stderr(predicate::str::contains("PRIMARY_PASSWORD"))
        .stderr(predicate::str::contains("REPLICA_SERVER"))
        .stderr(predicate::str::contains("REPLICA_DRIVER"));
}

#[test]
fn test_check_reports_missing_settings_per_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cmd = scrubbed(&tmp);
    cmd.arg("check");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Testing connection to primary"))
        .stdout(predicate::str::contains("Testing connection to replica"))
        .stdout(predicate::str::contains("PRIMARY_SERVER"))
        .stdout(predicate::str::contains("REPLICA_SERVER"));
}

#[test]
fn test_dump_rejects_bad_table_name() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cmd = scrubbed(&tmp);
    cmd.arg("dump").arg("--table").arg("x; drop table y");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid table name"));
}
