use assert_cmd::Command;
use predicates::prelude::*;

fn cladetime_cmd() -> Command {
    let mut cmd = Command::cargo_bin("cladetime").unwrap();
    cmd.env_remove("CLADETIME_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help_command() {
    cladetime_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nextstrain"))
        .stdout(predicate::str::contains("urls"))
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("assign"));
}

#[test]
fn test_cli_version_command() {
    cladetime_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cladetime"));
}

#[test]
fn test_assign_help_lists_window() {
    cladetime_cmd()
        .args(["assign", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--collection-min-date"))
        .stdout(predicate::str::contains("--state-format"));
}

#[test]
fn test_invalid_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("cladetime.toml");
    std::fs::write(&config, "[nextstrain\nbucket = ").unwrap();

    cladetime_cmd()
        .arg("--config")
        .arg(&config)
        .arg("urls")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_missing_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    cladetime_cmd()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("urls")
        .assert()
        .code(3);
}

#[test]
fn test_empty_collection_window() {
    cladetime_cmd()
        .args([
            "assign",
            "--collection-min-date",
            "2024-06-01",
            "--collection-max-date",
            "2024-05-01",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("collection window is empty"));
}

#[test]
fn test_unknown_state_format() {
    cladetime_cmd()
        .args(["assign", "--state-format", "zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown state format"));
}
