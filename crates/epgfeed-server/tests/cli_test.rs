#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use assert_cmd::cargo_bin_cmd;
use predicates::prelude::predicate;

#[test]
fn test_help_lists_subcommands() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("epgfeed");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_serve_help() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("epgfeed");
    cmd.args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dir"));
}

#[test]
fn test_generate_help() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("epgfeed");
    cmd.args(["generate", "--help"]).assert().success();
}

#[test]
fn test_missing_subcommand_fails() {
    // Arrange & Act & Assert
    let mut cmd = cargo_bin_cmd!("epgfeed");
    cmd.assert().failure();
}

#[test]
fn test_broken_config_fails_fast() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[server\nbind = ").unwrap();

    // Act & Assert
    let mut cmd = cargo_bin_cmd!("epgfeed");
    cmd.args(["--dir"])
        .arg(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}
