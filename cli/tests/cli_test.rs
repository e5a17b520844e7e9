//! End-to-end tests for the `mothball` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, project: &Path, archive: &Path) -> std::path::PathBuf {
    let config_path = dir.join("mothball.yaml");
    let yaml = format!(
        concat!(
            "mothball config version: 1\n",
            "archive root path: \"{}\"\n",
            "source root path: \"{}\"\n",
            "include paths: \"/src/*\"\n",
            "exclude paths:\n",
            "include file endings: \"*.kt\"\n",
            "block comments to remove: \"/*...*/\"\n",
            "block comments to keep: \"/*!...*/\"\n",
            "line comments to remove: \"//\"\n",
            "line comments to keep: \"//!\"\n",
        ),
        archive.display(),
        project.display()
    );
    fs::write(&config_path, yaml).unwrap();
    config_path
}

#[test]
fn no_arguments_prints_banner_and_help() -> Result<()> {
    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Mothball - Commented Out Code Archiver. Version 0.1.0",
        ))
        .stdout(predicate::str::contains("Usage:"));
    Ok(())
}

#[test]
fn missing_config_parameter_fails_with_a_message() -> Result<()> {
    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["-a", "p"]).assert().failure().stderr(
        predicate::str::contains("Missing config file path parameter '-c'"),
    );
    Ok(())
}

#[test]
fn config_file_must_be_yaml() -> Result<()> {
    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["-a", "p", "-c", "config.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Config filename must have one of these endings: .yaml, .yml",
        ));
    Ok(())
}

#[test]
fn sample_config_action_writes_the_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sample.yaml");

    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["-a", "c", "-o"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Written sample config file to"));

    let text = fs::read_to_string(&path)?;
    assert!(text.starts_with("mothball config version: 1"));
    Ok(())
}

#[test]
fn preview_run_reports_occurrences() -> Result<()> {
    let dir = TempDir::new()?;
    let project = dir.path().join("project");
    let archive = dir.path().join("archive");
    fs::create_dir_all(project.join("src"))?;
    fs::write(project.join("src/Main.kt"), "x = 1\n// dead()\ny = 2\n")?;
    let config_path = write_config(dir.path(), &project, &archive);

    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["-a", "p", "-c"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Occurrences found: 1"))
        .stdout(predicate::str::contains("src/Main.kt:2-2>"))
        .stdout(predicate::str::contains("processing complete."));

    // previewing leaves the file untouched
    assert_eq!(
        fs::read_to_string(project.join("src/Main.kt"))?,
        "x = 1\n// dead()\ny = 2\n"
    );
    Ok(())
}

#[test]
fn archive_run_with_no_confirm_rewrites_sources() -> Result<()> {
    let dir = TempDir::new()?;
    let project = dir.path().join("project");
    let archive = dir.path().join("archive");
    fs::create_dir_all(project.join("src"))?;
    fs::write(project.join("src/Main.kt"), "x = 1\n// dead()\ny = 2\n")?;
    let config_path = write_config(dir.path(), &project, &archive);

    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["-a", "a", "-c"])
        .arg(&config_path)
        .arg("--no-confirm")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "INFO: src/Main.kt:1 comment removed",
        ));

    assert_eq!(
        fs::read_to_string(project.join("src/Main.kt"))?,
        "x = 1\ny = 2\n"
    );
    assert!(archive.join("operation-index").exists());
    Ok(())
}

#[test]
fn completion_subcommand_prints_a_script() -> Result<()> {
    let mut cmd = Command::cargo_bin("mothball")?;
    cmd.args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mothball"))
        .stdout(predicate::str::contains("Commented Out Code Archiver").not());
    Ok(())
}
