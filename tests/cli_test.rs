//! Integration tests for the stagehand binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(manifest: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".stagehand");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("product.yml"), manifest).unwrap();
    temp
}

fn stagehand(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.current_dir(temp.path())
        .arg("--no-color")
        .env_remove("RUST_LOG");
    cmd
}

const SIMPLE_MANIFEST: &str = r#"
product: demo
configure:
  - name: hello
    description: Say hello
    command: echo hello > hello.txt
    required: true
    estimated_seconds: 3
  - name: upgrade-db
    description: Upgrade database
    command: "true"
    workflows: [upgrade]
remove:
  - name: cleanup
    description: Clean up
    actions:
      - description: Delete files
        command: rm -f hello.txt
        required: true
"#;

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Step orchestration"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_configure_dry_run_touches_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);
    let mut cmd = stagehand(&temp);
    cmd.args(["configure", "--dry-run"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dry-run"));

    assert!(!temp.path().join("hello.txt").exists());
    assert!(!temp.path().join(".stagehand/settings.yml").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_configure_then_remove() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);

    stagehand(&temp).arg("configure").assert().success();
    assert!(temp.path().join("hello.txt").exists());

    stagehand(&temp).arg("remove").assert().success();
    assert!(!temp.path().join("hello.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_no_subcommand_runs_configure() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);

    stagehand(&temp).assert().success();
    assert!(temp.path().join("hello.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_required_failure_exits_with_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
product: demo
configure:
  - name: broken
    description: Broken step
    command: exit 3
    required: true
  - name: after
    command: touch after.txt
"#,
    );

    stagehand(&temp).arg("configure").assert().code(1);
    assert!(!temp.path().join("after.txt").exists());
    Ok(())
}

#[test]
fn cli_missing_manifest_exits_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.current_dir(temp.path()).args(["--project", "."]).arg("list");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("No manifest found"));
    Ok(())
}

#[test]
fn cli_config_flag_overrides_manifest_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let manifest = temp.path().join("elsewhere.yml");
    fs::write(&manifest, "product: other\n")?;

    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.current_dir(temp.path())
        .arg("--config")
        .arg(&manifest)
        .args(["list", "--json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"product\": \"other\""));
    Ok(())
}

#[test]
fn cli_list_json_is_machine_readable() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);
    let output = stagehand(&temp).args(["list", "--json"]).output()?;
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listing["product"], "demo");
    assert_eq!(listing["kind"], "shell");
    assert_eq!(listing["configure"][0]["name"], "hello");
    assert_eq!(listing["configure"][1]["workflows"], "upgrade");
    assert_eq!(listing["remove"][0]["actions"][0]["required"], true);
    Ok(())
}

#[test]
fn cli_list_shows_both_plans() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);
    let output = stagehand(&temp).arg("list").output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    insta::assert_snapshot!(stdout.trim_end(), @r"
    demo (shell)

    Configure steps:
      hello: Say hello [required, ~3s]
      upgrade-db: Upgrade database [upgrade]

    Remove steps:
      cleanup: Clean up
        - Delete files [required]
    ");
    Ok(())
}

#[test]
fn cli_settings_saves_assignments() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);
    let mut cmd = stagehand(&temp);
    cmd.args(["settings", "PORT=9000"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Saved PORT"));

    let saved = fs::read_to_string(temp.path().join(".stagehand/settings.yml"))?;
    assert!(saved.contains("9000"));
    Ok(())
}

#[test]
fn cli_settings_rejects_unknown_keyword() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_MANIFEST);
    let mut cmd = stagehand(&temp);
    cmd.args(["settings", "COLOR=blue"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown setting: COLOR"));
    Ok(())
}

#[test]
fn cli_completions_bash() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.args(["completions", "bash"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("stagehand"));
    Ok(())
}
