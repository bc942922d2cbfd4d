//! Integration tests for CLI execution using `assert_cmd`.
//!
//! These tests invoke the compiled binary against models written into
//! temporary directories and check the files and streams it produces.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use test_support::bffgen::run_bffgen_in;
use test_support::model::{build_dir_in, model_yaml, write_model};

const TARGETS: &str = concat!(
    "targets:\n",
    "  - name: gen\n",
    "    kind: utility\n",
    "    custom_commands:\n",
    "      - outputs: out.txt\n",
    "        commands:\n",
    "          - [echo, hello]\n",
    "  - name: docs\n",
    "    kind: utility\n",
    "    depends: gen\n",
);

fn write_fixture(dir: &Path, targets: &str) -> Result<String> {
    let build_dir = build_dir_in(dir)?;
    write_model(dir, &model_yaml(&build_dir, targets))?;
    Ok(build_dir)
}

#[test]
fn generate_writes_build_file_and_scripts() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let build_dir = write_fixture(temp.path(), TARGETS)?;

    let run = run_bffgen_in(temp.path(), &["generate"])?;
    ensure!(run.success, "generate failed: {}", run.stderr);

    let bff = fs::read_to_string(temp.path().join("fbuild.bff")).context("read fbuild.bff")?;
    ensure!(
        bff.starts_with(bffgen::bff_gen::DISCLAIMER),
        "unexpected header: {bff}"
    );
    ensure!(bff.contains("// Target definition: docs"), "missing docs: {bff}");

    let scripts = Path::new(&build_dir).join(".bffgen");
    let count = fs::read_dir(&scripts)
        .with_context(|| format!("list {}", scripts.display()))?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sh"))
        .count();
    ensure!(count == 1, "expected one script, found {count}");
    Ok(())
}

#[test]
fn generate_streams_to_stdout_when_dash() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    write_fixture(temp.path(), TARGETS)?;

    let run = run_bffgen_in(temp.path(), &["generate", "-"])?;
    ensure!(run.success, "generate - failed: {}", run.stderr);
    ensure!(
        run.stdout.contains("Alias('all')"),
        "stdout should hold the build file: {}",
        run.stdout
    );
    ensure!(
        !temp.path().join("-").exists(),
        "generate - should not create a file named '-'"
    );
    Ok(())
}

#[test]
fn order_lists_units() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    write_fixture(temp.path(), TARGETS)?;

    let run = run_bffgen_in(temp.path(), &["order"])?;
    ensure!(run.success, "order failed: {}", run.stderr);
    let lines: Vec<&str> = run.stdout.lines().collect();
    ensure!(lines == ["noop", "gen", "docs", "all"], "got {lines:?}");
    ensure!(
        !temp.path().join("fbuild.bff").exists(),
        "order must not write the build file"
    );
    Ok(())
}

#[test]
fn directory_flag_relocates_model_and_output() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let project = temp.path().join("project");
    fs::create_dir(&project).context("create project dir")?;
    write_fixture(&project, TARGETS)?;

    let mut cmd = Command::cargo_bin("bffgen").context("locate bffgen binary")?;
    cmd.current_dir(temp.path())
        .env_remove(bff_env::CONFIG_PATH_ENV)
        .arg("-C")
        .arg("project")
        .arg("generate")
        .arg("out/fbuild.bff")
        .assert()
        .success();
    ensure!(
        project.join("out").join("fbuild.bff").exists(),
        "output should land under the -C directory"
    );
    Ok(())
}

#[test]
fn check_reports_warnings() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    write_fixture(temp.path(), "targets:\n  - name: app\n    kind: utility\n    depends: ghost\n")?;

    let run = run_bffgen_in(temp.path(), &["check"])?;
    ensure!(run.success, "check failed: {}", run.stderr);
    ensure!(
        run.stdout.contains("unknown target 'ghost'"),
        "stdout: {}",
        run.stdout
    );
    ensure!(run.stdout.contains("1 warning(s)"), "stdout: {}", run.stdout);
    Ok(())
}

#[test]
fn deny_warnings_fails_without_writing() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    write_fixture(temp.path(), "targets:\n  - name: app\n    kind: utility\n    depends: ghost\n")?;

    let run = run_bffgen_in(temp.path(), &["--deny-warnings", "generate"])?;
    ensure!(!run.success, "generate should fail under --deny-warnings");
    ensure!(
        run.stderr.contains("warnings are denied"),
        "stderr: {}",
        run.stderr
    );
    ensure!(
        !temp.path().join("fbuild.bff").exists(),
        "no build file should be written"
    );
    Ok(())
}

#[test]
fn missing_model_is_an_error() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let mut cmd = Command::cargo_bin("bffgen").context("locate bffgen binary")?;
    cmd.current_dir(temp.path())
        .env_remove(bff_env::CONFIG_PATH_ENV)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}
