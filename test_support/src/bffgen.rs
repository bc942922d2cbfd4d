//! Helpers for invoking the built `bffgen` binary in tests.
//!
//! The binary runs in a controlled working directory with every
//! `BFFGEN_*` configuration variable cleared.

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::path::Path;

/// Captured output from a `bffgen` invocation.
#[derive(Debug)]
pub struct BffgenRun {
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
}

/// Run `bffgen` in `current_dir` with the supplied args.
///
/// # Errors
///
/// Returns an error when `bffgen` cannot be located or the process cannot be
/// spawned.
pub fn run_bffgen_in(current_dir: &Path, args: &[&str]) -> Result<BffgenRun> {
    let mut cmd = Command::cargo_bin("bffgen").context("locate bffgen binary")?;
    cmd.current_dir(current_dir)
        .env_remove(bff_env::CONFIG_PATH_ENV)
        .env_remove("BFFGEN_CACHE_PATH")
        .env_remove("BFFGEN_ENVIRONMENT")
        .env_remove("BFFGEN_DENY_WARNINGS")
        .env_remove("BFFGEN_FILE")
        .env("HOME", current_dir)
        .env("XDG_CONFIG_HOME", current_dir.join(".config"));
    let output = cmd.args(args).output().context("run bffgen command")?;
    Ok(BffgenRun {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}
