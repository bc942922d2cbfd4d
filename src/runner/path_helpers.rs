//! Path resolution helpers for the runner module.
//!
//! Centralises model and output path logic so the main runner module stays
//! focused on command dispatch.

use crate::cli::Cli;
use anyhow::{Result, anyhow};
use camino::Utf8PathBuf;
use std::borrow::Cow;
use std::path::Path;

use super::RunnerError;

/// Determine the model path respecting the CLI's directory option.
///
/// # Errors
/// Returns an error when the CLI `file` or `directory` paths are not valid
/// UTF-8, or when the path names no file.
pub(super) fn resolve_model_path(cli: &Cli) -> Result<Utf8PathBuf> {
    let file = Utf8PathBuf::from_path_buf(cli.file.clone())
        .map_err(|path| anyhow!("model path {} is not valid UTF-8", path.display()))?;
    let resolved = if let Some(dir) = &cli.directory {
        let base = Utf8PathBuf::from_path_buf(dir.clone())
            .map_err(|path| anyhow!("directory {} is not valid UTF-8", path.display()))?;
        base.join(&file)
    } else {
        file
    };
    if resolved.file_name().is_none() {
        return Err(anyhow!("model path '{resolved}' has no file name"));
    }
    Ok(resolved)
}

/// Resolve an output path relative to the CLI working directory.
///
/// `-C/--directory` behaves like a working directory change for any
/// filesystem path supplied on the command line. When `path` is relative and
/// a directory has been configured, the returned path is `directory/path`.
#[must_use]
pub(super) fn resolve_output_path<'a>(cli: &Cli, path: &'a Path) -> Cow<'a, Path> {
    if path.is_relative() {
        cli.directory
            .as_ref()
            .map_or_else(|| Cow::Borrowed(path), |dir| Cow::Owned(dir.join(path)))
    } else {
        Cow::Borrowed(path)
    }
}

pub(super) fn ensure_model_exists(model_path: &Utf8PathBuf) -> Result<()> {
    if model_path.as_std_path().exists() {
        return Ok(());
    }
    Err(RunnerError::ModelNotFound {
        path: model_path.to_path_buf().into_std_path_buf(),
    }
    .into())
}
