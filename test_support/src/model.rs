//! Helpers for constructing target model fixtures in tests.

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use std::path::Path;

/// Prefix `body` with the model version header and `build_dir`.
#[must_use]
pub fn model_yaml(build_dir: &str, body: &str) -> String {
    format!("model_version: 1.0.0\nbuild_dir: {build_dir}\n{body}")
}

/// Write `yaml` as the default model file inside `dir`.
///
/// # Errors
///
/// Returns an error when the file cannot be written or `dir` is not UTF-8.
pub fn write_model(dir: &Path, yaml: &str) -> Result<Utf8PathBuf> {
    let path = Utf8PathBuf::from_path_buf(dir.join(bff_env::DEFAULT_MODEL_FILE))
        .map_err(|path| anyhow!("non UTF-8 model path {}", path.display()))?;
    std::fs::write(&path, yaml).with_context(|| format!("write model {path}"))?;
    Ok(path)
}

/// Build directory path under `dir` as a UTF-8 string.
///
/// # Errors
///
/// Returns an error when `dir` is not UTF-8.
pub fn build_dir_in(dir: &Path) -> Result<String> {
    let build = dir.join("build");
    build
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("non UTF-8 build dir {}", build.display()))
}
