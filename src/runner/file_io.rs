//! File creation helpers for the runner.
//! Writes the build file and the command scripts through capability-based
//! directories.

use crate::bff_gen::BuildFileContent;
use crate::ir::BuildGraph;
use anyhow::{Context, Result as AnyResult, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs};
use std::io;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Return `true` when `path` is the CLI sentinel indicating "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn write_text_utf8(dir: &cap_fs::Dir, path: &Utf8Path, text: &str) -> AnyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent.as_str())
            .with_context(|| format!("failed to create parent directory {parent}"))?;
    }
    let mut file = dir
        .create(path.as_str())
        .with_context(|| format!("failed to create {path}"))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("failed to write {path}"))?;
    file.flush()
        .with_context(|| format!("failed to flush {path}"))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {path}"))?;
    Ok(())
}

fn derive_dir_and_relative(path: &Utf8Path) -> AnyResult<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())
            .context("failed to open the current directory")?;
        return Ok((dir, path.to_owned()));
    }

    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate.as_str(), ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .context("failed to derive a path relative to its ancestor")?
        .to_owned();
    Ok((dir, relative))
}

fn write_text(path: &Utf8Path, text: &str) -> AnyResult<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_text_utf8(&dir, &relative, text)
}

/// Write the generated build file to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error when `path` is not UTF-8 or any filesystem step fails.
pub fn write_build_file(path: &Path, content: &BuildFileContent) -> AnyResult<()> {
    let utf8_path = Utf8Path::from_path(path)
        .ok_or_else(|| anyhow!("output path {} is not valid UTF-8", path.display()))?;
    write_text(utf8_path, content.as_str())?;
    info!("Wrote build file to {utf8_path}");
    Ok(())
}

/// Write the shell script behind every command step of `graph`.
///
/// Relative script paths are placed under `build_root`, which is the
/// model's build directory resolved against the CLI working directory.
///
/// # Errors
///
/// Returns an error when a script cannot be written.
pub fn write_scripts(build_root: &Utf8Path, graph: &BuildGraph) -> AnyResult<usize> {
    let mut written = 0;
    for step in graph.units.iter().flat_map(|unit| unit.all_commands()) {
        let Some(script) = &step.script else {
            continue;
        };
        let path = build_root.join(&script.path);
        write_text(&path, &script.contents())?;
        debug!(step = %step.name, "wrote script {path}");
        written += 1;
    }
    Ok(written)
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Write `text` to stdout, treating a closed pipe as success.
///
/// # Errors
///
/// Returns an error for any write failure other than a broken pipe.
pub fn write_stdout(text: &str) -> AnyResult<()> {
    let mut stdout = io::stdout().lock();
    write_all_ignoring_broken_pipe(&mut stdout, text.as_bytes())
        .context("failed to write to stdout")?;
    flush_ignoring_broken_pipe(&mut stdout).context("failed to flush stdout")?;
    Ok(())
}
