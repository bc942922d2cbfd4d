//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the target model, lowers it and hands the graph to the requested
//! command.

mod error;
mod file_io;
mod path_helpers;

pub use error::RunnerError;
pub use file_io::{is_stdout_path, write_build_file, write_scripts, write_stdout};

use crate::bff_gen::{BuildFileFormat, Fastbuild};
use crate::cli::{Cli, Commands};
use crate::diagnostics::Diagnostics;
use crate::ir::{BuildGraph, GenerationOptions};
use crate::model;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use path_helpers::{ensure_model_exists, resolve_model_path, resolve_output_path};

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded, lowering fails, warnings
/// are denied, or output cannot be written.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Commands::Generate {
        file: PathBuf::from(bff_env::DEFAULT_BUILD_FILE),
    });
    let format = Fastbuild;
    let build_file = match &command {
        Commands::Generate { file } if !is_stdout_path(file) => file.as_path(),
        _ => Path::new(bff_env::DEFAULT_BUILD_FILE),
    };
    let options = generation_options(cli, &format, build_file);
    let (graph, diagnostics) = lower(cli, &options)?;

    if cli.deny_warnings && !diagnostics.is_empty() {
        return Err(RunnerError::WarningsDenied {
            count: diagnostics.len(),
        }
        .into());
    }

    match command {
        Commands::Generate { file } => generate(cli, &format, &graph, &file),
        Commands::Order => {
            let listing = graph.unit_names().join("\n");
            write_stdout(&format!("{listing}\n"))
        }
        Commands::Check => {
            let mut report = String::new();
            for warning in diagnostics.iter() {
                report.push_str(&format!("warning: {warning}\n"));
            }
            report.push_str(&format!(
                "{} unit(s), {} warning(s)\n",
                graph.units.len(),
                diagnostics.len()
            ));
            write_stdout(&report)
        }
    }
}

/// Derive lowering options from the CLI and the target format.
fn generation_options(
    cli: &Cli,
    format: &dyn BuildFileFormat,
    build_file: &Path,
) -> GenerationOptions {
    GenerationOptions {
        multi_output_steps: format.supports_multi_output_steps(),
        build_file: build_file.display().to_string(),
        cache_path: cli.cache_path.clone(),
        environment: cli.environment.clone(),
    }
}

/// Load the model named by the CLI and lower it into a [`BuildGraph`].
fn lower(cli: &Cli, options: &GenerationOptions) -> Result<(BuildGraph, Diagnostics)> {
    let model_path = resolve_model_path(cli)?;
    ensure_model_exists(&model_path)?;
    let model = model::from_path(&model_path)?;
    debug!(targets = model.targets.len(), "loaded target model {model_path}");

    let mut diagnostics = Diagnostics::new();
    let graph = BuildGraph::from_model(&model, options, &mut diagnostics)
        .with_context(|| format!("failed to lower target model {model_path}"))?;
    info!(
        units = graph.units.len(),
        warnings = diagnostics.len(),
        "lowered target model"
    );
    Ok((graph, diagnostics))
}

fn generate(
    cli: &Cli,
    format: &dyn BuildFileFormat,
    graph: &BuildGraph,
    file: &Path,
) -> Result<()> {
    let content = format.generate(graph);
    if is_stdout_path(file) {
        write_stdout(content.as_str())?;
    } else {
        let output = resolve_output_path(cli, file);
        write_build_file(output.as_ref(), &content)?;
    }

    let build_dir = PathBuf::from(&graph.build_dir);
    let build_root = Utf8PathBuf::from_path_buf(resolve_output_path(cli, &build_dir).into_owned())
        .map_err(|path| anyhow::anyhow!("build directory {} is not valid UTF-8", path.display()))?;
    let scripts = write_scripts(&build_root, graph)?;
    debug!(scripts, "wrote command scripts under {build_root}");
    Ok(())
}
