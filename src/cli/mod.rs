//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands, and layers
//! configuration files and `BFFGEN_*` environment variables beneath the
//! flags given on the command line.

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoMergeExt, OrthoResult, sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

mod parsing;

use parsing::parse_env_pair;

/// Lowers a resolved target model into a dependency-ordered FASTBuild file.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "BFFGEN")]
pub struct Cli {
    /// Path to the target model file.
    #[arg(short, long, value_name = "FILE", default_value = bff_env::DEFAULT_MODEL_FILE)]
    #[ortho_config(default = default_model_path())]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// This affects model lookup, output paths, and config discovery.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Directory for the FASTBuild object cache.
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<String>,

    /// Environment variable passed to every process FASTBuild spawns.
    #[arg(long = "env", value_name = "NAME=VALUE", value_parser = parse_env_pair)]
    #[ortho_config(merge_strategy = "append")]
    pub environment: Vec<String>,

    /// Fail instead of writing output when lowering reports warnings.
    #[arg(long)]
    #[ortho_config(default = false)]
    pub deny_warnings: bool,

    /// Optional subcommand to execute; defaults to `generate` when omitted.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate {
                file: default_build_path(),
            });
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: default_model_path(),
            directory: None,
            verbose: false,
            cache_path: None,
            environment: Vec::new(),
            deny_warnings: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Available top-level commands for bffgen.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Write the FASTBuild file.
    Generate {
        /// Output path for the generated file.
        ///
        /// Use `-` to write to stdout.
        #[arg(value_name = "FILE", default_value = bff_env::DEFAULT_BUILD_FILE)]
        file: PathBuf,
    },

    /// Print unit names in emission order.
    Order,

    /// Lower the model and report diagnostics without writing anything.
    Check,
}

/// Return the default model filename when none is provided.
fn default_model_path() -> PathBuf {
    PathBuf::from(bff_env::DEFAULT_MODEL_FILE)
}

fn default_build_path() -> PathBuf {
    PathBuf::from(bff_env::DEFAULT_BUILD_FILE)
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    let cli = Cli::from_arg_matches(&matches).map_err(|err| err.with_cmd(&command))?;
    Ok((cli, matches))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(bff_env::ENV_PREFIX)
}

/// Build configuration discovery rooted in the optional working directory.
fn config_discovery(directory: Option<&PathBuf>) -> ConfigDiscovery {
    let mut builder = ConfigDiscovery::builder("bffgen").env_var(bff_env::CONFIG_PATH_ENV);
    if let Some(dir) = directory {
        builder = builder.clear_project_roots().add_project_root(dir);
    }
    builder.build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let mut map = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(ortho_config::OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in ["file", "verbose", "environment", "deny_warnings"] {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// Precedence from lowest to highest: defaults, configuration files,
/// `BFFGEN_*` environment variables, flags given on the command line.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let command = cli.command.clone();
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let discovery = config_discovery(cli.directory.as_ref());
    let mut file_layers = discovery.compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    let mut merged = composition.into_merge_result(Cli::merge_from_layers)?;
    merged.command = command;
    Ok(merged)
}
