#![forbid(unsafe_code)]

//! Environment and file-name constants shared by the bffgen library, its
//! binary, and the test helpers.

/// Prefix applied to every environment variable read by the configuration
/// layer.
pub const ENV_PREFIX: &str = "BFFGEN_";

/// Environment variable naming an explicit configuration file.
///
/// # Examples
///
/// ```
/// use bff_env::CONFIG_PATH_ENV;
/// assert!(CONFIG_PATH_ENV.starts_with(bff_env::ENV_PREFIX));
/// ```
pub const CONFIG_PATH_ENV: &str = "BFFGEN_CONFIG_PATH";

/// Model file read when no `--file` option is given.
pub const DEFAULT_MODEL_FILE: &str = "bffgen.yml";

/// Build file written by the `generate` command when no path is given.
pub const DEFAULT_BUILD_FILE: &str = "fbuild.bff";
