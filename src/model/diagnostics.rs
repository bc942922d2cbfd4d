//! Translates model parsing errors into actionable diagnostics.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. The unused_assignments lint fires in some
// Rust versions but not others. Since `#[expect]` fails when the lint doesn't
// fire, and `unfulfilled_lint_expectations` cannot be expected, we must use
// `#[allow]` here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

use super::hints::{DATA_HINTS, YAML_HINTS};

/// YAML source content for a target model.
///
/// # Examples
/// ```rust
/// use bffgen::model::ModelSource;
/// let source = ModelSource::from("build_dir: out");
/// assert_eq!(source.as_str(), "build_dir: out");
/// ```
#[derive(Debug, Clone)]
pub struct ModelSource(String);

impl ModelSource {
    /// Wrap YAML text.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// Borrow the YAML text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ModelSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelSource {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ModelSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Display name for a model source used in diagnostics.
///
/// # Examples
/// ```rust
/// use bffgen::model::ModelName;
/// let name = ModelName::new("bffgen.yml");
/// assert_eq!(name.as_str(), "bffgen.yml");
/// ```
#[derive(Debug, Clone)]
pub struct ModelName(String);

impl ModelName {
    /// Wrap a display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the display name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ModelName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value.min(usize::MAX as u64)).unwrap_or(usize::MAX)
}

fn location_to_index(src: &ModelSource, loc: Location) -> usize {
    let target_line = saturating_usize(loc.line().saturating_sub(1));
    let target_column = saturating_usize(loc.column().saturating_sub(1));
    let mut offset = 0usize;
    for (idx, segment) in src.as_ref().split_inclusive('\n').enumerate() {
        if idx == target_line {
            let line = segment.strip_suffix('\n').unwrap_or(segment);
            let byte_index = line
                .char_indices()
                .nth(target_column)
                .map_or(line.len(), |(byte_idx, _)| byte_idx);
            return offset + byte_index;
        }
        offset += segment.len();
    }
    src.as_ref().len()
}

fn to_span(src: &ModelSource, loc: Location) -> SourceSpan {
    let at = location_to_index(src, loc);
    let bytes = src.as_ref().as_bytes();
    let (start, end) = match bytes.get(at) {
        Some(&b) if b != b'\n' => (at, at + 1),
        _ => {
            let start = if at > 0 && bytes.get(at - 1).is_some_and(|p| *p != b'\n') {
                at - 1
            } else {
                at
            };
            (start, at)
        }
    };
    let len = end.saturating_sub(start);
    #[expect(clippy::useless_conversion, reason = "future-proof span length type")]
    SourceSpan::new(start.into(), len.into())
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(bffgen::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn has_tab_indent(src: &ModelSource, loc: Option<Location>) -> bool {
    let Some(loc) = loc else { return false };
    let line_idx = saturating_usize(loc.line().saturating_sub(1));
    let line = src.as_ref().lines().nth(line_idx).unwrap_or("");
    line.chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\t')
}

fn hint_for(err_str: &str, src: &ModelSource, loc: Option<Location>) -> Option<String> {
    if has_tab_indent(src, loc) {
        return Some("Use spaces for indentation; tabs are invalid in YAML.".into());
    }
    let lower = err_str.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).into())
}

/// Error raised when a target model cannot be loaded.
///
/// # Examples
/// ```rust
/// use miette::miette;
/// use bffgen::model::ModelError;
///
/// let err = ModelError::Parse {
///     source: miette!("bad model").into(),
///     message: "target model parse error".into(),
/// };
/// assert_eq!(format!("{err}"), "target model parse error");
/// ```
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// YAML syntax or structure error.
    #[error("{message}")]
    #[diagnostic(code(bffgen::model::parse))]
    Parse {
        /// Underlying diagnostic with source spans where available.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
        /// Summary line.
        message: String,
    },

    /// The model declares a format version this build does not read.
    #[error("{name}: unsupported model_version {version}")]
    #[diagnostic(
        code(bffgen::model::unsupported_version),
        help("this bffgen reads model_version 1.x")
    )]
    UnsupportedVersion {
        /// Model display name.
        name: String,
        /// Declared version.
        version: semver::Version,
    },
}

/// Convert a YAML syntax error into a diagnostic pointing at the offending
/// location.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &ModelSource,
    name: &ModelName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, col, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_str = err.to_string();
    let hint = hint_for(&err_str, src, loc);
    let mut message = format!("YAML parse error at line {line}, column {col}: {err_str}");
    if let Some(ref h) = hint {
        message.push_str("\nhelp: ");
        message.push_str(h);
    }

    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_ref(), src.as_ref().to_string()),
        span,
        help: hint,
        source: err,
        message,
    })
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(bffgen::model::structure))]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    #[help]
    help: Option<String>,
    message: String,
}

/// Convert a schema mismatch into a diagnostic naming the model.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ModelName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let message = format!("target model structure error in {}: {err}", name.as_ref());
    let help = DATA_HINTS
        .iter()
        .find(|(needle, _)| message.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned());
    Box::new(DataDiagnostic {
        source: err,
        help,
        message,
    })
}
