//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

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

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The target model file does not exist at the expected path.
    #[error("target model '{}' not found", path.display())]
    #[diagnostic(
        code(bffgen::runner::model_not_found),
        help("pass the model with --file or run from the directory that holds it")
    )]
    ModelNotFound {
        /// The path that was attempted.
        path: PathBuf,
    },

    /// Lowering produced warnings while `--deny-warnings` was set.
    #[error("lowering reported {count} warning(s) and warnings are denied")]
    #[diagnostic(
        code(bffgen::runner::warnings_denied),
        help("fix the reported warnings or drop --deny-warnings")
    )]
    WarningsDenied {
        /// Number of warnings reported.
        count: usize,
    },
}
