//! Intermediate Representation structures.
//!
//! This module lowers a [`crate::ast::TargetModel`] into the ordered,
//! resolved [`BuildGraph`] a build file format serializes. Lowering groups
//! sources into compile batches, names custom commands by content, resolves
//! file-level dependencies into unit edges, orders the units and leaves a
//! single creator per shared precompiled header.
//!
//! # Examples
//!
//! ```
//! use bffgen::ast::TargetModel;
//! use bffgen::diagnostics::Diagnostics;
//! use bffgen::ir::{BuildGraph, GenerationOptions};
//!
//! let model: TargetModel = serde_json::from_value(serde_json::json!({
//!     "model_version": "1.0.0",
//!     "build_dir": "/work/build",
//!     "targets": [{ "name": "docs", "kind": "utility" }],
//! }))
//! .expect("model");
//! let mut diagnostics = Diagnostics::new();
//! let graph = BuildGraph::from_model(&model, &GenerationOptions::default(), &mut diagnostics)
//!     .expect("graph");
//! assert_eq!(graph.unit_names().collect::<Vec<_>>(), ["noop", "docs", "all"]);
//! ```

mod commands;
mod compile;
mod compilers;
mod cycle;
mod from_model;
mod globals;
mod graph;
mod layout;
mod link;
mod output_index;
mod pch;
mod resolve;
mod shell;

pub use globals::{ALL_UNIT, NOOP_UNIT, REBUILD_UNIT};
pub use graph::{
    AliasGroup, BuildGraph, BuildUnit, CommandStep, CompileBatch, Compiler, CompilerFamily,
    IrGenError, LinkKind, LinkStep, Script, Settings,
};
pub use output_index::{OutputIndex, Producer};
pub use pch::PchReuseTracker;
pub use shell::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};

/// Knobs for one lowering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Keep every output on one command step instead of splitting extra
    /// outputs into touch steps.
    pub multi_output_steps: bool,
    /// Build file the `rebuild-bff` unit regenerates.
    pub build_file: String,
    /// Overrides the model's cache directory.
    pub cache_path: Option<String>,
    /// `NAME=VALUE` pairs appended to the model's environment.
    pub environment: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            multi_output_steps: false,
            build_file: String::from(bff_env::DEFAULT_BUILD_FILE),
            cache_path: None,
            environment: Vec::new(),
        }
    }
}
