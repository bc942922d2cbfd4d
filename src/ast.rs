//! Target model Abstract Syntax Tree structures.
//!
//! A target model is the fully resolved description of a project: compile
//! command lines, custom commands and link lines are final strings, so
//! `bffgen` only has to assemble and order them. The structures mirror the
//! YAML schema and are deserialised with `serde` after `serde_saphyr` parses
//! the document.
//!
//! ```rust
//! use bffgen::ast::{TargetKind, TargetModel};
//!
//! let yaml = serde_json::json!({
//!     "model_version": "1.0.0",
//!     "build_dir": "/work/build",
//!     "targets": [{ "name": "tool", "kind": "utility" }],
//! });
//! let model: TargetModel = serde_json::from_value(yaml).expect("parse");
//! assert_eq!(model.targets.first().map(|t| t.kind), Some(TargetKind::Utility));
//! ```

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Top-level model structure.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetModel {
    /// Semantic version of the model format.
    pub model_version: Version,

    /// Root of the build tree. Paths inside it are written relative to it.
    pub build_dir: String,

    /// Root of the source tree, used to resolve relative source paths.
    #[serde(default)]
    pub source_dir: Option<String>,

    /// Executor-wide settings.
    #[serde(default)]
    pub settings: ModelSettings,

    /// One compiler per language.
    #[serde(default)]
    pub compilers: Vec<CompilerSpec>,

    /// Build targets in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,

    /// How to regenerate the build file when the model changes.
    #[serde(default)]
    pub regenerate: Option<RegenerateSpec>,
}

fn default_shell() -> String {
    String::from("/bin/sh")
}

/// Executor-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    /// Object cache directory. Defaults to `<build_dir>/fbuild.cache`.
    #[serde(default)]
    pub cache_path: Option<String>,
    /// `NAME=VALUE` pairs passed to every process the executor spawns.
    #[serde(default)]
    pub environment: Vec<String>,
    /// Shell used to run command steps.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            cache_path: None,
            environment: Vec::new(),
            shell: default_shell(),
        }
    }
}

fn default_output_extension() -> String {
    String::from(".o")
}

/// A compiler toolchain for one language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSpec {
    /// Language identifier such as `C`, `CXX`, `CUDA` or `RC`.
    pub language: String,
    /// Absolute path of the compiler executable.
    pub path: String,
    /// Vendor identifier such as `GNU`, `Clang`, `AppleClang` or `MSVC`.
    #[serde(default)]
    pub id: String,
    /// Dotted compiler version.
    #[serde(default)]
    pub version: String,
    /// Object file extension.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
    /// Additional files remote workers need.
    #[serde(default)]
    pub extra_files: StringOrList,
    /// Request FASTBuild's light cache. Honoured for MSVC C and C++ only.
    #[serde(default)]
    pub use_light_cache: bool,
}

/// Kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Linked program.
    Executable,
    /// Shared library.
    SharedLibrary,
    /// Loadable module.
    ModuleLibrary,
    /// Static archive.
    StaticLibrary,
    /// Objects consumed by other targets without linking.
    ObjectLibrary,
    /// Custom commands only.
    Utility,
    /// Project-wide helper target.
    Global,
}

impl TargetKind {
    /// Return `true` when the kind produces a linked binary or archive.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(
            self,
            Self::Executable | Self::SharedLibrary | Self::ModuleLibrary | Self::StaticLibrary
        )
    }
}

/// A single build target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Unique target name.
    pub name: String,
    /// Artifact kind.
    pub kind: TargetKind,
    /// Leave the target out of `all`.
    #[serde(default)]
    pub excluded: bool,
    /// Names of targets built first.
    #[serde(default)]
    pub depends: StringOrList,
    /// Directory the target is configured in. Defaults to `build_dir`.
    #[serde(default)]
    pub binary_dir: Option<String>,
    /// Directory for objects. Defaults to `<binary_dir>/<name>.dir`.
    #[serde(default)]
    pub object_dir: Option<String>,
    /// Linked artifact path.
    #[serde(default)]
    pub output: Option<String>,
    /// Variables written at the top of the target block.
    #[serde(default)]
    pub variables: IndexMap<String, String>,
    /// Link or archive command.
    #[serde(default)]
    pub link: Option<LinkSpec>,
    /// Compiler launcher command line per language, for example `ccache`.
    #[serde(default)]
    pub launchers: IndexMap<String, String>,
    /// Precompiled header configuration.
    #[serde(default)]
    pub pch: Option<PchSpec>,
    /// Sources compiled into objects.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Commands run before anything else.
    #[serde(default)]
    pub pre_build: Vec<CommandSpec>,
    /// Commands run before linking.
    #[serde(default)]
    pub pre_link: Vec<CommandSpec>,
    /// Commands run after linking.
    #[serde(default)]
    pub post_build: Vec<CommandSpec>,
    /// Commands producing files.
    #[serde(default)]
    pub custom_commands: Vec<CommandSpec>,
}

/// Link or archive command.
///
/// `{objects}` and `{output}` in `command` are replaced by FASTBuild
/// placeholders for the linked objects and the produced binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    /// Full command line; the first word is the linker.
    pub command: String,
    /// Objects or libraries linked in from other targets or outside the
    /// build. Names of object library targets link their objects.
    #[serde(default)]
    pub objects: StringOrList,
}

fn default_pch_language() -> String {
    String::from("CXX")
}

/// Precompiled header configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PchSpec {
    /// Source whose compile command creates the header.
    pub source: String,
    /// Language whose sources use the header.
    #[serde(default = "default_pch_language")]
    pub language: String,
    /// Precompiled header file.
    pub output: String,
    /// Object produced alongside the header.
    #[serde(default)]
    pub object: String,
    /// Target whose header this target shares. The target is built first and
    /// `output` must name that target's header.
    #[serde(default)]
    pub reuse_from: Option<String>,
}

/// One translation unit.
///
/// Relative source paths are resolved against `source_dir`. Relative
/// `object_outputs` and `object_depends` are resolved against the target's
/// binary directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    /// Source file.
    pub path: String,
    /// Language the source is compiled as.
    pub language: String,
    /// Full compile command; `{source}` and `{object}` mark the input and
    /// output.
    pub command: String,
    /// Subdirectory of the object directory receiving the object.
    #[serde(default)]
    pub object_subdir: String,
    /// Extra files the compile produces.
    #[serde(default)]
    pub object_outputs: StringOrList,
    /// Extra files the compile needs.
    #[serde(default)]
    pub object_depends: StringOrList,
    /// Compile without the target's precompiled header.
    #[serde(default)]
    pub skip_pch: bool,
}

/// One custom command.
///
/// Relative paths are resolved against the target's binary directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    /// Files produced.
    #[serde(default)]
    pub outputs: StringOrList,
    /// Files written as a side effect.
    #[serde(default)]
    pub byproducts: StringOrList,
    /// Outputs that never exist on disk.
    #[serde(default)]
    pub symbolic: StringOrList,
    /// Files the command reads.
    #[serde(default)]
    pub depends: StringOrList,
    /// Argument vectors run in order.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,
    /// Directory the commands run in. Defaults to the target's binary dir.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Command regenerating the build file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegenerateSpec {
    /// Argument vector, for example `["bffgen", "-f", "model.yml"]`.
    pub command: Vec<String>,
    /// Files whose change triggers regeneration.
    #[serde(default)]
    pub inputs: StringOrList,
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// It mirrors YAML syntax where a scalar or sequence is allowed. Empty values
/// deserialize to `StringOrList::Empty`.
///
/// ```yaml
/// # Scalar
/// depends: lib
/// # Sequence
/// depends:
///   - lib
///   - gen
/// ```
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Borrow the items as a slice.
    ///
    /// ```rust
    /// use bffgen::ast::StringOrList;
    /// let single = StringOrList::String("a".into());
    /// assert_eq!(single.as_slice(), ["a".to_owned()]);
    /// assert!(StringOrList::Empty.as_slice().is_empty());
    /// ```
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Empty => &[],
            Self::String(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        }
    }

    /// Iterate over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.as_slice().iter()
    }

    /// Return `true` when no item is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<'a> IntoIterator for &'a StringOrList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}
