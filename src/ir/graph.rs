//! Build graph node types.
//!
//! Every field holds text ready for the emitter. Compiler, PCH and linker
//! option strings are stored already escaped for FASTBuild so they may carry
//! `$FB_INPUT_*_PLACEHOLDER$` references; every other string is a literal
//! value.

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

use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, IndexSet};
use miette::Diagnostic;
use thiserror::Error;

/// The ordered, resolved graph handed to a [`crate::bff_gen::BuildFileFormat`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildGraph {
    /// Build root that relative paths refer to.
    pub build_dir: String,
    /// Global executor settings.
    pub settings: Settings,
    /// Compiler definitions keyed by language or `<language>-<hash>` for
    /// launchers.
    pub compilers: BTreeMap<String, Compiler>,
    /// Units in emission order.
    pub units: Vec<BuildUnit>,
}

impl BuildGraph {
    /// Find a unit by name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&BuildUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// Unit names in emission order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|unit| unit.name.as_str())
    }
}

/// Contents of the FASTBuild `Settings` block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory for the FASTBuild object cache.
    pub cache_path: String,
    /// `NAME=VALUE` pairs exported to every spawned process.
    pub environment: Vec<String>,
    /// Shell used to run command steps.
    pub shell: String,
}

/// Toolchain family FASTBuild uses to interpret compiler arguments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerFamily {
    /// Microsoft `cl.exe`.
    Msvc,
    /// Clang and Apple Clang.
    Clang,
    /// GCC.
    Gcc,
    /// NVIDIA `nvcc`.
    CudaNvcc,
    /// Anything else; FASTBuild passes arguments through untouched.
    #[default]
    Custom,
}

impl CompilerFamily {
    /// Map a compiler id and language onto a family.
    ///
    /// Only C, C++ and CUDA compilers get a specific family.
    ///
    /// # Examples
    ///
    /// ```
    /// use bffgen::ir::CompilerFamily;
    /// assert_eq!(CompilerFamily::detect("GNU", "CXX"), CompilerFamily::Gcc);
    /// assert_eq!(CompilerFamily::detect("GNU", "Fortran"), CompilerFamily::Custom);
    /// ```
    #[must_use]
    pub fn detect(compiler_id: &str, language: &str) -> Self {
        if !matches!(language, "C" | "CXX" | "CUDA") {
            return Self::Custom;
        }
        match compiler_id {
            "MSVC" => Self::Msvc,
            "Clang" | "AppleClang" => Self::Clang,
            "GNU" => Self::Gcc,
            "NVIDIA" => Self::CudaNvcc,
            _ => Self::Custom,
        }
    }

    /// The value written to `.CompilerFamily`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Msvc => "msvc",
            Self::Clang => "clang",
            Self::Gcc => "gcc",
            Self::CudaNvcc => "cuda-nvcc",
            Self::Custom => "custom",
        }
    }
}

/// A FASTBuild `Compiler` definition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Compiler {
    /// Node name, for example `Compiler-CXX`.
    pub name: String,
    /// Source language the compiler handles.
    pub language: String,
    /// Directory holding the executable, exposed as `$Root$`.
    pub root: Option<String>,
    /// Executable path, possibly relative to `$Root$`.
    pub executable: String,
    /// Argument dialect.
    pub family: CompilerFamily,
    /// Enable FASTBuild's light cache.
    pub use_light_cache: bool,
    /// Extra files shipped to remote workers, already escaped.
    pub extra_files: Vec<String>,
}

impl Compiler {
    /// Name of the variable that refers to this compiler.
    ///
    /// # Examples
    ///
    /// ```
    /// use bffgen::ir::Compiler;
    /// let compiler = Compiler { name: "Compiler-CXX".into(), ..Compiler::default() };
    /// assert_eq!(compiler.variable(), "Compiler_CXX");
    /// ```
    #[must_use]
    pub fn variable(&self) -> String {
        self.name.replace('-', "_")
    }
}

/// One independently named target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildUnit {
    /// Unique unit name.
    pub name: String,
    /// Variables written at the top of the unit block.
    pub variables: IndexMap<String, String>,
    /// Names of units that must be built first.
    pub dependencies: IndexSet<String>,
    /// Steps run before anything else in the unit.
    pub pre_build: Vec<CommandStep>,
    /// Custom command steps.
    pub commands: Vec<CommandStep>,
    /// Object lists in dependency order.
    pub compile_batches: Vec<CompileBatch>,
    /// Steps run between compiling and linking.
    pub pre_link: Vec<CommandStep>,
    /// Link or archive step, when the unit produces a binary.
    pub link: Option<LinkStep>,
    /// Steps run after linking.
    pub post_build: Vec<CommandStep>,
    /// Named groupings of the unit's steps.
    pub aliases: Vec<AliasGroup>,
    /// Command steps owned by another unit that this unit relies on.
    pub referenced_steps: BTreeSet<String>,
    /// Built-in units such as `all` and `noop`.
    pub is_global: bool,
    /// Excluded from the `all` alias.
    pub is_excluded: bool,
}

impl BuildUnit {
    /// Create an empty unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every command step in the unit, in emission order.
    pub fn all_commands(&self) -> impl Iterator<Item = &CommandStep> {
        self.pre_build
            .iter()
            .chain(&self.commands)
            .chain(&self.pre_link)
            .chain(&self.post_build)
    }

    /// Name of the alias grouping every artifact the unit produces.
    #[must_use]
    pub fn products_alias(&self) -> String {
        format!("{}-products", self.name)
    }
}

/// Sources compiled with identical options into one output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompileBatch {
    /// Object list name.
    pub name: String,
    /// Compiler variable reference, for example `.Compiler_CXX`.
    pub compiler: String,
    /// Grouping key: options plus PCH usage marker.
    pub key: String,
    /// Escaped compiler options.
    pub options: String,
    /// Source files.
    pub inputs: Vec<String>,
    /// Directory receiving the objects.
    pub output_dir: String,
    /// Object file extension.
    pub output_extension: String,
    /// Header compiled into the PCH, set only on the batch creating it.
    pub pch_input_file: Option<String>,
    /// Escaped options used to create the PCH.
    pub pch_options: Option<String>,
    /// PCH file produced or consumed.
    pub pch_output_file: Option<String>,
    /// Extra files the compile step produces.
    pub extra_outputs: BTreeSet<String>,
    /// Files the compile step needs that no known step produces.
    pub extra_dependencies: BTreeSet<String>,
    /// Units or sibling steps that must run first.
    pub pre_build_dependencies: BTreeSet<String>,
}

/// Binary produced by a [`LinkStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Executable program.
    Executable,
    /// Shared or module library.
    SharedLibrary,
    /// Static archive.
    StaticLibrary,
}

/// One link or archive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStep {
    /// Node name.
    pub name: String,
    /// Binary kind.
    pub kind: LinkKind,
    /// Linker or librarian executable.
    pub linker: String,
    /// Escaped linker options.
    pub options: String,
    /// Produced binary.
    pub output: String,
    /// FASTBuild linker type.
    pub linker_type: String,
    /// Compiler reference a librarian needs.
    pub compiler: String,
    /// Escaped compiler options a librarian needs.
    pub compiler_options: String,
    /// Object lists and external objects linked in.
    pub libraries: Vec<String>,
}

/// One user-defined command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandStep {
    /// Stable content-derived name.
    pub name: String,
    /// Program to run.
    pub executable: String,
    /// Program arguments.
    pub arguments: String,
    /// Working directory.
    pub working_dir: Option<String>,
    /// Input files.
    pub inputs: Vec<String>,
    /// The single output the executor tracks.
    pub output: String,
    /// Further outputs kept on the step when the format allows it.
    pub extra_outputs: Vec<String>,
    /// Capture standard output into [`Self::output`].
    pub use_stdout_as_output: bool,
    /// Run on every build.
    pub always_run: bool,
    /// The step has no commands and is only an alias.
    pub is_noop: bool,
    /// Steps and units that must run first.
    pub pre_build_dependencies: BTreeSet<String>,
    /// Shell script the step runs, written next to the build file.
    pub script: Option<Script>,
}

impl CommandStep {
    /// Every file the step writes.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.output.as_str())
            .filter(|output| !output.is_empty())
            .chain(self.extra_outputs.iter().map(String::as_str))
    }
}

/// A shell script backing a [`CommandStep`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Script {
    /// Script location; relative paths are relative to the build root.
    pub path: String,
    /// Command lines run in order.
    pub lines: Vec<String>,
}

impl Script {
    /// Script text. Execution stops at the first failing line.
    ///
    /// # Examples
    ///
    /// ```
    /// use bffgen::ir::Script;
    /// let script = Script { path: "s.sh".into(), lines: vec!["cd .".into(), "true".into()] };
    /// assert_eq!(script.contents(), "set -e\n\ncd .\ntrue\n");
    /// ```
    #[must_use]
    pub fn contents(&self) -> String {
        let mut text = String::from("set -e\n\n");
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// A named group of targets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AliasGroup {
    /// Alias name.
    pub name: String,
    /// Grouped target names.
    pub targets: BTreeSet<String>,
}

impl AliasGroup {
    /// Build an alias over `targets`.
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Fatal errors raised while lowering a model.
#[derive(Debug, Error, Diagnostic)]
pub enum IrGenError {
    /// Two units share a name.
    #[error("unit '{name}' is defined more than once")]
    #[diagnostic(
        code(bffgen::ir::duplicate_unit),
        help("rename one of the targets; unit names must be unique")
    )]
    DuplicateUnit {
        /// Duplicated name.
        name: String,
    },

    /// Two different command steps hash to the same short name.
    #[error("command identity '{name}' is shared by '{existing}' and '{incoming}'")]
    #[diagnostic(code(bffgen::ir::identity_collision))]
    IdentityCollision {
        /// Colliding short name.
        name: String,
        /// Key registered first.
        existing: String,
        /// Key that collided.
        incoming: String,
    },

    /// A source uses a language without a configured compiler.
    #[error("unit '{unit}' compiles {language} sources but no {language} compiler is configured")]
    #[diagnostic(
        code(bffgen::ir::unknown_compiler),
        help("add an entry for this language under `compilers`")
    )]
    UnknownCompiler {
        /// Unit owning the source.
        unit: String,
        /// Language without a compiler.
        language: String,
    },

    /// A command line cannot be split with shell rules.
    #[error("unit '{unit}' has an invalid command: {snippet}")]
    #[diagnostic(
        code(bffgen::ir::invalid_command),
        help("check the command for unbalanced quotes")
    )]
    InvalidCommand {
        /// Unit owning the command.
        unit: String,
        /// Full command text.
        command: String,
        /// Leading part of the command for display.
        snippet: String,
    },

    /// A linking target kind has no link command.
    #[error("unit '{unit}' must be linked but has no `link.command`")]
    #[diagnostic(code(bffgen::ir::missing_link_command))]
    MissingLinkCommand {
        /// Unit missing the command.
        unit: String,
    },
}
