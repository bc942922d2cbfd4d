//! FASTBuild file generator.
//!
//! This module converts a [`crate::ir::BuildGraph`] into the `.bff` text
//! consumed by FASTBuild. Units are written in graph order, one scoped block
//! each, so every node name a block refers to is already defined above it.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use crate::ir::{
    BuildGraph, BuildUnit, CommandStep, CompileBatch, Compiler, CompilerFamily, LinkKind,
    LinkStep, NOOP_UNIT, Settings,
};

/// First line of every generated file.
pub const DISCLAIMER: &str = "// bffgen generated file: DO NOT EDIT!";

const INDENT: &str = "  ";
const BODY_INDENT: &str = "    ";

/// A build file syntax the graph can be serialized to.
pub trait BuildFileFormat {
    /// Whether one command step may declare several outputs.
    fn supports_multi_output_steps(&self) -> bool;

    /// Serialize `graph`.
    fn generate(&self, graph: &BuildGraph) -> BuildFileContent;
}

/// Wrapper around generated build file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFileContent(String);

impl BuildFileContent {
    /// Store the provided build file text.
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self(content)
    }

    /// Borrow the underlying text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// The FASTBuild `.bff` format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fastbuild;

impl BuildFileFormat for Fastbuild {
    fn supports_multi_output_steps(&self) -> bool {
        false
    }

    fn generate(&self, graph: &BuildGraph) -> BuildFileContent {
        generate(graph)
    }
}

/// Generate a FASTBuild file as a string.
#[must_use]
pub fn generate(graph: &BuildGraph) -> BuildFileContent {
    BuildFileContent::new(BffFile { graph }.to_string())
}

/// Quote a value that is already escaped for FASTBuild.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "^'"))
}

/// Quote literal text, escaping FASTBuild's special characters.
fn quote_literal(value: &str) -> String {
    quote(&value.replace('^', "^^").replace('$', "^$"))
}

fn write_divider(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "// {}", "=".repeat(77))
}

fn write_section(f: &mut Formatter<'_>, title: &str) -> fmt::Result {
    write_divider(f)?;
    writeln!(f, "// {title}")?;
    write_divider(f)?;
    writeln!(f)
}

fn write_variable(f: &mut Formatter<'_>, indent: &str, key: &str, value: &str) -> fmt::Result {
    writeln!(f, "{indent}.{key} = {value}")
}

fn write_array<I>(f: &mut Formatter<'_>, indent: &str, key: &str, items: I) -> fmt::Result
where
    I: IntoIterator<Item = String>,
{
    writeln!(f, "{indent}.{key} =")?;
    writeln!(f, "{indent}{{")?;
    let mut first = true;
    for item in items {
        if !first {
            writeln!(f, ",")?;
        }
        first = false;
        write!(f, "{indent}{INDENT}{item}")?;
    }
    if !first {
        writeln!(f)?;
    }
    writeln!(f, "{indent}}}")
}

fn write_literal_array<'s, I>(f: &mut Formatter<'_>, indent: &str, key: &str, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'s String>,
{
    write_array(f, indent, key, items.into_iter().map(|item| quote_literal(item)))
}

fn write_bool(f: &mut Formatter<'_>, indent: &str, key: &str, value: bool) -> fmt::Result {
    write_variable(f, indent, key, if value { "true" } else { "false" })
}

fn open_function(f: &mut Formatter<'_>, function: &str, name: &str) -> fmt::Result {
    writeln!(f, "{INDENT}{function}({})", quote_literal(name))?;
    writeln!(f, "{INDENT}{{")
}

fn close_function(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "{INDENT}}}")
}

fn write_alias(f: &mut Formatter<'_>, name: &str, targets: &BTreeSet<String>) -> fmt::Result {
    if targets.is_empty() {
        return Ok(());
    }
    open_function(f, "Alias", name)?;
    write_literal_array(f, BODY_INDENT, "Targets", targets)?;
    close_function(f)
}

struct BffFile<'a> {
    graph: &'a BuildGraph,
}

impl Display for BffFile<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{DISCLAIMER}")?;
        writeln!(f, "// This file contains all the build statements")?;
        writeln!(f)?;
        write_placeholders(f)?;
        write_settings(f, &self.graph.settings)?;
        write_compilers(f, self.graph)?;
        for unit in &self.graph.units {
            UnitWriter::new(self.graph, unit).write(f)?;
        }
        Ok(())
    }
}

fn write_placeholders(f: &mut Formatter<'_>) -> fmt::Result {
    write_section(f, "Helper variables")?;
    for index in 1..=3 {
        write_variable(f, "", &format!("FB_INPUT_{index}_PLACEHOLDER"), &format!("'\"%{index}\"'"))?;
    }
    writeln!(f)
}

fn write_settings(f: &mut Formatter<'_>, settings: &Settings) -> fmt::Result {
    write_section(f, "Settings")?;
    writeln!(f, "Settings")?;
    writeln!(f, "{{")?;
    if !settings.environment.is_empty() {
        write_literal_array(f, INDENT, "Environment", &settings.environment)?;
    }
    write_variable(f, INDENT, "CachePath", &quote_literal(&settings.cache_path))?;
    writeln!(f, "}}")?;
    writeln!(f)
}

fn write_compilers(f: &mut Formatter<'_>, graph: &BuildGraph) -> fmt::Result {
    if graph.compilers.is_empty() {
        return Ok(());
    }
    write_section(f, "Compilers")?;
    for compiler in graph.compilers.values() {
        write_compiler(f, compiler)?;
    }
    if let Some(first) = graph.compilers.values().next() {
        write_variable(f, "", "Compiler_dummy", &quote_literal(&first.name))?;
    }
    writeln!(f)
}

fn write_compiler(f: &mut Formatter<'_>, compiler: &Compiler) -> fmt::Result {
    writeln!(f, "Compiler({})", quote_literal(&compiler.name))?;
    writeln!(f, "{{")?;
    if let Some(root) = &compiler.root {
        write_variable(f, INDENT, "Root", &quote_literal(root))?;
    }
    write_variable(f, INDENT, "Executable", &quote(&compiler.executable))?;
    write_variable(f, INDENT, "CompilerFamily", &quote(compiler.family.as_str()))?;
    if compiler.use_light_cache {
        write_bool(f, INDENT, "UseLightCache_Experimental", true)?;
    }
    if compiler.family == CompilerFamily::Clang {
        write_bool(f, INDENT, "ClangRewriteIncludes", false)?;
    }
    if !compiler.extra_files.is_empty() {
        write_array(f, INDENT, "ExtraFiles", compiler.extra_files.iter().map(|file| quote(file)))?;
    }
    writeln!(f, "}}")?;
    write_variable(f, "", &compiler.variable(), &quote_literal(&compiler.name))?;
    writeln!(f)
}

/// Writes one unit block and tracks the node names it defines.
struct UnitWriter<'a> {
    graph: &'a BuildGraph,
    unit: &'a BuildUnit,
    products: BTreeSet<String>,
    artifacts: BTreeSet<String>,
}

impl<'a> UnitWriter<'a> {
    fn new(graph: &'a BuildGraph, unit: &'a BuildUnit) -> Self {
        Self {
            graph,
            unit,
            products: BTreeSet::new(),
            artifacts: BTreeSet::new(),
        }
    }

    /// Unit dependencies as node names: `<dep>-products`, or the plain name
    /// of a global unit. Names without a unit are left out.
    fn unit_dependencies(&self) -> BTreeSet<String> {
        self.unit
            .dependencies
            .iter()
            .filter_map(|dep| self.graph.unit(dep))
            .map(|dep| {
                if dep.is_global {
                    dep.name.clone()
                } else {
                    dep.products_alias()
                }
            })
            .collect()
    }

    fn write(mut self, f: &mut Formatter<'_>) -> fmt::Result {
        let unit = self.unit;
        writeln!(f)?;
        writeln!(f, "{}", "/".repeat(45))?;
        writeln!(f, "// Target definition: {}", unit.name)?;
        writeln!(f)?;
        writeln!(f, "{{")?;
        for (key, value) in &unit.variables {
            write_variable(f, INDENT, key, &quote(value))?;
        }

        let unit_deps = self.unit_dependencies();
        let pre_build = self.write_execs(f, &unit.pre_build, &unit_deps)?;
        let after_commands = self.write_execs(f, &unit.commands, &pre_build)?;
        let objects = self.write_object_lists(f, &after_commands)?;
        let after_objects = if objects.is_empty() { after_commands } else { objects };
        let mut before_post_build = self.write_execs(f, &unit.pre_link, &after_objects)?;
        if let Some(link) = &unit.link {
            before_post_build.extend(unit_deps.iter().cloned());
            self.write_link(f, link, &before_post_build)?;
            before_post_build = BTreeSet::from([link.name.clone()]);
        }
        self.write_execs(f, &unit.post_build, &before_post_build)?;

        for alias in &unit.aliases {
            write_alias(f, &alias.name, &alias.targets)?;
            self.products.insert(alias.name.clone());
        }
        self.products.extend(self.unit.referenced_steps.iter().cloned());
        self.write_unit_aliases(f)?;
        writeln!(f, "}}")
    }

    /// Write `steps` in order and return the names later steps wait for.
    fn write_execs(
        &mut self,
        f: &mut Formatter<'_>,
        steps: &[CommandStep],
        inherited: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, fmt::Error> {
        let mut written = BTreeSet::new();
        for step in steps {
            let mut deps = step.pre_build_dependencies.clone();
            deps.extend(inherited.iter().cloned());
            if step.is_noop {
                if deps.is_empty() {
                    deps.insert(NOOP_UNIT.to_owned());
                }
                write_alias(f, &step.name, &deps)?;
            } else {
                write_exec(f, step, &deps)?;
            }
            written.insert(step.name.clone());
            self.products.insert(step.name.clone());
        }
        Ok(if written.is_empty() { inherited.clone() } else { written })
    }

    fn write_object_lists(
        &mut self,
        f: &mut Formatter<'_>,
        inherited: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, fmt::Error> {
        let mut written = BTreeSet::new();
        let unit = self.unit;
        for batch in &unit.compile_batches {
            let mut deps = inherited.clone();
            deps.extend(batch.pre_build_dependencies.iter().cloned());
            deps.extend(unit.referenced_steps.iter().cloned());
            write_object_list(f, batch, &deps)?;
            written.insert(batch.name.clone());
            self.products.insert(batch.name.clone());
            self.artifacts.insert(batch.name.clone());
        }
        Ok(written)
    }

    fn write_link(&mut self, f: &mut Formatter<'_>, link: &LinkStep, deps: &BTreeSet<String>) -> fmt::Result {
        let libraries: BTreeSet<&String> = link.libraries.iter().collect();
        let pre_build: BTreeSet<String> = deps
            .iter()
            .filter(|dep| !libraries.contains(dep))
            .cloned()
            .collect();
        let function = match link.kind {
            LinkKind::Executable => "Executable",
            LinkKind::SharedLibrary => "DLL",
            LinkKind::StaticLibrary => "Library",
        };
        open_function(f, function, &link.name)?;
        if !pre_build.is_empty() {
            write_literal_array(f, BODY_INDENT, "PreBuildDependencies", &pre_build)?;
        }
        if link.kind == LinkKind::StaticLibrary {
            write_variable(f, BODY_INDENT, "Librarian", &quote(&link.linker))?;
            write_variable(f, BODY_INDENT, "LibrarianOptions", &quote(&link.options))?;
            write_literal_array(f, BODY_INDENT, "LibrarianAdditionalInputs", &link.libraries)?;
            write_variable(f, BODY_INDENT, "LibrarianOutput", &quote_literal(&link.output))?;
            write_variable(f, BODY_INDENT, "LibrarianType", &quote_literal(&link.linker_type))?;
            if !self.graph.compilers.is_empty() {
                write_variable(f, BODY_INDENT, "Compiler", &link.compiler)?;
            }
            write_variable(f, BODY_INDENT, "CompilerOptions", &quote(&link.compiler_options))?;
            write_variable(f, BODY_INDENT, "CompilerOutputPath", &quote("/dummy/"))?;
        } else {
            write_variable(f, BODY_INDENT, "Linker", &quote(&link.linker))?;
            write_variable(f, BODY_INDENT, "LinkerOptions", &quote(&link.options))?;
            write_variable(f, BODY_INDENT, "LinkerOutput", &quote_literal(&link.output))?;
            write_literal_array(f, BODY_INDENT, "Libraries", &link.libraries)?;
            write_bool(f, BODY_INDENT, "LinkerLinkObjects", false)?;
            write_variable(f, BODY_INDENT, "LinkerType", &quote_literal(&link.linker_type))?;
        }
        close_function(f)?;
        self.products.insert(link.name.clone());
        self.artifacts.insert(link.name.clone());
        Ok(())
    }

    fn write_unit_aliases(&mut self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = &self.unit.name;
        if self.products.is_empty() {
            self.products.insert(NOOP_UNIT.to_owned());
        }
        if !self.products.contains(name) {
            write_alias(f, name, &self.products)?;
        }
        if self.unit.is_global {
            return Ok(());
        }
        let mut outputs: BTreeSet<String> = self.products.difference(&self.artifacts).cloned().collect();
        outputs.remove(NOOP_UNIT);
        outputs.insert(name.clone());
        write_alias(f, &self.unit.products_alias(), &outputs)
    }
}

fn write_exec(f: &mut Formatter<'_>, step: &CommandStep, deps: &BTreeSet<String>) -> fmt::Result {
    open_function(f, "Exec", &step.name)?;
    if !deps.is_empty() {
        write_literal_array(f, BODY_INDENT, "PreBuildDependencies", deps)?;
    }
    write_variable(f, BODY_INDENT, "ExecExecutable", &quote_literal(&step.executable))?;
    if !step.arguments.is_empty() {
        write_variable(f, BODY_INDENT, "ExecArguments", &quote_literal(&step.arguments))?;
    }
    if let Some(dir) = &step.working_dir {
        write_variable(f, BODY_INDENT, "ExecWorkingDir", &quote_literal(dir))?;
    }
    if !step.inputs.is_empty() {
        write_literal_array(f, BODY_INDENT, "ExecInput", &step.inputs)?;
    }
    if step.use_stdout_as_output {
        write_bool(f, BODY_INDENT, "ExecUseStdOutAsOutput", true)?;
    }
    write_bool(f, BODY_INDENT, "ExecAlwaysShowOutput", true)?;
    write_variable(f, BODY_INDENT, "ExecOutput", &quote_literal(&step.output))?;
    if step.always_run {
        write_bool(f, BODY_INDENT, "ExecAlways", true)?;
    }
    close_function(f)
}

fn write_object_list(f: &mut Formatter<'_>, batch: &CompileBatch, deps: &BTreeSet<String>) -> fmt::Result {
    open_function(f, "ObjectList", &batch.name)?;
    if !deps.is_empty() {
        write_literal_array(f, BODY_INDENT, "PreBuildDependencies", deps)?;
    }
    write_variable(f, BODY_INDENT, "Compiler", &batch.compiler)?;
    write_variable(f, BODY_INDENT, "CompilerOptions", &quote(&batch.options))?;
    write_variable(f, BODY_INDENT, "CompilerOutputPath", &quote_literal(&batch.output_dir))?;
    write_variable(f, BODY_INDENT, "CompilerOutputExtension", &quote_literal(&batch.output_extension))?;
    write_bool(f, BODY_INDENT, "CompilerOutputKeepBaseExtension", true)?;
    write_literal_array(f, BODY_INDENT, "CompilerInputFiles", &batch.inputs)?;
    if let (Some(input), Some(options)) = (&batch.pch_input_file, &batch.pch_options) {
        write_variable(f, BODY_INDENT, "PCHInputFile", &quote_literal(input))?;
        write_variable(f, BODY_INDENT, "PCHOptions", &quote(options))?;
    }
    if let Some(output) = &batch.pch_output_file {
        write_variable(f, BODY_INDENT, "PCHOutputFile", &quote_literal(output))?;
    }
    close_function(f)
}
