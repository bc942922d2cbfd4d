//! Grouping of sources into compile batches.
//!
//! Sources of one language with identical options and PCH usage share a
//! batch per object subdirectory. Batches are named
//! `<LANG>_ObjectGroup_<target>-<subdir>-<n>` with `n` counting from one per
//! language.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use super::compilers::CompilerRegistry;
use super::cycle;
use super::layout::TargetLayout;
use super::shell::{
    INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER, escape_fastbuild, expand_tokens, split_executable,
    validate,
};
use super::{CompileBatch, IrGenError};
use crate::ast::{SourceSpec, TargetSpec};
use crate::diagnostics::{Diagnostics, GenWarning};
use crate::toposort::{DependencyMap, sort_by_dependencies};

#[derive(Debug, Default)]
struct ObjectGroup {
    sources: Vec<String>,
    extra_outputs: BTreeSet<String>,
    extra_dependencies: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Permutation {
    options: String,
    use_pch: bool,
    groups: BTreeMap<String, ObjectGroup>,
}

/// Build the ordered compile batches of `target`.
pub(crate) fn compile_batches(
    target: &TargetSpec,
    layout: &TargetLayout<'_>,
    registry: &mut CompilerRegistry,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CompileBatch>, IrGenError> {
    let mut by_language: BTreeMap<&str, Vec<&SourceSpec>> = BTreeMap::new();
    for source in &target.sources {
        by_language
            .entry(source.language.as_str())
            .or_default()
            .push(source);
    }

    let mut by_name: IndexMap<String, CompileBatch> = IndexMap::new();
    for (language, sources) in by_language {
        for batch in language_batches(target, layout, registry, language, &sources)? {
            by_name.insert(batch.name.clone(), batch);
        }
    }

    link_sibling_outputs(&mut by_name);

    let (mut ordered, rest): (Vec<String>, Vec<String>) = by_name
        .keys()
        .cloned()
        .partition(|name| name.starts_with("C_") || name.starts_with("CXX_"));
    ordered.extend(rest);
    let deps: DependencyMap<String> = by_name
        .values()
        .flat_map(|batch| {
            batch
                .pre_build_dependencies
                .iter()
                .map(|dep| (batch.name.clone(), dep.clone()))
        })
        .collect();
    let outcome = sort_by_dependencies(&mut ordered, &deps);
    if !outcome.is_acyclic() {
        let found = cycle::analyse(&outcome.flushed, &deps).cycle;
        diagnostics.push(GenWarning::CyclicDependency {
            scope: format!("compile batches of unit '{}'", target.name),
            cycle: found.unwrap_or_else(|| outcome.flushed.clone()),
            flushed: outcome.flushed,
        });
    }

    Ok(ordered
        .into_iter()
        .filter_map(|name| by_name.shift_remove(&name))
        .collect())
}

fn language_batches(
    target: &TargetSpec,
    layout: &TargetLayout<'_>,
    registry: &mut CompilerRegistry,
    language: &str,
    sources: &[&SourceSpec],
) -> Result<Vec<CompileBatch>, IrGenError> {
    let reference = registry.reference(&target.name, language)?;
    let launcher = target.launchers.get(language);
    let compiler = match launcher {
        Some(command) => {
            let (executable, _) = split_executable(command);
            registry.add_launcher(&target.name, &executable, language)?
        }
        None => reference.variable.clone(),
    };

    let pch = target.pch.as_ref().filter(|pch| pch.language == language);
    let pch_source = pch.map(|pch| layout.source(&pch.source));
    let mut pch_options = None;
    let mut permutations: BTreeMap<String, Permutation> = BTreeMap::new();

    for source in sources {
        let command = match launcher {
            Some(prefix) => format!("{prefix} {}", source.command),
            None => source.command.clone(),
        };
        validate(&target.name, &command)?;
        let (_, flags) = split_executable(&command);
        let path = layout.source(&source.path);

        if let (Some(spec), Some(creating)) = (pch, pch_source.as_deref())
            && creating == path
        {
            let object = escape_fastbuild(&layout.generated(&spec.object));
            pch_options = Some(expand_tokens(
                &flags,
                &[("{source}", INPUT_PLACEHOLDER), ("{object}", &object)],
            ));
            continue;
        }

        let options = expand_tokens(
            &flags,
            &[("{source}", INPUT_PLACEHOLDER), ("{object}", OUTPUT_PLACEHOLDER)],
        );
        let use_pch = pch.is_some() && !source.skip_pch;
        let key = format!("{options}{{|}}{}", if use_pch { "usePCH" } else { "" });
        let permutation = permutations.entry(key).or_default();
        permutation.options = options;
        permutation.use_pch = use_pch;
        let group = permutation
            .groups
            .entry(source.object_subdir.clone())
            .or_default();
        group.sources.push(path);
        group
            .extra_outputs
            .extend(source.object_outputs.iter().map(|p| layout.generated(p)));
        group
            .extra_dependencies
            .extend(source.object_depends.iter().map(|p| layout.generated(p)));
    }

    let mut batches = Vec::new();
    let mut count = 1usize;
    for (key, permutation) in permutations {
        for (subdir, group) in permutation.groups {
            let mut batch = CompileBatch {
                name: format!("{language}_ObjectGroup_{}-{subdir}-{count}", target.name),
                compiler: compiler.clone(),
                key: key.clone(),
                options: permutation.options.clone(),
                inputs: group.sources,
                output_dir: layout.object_subdir(&subdir),
                output_extension: reference.output_extension.clone(),
                extra_outputs: group.extra_outputs,
                extra_dependencies: group.extra_dependencies,
                ..CompileBatch::default()
            };
            count += 1;
            if let Some(spec) = pch.filter(|_| permutation.use_pch) {
                batch.pch_output_file = Some(layout.generated(&spec.output));
                if let (Some(options), Some(input)) = (&pch_options, &pch_source) {
                    batch.pch_input_file = Some(input.clone());
                    batch.pch_options = Some(options.clone());
                }
            }
            batches.push(batch);
        }
    }
    Ok(batches)
}

/// Turn dependencies on a sibling batch's extra outputs into batch edges.
fn link_sibling_outputs(by_name: &mut IndexMap<String, CompileBatch>) {
    let producers: BTreeMap<String, String> = by_name
        .values()
        .flat_map(|batch| {
            batch
                .extra_outputs
                .iter()
                .map(|output| (output.clone(), batch.name.clone()))
        })
        .collect();
    for batch in by_name.values_mut() {
        let name = batch.name.clone();
        let mut siblings = Vec::new();
        batch.extra_dependencies.retain(|dep| match producers.get(dep) {
            Some(producer) => {
                if *producer != name {
                    siblings.push(producer.clone());
                }
                false
            }
            None => true,
        });
        batch.pre_build_dependencies.extend(siblings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompilerSpec, StringOrList, TargetModel};
    use crate::paths::PathTools;

    fn cxx_compiler(language: &str) -> CompilerSpec {
        CompilerSpec {
            language: language.to_owned(),
            path: "/usr/bin/cc".to_owned(),
            id: "GNU".to_owned(),
            version: "13".to_owned(),
            output_extension: ".o".to_owned(),
            extra_files: StringOrList::Empty,
            use_light_cache: false,
        }
    }

    fn model() -> TargetModel {
        serde_json::from_value(serde_json::json!({
            "model_version": "1.0.0",
            "build_dir": "/b",
            "source_dir": "/s",
        }))
        .expect("model")
    }

    fn target(value: serde_json::Value) -> TargetSpec {
        serde_json::from_value(value).expect("target")
    }

    fn lower(t: &TargetSpec, languages: &[&str]) -> (Vec<CompileBatch>, Diagnostics) {
        let tools = PathTools::new("/b");
        let m = model();
        let layout = TargetLayout::new(&tools, &m, t);
        let specs: Vec<CompilerSpec> = languages.iter().map(|l| cxx_compiler(l)).collect();
        let mut registry = CompilerRegistry::from_specs(&specs);
        let mut diags = Diagnostics::new();
        let batches = compile_batches(t, &layout, &mut registry, &mut diags).expect("batches");
        (batches, diags)
    }

    #[test]
    fn groups_sources_by_options_and_subdir() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [
                {"path": "a.cpp", "language": "CXX", "command": "cc -O2 -c {source} -o {object}"},
                {"path": "b.cpp", "language": "CXX", "command": "cc -O2 -c {source} -o {object}"},
                {"path": "c.cpp", "language": "CXX", "command": "cc -O0 -c {source} -o {object}"},
                {"path": "d.cpp", "language": "CXX", "command": "cc -O2 -c {source} -o {object}", "object_subdir": "sub"},
            ],
        }));
        let (batches, diags) = lower(&t, &["CXX"]);
        assert!(diags.is_empty());
        let names: Vec<&str> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "CXX_ObjectGroup_app--1",
                "CXX_ObjectGroup_app--2",
                "CXX_ObjectGroup_app-sub-3",
            ]
        );
        let first = batches.first().expect("batch");
        assert_eq!(first.inputs, vec!["/s/c.cpp".to_owned()]);
        assert_eq!(first.options, "-O0 -c $FB_INPUT_1_PLACEHOLDER$ -o $FB_INPUT_2_PLACEHOLDER$");
        assert_eq!(first.compiler, ".Compiler_CXX");
        assert_eq!(first.output_dir, "app.dir");
        let second = batches.get(1).expect("batch");
        assert_eq!(second.inputs, vec!["/s/a.cpp".to_owned(), "/s/b.cpp".to_owned()]);
        assert_eq!(batches.get(2).map(|b| b.output_dir.as_str()), Some("app.dir/sub"));
    }

    #[test]
    fn c_family_batches_come_first() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [
                {"path": "k.cu", "language": "CUDA", "command": "nvcc -c {source}"},
                {"path": "m.cpp", "language": "CXX", "command": "cc -c {source}"},
                {"path": "g.c", "language": "C", "command": "cc -c {source}"},
            ],
        }));
        let (batches, diags) = lower(&t, &["C", "CXX", "CUDA"]);
        assert!(diags.is_empty());
        let names: Vec<&str> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["C_ObjectGroup_app--1", "CXX_ObjectGroup_app--1", "CUDA_ObjectGroup_app--1"]
        );
    }

    #[test]
    fn batches_keep_creation_order_past_nine() {
        let sources: Vec<serde_json::Value> = (0..11)
            .map(|n| {
                serde_json::json!({
                    "path": format!("s{n:02}.cpp"),
                    "language": "CXX",
                    "command": format!("cc -DN{n:02} -c {{source}}"),
                })
            })
            .collect();
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": sources,
        }));
        let (batches, _) = lower(&t, &["CXX"]);
        let names: Vec<String> = batches.iter().map(|b| b.name.clone()).collect();
        let expected: Vec<String> = (1..=11)
            .map(|n| format!("CXX_ObjectGroup_app--{n}"))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn cross_language_outputs_become_batch_edges() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [
                {"path": "m.cpp", "language": "CXX", "command": "cc -c {source}",
                 "object_depends": "gen.h"},
                {"path": "g.c", "language": "C", "command": "cc -c {source}",
                 "object_outputs": "gen.h"},
            ],
        }));
        let (batches, diags) = lower(&t, &["C", "CXX"]);
        assert!(diags.is_empty());
        let names: Vec<&str> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["C_ObjectGroup_app--1", "CXX_ObjectGroup_app--1"]);
        let cxx = batches.get(1).expect("cxx");
        assert!(cxx.pre_build_dependencies.contains("C_ObjectGroup_app--1"));
        assert!(cxx.extra_dependencies.is_empty());
    }

    #[test]
    fn mutually_dependent_batches_warn() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [
                {"path": "a.cpp", "language": "CXX", "command": "cc -DA {source}",
                 "object_depends": "b.inc", "object_outputs": "a.inc"},
                {"path": "b.cpp", "language": "CXX", "command": "cc -DB {source}",
                 "object_depends": "a.inc", "object_outputs": "b.inc"},
            ],
        }));
        let (batches, diags) = lower(&t, &["CXX"]);
        assert_eq!(batches.len(), 2);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags.iter().next(),
            Some(GenWarning::CyclicDependency { .. })
        ));
    }

    #[test]
    fn sibling_dependency_reorders_batches() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [
                {"path": "a.cpp", "language": "CXX", "command": "cc -DA {source}",
                 "object_depends": "b.inc"},
                {"path": "b.cpp", "language": "CXX", "command": "cc -DB {source}",
                 "object_outputs": "b.inc"},
            ],
        }));
        let (batches, _) = lower(&t, &["CXX"]);
        let names: Vec<&str> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["CXX_ObjectGroup_app--2", "CXX_ObjectGroup_app--1"]);
    }

    #[test]
    fn pch_source_yields_options_and_no_batch() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "pch": {"source": "pch.cxx", "output": "app.dir/pch.gch", "object": "app.dir/pch.o"},
            "sources": [
                {"path": "pch.cxx", "language": "CXX", "command": "cc -x c++-header {source} -o {object}"},
                {"path": "a.cpp", "language": "CXX", "command": "cc -c {source}"},
                {"path": "b.cpp", "language": "CXX", "command": "cc -c {source}", "skip_pch": true},
            ],
        }));
        let (batches, _) = lower(&t, &["CXX"]);
        assert_eq!(batches.len(), 2);
        let using: Vec<&CompileBatch> = batches.iter().filter(|b| b.key.ends_with("usePCH")).collect();
        assert_eq!(using.len(), 1);
        let batch = using.first().expect("pch batch");
        assert_eq!(batch.pch_input_file.as_deref(), Some("/s/pch.cxx"));
        assert_eq!(
            batch.pch_options.as_deref(),
            Some("-x c++-header $FB_INPUT_1_PLACEHOLDER$ -o app.dir/pch.o")
        );
        assert_eq!(batch.pch_output_file.as_deref(), Some("app.dir/pch.gch"));
        assert!(batches.iter().all(|b| !b.inputs.contains(&"/s/pch.cxx".to_owned())));
    }

    #[test]
    fn launcher_replaces_compiler_reference() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "launchers": {"CXX": "ccache"},
            "sources": [{"path": "a.cpp", "language": "CXX", "command": "cc -c {source}"}],
        }));
        let (batches, _) = lower(&t, &["CXX"]);
        let batch = batches.first().expect("batch");
        assert!(batch.compiler.starts_with(".Launcher_CXX_"));
        assert!(batch.options.starts_with("cc -c"));
    }

    #[test]
    fn unknown_language_is_fatal() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "sources": [{"path": "a.f90", "language": "Fortran", "command": "gfortran -c {source}"}],
        }));
        let tools = PathTools::new("/b");
        let m = model();
        let layout = TargetLayout::new(&tools, &m, &t);
        let mut registry = CompilerRegistry::from_specs(&[cxx_compiler("CXX")]);
        let mut diags = Diagnostics::new();
        let err = compile_batches(&t, &layout, &mut registry, &mut diags).expect_err("fatal");
        assert!(matches!(err, IrGenError::UnknownCompiler { .. }));
    }
}
