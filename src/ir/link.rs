//! Link and archive steps.

use std::collections::{BTreeSet, HashSet};

use super::layout::TargetLayout;
use super::shell::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER, escape_fastbuild, expand_tokens, split_executable, validate};
use super::{CompileBatch, IrGenError, LinkKind, LinkStep};
use crate::ast::{TargetKind, TargetSpec};

/// Suffix of the alias grouping a unit's compile batches.
pub(crate) const OBJECTS_SUFFIX: &str = "-objects";

/// Alias name grouping the compile batches of `unit`.
pub(crate) fn objects_alias(unit: &str) -> String {
    format!("{unit}{OBJECTS_SUFFIX}")
}

const fn link_kind(kind: TargetKind) -> Option<LinkKind> {
    match kind {
        TargetKind::Executable => Some(LinkKind::Executable),
        TargetKind::SharedLibrary | TargetKind::ModuleLibrary => Some(LinkKind::SharedLibrary),
        TargetKind::StaticLibrary => Some(LinkKind::StaticLibrary),
        TargetKind::ObjectLibrary | TargetKind::Utility | TargetKind::Global => None,
    }
}

/// Build the link step of `target`, if its kind links.
///
/// `object_libraries` names the object library targets that own compile
/// batches; linking one of them links its objects alias.
pub(crate) fn link_step(
    target: &TargetSpec,
    layout: &TargetLayout<'_>,
    batches: &[CompileBatch],
    object_libraries: &HashSet<&str>,
) -> Result<Option<LinkStep>, IrGenError> {
    let Some(kind) = link_kind(target.kind) else {
        return Ok(None);
    };
    let Some(spec) = &target.link else {
        return Err(IrGenError::MissingLinkCommand {
            unit: target.name.clone(),
        });
    };
    validate(&target.name, &spec.command)?;
    let (linker, flags) = split_executable(&spec.command);
    let options = expand_tokens(
        &flags,
        &[("{objects}", INPUT_PLACEHOLDER), ("{output}", OUTPUT_PLACEHOLDER)],
    );
    let output = layout.generated(target.output.as_deref().unwrap_or(&target.name));

    let mut libraries: BTreeSet<String> = spec
        .objects
        .iter()
        .map(|object| {
            if object_libraries.contains(object.as_str()) {
                objects_alias(object)
            } else {
                layout.generated(object)
            }
        })
        .collect();
    libraries.extend(batches.iter().map(|batch| batch.name.clone()));

    Ok(Some(LinkStep {
        name: target.name.clone(),
        kind,
        linker: escape_fastbuild(&linker),
        options,
        output,
        linker_type: String::from("auto"),
        compiler: String::from(".Compiler_dummy"),
        compiler_options: batches
            .first()
            .map(|batch| batch.options.clone())
            .unwrap_or_default(),
        libraries: libraries.into_iter().collect(),
    }))
}

/// Object library targets linked by `target`.
pub(crate) fn linked_object_libraries<'a>(
    target: &'a TargetSpec,
    object_libraries: &HashSet<&str>,
) -> Vec<&'a str> {
    target
        .link
        .iter()
        .flat_map(|link| link.objects.iter())
        .map(String::as_str)
        .filter(|object| object_libraries.contains(object))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TargetModel;
    use crate::paths::PathTools;
    use rstest::rstest;

    fn model() -> TargetModel {
        serde_json::from_value(serde_json::json!({
            "model_version": "1.0.0",
            "build_dir": "/b",
        }))
        .expect("model")
    }

    fn target(value: serde_json::Value) -> TargetSpec {
        serde_json::from_value(value).expect("target")
    }

    fn batch(name: &str, options: &str) -> CompileBatch {
        CompileBatch {
            name: name.to_owned(),
            options: options.to_owned(),
            ..CompileBatch::default()
        }
    }

    #[rstest]
    #[case("executable", Some(LinkKind::Executable))]
    #[case("module_library", Some(LinkKind::SharedLibrary))]
    #[case("static_library", Some(LinkKind::StaticLibrary))]
    #[case("utility", None)]
    #[case("object_library", None)]
    fn kinds_map_to_link_kinds(#[case] kind: &str, #[case] expected: Option<LinkKind>) {
        let t = target(serde_json::json!({
            "name": "x",
            "kind": kind,
            "link": {"command": "ld {objects} -o {output}"},
        }));
        let tools = PathTools::new("/b");
        let m = model();
        let layout = TargetLayout::new(&tools, &m, &t);
        let step = link_step(&t, &layout, &[], &HashSet::new()).expect("link");
        assert_eq!(step.map(|s| s.kind), expected);
    }

    #[test]
    fn link_collects_batches_and_objects() {
        let t = target(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "output": "bin/app",
            "link": {"command": "/usr/bin/c++ {objects} -o {output} -lm", "objects": ["core", "/opt/libz.a"]},
        }));
        let tools = PathTools::new("/b");
        let m = model();
        let layout = TargetLayout::new(&tools, &m, &t);
        let libs = HashSet::from(["core"]);
        let batches = [batch("CXX_ObjectGroup_app--1", "-O2 -c")];
        let step = link_step(&t, &layout, &batches, &libs)
            .expect("link")
            .expect("step");
        assert_eq!(step.linker, "/usr/bin/c++");
        assert_eq!(step.options, "$FB_INPUT_1_PLACEHOLDER$ -o $FB_INPUT_2_PLACEHOLDER$ -lm");
        assert_eq!(step.output, "bin/app");
        assert_eq!(
            step.libraries,
            vec![
                "/opt/libz.a".to_owned(),
                "CXX_ObjectGroup_app--1".to_owned(),
                "core-objects".to_owned(),
            ]
        );
        assert_eq!(step.compiler_options, "-O2 -c");
        assert_eq!(linked_object_libraries(&t, &libs), vec!["core"]);
    }

    #[test]
    fn missing_link_command_is_fatal() {
        let t = target(serde_json::json!({"name": "lib", "kind": "static_library"}));
        let tools = PathTools::new("/b");
        let m = model();
        let layout = TargetLayout::new(&tools, &m, &t);
        let err = link_step(&t, &layout, &[], &HashSet::new()).expect_err("fatal");
        assert!(matches!(err, IrGenError::MissingLinkCommand { ref unit } if unit == "lib"));
    }
}
