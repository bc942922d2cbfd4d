//! Target model loading helpers.
//!
//! The YAML document is parsed into a `serde_json::Value` first so syntax
//! errors carry precise source spans, then deserialised into
//! [`TargetModel`]. JSON documents are valid YAML and load the same way.
//! Diagnostics wrap model identifiers in [`ModelName`] and YAML text in
//! [`ModelSource`].

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::ast::TargetModel;

mod diagnostics;
mod hints;

pub use diagnostics::{ModelError, ModelName, ModelSource, map_data_error, map_yaml_error};

/// Major version of the model format this build reads.
pub const SUPPORTED_MAJOR: u64 = 1;

/// Parse a target model, naming it `name` in diagnostics.
///
/// # Errors
///
/// Returns [`ModelError`] when the YAML is malformed, does not match the
/// schema, or declares an unsupported `model_version`.
pub fn from_str_named(yaml: &str, name: &ModelName) -> Result<TargetModel, ModelError> {
    let doc: serde_json::Value =
        serde_saphyr::from_str(yaml).map_err(|e| ModelError::Parse {
            source: map_yaml_error(e, &ModelSource::from(yaml), name),
            message: String::from("target model parse error"),
        })?;
    let model: TargetModel = serde_json::from_value(doc).map_err(|e| ModelError::Parse {
        source: map_data_error(e, name),
        message: String::from("target model parse error"),
    })?;
    if model.model_version.major != SUPPORTED_MAJOR {
        return Err(ModelError::UnsupportedVersion {
            name: name.to_string(),
            version: model.model_version,
        });
    }
    tracing::debug!(
        model = %name,
        targets = model.targets.len(),
        compilers = model.compilers.len(),
        "parsed target model"
    );
    Ok(model)
}

/// Parse a target model from a string.
///
/// # Errors
///
/// Returns [`ModelError`] when parsing fails.
///
/// # Examples
///
/// ```rust
/// let yaml = "model_version: 1.0.0\nbuild_dir: /b\ntargets: []\n";
/// let model = bffgen::model::from_str(yaml).expect("parse");
/// assert!(model.targets.is_empty());
/// ```
pub fn from_str(yaml: &str) -> Result<TargetModel, ModelError> {
    from_str_named(yaml, &ModelName::new(bff_env::DEFAULT_MODEL_FILE))
}

/// Load a [`TargetModel`] from the given file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsing fails.
pub fn from_path(path: impl AsRef<Path>) -> Result<TargetModel> {
    let path_ref = path.as_ref();
    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read target model {}", path_ref.display()))?;
    let name = ModelName::new(path_ref.display().to_string());
    Ok(from_str_named(&data, &name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{StringOrList, TargetKind};
    use rstest::rstest;

    #[test]
    fn parses_full_target() {
        let yaml = concat!(
            "model_version: 1.2.0\n",
            "build_dir: /work/build\n",
            "compilers:\n",
            "  - language: CXX\n",
            "    path: /usr/bin/g++\n",
            "    id: GNU\n",
            "targets:\n",
            "  - name: app\n",
            "    kind: executable\n",
            "    depends: core\n",
            "    link:\n",
            "      command: /usr/bin/g++ {objects} -o {output}\n",
            "    sources:\n",
            "      - path: /work/src/main.cpp\n",
            "        language: CXX\n",
            "        command: /usr/bin/g++ -c {source} -o {object}\n",
        );
        let model = from_str(yaml).expect("parse");
        let target = model.targets.first().expect("target");
        assert_eq!(target.kind, TargetKind::Executable);
        assert_eq!(target.depends, StringOrList::String("core".into()));
        assert_eq!(model.settings.shell, "/bin/sh");
        let compiler = model.compilers.first().expect("compiler");
        assert_eq!(compiler.output_extension, ".o");
    }

    #[rstest]
    #[case("model_version: 2.0.0\nbuild_dir: /b\n")]
    #[case("model_version: 0.9.0\nbuild_dir: /b\n")]
    fn rejects_other_major_versions(#[case] yaml: &str) {
        let err = from_str(yaml).expect_err("version");
        assert!(matches!(err, ModelError::UnsupportedVersion { .. }));
    }

    #[rstest]
    #[case("model_version: 1.0.0\nbuild_dir: /b\nunknown: 1\n")]
    #[case("model_version: 1.0.0\nbuild_dir: /b\ntargets:\n  - name: x\n    kind: program\n")]
    #[case("build_dir: /b\n")]
    fn rejects_schema_mismatches(#[case] yaml: &str) {
        let err = from_str(yaml).expect_err("schema");
        assert!(matches!(err, ModelError::Parse { .. }));
    }

    #[test]
    fn accepts_json_documents() {
        let json = r#"{"model_version": "1.0.0", "build_dir": "/b", "targets": []}"#;
        assert!(from_str(json).is_ok());
    }
}
