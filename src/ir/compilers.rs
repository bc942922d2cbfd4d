//! Compiler definitions derived from the model.

use std::collections::{BTreeMap, HashMap};

use camino::Utf8Path;

use super::shell::escape_fastbuild;
use super::{Compiler, CompilerFamily, IrGenError};
use crate::ast::CompilerSpec;
use crate::hasher::short_hash;

/// Files `cl.exe` from Visual Studio 2019 and later loads at run time.
const MSVC_1920_FILES: [&str; 16] = [
    "c1.dll",
    "c1xx.dll",
    "c2.dll",
    "atlprov.dll",
    "msobj140.dll",
    "mspdb140.dll",
    "mspdbcore.dll",
    "mspdbsrv.exe",
    "mspft140.dll",
    "msvcp140.dll",
    "msvcp140_atomic_wait.dll",
    "tbbmalloc.dll",
    "vcruntime140.dll",
    "vcruntime140_1.dll",
    "1033/clui.dll",
    "1033/mspft140ui.dll",
];

/// Files `cl.exe` from Visual Studio 2017 loads at run time.
const MSVC_1910_FILES: [&str; 12] = [
    "c1.dll",
    "c1xx.dll",
    "c2.dll",
    "atlprov.dll",
    "msobj140.dll",
    "mspdb140.dll",
    "mspdbcore.dll",
    "mspdbsrv.exe",
    "mspft140.dll",
    "msvcp140.dll",
    "vcruntime140.dll",
    "1033/clui.dll",
];

/// Compiler reference handed to a compile batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompilerRef {
    /// Variable reference, for example `.Compiler_CXX`.
    pub(crate) variable: String,
    /// Object file extension.
    pub(crate) output_extension: String,
}

#[derive(Debug, Clone)]
struct LanguageInfo {
    id: String,
    output_extension: String,
    use_light_cache: bool,
}

/// Compilers known to one generation pass.
#[derive(Debug, Default)]
pub(crate) struct CompilerRegistry {
    compilers: BTreeMap<String, Compiler>,
    languages: HashMap<String, LanguageInfo>,
}

impl CompilerRegistry {
    pub(crate) fn from_specs(specs: &[CompilerSpec]) -> Self {
        let mut registry = Self::default();
        for spec in specs {
            registry.add(spec);
        }
        registry
    }

    fn add(&mut self, spec: &CompilerSpec) {
        let path = Utf8Path::new(&spec.path);
        let (root, executable) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(file)) if !parent.as_str().is_empty() => {
                (Some(parent.as_str().to_owned()), format!("$Root$/{}", escape_fastbuild(file)))
            }
            _ => (None, escape_fastbuild(&spec.path)),
        };
        let use_light_cache = light_cache_allowed(spec, &spec.language);
        let mut extra_files: Vec<String> = spec.extra_files.iter().map(|f| escape_fastbuild(f)).collect();
        extra_files.extend(msvc_extra_files(spec));
        let compiler = Compiler {
            name: format!("Compiler-{}", spec.language),
            language: spec.language.clone(),
            root,
            executable,
            family: CompilerFamily::detect(&spec.id, &spec.language),
            use_light_cache,
            extra_files,
        };
        tracing::debug!(compiler = %compiler.name, family = compiler.family.as_str(), "registered compiler");
        self.compilers.insert(spec.language.clone(), compiler);
        self.languages.insert(
            spec.language.clone(),
            LanguageInfo {
                id: spec.id.clone(),
                output_extension: spec.output_extension.clone(),
                use_light_cache,
            },
        );
    }

    /// Compiler used for `language` sources in `unit`.
    pub(crate) fn reference(&self, unit: &str, language: &str) -> Result<CompilerRef, IrGenError> {
        let (Some(compiler), Some(info)) =
            (self.compilers.get(language), self.languages.get(language))
        else {
            return Err(IrGenError::UnknownCompiler {
                unit: unit.to_owned(),
                language: language.to_owned(),
            });
        };
        let output_extension = if language == "RC" {
            String::from(".res")
        } else {
            info.output_extension.clone()
        };
        Ok(CompilerRef {
            variable: format!(".{}", compiler.variable()),
            output_extension,
        })
    }

    /// Register `launcher` as the executable wrapping `language` compiles and
    /// return its variable reference.
    pub(crate) fn add_launcher(&mut self, unit: &str, launcher: &str, language: &str) -> Result<String, IrGenError> {
        let Some(info) = self.languages.get(language) else {
            return Err(IrGenError::UnknownCompiler {
                unit: unit.to_owned(),
                language: language.to_owned(),
            });
        };
        let hash = short_hash(launcher);
        let compiler = Compiler {
            name: format!("Launcher-{language}-{hash}"),
            language: language.to_owned(),
            root: None,
            executable: escape_fastbuild(launcher),
            family: CompilerFamily::detect(&info.id, language),
            use_light_cache: info.use_light_cache,
            extra_files: Vec::new(),
        };
        let variable = format!(".{}", compiler.variable());
        self.compilers
            .entry(format!("{language}-{hash}"))
            .or_insert(compiler);
        Ok(variable)
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, Compiler> {
        self.compilers
    }
}

fn light_cache_allowed(spec: &CompilerSpec, language: &str) -> bool {
    spec.use_light_cache && spec.id == "MSVC" && matches!(language, "C" | "CXX")
}

fn msvc_extra_files(spec: &CompilerSpec) -> Vec<String> {
    if spec.id != "MSVC" || !matches!(spec.language.as_str(), "C" | "CXX") {
        return Vec::new();
    }
    let files: &[&str] = if version_at_least(&spec.version, 19, 20) {
        &MSVC_1920_FILES
    } else if version_at_least(&spec.version, 19, 10) {
        &MSVC_1910_FILES
    } else {
        &[]
    };
    files.iter().map(|file| format!("$Root$/{file}")).collect()
}

/// Compare the first two dotted components of `version`.
fn version_at_least(version: &str, major: u64, minor: u64) -> bool {
    let mut parts = version
        .split('.')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0));
    let found_major = parts.next().unwrap_or(0);
    let found_minor = parts.next().unwrap_or(0);
    (found_major, found_minor) >= (major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StringOrList;
    use rstest::rstest;

    fn spec(language: &str, id: &str, version: &str, path: &str) -> CompilerSpec {
        CompilerSpec {
            language: language.to_owned(),
            path: path.to_owned(),
            id: id.to_owned(),
            version: version.to_owned(),
            output_extension: ".o".to_owned(),
            extra_files: StringOrList::Empty,
            use_light_cache: true,
        }
    }

    #[rstest]
    #[case("19.29.30133", 16)]
    #[case("19.16", 12)]
    #[case("19.0", 0)]
    fn msvc_extra_files_follow_version(#[case] version: &str, #[case] expected: usize) {
        let files = msvc_extra_files(&spec("CXX", "MSVC", version, "C:/VC/bin/cl.exe"));
        assert_eq!(files.len(), expected);
        assert!(files.iter().all(|f| f.starts_with("$Root$/")));
    }

    #[test]
    fn compiler_splits_root_and_executable() {
        let registry = CompilerRegistry::from_specs(&[spec("CXX", "GNU", "13.2", "/usr/bin/g++")]);
        let compilers = registry.into_map();
        let cxx = compilers.get("CXX").expect("CXX");
        assert_eq!(cxx.name, "Compiler-CXX");
        assert_eq!(cxx.root.as_deref(), Some("/usr/bin"));
        assert_eq!(cxx.executable, "$Root$/g++");
        assert_eq!(cxx.family, CompilerFamily::Gcc);
        assert!(!cxx.use_light_cache);
    }

    #[test]
    fn light_cache_requires_msvc() {
        let registry = CompilerRegistry::from_specs(&[
            spec("C", "MSVC", "19.20", "C:/VC/cl.exe"),
            spec("CUDA", "MSVC", "19.20", "C:/VC/cl.exe"),
        ]);
        let compilers = registry.into_map();
        assert!(compilers.get("C").is_some_and(|c| c.use_light_cache));
        assert!(compilers.get("CUDA").is_some_and(|c| !c.use_light_cache));
    }

    #[test]
    fn reference_reports_unknown_language() {
        let registry = CompilerRegistry::from_specs(&[spec("C", "GNU", "13", "/usr/bin/gcc")]);
        let found = registry.reference("app", "C").expect("C");
        assert_eq!(found.variable, ".Compiler_C");
        let err = registry.reference("app", "Fortran").expect_err("unknown");
        assert!(matches!(err, IrGenError::UnknownCompiler { ref language, .. } if language == "Fortran"));
    }

    #[test]
    fn resource_compiler_uses_res_extension() {
        let registry = CompilerRegistry::from_specs(&[spec("RC", "", "", "rc.exe")]);
        let found = registry.reference("app", "RC").expect("RC");
        assert_eq!(found.output_extension, ".res");
    }

    #[test]
    fn launcher_is_registered_once() {
        let mut registry = CompilerRegistry::from_specs(&[spec("CXX", "Clang", "17", "/usr/bin/clang++")]);
        let first = registry.add_launcher("a", "/usr/bin/ccache", "CXX").expect("launcher");
        let second = registry.add_launcher("b", "/usr/bin/ccache", "CXX").expect("launcher");
        assert_eq!(first, second);
        let hash = short_hash("/usr/bin/ccache");
        assert_eq!(first, format!(".Launcher_CXX_{hash}"));
        let compilers = registry.into_map();
        assert_eq!(compilers.len(), 2);
        let launcher = compilers.get(&format!("CXX-{hash}")).expect("launcher");
        assert_eq!(launcher.executable, "/usr/bin/ccache");
        assert_eq!(launcher.family, CompilerFamily::Clang);
    }
}
