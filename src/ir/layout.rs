//! Per-target directory layout.

use crate::ast::{TargetModel, TargetSpec};
use crate::paths::PathTools;

/// Directories of one target and the path helpers for the pass.
#[derive(Debug, Clone)]
pub(crate) struct TargetLayout<'a> {
    tools: &'a PathTools,
    source_dir: Option<&'a str>,
    binary_dir: String,
    object_dir: String,
}

impl<'a> TargetLayout<'a> {
    pub(crate) fn new(tools: &'a PathTools, model: &'a TargetModel, target: &TargetSpec) -> Self {
        let build_dir = tools.build_dir().as_str();
        let binary_dir = target
            .binary_dir
            .as_deref()
            .map_or_else(|| build_dir.to_owned(), |dir| PathTools::join(build_dir, dir));
        let object_dir = target.object_dir.as_deref().map_or_else(
            || PathTools::join(&binary_dir, &format!("{}.dir", target.name)),
            |dir| PathTools::join(&binary_dir, dir),
        );
        Self {
            tools,
            source_dir: model.source_dir.as_deref(),
            binary_dir,
            object_dir,
        }
    }

    /// Build-relative form of a source path.
    pub(crate) fn source(&self, path: &str) -> String {
        let resolved = match self.source_dir {
            Some(dir) => PathTools::join(dir, path),
            None => PathTools::normalize(path),
        };
        self.tools.to_build_relative(&resolved)
    }

    /// Build-relative form of a path in the target's binary directory.
    pub(crate) fn generated(&self, path: &str) -> String {
        self.tools
            .to_build_relative(&PathTools::join(&self.binary_dir, path))
    }

    /// Build-relative path of an object subdirectory.
    pub(crate) fn object_subdir(&self, subdir: &str) -> String {
        self.tools
            .to_build_relative(&PathTools::join(&self.object_dir, subdir))
    }

    /// Build-relative binary directory.
    pub(crate) fn binary_dir(&self) -> String {
        self.tools.to_build_relative(&self.binary_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TargetKind;

    fn model(source_dir: Option<&str>) -> TargetModel {
        serde_json::from_value(serde_json::json!({
            "model_version": "1.0.0",
            "build_dir": "/w/build",
            "source_dir": source_dir,
        }))
        .expect("model")
    }

    fn target(binary_dir: Option<&str>) -> TargetSpec {
        serde_json::from_value(serde_json::json!({
            "name": "app",
            "kind": "executable",
            "binary_dir": binary_dir,
        }))
        .expect("target")
    }

    #[test]
    fn defaults_follow_build_dir() {
        let tools = PathTools::new("/w/build");
        let m = model(Some("/w/src"));
        let t = target(None);
        assert_eq!(t.kind, TargetKind::Executable);
        let layout = TargetLayout::new(&tools, &m, &t);
        assert_eq!(layout.binary_dir(), ".");
        assert_eq!(layout.object_subdir(""), "app.dir");
        assert_eq!(layout.object_subdir("sub"), "app.dir/sub");
        assert_eq!(layout.source("main.c"), "/w/src/main.c");
        assert_eq!(layout.generated("gen/x.h"), "gen/x.h");
    }

    #[test]
    fn relative_binary_dir_nests_under_build_dir() {
        let tools = PathTools::new("/w/build");
        let m = model(None);
        let t = target(Some("lib"));
        let layout = TargetLayout::new(&tools, &m, &t);
        assert_eq!(layout.binary_dir(), "lib");
        assert_eq!(layout.generated("x.h"), "lib/x.h");
        assert_eq!(layout.object_subdir(""), "lib/app.dir");
        assert_eq!(layout.source("rel/main.c"), "rel/main.c");
    }
}
