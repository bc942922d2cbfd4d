//! Lexical path helpers used while lowering the model.
//!
//! Nothing here touches the filesystem. Paths are normalised by collapsing
//! `.` and `..` components and converting separators to `/`, which is the form
//! FASTBuild accepts on every host.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalises paths and expresses them relative to the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTools {
    build_dir: Utf8PathBuf,
}

impl PathTools {
    /// Create helpers rooted at `build_dir`.
    #[must_use]
    pub fn new(build_dir: impl AsRef<str>) -> Self {
        Self {
            build_dir: Utf8PathBuf::from(Self::normalize(build_dir.as_ref())),
        }
    }

    /// The normalised build directory.
    #[must_use]
    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Collapse `.` and `..` components and use forward slashes.
    ///
    /// `..` components that would climb above the start of a relative path are
    /// kept; those above the root of an absolute path are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bffgen::paths::PathTools;
    /// assert_eq!(PathTools::normalize("a/./b/../c"), "a/c");
    /// assert_eq!(PathTools::normalize("a\\b"), "a/b");
    /// assert_eq!(PathTools::normalize("../x"), "../x");
    /// ```
    #[must_use]
    pub fn normalize(path: &str) -> String {
        let slashed = path.replace('\\', "/");
        let mut prefix = String::new();
        let mut parts: Vec<&str> = Vec::new();
        for component in Utf8Path::new(&slashed).components() {
            match component {
                Utf8Component::Prefix(p) => prefix.push_str(p.as_str()),
                Utf8Component::RootDir => prefix.push('/'),
                Utf8Component::CurDir => {}
                Utf8Component::ParentDir => match parts.last() {
                    Some(&last) if last != ".." => {
                        parts.pop();
                    }
                    _ if prefix.ends_with('/') => {}
                    _ => parts.push(".."),
                },
                Utf8Component::Normal(part) => parts.push(part),
            }
        }
        let joined = parts.join("/");
        if prefix.is_empty() && joined.is_empty() {
            String::from(".")
        } else {
            format!("{prefix}{joined}")
        }
    }

    /// Return `true` for rooted paths, including Windows drive paths.
    #[must_use]
    pub fn is_absolute(path: &str) -> bool {
        let slashed = path.replace('\\', "/");
        let bytes = slashed.as_bytes();
        slashed.starts_with('/')
            || matches!(
                (bytes.first(), bytes.get(1), bytes.get(2)),
                (Some(drive), Some(b':'), Some(b'/')) if drive.is_ascii_alphabetic()
            )
    }

    /// Express `path` relative to the build directory when it lives inside it.
    ///
    /// Relative inputs are taken to be relative to the build directory already
    /// and are only normalised. Absolute paths outside the build directory are
    /// returned normalised but otherwise unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use bffgen::paths::PathTools;
    /// let tools = PathTools::new("/work/build");
    /// assert_eq!(tools.to_build_relative("/work/build/app/main.o"), "app/main.o");
    /// assert_eq!(tools.to_build_relative("/work/src/main.c"), "/work/src/main.c");
    /// assert_eq!(tools.to_build_relative("gen/./x.h"), "gen/x.h");
    /// ```
    #[must_use]
    pub fn to_build_relative(&self, path: &str) -> String {
        let normalized = Self::normalize(path);
        if !Self::is_absolute(&normalized) {
            return normalized;
        }
        match Utf8Path::new(&normalized).strip_prefix(&self.build_dir) {
            Ok(rest) if rest.as_str().is_empty() => String::from("."),
            Ok(rest) => rest.as_str().to_owned(),
            Err(_) => normalized,
        }
    }

    /// Join `child` onto `base` and normalise the result.
    #[must_use]
    pub fn join(base: &str, child: &str) -> String {
        if child.is_empty() {
            return Self::normalize(base);
        }
        if Self::is_absolute(child) {
            return Self::normalize(child);
        }
        Self::normalize(&format!("{base}/{child}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/../a", "/a")]
    #[case("a/../../b", "../b")]
    #[case("./", ".")]
    #[case("a//b/", "a/b")]
    #[case("C:\\work\\src", "C:/work/src")]
    fn normalize_collapses_components(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(PathTools::normalize(input), expected);
    }

    #[rstest]
    #[case("/usr/bin", true)]
    #[case("C:/tools", true)]
    #[case("c:\\tools", true)]
    #[case("rel/path", false)]
    #[case("C:", false)]
    fn is_absolute_detects_roots(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(PathTools::is_absolute(input), expected);
    }

    #[test]
    fn build_dir_itself_becomes_dot() {
        let tools = PathTools::new("/work/build/");
        assert_eq!(tools.to_build_relative("/work/build"), ".");
        assert_eq!(tools.build_dir().as_str(), "/work/build");
    }

    #[test]
    fn sibling_prefix_is_not_stripped() {
        let tools = PathTools::new("/work/build");
        assert_eq!(
            tools.to_build_relative("/work/build-other/x.o"),
            "/work/build-other/x.o"
        );
    }

    #[rstest]
    #[case("/b/app.dir", "", "/b/app.dir")]
    #[case("/b/app.dir", "src", "/b/app.dir/src")]
    #[case("/b", "/abs/x", "/abs/x")]
    fn join_handles_empty_and_absolute_children(
        #[case] base: &str,
        #[case] child: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(PathTools::join(base, child), expected);
    }
}
