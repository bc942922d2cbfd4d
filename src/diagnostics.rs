//! Non-fatal findings collected during one generation pass.
//!
//! Warnings never abort lowering. Each one is logged through `tracing` as it
//! is recorded and kept in a [`Diagnostics`] list so the runner can report a
//! count or refuse to write output under `--deny-warnings`.

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

use miette::Diagnostic;
use thiserror::Error;

/// A recoverable problem in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GenWarning {
    /// A unit depends on a name that no unit defines.
    #[error("unit '{unit}' depends on unknown target '{dependency}'")]
    #[diagnostic(
        code(bffgen::ir::unresolved_dependency),
        severity(Warning),
        help("the dependency is skipped; check the target name for typos")
    )]
    UnresolvedDependency {
        /// Dependent unit.
        unit: String,
        /// Name that did not resolve.
        dependency: String,
    },

    /// Ordering gave up on a dependency cycle.
    #[error("dependency cycle among {scope}: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(bffgen::ir::cyclic_dependency),
        severity(Warning),
        help("items in the cycle are emitted in declaration order")
    )]
    CyclicDependency {
        /// What was being ordered, for example `units` or `unit 'app' batches`.
        scope: String,
        /// Concrete cycle, first element repeated at the end.
        cycle: Vec<String>,
        /// Items appended without ordering.
        flushed: Vec<String>,
    },

    /// A unit is emitted before one of its dependencies.
    #[error("unit '{unit}' is emitted before its dependency '{dependency}'")]
    #[diagnostic(code(bffgen::ir::order_violation), severity(Warning))]
    OrderViolation {
        /// Dependent unit.
        unit: String,
        /// Dependency emitted later.
        dependency: String,
    },
}

/// Ordered collection of [`GenWarning`]s.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<GenWarning>,
}

impl Diagnostics {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Record and log a warning.
    pub fn push(&mut self, warning: GenWarning) {
        tracing::warn!(code = %warning_code(&warning), "{warning}");
        self.warnings.push(warning);
    }

    /// Iterate over recorded warnings.
    pub fn iter(&self) -> std::slice::Iter<'_, GenWarning> {
        self.warnings.iter()
    }

    /// Number of recorded warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Return `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consume the collection.
    #[must_use]
    pub fn into_vec(self) -> Vec<GenWarning> {
        self.warnings
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a GenWarning;
    type IntoIter = std::slice::Iter<'a, GenWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn warning_code(warning: &GenWarning) -> String {
    warning
        .code()
        .map_or_else(String::new, |code| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_joins_members() {
        let warning = GenWarning::CyclicDependency {
            scope: "units".into(),
            cycle: vec!["a".into(), "b".into(), "a".into()],
            flushed: vec!["a".into(), "b".into()],
        };
        assert_eq!(warning.to_string(), "dependency cycle among units: a -> b -> a");
        assert_eq!(warning_code(&warning), "bffgen::ir::cyclic_dependency");
    }

    #[test]
    fn push_keeps_insertion_order() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(GenWarning::UnresolvedDependency {
            unit: "app".into(),
            dependency: "ghost".into(),
        });
        diags.push(GenWarning::OrderViolation {
            unit: "app".into(),
            dependency: "lib".into(),
        });
        assert_eq!(diags.len(), 2);
        let first = diags.iter().next().map(ToString::to_string);
        assert_eq!(
            first.as_deref(),
            Some("unit 'app' depends on unknown target 'ghost'")
        );
        assert!(matches!(
            diags.into_vec().get(1),
            Some(GenWarning::OrderViolation { .. })
        ));
    }
}
