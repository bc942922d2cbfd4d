//! Lookup from produced paths to the step producing them.

use indexmap::IndexMap;

use super::BuildUnit;

/// Unit and step that write a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer {
    /// Owning unit.
    pub unit: String,
    /// Producing step within the unit.
    pub step: String,
}

/// Maps every declared output and byproduct to the [`Producer`]s declaring it.
///
/// Several units may declare the same path when they share a generating
/// command. Producers are kept in the order given to [`OutputIndex::build`].
#[derive(Debug, Default)]
pub struct OutputIndex {
    producers: IndexMap<String, Vec<Producer>>,
}

impl OutputIndex {
    /// Index compile batch extra outputs, command outputs and link outputs.
    #[must_use]
    pub fn build(units: &[BuildUnit]) -> Self {
        let mut index = Self::default();
        for unit in units {
            for batch in &unit.compile_batches {
                for output in &batch.extra_outputs {
                    index.register(output, &unit.name, &batch.name);
                }
            }
            for step in unit.all_commands() {
                for output in step.outputs() {
                    index.register(output, &unit.name, &step.name);
                }
            }
            if let Some(link) = &unit.link {
                index.register(&link.output, &unit.name, &link.name);
            }
        }
        tracing::debug!(paths = index.producers.len(), "built output index");
        index
    }

    fn register(&mut self, path: &str, unit: &str, step: &str) {
        let producers = self.producers.entry(path.to_owned()).or_default();
        if producers.iter().any(|p| p.unit == unit && p.step == step) {
            return;
        }
        if let Some(owner) = producers.first() {
            tracing::debug!(path, owner = %owner.unit, other = %unit, "path has several producers");
        }
        producers.push(Producer {
            unit: unit.to_owned(),
            step: step.to_owned(),
        });
    }

    /// First producer of `path`, if any step declares it.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Producer> {
        self.producers.get(path).and_then(|producers| producers.first())
    }

    /// Producer of `path` as seen from `unit`.
    ///
    /// Returns `None` when nothing declares `path` or when `unit` is itself
    /// among its producers.
    #[must_use]
    pub fn resolve_for(&self, unit: &str, path: &str) -> Option<&Producer> {
        let producers = self.producers.get(path)?;
        if producers.iter().any(|p| p.unit == unit) {
            return None;
        }
        producers.first()
    }

    /// Number of indexed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Return `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
