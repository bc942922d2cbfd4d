//! Precompiled header sharing across ordered units.

use std::collections::HashSet;

use super::BuildUnit;

/// Ensures each precompiled header is created by exactly one compile batch.
///
/// Scanning units in emission order, the first batch naming a PCH output keeps
/// its creation fields. Later batches keep only `pch_output_file` and so reuse
/// the header instead of building it again.
#[derive(Debug, Default)]
pub struct PchReuseTracker {
    claimed: HashSet<String>,
}

impl PchReuseTracker {
    /// Create a tracker with no claimed headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear creation fields on every batch reusing an earlier header.
    pub fn apply(&mut self, units: &mut [BuildUnit]) {
        for unit in units.iter_mut() {
            for batch in &mut unit.compile_batches {
                let Some(output) = batch.pch_output_file.as_deref() else {
                    continue;
                };
                if output.is_empty() {
                    continue;
                }
                if self.claimed.contains(output) {
                    tracing::debug!(unit = %unit.name, batch = %batch.name, pch = output, "reusing precompiled header");
                    batch.pch_input_file = None;
                    batch.pch_options = None;
                } else {
                    self.claimed.insert(output.to_owned());
                }
            }
        }
    }

    /// Return `true` when `output` has been claimed.
    #[must_use]
    pub fn is_claimed(&self, output: &str) -> bool {
        self.claimed.contains(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CompileBatch;

    fn pch_unit(name: &str, output: Option<&str>) -> BuildUnit {
        let mut unit = BuildUnit::new(name);
        unit.compile_batches.push(CompileBatch {
            name: format!("CXX_ObjectGroup_{name}--1"),
            pch_input_file: output.map(|_| "pch.hxx.cxx".to_owned()),
            pch_options: output.map(|_| "-x c++-header".to_owned()),
            pch_output_file: output.map(str::to_owned),
            ..CompileBatch::default()
        });
        unit
    }

    #[test]
    fn only_first_batch_creates_shared_header() {
        let mut units = vec![
            pch_unit("a", Some("pch.gch")),
            pch_unit("b", Some("pch.gch")),
            pch_unit("c", Some("pch.gch")),
        ];
        let mut tracker = PchReuseTracker::new();
        tracker.apply(&mut units);
        let creators = units
            .iter()
            .flat_map(|u| &u.compile_batches)
            .filter(|b| b.pch_input_file.is_some() && b.pch_options.is_some())
            .count();
        assert_eq!(creators, 1);
        assert!(units.iter().flat_map(|u| &u.compile_batches).all(|b| {
            b.pch_output_file.as_deref() == Some("pch.gch")
        }));
        assert!(units
            .first()
            .and_then(|u| u.compile_batches.first())
            .is_some_and(|b| b.pch_input_file.is_some()));
        assert!(tracker.is_claimed("pch.gch"));
    }

    #[test]
    fn batches_without_header_are_ignored() {
        let mut units = vec![pch_unit("a", None), pch_unit("b", Some("x.gch"))];
        let mut tracker = PchReuseTracker::new();
        tracker.apply(&mut units);
        assert!(units
            .get(1)
            .and_then(|u| u.compile_batches.first())
            .is_some_and(|b| b.pch_input_file.is_some()));
        assert!(!tracker.is_claimed(""));
    }
}
