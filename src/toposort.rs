//! Stable dependency ordering with fail-soft cycle handling.
//!
//! [`sort_by_dependencies`] linearises any list of hashable items so that every
//! prerequisite is emitted before the items depending on it. The algorithm
//! repeatedly scans the pending items in their current order and emits each
//! item whose prerequisites have all been emitted. Edges pointing at an
//! emitted item are erased immediately, so a later item in the same scan can
//! become ready. Ties therefore always resolve to input order.
//!
//! When a scan emits nothing the remaining items form (or depend on) a cycle.
//! They are appended in their current relative order and reported through
//! [`SortOutcome::flushed`] so callers can raise a diagnostic. The sorter never
//! panics and never fails.
//!
//! # Examples
//!
//! ```
//! use bffgen::toposort::{DependencyMap, sort_by_dependencies};
//!
//! let mut items = vec!["c", "b", "a"];
//! let mut deps = DependencyMap::new();
//! deps.insert("c", "b");
//! deps.insert("b", "a");
//! let outcome = sort_by_dependencies(&mut items, &deps);
//! assert_eq!(items, vec!["a", "b", "c"]);
//! assert!(outcome.is_acyclic());
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

/// Multimap from a dependent item to the prerequisites it waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMap<T: Eq + Hash> {
    edges: IndexMap<T, IndexSet<T>>,
}

impl<T: Eq + Hash> Default for DependencyMap<T> {
    fn default() -> Self {
        Self {
            edges: IndexMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> DependencyMap<T> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` must come after `prerequisite`.
    pub fn insert(&mut self, dependent: T, prerequisite: T) {
        self.edges.entry(dependent).or_default().insert(prerequisite);
    }

    /// Prerequisites recorded for `item`, in insertion order.
    pub fn prerequisites<'a>(&'a self, item: &T) -> impl Iterator<Item = &'a T> + use<'a, T> {
        self.edges.get(item).into_iter().flatten()
    }

    /// Iterate over every `(dependent, prerequisite)` edge.
    pub fn edges(&self) -> impl Iterator<Item = (&T, &T)> + '_ {
        self.edges
            .iter()
            .flat_map(|(dependent, prereqs)| prereqs.iter().map(move |p| (dependent, p)))
    }

    /// Return `true` when no edge has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.values().all(IndexSet::is_empty)
    }
}

impl<T: Clone + Eq + Hash> FromIterator<(T, T)> for DependencyMap<T> {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (dependent, prerequisite) in iter {
            map.insert(dependent, prerequisite);
        }
        map
    }
}

/// Result of a [`sort_by_dependencies`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome<T> {
    /// Items appended by the fail-soft flush because no further progress was
    /// possible. Empty whenever the graph restricted to the items is acyclic.
    pub flushed: Vec<T>,
}

impl<T> SortOutcome<T> {
    /// Return `true` when every item was emitted after its prerequisites.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.flushed.is_empty()
    }
}

/// Reorder `items` in place so prerequisites precede their dependents.
///
/// Edges whose prerequisite is not among `items` do not constrain the order.
/// A self-edge keeps its item pending forever, so it is treated like any other
/// cycle and flushed.
pub fn sort_by_dependencies<T>(items: &mut Vec<T>, deps: &DependencyMap<T>) -> SortOutcome<T>
where
    T: Clone + Eq + Hash,
{
    let present: IndexSet<T> = items.iter().cloned().collect();
    let mut outstanding: HashMap<T, IndexSet<T>> = HashMap::new();
    let mut dependents: HashMap<T, Vec<T>> = HashMap::new();
    for (dependent, prerequisite) in deps.edges() {
        if !present.contains(dependent) || !present.contains(prerequisite) {
            continue;
        }
        let newly_added = outstanding
            .entry(dependent.clone())
            .or_default()
            .insert(prerequisite.clone());
        if newly_added {
            dependents
                .entry(prerequisite.clone())
                .or_default()
                .push(dependent.clone());
        }
    }

    let mut pending = std::mem::take(items);
    let mut ordered = Vec::with_capacity(pending.len());
    let mut flushed = Vec::new();
    while !pending.is_empty() {
        let before = pending.len();
        let mut remaining = Vec::with_capacity(before);
        for item in pending {
            let ready = outstanding.get(&item).is_none_or(IndexSet::is_empty);
            if !ready {
                remaining.push(item);
                continue;
            }
            if let Some(waiting) = dependents.get(&item) {
                for dependent in waiting {
                    if let Some(set) = outstanding.get_mut(dependent) {
                        set.shift_remove(&item);
                    }
                }
            }
            ordered.push(item);
        }
        if remaining.len() == before {
            flushed.clone_from(&remaining);
            ordered.append(&mut remaining);
        }
        pending = remaining;
    }

    *items = ordered;
    SortOutcome { flushed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn map(edges: &[(&'static str, &'static str)]) -> DependencyMap<&'static str> {
        edges.iter().copied().collect()
    }

    #[rstest]
    #[case(vec!["c", "b", "a"], &[("c", "b"), ("b", "a")], vec!["a", "b", "c"])]
    #[case(vec!["a", "b", "c"], &[], vec!["a", "b", "c"])]
    #[case(vec!["b", "a", "c"], &[("b", "c")], vec!["a", "c", "b"])]
    #[case(vec!["x", "y"], &[("y", "missing")], vec!["x", "y"])]
    fn sorts_acyclic_inputs(
        #[case] mut items: Vec<&'static str>,
        #[case] edges: &[(&'static str, &'static str)],
        #[case] expected: Vec<&'static str>,
    ) {
        let outcome = sort_by_dependencies(&mut items, &map(edges));
        assert_eq!(items, expected);
        assert!(outcome.is_acyclic());
    }

    #[test]
    fn later_item_becomes_ready_in_same_scan() {
        // `b` is visited after `a` is emitted, so a single scan suffices and
        // `c` (which waits on `b`) still keeps its relative position.
        let mut items = vec!["a", "b", "c"];
        let outcome = sort_by_dependencies(&mut items, &map(&[("b", "a"), ("c", "b")]));
        assert_eq!(items, vec!["a", "b", "c"]);
        assert!(outcome.flushed.is_empty());
    }

    #[test]
    fn flushes_cycle_in_relative_order() {
        let mut items = vec!["d", "a", "b", "c"];
        let outcome = sort_by_dependencies(
            &mut items,
            &map(&[("a", "b"), ("b", "c"), ("c", "a")]),
        );
        assert_eq!(items, vec!["d", "a", "b", "c"]);
        assert_eq!(outcome.flushed, vec!["a", "b", "c"]);
    }

    #[test]
    fn self_edge_is_flushed() {
        let mut items = vec!["a", "b"];
        let outcome = sort_by_dependencies(&mut items, &map(&[("a", "a")]));
        assert_eq!(items, vec!["b", "a"]);
        assert_eq!(outcome.flushed, vec!["a"]);
    }

    #[test]
    fn dependency_map_reports_prerequisites_in_insertion_order() {
        let deps = map(&[("a", "c"), ("a", "b"), ("a", "c")]);
        let prereqs: Vec<_> = deps.prerequisites(&"a").copied().collect();
        assert_eq!(prereqs, vec!["c", "b"]);
        assert!(!deps.is_empty());
        assert!(DependencyMap::<&str>::new().is_empty());
    }
}
