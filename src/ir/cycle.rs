//! Cycle detection over a [`DependencyMap`].
//!
//! The sorter only knows that it could not make progress. This module finds a
//! concrete cycle among the flushed items so the warning can name it.

use std::collections::HashMap;
use std::hash::Hash;

use crate::toposort::DependencyMap;

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

pub(crate) struct CycleDetectionReport<T> {
    pub(crate) cycle: Option<Vec<T>>,
}

/// Search `nodes` for a cycle, following only edges between members.
///
/// Nodes are visited in slice order so the reported cycle is deterministic.
pub(crate) fn analyse<T>(nodes: &[T], deps: &DependencyMap<T>) -> CycleDetectionReport<T>
where
    T: Clone + Eq + Hash + Ord + std::fmt::Debug,
{
    let mut detector = CycleDetector::new(nodes, deps);
    let mut cycle = None;
    for node in nodes {
        if detector.is_visited(node) {
            continue;
        }
        if let Some(found) = detector.visit(node.clone()) {
            cycle = Some(found);
            break;
        }
    }
    CycleDetectionReport { cycle }
}

struct CycleDetector<'a, T: Eq + Hash> {
    members: &'a [T],
    deps: &'a DependencyMap<T>,
    stack: Vec<T>,
    states: HashMap<T, VisitState>,
}

impl<'a, T> CycleDetector<'a, T>
where
    T: Clone + Eq + Hash + Ord + std::fmt::Debug,
{
    fn new(members: &'a [T], deps: &'a DependencyMap<T>) -> Self {
        Self {
            members,
            deps,
            stack: Vec::new(),
            states: HashMap::new(),
        }
    }

    fn is_visited(&self, node: &T) -> bool {
        matches!(self.states.get(node), Some(VisitState::Visited))
    }

    fn visit(&mut self, node: T) -> Option<Vec<T>> {
        match self.states.get(&node) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| n == &node)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting node must be on the stack");
                        0
                    });
                let mut cycle: Vec<T> = self.stack.iter().skip(idx).cloned().collect();
                cycle.push(node);
                return Some(canonicalize_cycle(cycle));
            }
            None => {
                self.states.insert(node.clone(), VisitState::Visiting);
            }
        }

        self.stack.push(node.clone());

        let prerequisites: Vec<T> = self.deps.prerequisites(&node).cloned().collect();
        for dep in prerequisites {
            if !self.members.contains(&dep) {
                tracing::trace!(
                    missing = ?dep,
                    dependent = ?node,
                    "skipping prerequisite outside the analysed set",
                );
                continue;
            }
            if let Some(cycle) = self.visit(dep) {
                return Some(cycle);
            }
        }

        self.stack.pop();
        self.states.insert(node, VisitState::Visited);
        None
    }
}

fn canonicalize_cycle<T: Clone + Ord>(mut cycle: Vec<T>) -> Vec<T> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}
