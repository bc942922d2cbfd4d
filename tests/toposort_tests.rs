//! Property tests for the dependency sorter.

use bffgen::toposort::{DependencyMap, sort_by_dependencies};
use proptest::prelude::*;

/// Random DAG over `0..n`: edges only point from a later label to an earlier
/// one, so the graph is acyclic whatever order the items arrive in.
fn dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let items = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        let edges = prop::collection::vec((0..n, 0..n), 0..(n * 2)).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| if a > b { (a, b) } else { (b, a) })
                .collect::<Vec<_>>()
        });
        (items, edges)
    })
}

fn position(items: &[usize], item: usize) -> Option<usize> {
    items.iter().position(|candidate| *candidate == item)
}

proptest! {
    #[test]
    fn acyclic_graphs_order_every_edge((input, edges) in dag()) {
        let mut items = input.clone();
        let deps: DependencyMap<usize> = edges.iter().copied().collect();
        let outcome = sort_by_dependencies(&mut items, &deps);

        prop_assert!(outcome.is_acyclic());
        let mut sorted_in = input;
        sorted_in.sort_unstable();
        let mut sorted_out = items.clone();
        sorted_out.sort_unstable();
        prop_assert_eq!(sorted_in, sorted_out);
        for (dependent, prerequisite) in edges {
            prop_assert!(position(&items, prerequisite) < position(&items, dependent));
        }
    }

    #[test]
    fn unconstrained_items_keep_input_order(input in prop::collection::vec(0u32..1000, 0..32)) {
        let mut items = input.clone();
        let outcome = sort_by_dependencies(&mut items, &DependencyMap::new());
        prop_assert!(outcome.is_acyclic());
        prop_assert_eq!(items, input);
    }

    #[test]
    fn same_input_sorts_the_same_way(
        (input, edges) in (1usize..24).prop_flat_map(|n| (
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            prop::collection::vec((0..n, 0..n), 0..(n * 3)),
        ))
    ) {
        let mut first = input.clone();
        let first_outcome = sort_by_dependencies(&mut first, &edges.iter().copied().collect());
        let mut second = input;
        let second_outcome = sort_by_dependencies(&mut second, &edges.iter().copied().collect());
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_outcome.flushed, second_outcome.flushed);
    }

    #[test]
    fn cycles_never_lose_items(n in 2usize..12) {
        let mut items: Vec<usize> = (0..n).collect();
        let deps: DependencyMap<usize> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let outcome = sort_by_dependencies(&mut items, &deps);
        prop_assert_eq!(outcome.flushed.len(), n);
        prop_assert_eq!(items, (0..n).collect::<Vec<_>>());
    }
}

#[test]
fn blocked_items_wait_for_the_next_scan() {
    let mut items = vec!["cxx", "c", "cuda"];
    let deps: DependencyMap<&str> = [("cxx", "c")].into_iter().collect();
    let outcome = sort_by_dependencies(&mut items, &deps);
    assert!(outcome.is_acyclic());
    assert_eq!(items, vec!["c", "cuda", "cxx"]);
}

#[test]
fn missing_prerequisites_do_not_block() {
    let mut items = vec!["app", "lib"];
    let deps: DependencyMap<&str> = [("app", "ghost")].into_iter().collect();
    let outcome = sort_by_dependencies(&mut items, &deps);
    assert!(outcome.is_acyclic());
    assert_eq!(items, vec!["app", "lib"]);
}
