//! Search correctness against a reference shortest-path count on random
//! graphs: the reported degree equals the true unweighted distance, the path
//! count is exact, and the returned subgraph holds exactly the edges lying
//! on some shortest path.

mod common;

use std::collections::{BTreeSet, HashMap, VecDeque};

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use wikiroute::{all_shortest_paths, PageId, Store};

const NODES: PageId = 10;

/// Unweighted distances from `start` over the given neighbor function.
fn distances(
    start: PageId,
    neighbors: &HashMap<PageId, Vec<PageId>>,
) -> HashMap<PageId, u32> {
    let mut dist = HashMap::from([(start, 0u32)]);
    let mut queue = VecDeque::from([start]);
    while let Some(page) = queue.pop_front() {
        let next = dist[&page] + 1;
        for &neighbor in neighbors.get(&page).into_iter().flatten() {
            if !dist.contains_key(&neighbor) {
                dist.insert(neighbor, next);
                queue.push_back(neighbor);
            }
        }
    }
    dist
}

/// Number of distinct shortest paths from `source` to every node, by dynamic
/// programming over the BFS levels.
fn path_counts(
    source: PageId,
    dist: &HashMap<PageId, u32>,
    edges: &[(PageId, PageId)],
) -> HashMap<PageId, u64> {
    let mut order: Vec<PageId> = dist.keys().copied().collect();
    order.sort_by_key(|page| dist[page]);

    let mut counts: HashMap<PageId, u64> = HashMap::from([(source, 1)]);
    for &page in &order {
        for &(from, to) in edges {
            if from == page && dist.get(&to) == Some(&(dist[&page] + 1)) {
                let inc = counts.get(&page).copied().unwrap_or(0);
                *counts.entry(to).or_insert(0) += inc;
            }
        }
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn matches_reference_on_random_graphs(
        edge_set in proptest::collection::btree_set((1..=NODES, 1..=NODES), 0..60),
        source in 1..=NODES,
        target in 1..=NODES,
    ) {
        let edges: Vec<(PageId, PageId)> = edge_set
            .into_iter()
            .filter(|(from, to)| from != to)
            .collect();

        let dir = tempfile::tempdir().expect("tempdir");
        let path = common::write_store_edges(dir.path(), "en", &[], &edges, NODES);
        let store = Store::open(&path).expect("open store");
        let snapshot = store.snapshot().expect("snapshot");
        let graph = all_shortest_paths(
            &snapshot,
            &store.info,
            source,
            target,
            &CancellationToken::new(),
        )
        .expect("search");

        let mut outgoing: HashMap<PageId, Vec<PageId>> = HashMap::new();
        for &(from, to) in &edges {
            outgoing.entry(from).or_default().push(to);
        }
        let dist_from_source = distances(source, &outgoing);

        match dist_from_source.get(&target) {
            None => {
                prop_assert_eq!(graph.path_count, 0);
                prop_assert_eq!(graph.path_degrees, 0);
                prop_assert!(graph.links.is_empty());
            }
            Some(&distance) => {
                prop_assert_eq!(graph.path_degrees, distance);

                let counts = path_counts(source, &dist_from_source, &edges);
                prop_assert_eq!(graph.path_count, counts.get(&target).copied().unwrap_or(0));

                // The returned subgraph is exactly the set of edges on some
                // shortest path: distance-to-source of the head, plus one,
                // plus distance-from-tail-to-target, sums to the total.
                let mut incoming: HashMap<PageId, Vec<PageId>> = HashMap::new();
                for &(from, to) in &edges {
                    incoming.entry(to).or_default().push(from);
                }
                let dist_to_target = distances(target, &incoming);
                let expected: BTreeSet<(PageId, PageId)> = edges
                    .iter()
                    .copied()
                    .filter(|(from, to)| {
                        match (dist_from_source.get(from), dist_to_target.get(to)) {
                            (Some(&a), Some(&b)) => a + 1 + b == distance,
                            _ => false,
                        }
                    })
                    .collect();
                let reported: BTreeSet<(PageId, PageId)> = graph
                    .links
                    .iter()
                    .flat_map(|(&from, targets)| {
                        targets.iter().map(move |&to| (from, to))
                    })
                    .collect();
                prop_assert_eq!(reported, expected);
            }
        }
    }
}
