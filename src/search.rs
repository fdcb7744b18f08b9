//! All-shortest-paths search.
//!
//! A bidirectional breadth-first search expands the smaller frontier of the
//! two until they meet, then backtracks from every meeting page through both
//! parent maps, counting distinct paths with memoization. The result is the
//! subgraph induced by the shortest paths only, small enough to serialize
//! whole.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RouteError};
use crate::model::{PageId, StoreInfo};
use crate::store::Snapshot;

/// The subgraph induced by all shortest paths between two pages.
///
/// `links` maps a page to the pages it links to, restricted to edges lying
/// on a shortest path; every list is sorted ascending, so identical queries
/// serialize identically.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsGraph {
    pub source: PageId,
    pub source_is_redirect: bool,
    pub target: PageId,
    pub target_is_redirect: bool,
    pub language_code: String,
    pub links: BTreeMap<PageId, Vec<PageId>>,
    pub path_count: u64,
    pub path_degrees: u32,
}

type Parents = HashMap<PageId, HashSet<PageId>>;

/// Find every shortest path from `source` to `target`.
///
/// Redirect endpoints are folded to their terminal pages first and reported
/// in the result. The token is polled between levels and before each
/// neighbor fetch; cancellation aborts with [`RouteError::Cancelled`].
pub fn all_shortest_paths(
    snapshot: &Snapshot,
    info: &StoreInfo,
    source: PageId,
    target: PageId,
    cancel: &CancellationToken,
) -> Result<PathsGraph> {
    let (source, source_is_redirect) = match snapshot.redirect(source)? {
        Some(terminal) => (terminal, true),
        None => (source, false),
    };
    let (target, target_is_redirect) = match snapshot.redirect(target)? {
        Some(terminal) => (terminal, true),
        None => (target, false),
    };

    // Parent maps double as the visited sets; the endpoints start visited
    // with no parents.
    let mut forward_parents: Parents = HashMap::from([(source, HashSet::new())]);
    let mut backward_parents: Parents = HashMap::from([(target, HashSet::new())]);
    let mut forward_queue = VecDeque::from([source]);
    let mut backward_queue = VecDeque::from([target]);
    let mut overlap: HashSet<PageId> = HashSet::new();
    let mut forward_depth = 0u32;
    let mut backward_depth = 0u32;

    if source == target {
        overlap.insert(source);
    }

    while overlap.is_empty() && !forward_queue.is_empty() && !backward_queue.is_empty() {
        if cancel.is_cancelled() {
            return Err(RouteError::Cancelled);
        }

        // Expand the smaller frontier; ties expand backward. This keeps the
        // working set proportional to the thinner cone.
        if forward_queue.len() < backward_queue.len() {
            let level: Vec<PageId> = forward_queue.drain(..).collect();
            let mut new_parents: Parents = HashMap::new();
            for page in level {
                if cancel.is_cancelled() {
                    return Err(RouteError::Cancelled);
                }
                for out in snapshot.outgoing(page)? {
                    if forward_parents.contains_key(&out) {
                        // A revisit at a later depth cannot lie on a
                        // shorter path.
                        continue;
                    }
                    if let Some(parents) = new_parents.get_mut(&out) {
                        parents.insert(page);
                    } else {
                        new_parents.insert(out, HashSet::from([page]));
                        forward_queue.push_back(out);
                        if backward_parents.contains_key(&out) {
                            overlap.insert(out);
                        }
                    }
                }
            }
            for (child, parents) in new_parents {
                forward_parents.entry(child).or_default().extend(parents);
            }
            forward_depth += 1;
        } else {
            let level: Vec<PageId> = backward_queue.drain(..).collect();
            let mut new_parents: Parents = HashMap::new();
            for page in level {
                if cancel.is_cancelled() {
                    return Err(RouteError::Cancelled);
                }
                for inc in snapshot.incoming(page)? {
                    if backward_parents.contains_key(&inc) {
                        continue;
                    }
                    if let Some(parents) = new_parents.get_mut(&inc) {
                        parents.insert(page);
                    } else {
                        new_parents.insert(inc, HashSet::from([page]));
                        backward_queue.push_back(inc);
                        if forward_parents.contains_key(&inc) {
                            overlap.insert(inc);
                        }
                    }
                }
            }
            for (child, parents) in new_parents {
                backward_parents.entry(child).or_default().extend(parents);
            }
            backward_depth += 1;
        }
    }

    // Backtrack from every meeting page. The forward map yields the number
    // of distinct shortest prefixes from the source, the backward map the
    // number of distinct suffixes to the target; their product counts the
    // paths through that page.
    let mut links: BTreeMap<PageId, BTreeSet<PageId>> = BTreeMap::new();
    let mut forward_counts: HashMap<PageId, u64> = HashMap::new();
    let mut backward_counts: HashMap<PageId, u64> = HashMap::new();
    let mut path_count = 0u64;
    for &meeting in &overlap {
        let prefixes = backtrack(
            meeting,
            &forward_parents,
            false,
            &mut forward_counts,
            &mut links,
        );
        let suffixes = backtrack(
            meeting,
            &backward_parents,
            true,
            &mut backward_counts,
            &mut links,
        );
        path_count += prefixes * suffixes;
    }

    Ok(PathsGraph {
        source,
        source_is_redirect,
        target,
        target_is_redirect,
        language_code: info.language_code.clone(),
        links: links
            .into_iter()
            .map(|(page, targets)| (page, targets.into_iter().collect()))
            .collect(),
        path_count,
        path_degrees: if path_count > 0 {
            forward_depth + backward_depth
        } else {
            0
        },
    })
}

/// Count the distinct shortest paths from `page` back to the root of
/// `parents`, memoized per page, recording every traversed edge into `links`
/// oriented from link source to link target.
///
/// In the forward map a parent precedes `page` on the way from the source;
/// in the backward map (`towards_target`) a parent follows it.
fn backtrack(
    page: PageId,
    parents: &Parents,
    towards_target: bool,
    counts: &mut HashMap<PageId, u64>,
    links: &mut BTreeMap<PageId, BTreeSet<PageId>>,
) -> u64 {
    let Some(direct) = parents.get(&page).filter(|set| !set.is_empty()) else {
        // The root of this side; exactly one (empty) path.
        return 1;
    };
    if let Some(&memoized) = counts.get(&page) {
        return memoized;
    }

    let mut total = 0u64;
    for &parent in direct {
        if towards_target {
            links.entry(page).or_default().insert(parent);
        } else {
            links.entry(parent).or_default().insert(page);
        }
        let parent_count = match counts.get(&parent) {
            Some(&memoized) => memoized,
            None => backtrack(parent, parents, towards_target, counts, links),
        };
        total += parent_count;
    }
    counts.insert(page, total);
    total
}
