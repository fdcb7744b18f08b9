//! Transitive redirect resolution.
//!
//! The raw redirect map can contain chains (`a → b → c`) and, when a dump
//! straddles concurrent page moves, cycles. Resolution rewrites every entry
//! to its terminal target. A cycle is broken by deleting the entry whose
//! traversal closed it; the chain's last remaining page becomes the terminal
//! for everything that pointed into it. Broken cycles are expected and not
//! an error.

use std::collections::HashMap;

use crate::model::PageId;

/// Rewrite `raw` in place so that no value is itself a key.
pub(crate) fn resolve(raw: &mut HashMap<PageId, PageId>) {
    let sources: Vec<PageId> = raw.keys().copied().collect();
    for source in sources {
        // The entry may have been deleted while breaking an earlier cycle.
        let Some(&first) = raw.get(&source) else {
            continue;
        };
        if !raw.contains_key(&first) {
            continue;
        }

        let mut chain = vec![source, first];
        loop {
            let last = chain[chain.len() - 1];
            let Some(&next) = raw.get(&last) else {
                break;
            };
            if chain.contains(&next) {
                raw.remove(&last);
                break;
            }
            chain.push(next);
        }

        let terminal = chain[chain.len() - 1];
        raw.insert(source, terminal);
    }
}
