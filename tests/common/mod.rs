use std::collections::HashMap;
use std::path::{Path, PathBuf};

use wikiroute::{PageId, StoreInfo, StoreName, StoreWriter};

/// Write a small store from a directed edge list. Incoming links are derived
/// from the outgoing ones, so the two adjacency tables are symmetric by
/// construction.
#[allow(dead_code)]
pub fn write_store_edges(
    dir: &Path,
    language_code: &str,
    redirects: &[(PageId, PageId)],
    edges: &[(PageId, PageId)],
    max_page_id: PageId,
) -> PathBuf {
    let name = StoreName::new(&format!("{language_code}wiki"), "20240501");
    let writer = StoreWriter::create(dir, &name).expect("create writer");

    writer
        .put_info(&StoreInfo {
            language_code: language_code.to_owned(),
            language_name: language_code.to_owned(),
            dump_date: "20240501".to_owned(),
            build_date: "20240601".to_owned(),
            max_page_id,
        })
        .expect("write metadata");

    writer
        .put_redirects(&redirects.iter().copied().collect())
        .expect("write redirects");

    let mut outgoing_map: HashMap<PageId, Vec<PageId>> = HashMap::new();
    let mut incoming_map: HashMap<PageId, Vec<PageId>> = HashMap::new();
    for &(source, target) in edges {
        outgoing_map.entry(source).or_default().push(target);
        incoming_map.entry(target).or_default().push(source);
    }
    writer
        .flush_links(&mut incoming_map, &mut outgoing_map)
        .expect("write links");

    writer.finish().expect("finish store")
}

/// `write_store_edges` with the outgoing side written as per-page lists.
#[allow(dead_code)]
pub fn write_store(
    dir: &Path,
    language_code: &str,
    redirects: &[(PageId, PageId)],
    outgoing: &[(PageId, &[PageId])],
    max_page_id: PageId,
) -> PathBuf {
    let edges: Vec<(PageId, PageId)> = outgoing
        .iter()
        .flat_map(|&(source, targets)| targets.iter().map(move |&target| (source, target)))
        .collect();
    write_store_edges(dir, language_code, redirects, &edges, max_page_id)
}
