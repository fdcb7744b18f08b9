//! The builder pipeline.
//!
//! Three streaming passes over the dumps, strictly ordered: pages fill the
//! title map, redirects are collected and resolved to terminal targets, and
//! pagelinks are folded through the redirect map into the two adjacency maps.
//! Everything is written into a temporary store file that is renamed into
//! place only after the final flush, so readers never observe a partial
//! build.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::dump::{self, DumpSet};
use crate::error::{Result, RouteError};
use crate::model::{Language, PageId, StoreInfo, StoreName};
use crate::store::StoreWriter;

mod redirects;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub databases_dir: PathBuf,
    pub dumps_dir: PathBuf,
    /// Dump date to build from; the newest complete set wins when absent.
    pub date: Option<String>,
    /// Parser worker count.
    pub threads: usize,
    /// Approximate ceiling on buffered adjacency bytes. When exceeded the
    /// buffers are flushed into the store early and merged on the next
    /// flush. Unset means a single flush after the pagelinks pass.
    pub memory_limit: Option<u64>,
}

/// Estimated resident bytes per buffered link: two u32 endpoints plus map
/// and vector overhead.
const BYTES_PER_BUFFERED_LINK: u64 = 16;

struct PageIngest {
    titler: HashMap<String, PageId>,
    max_page_id: PageId,
}

struct LinkBuffer {
    incoming: HashMap<PageId, Vec<PageId>>,
    outgoing: HashMap<PageId, Vec<PageId>>,
    buffered: u64,
    flushed: u64,
    error: Option<RouteError>,
}

/// Build one language's store from its dump set. Returns the path of the
/// finished store file.
pub fn build(language: &Language, options: &BuildOptions) -> Result<PathBuf> {
    let start = Instant::now();
    info!("building '{}' store", language.code);

    let dumps = DumpSet::locate(&options.dumps_dir, &language.wiki_db, options.date.as_deref())?;
    let name = StoreName::new(&language.wiki_db, &dumps.date);

    fs::create_dir_all(&options.databases_dir)?;
    let final_path = options.databases_dir.join(name.file_name());
    if final_path.exists() {
        warn!("store {name} already exists, skipping build");
        return Ok(final_path);
    }

    // Removes any stale .tmp from a crashed build; unlinks its own .tmp on
    // any error below.
    let writer = StoreWriter::create(&options.databases_dir, &name)?;

    info!("parsing page dump {}", dumps.pages.display());
    let pages = Mutex::new(PageIngest {
        titler: HashMap::new(),
        max_page_id: 0,
    });
    dump::scan_pages(&dumps.pages, options.threads, |batch| {
        let mut pages = pages.lock();
        for row in batch {
            if row.id > pages.max_page_id {
                pages.max_page_id = row.id;
            }
            pages.titler.insert(row.title, row.id);
        }
    })?;
    let PageIngest {
        titler,
        max_page_id,
    } = pages.into_inner();
    if titler.is_empty() {
        return Err(RouteError::Parse(
            "nothing parsed from the page dump, possibly caused by schema changes".into(),
        ));
    }
    info!("{} page titles found", titler.len());

    writer.put_info(&StoreInfo {
        language_code: language.code.clone(),
        language_name: language.name.clone(),
        dump_date: dumps.date.clone(),
        build_date: Utc::now().format("%Y%m%d").to_string(),
        max_page_id,
    })?;

    info!("parsing redirect dump {}", dumps.redirects.display());
    let raw = Mutex::new(HashMap::new());
    dump::scan_redirects(&dumps.redirects, options.threads, |batch| {
        let mut raw = raw.lock();
        for row in batch {
            if let Some(&target) = titler.get(&row.title) {
                if target != row.from {
                    raw.insert(row.from, target);
                }
            }
        }
    })?;
    let mut redirect_map = raw.into_inner();
    if redirect_map.is_empty() {
        warn!("no redirects parsed from {}", dumps.redirects.display());
    }
    info!("{} raw redirects found", redirect_map.len());

    redirects::resolve(&mut redirect_map);
    info!("{} redirects after transitive resolution", redirect_map.len());
    writer.put_redirects(&redirect_map)?;

    info!("parsing pagelinks dump {}", dumps.pagelinks.display());
    let flush_after = options
        .memory_limit
        .map(|bytes| (bytes / BYTES_PER_BUFFERED_LINK).max(1));
    let links = Mutex::new(LinkBuffer {
        incoming: HashMap::new(),
        outgoing: HashMap::new(),
        buffered: 0,
        flushed: 0,
        error: None,
    });
    dump::scan_links(&dumps.pagelinks, options.threads, |batch| {
        let mut buffer = links.lock();
        if buffer.error.is_some() {
            return;
        }
        for row in batch {
            let source = redirect_map.get(&row.from).copied().unwrap_or(row.from);
            // A pl_from above maxPageId references a page row the page dump
            // no longer has; every stored id must stay within maxPageId.
            if source > max_page_id {
                continue;
            }
            let Some(&target) = titler.get(&row.title) else {
                continue;
            };
            let target = redirect_map.get(&target).copied().unwrap_or(target);
            if source == target {
                continue;
            }
            buffer.incoming.entry(target).or_default().push(source);
            buffer.outgoing.entry(source).or_default().push(target);
            buffer.buffered += 1;
        }
        if let Some(limit) = flush_after {
            if buffer.buffered >= limit {
                let LinkBuffer {
                    incoming, outgoing, ..
                } = &mut *buffer;
                match writer.flush_links(incoming, outgoing) {
                    Ok(count) => {
                        buffer.flushed += count;
                        buffer.buffered = 0;
                    }
                    Err(e) => buffer.error = Some(e),
                }
            }
        }
    })?;

    let mut buffer = links.into_inner();
    if let Some(e) = buffer.error.take() {
        return Err(e);
    }
    let LinkBuffer {
        incoming,
        outgoing,
        flushed,
        ..
    } = &mut buffer;
    let total_links = *flushed + writer.flush_links(incoming, outgoing)?;
    if total_links == 0 {
        return Err(RouteError::Parse(
            "nothing parsed from the pagelinks dump, possibly caused by schema changes".into(),
        ));
    }
    info!("{total_links} links ingested");

    let path = writer.finish()?;
    info!("store {name} built in {:.0?}", start.elapsed());
    Ok(path)
}

/// Build every language in `languages`, continuing on per-language success
/// and stopping at the first failure.
pub fn build_all(languages: &[Language], options: &BuildOptions) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(languages.len());
    for language in languages {
        paths.push(build(language, options)?);
    }
    Ok(paths)
}
