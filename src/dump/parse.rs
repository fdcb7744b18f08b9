//! Streaming regex scanner for gzip-compressed SQL dumps.
//!
//! The scanner decompresses a dump as one continuous byte stream and hands
//! overlapping chunks to a pool of regex workers. Each chunk carries the
//! trailing bytes of its predecessor, sized to the longest tuple the dump can
//! contain, so no tuple is ever split across a chunk boundary. A tuple lying
//! entirely inside the overlap region is seen twice; every consumer of the
//! scanner is idempotent, so duplicates are harmless. Output order across
//! workers is unspecified.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use flate2::read::GzDecoder;
use parking_lot::Mutex;
use regex::bytes::{Captures, Regex};

use crate::error::Result;
use crate::model::{normalize_title, PageId, NULL_PAGE_ID};
use crate::progress;

const WINDOW: usize = 64 * 1024;

// Upper bounds on one tuple's byte length, per the MediaWiki table manuals.
const PAGE_OVERLAP: usize = 2048;
const REDIRECT_OVERLAP: usize = 1536;
const PAGELINKS_OVERLAP: usize = 1024;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PageRow {
    pub id: PageId,
    pub title: String,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RedirectRow {
    pub from: PageId,
    pub title: String,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LinkRow {
    pub from: PageId,
    pub title: String,
}

/// Scan the page dump for `(page_id, page_title)` of namespace-0 wikitext
/// pages. <https://www.mediawiki.org/wiki/Manual:Page_table>
pub(crate) fn scan_pages<S>(path: &Path, threads: usize, sink: S) -> Result<()>
where
    S: Fn(Vec<PageRow>) + Sync,
{
    let regex = Regex::new(
        r"\(([0-9]{1,10}),0,'(.{1,255}?)',[01],[01],0\.[0-9]{1,32},'[0-9]{14}',(?:'[0-9]{14}'|NULL),[0-9]{1,10},[0-9]{1,10},'wikitext',NULL\)",
    )?;
    scan(
        path,
        &regex,
        WINDOW,
        PAGE_OVERLAP,
        threads,
        |caps| {
            Some(PageRow {
                id: capture_id(caps, 1)?,
                title: capture_title(caps, 2)?,
            })
        },
        sink,
    )
}

/// Scan the redirect dump for `(rd_from, rd_title)` of namespace-0 redirects.
/// <https://www.mediawiki.org/wiki/Manual:Redirect_table>
pub(crate) fn scan_redirects<S>(path: &Path, threads: usize, sink: S) -> Result<()>
where
    S: Fn(Vec<RedirectRow>) + Sync,
{
    let regex = Regex::new(r"\(([0-9]{1,10}),0,'(.{1,255}?)','.{0,32}?','.{0,255}?'\)")?;
    scan(
        path,
        &regex,
        WINDOW,
        REDIRECT_OVERLAP,
        threads,
        |caps| {
            Some(RedirectRow {
                from: capture_id(caps, 1)?,
                title: capture_title(caps, 2)?,
            })
        },
        sink,
    )
}

/// Scan the pagelinks dump for `(pl_from, pl_title)` where both the source
/// and the target namespace are 0.
/// <https://www.mediawiki.org/wiki/Manual:Pagelinks_table>
pub(crate) fn scan_links<S>(path: &Path, threads: usize, sink: S) -> Result<()>
where
    S: Fn(Vec<LinkRow>) + Sync,
{
    let regex = Regex::new(r"\(([0-9]{1,10}),0,'(.{1,255}?)',0\)")?;
    scan(
        path,
        &regex,
        WINDOW,
        PAGELINKS_OVERLAP,
        threads,
        |caps| {
            Some(LinkRow {
                from: capture_id(caps, 1)?,
                title: capture_title(caps, 2)?,
            })
        },
        sink,
    )
}

/// A capture of digits as a page id. Rows with ids that are zero or beyond
/// the 32-bit range are skipped like any other unparseable tuple.
fn capture_id(caps: &Captures<'_>, group: usize) -> Option<PageId> {
    let digits = std::str::from_utf8(caps.get(group)?.as_bytes()).ok()?;
    let id: PageId = digits.parse().ok()?;
    (id != NULL_PAGE_ID).then_some(id)
}

/// A capture as a normalized title. Non-UTF-8 byte sequences are skipped.
fn capture_title(caps: &Captures<'_>, group: usize) -> Option<String> {
    let raw = std::str::from_utf8(caps.get(group)?.as_bytes()).ok()?;
    Some(normalize_title(raw))
}

/// Decompress `path` and run `regex` over rolling chunks on a worker pool.
/// Workers batch the tuples of one chunk and hand the batch to `sink`; order
/// across batches is unspecified.
fn scan<T, P, S>(
    path: &Path,
    regex: &Regex,
    window: usize,
    overlap: usize,
    threads: usize,
    parse: P,
    sink: S,
) -> Result<()>
where
    T: Send,
    P: Fn(&Captures<'_>) -> Option<T> + Sync,
    S: Fn(Vec<T>) + Sync,
{
    let file = File::open(path)?;
    let compressed_len = file.metadata()?.len();
    let bar = progress::byte_bar(compressed_len);
    let mut reader = GzDecoder::new(progress::Reader::new(file, bar.clone()));
    let threads = threads.max(1);

    let (chunk_tx, chunk_rx) = mpsc::sync_channel::<Vec<u8>>(threads * 2);
    let chunk_rx = Mutex::new(chunk_rx);
    let chunk_rx = &chunk_rx;

    thread::scope(|scope| -> Result<()> {
        let parse = &parse;
        let sink = &sink;

        for _ in 0..threads {
            scope.spawn(move || loop {
                let chunk = chunk_rx.lock().recv();
                let Ok(chunk) = chunk else {
                    break;
                };
                let mut batch = Vec::new();
                for caps in regex.captures_iter(&chunk) {
                    if let Some(row) = parse(&caps) {
                        batch.push(row);
                    }
                }
                if !batch.is_empty() {
                    sink(batch);
                }
            });
        }

        let mut tail: Vec<u8> = Vec::new();
        loop {
            let mut chunk = Vec::with_capacity(tail.len() + window);
            chunk.extend_from_slice(&tail);
            chunk.resize(tail.len() + window, 0);
            let offset = tail.len();
            let read = read_full(&mut reader, &mut chunk[offset..])?;
            chunk.truncate(offset + read);
            if read == 0 {
                break;
            }
            let keep_from = chunk.len().saturating_sub(overlap);
            tail.clear();
            tail.extend_from_slice(&chunk[keep_from..]);
            if chunk_tx.send(chunk).is_err() {
                break;
            }
        }
        drop(chunk_tx);
        Ok(())
    })?;

    bar.finish_and_clear();
    Ok(())
}

/// Read until `buf` is full or the stream ends.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
