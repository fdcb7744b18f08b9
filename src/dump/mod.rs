//! Dump descriptors.
//!
//! Downloading and checksum-verifying dump files is a collaborator concern;
//! the builder consumes a [`DumpSet`]: three readable gzip-compressed SQL
//! dumps plus the dump's date string. This module only locates an existing
//! set in a directory by the Wikimedia naming convention
//! `<wikiDb>-<yyyymmdd>-<table>.sql.gz`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, RouteError};

mod parse;

pub(crate) use parse::{scan_links, scan_pages, scan_redirects};

#[derive(Debug, Clone)]
pub struct DumpSet {
    pub pages: PathBuf,
    pub redirects: PathBuf,
    pub pagelinks: PathBuf,
    pub date: String,
}

impl DumpSet {
    /// Locate the dump set for a wiki in a directory. When `date` is given,
    /// all three files for that date must exist; otherwise the newest date
    /// with a complete set wins.
    pub fn locate(dumps_dir: &Path, wiki_db: &str, date: Option<&str>) -> Result<Self> {
        match date {
            Some(date) => Self::at_date(dumps_dir, wiki_db, date),
            None => {
                let date = newest_complete_date(dumps_dir, wiki_db)?;
                debug!("using newest complete dump set {wiki_db}-{date}");
                Self::at_date(dumps_dir, wiki_db, &date)
            }
        }
    }

    fn at_date(dumps_dir: &Path, wiki_db: &str, date: &str) -> Result<Self> {
        let file = |table: &str| dumps_dir.join(format!("{wiki_db}-{date}-{table}.sql.gz"));
        let set = Self {
            pages: file("page"),
            redirects: file("redirect"),
            pagelinks: file("pagelinks"),
            date: date.to_owned(),
        };
        for path in [&set.pages, &set.redirects, &set.pagelinks] {
            if !path.is_file() {
                debug!("missing dump file {}", path.display());
                return Err(RouteError::NotFound("dump file"));
            }
        }
        Ok(set)
    }
}

fn newest_complete_date(dumps_dir: &Path, wiki_db: &str) -> Result<String> {
    let prefix = format!("{wiki_db}-");
    let suffix = "-page.sql.gz";
    let mut dates = BTreeSet::new();
    for entry in fs::read_dir(dumps_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(date) = file_name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        {
            if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
                dates.insert(date.to_owned());
            }
        }
    }
    // Newest first, but only a date with all three files counts.
    for date in dates.into_iter().rev() {
        if DumpSet::at_date(dumps_dir, wiki_db, &date).is_ok() {
            return Ok(date);
        }
    }
    Err(RouteError::NotFound("complete dump set"))
}
