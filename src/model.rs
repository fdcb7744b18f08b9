use std::path::Path;

use serde::Serialize;

use crate::error::{Result, RouteError};

/// A Wikipedia page id. The dumps declare 10-digit unsigned integers, but no
/// language edition comes close to exhausting 32 bits, and halving the id
/// width halves the adjacency storage.
pub type PageId = u32;

/// Reserved sentinel for "absent/invalid page".
pub const NULL_PAGE_ID: PageId = 0;

/// File extension of persisted stores.
pub const STORE_EXTENSION: &str = "redb";

/// Extension suffix of the in-progress build file.
pub const TMP_SUFFIX: &str = "tmp";

/// Undo the escaping the SQL dumps apply to page titles. Applied exactly once,
/// inside the dump parser.
pub fn normalize_title(raw: &str) -> String {
    raw.replace("\\'", "'").replace('_', " ")
}

/// A language edition selected on the command line. Enumerating and matching
/// the full Wikimedia language registry is a collaborator concern; this is
/// the shape of what it hands us.
#[derive(Debug, Clone)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub wiki_db: String,
}

impl Language {
    pub fn new(code: &str, name: Option<&str>) -> Self {
        Self {
            code: code.to_owned(),
            name: name.unwrap_or(code).to_owned(),
            wiki_db: format!("{code}wiki"),
        }
    }
}

/// Identity of a persisted store, encoded in its file name as
/// `<wikiDb>-<yyyymmdd>.redb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreName {
    pub wiki_db: String,
    pub dump_date: String,
}

impl StoreName {
    pub fn new(wiki_db: &str, dump_date: &str) -> Self {
        Self {
            wiki_db: wiki_db.to_owned(),
            dump_date: dump_date.to_owned(),
        }
    }

    /// Parse a store name from a file path. Rejects names that do not follow
    /// the `<wikiDb>-<yyyymmdd>.redb` convention.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RouteError::InvalidArgument(format!("bad store path {path:?}")))?;
        let stem = file_name
            .strip_suffix(&format!(".{STORE_EXTENSION}"))
            .ok_or_else(|| {
                RouteError::InvalidArgument(format!("store file {file_name:?} has wrong extension"))
            })?;
        let (wiki_db, dump_date) = stem.rsplit_once('-').ok_or_else(|| {
            RouteError::InvalidArgument(format!("store file {file_name:?} has wrong format"))
        })?;
        if wiki_db.is_empty()
            || dump_date.len() != 8
            || !dump_date.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(RouteError::InvalidArgument(format!(
                "store file {file_name:?} has wrong format"
            )));
        }
        Ok(Self::new(wiki_db, dump_date))
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.wiki_db, self.dump_date, STORE_EXTENSION)
    }

    pub fn tmp_file_name(&self) -> String {
        format!("{}.{}", self.file_name(), TMP_SUFFIX)
    }
}

impl std::fmt::Display for StoreName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.wiki_db, self.dump_date)
    }
}

/// Immutable description of an open store, read from its metadata table once
/// at open time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub language_code: String,
    pub language_name: String,
    pub dump_date: String,
    pub build_date: String,
    #[serde(skip)]
    pub max_page_id: PageId,
}
