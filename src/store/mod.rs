//! Read-only access to a persisted link store.
//!
//! A store is a single redb file holding four tables: string metadata, the
//! resolved redirect map, and the incoming/outgoing adjacency blobs. Stores
//! are written once by the builder and never mutated afterwards; readers get
//! MVCC snapshots and need no locking.

use std::path::Path;

use redb::{Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, TableDefinition};
use tracing::error;

use crate::error::{Result, RouteError};
use crate::model::{PageId, StoreInfo, StoreName};

pub mod blob;
mod writer;

pub use writer::StoreWriter;

pub(crate) const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");
pub(crate) const REDIRECTS: TableDefinition<u32, u32> = TableDefinition::new("redirects");
pub(crate) const INCOMING: TableDefinition<u32, &[u8]> = TableDefinition::new("incoming");
pub(crate) const OUTGOING: TableDefinition<u32, &[u8]> = TableDefinition::new("outgoing");

pub(crate) const META_DUMP_DATE: &str = "dumpDate";
pub(crate) const META_BUILD_DATE: &str = "buildDate";
pub(crate) const META_LANGUAGE_CODE: &str = "languageCode";
pub(crate) const META_LANGUAGE_NAME: &str = "languageName";
pub(crate) const META_MAX_PAGE_ID: &str = "maxPageId";

/// An open store. Holds the redb handle and the metadata record, which is
/// read once at open time.
pub struct Store {
    db: Database,
    pub name: StoreName,
    pub info: StoreInfo,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open a store file for serving. The file name must follow the
    /// `<wikiDb>-<yyyymmdd>.redb` convention and the metadata table must be
    /// complete and consistent with it.
    pub fn open(path: &Path) -> Result<Self> {
        let name = StoreName::from_path(path)?;
        let db = Database::open(path)?;
        let info = read_info(&db)?;
        if info.dump_date != name.dump_date {
            return Err(RouteError::Corruption(format!(
                "store {} carries metadata for dump date {}",
                name, info.dump_date
            )));
        }
        Ok(Self { db, name, info })
    }

    /// Begin a stable read snapshot. Each query takes its own; snapshots from
    /// concurrent queries do not block each other.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let txn = self.db.begin_read()?;
        let redirects = txn.open_table(REDIRECTS)?;
        let incoming = txn.open_table(INCOMING)?;
        let outgoing = txn.open_table(OUTGOING)?;
        Ok(Snapshot {
            redirects,
            incoming,
            outgoing,
            _txn: txn,
        })
    }

}

fn read_info(db: &Database) -> Result<StoreInfo> {
    let txn = db.begin_read()?;
    let table = txn.open_table(METADATA)?;

    let get = |key: &'static str| -> Result<String> {
        table
            .get(key)?
            .map(|guard| guard.value().to_owned())
            .ok_or_else(|| RouteError::Corruption(format!("metadata key '{key}' missing")))
    };

    let max_page_id = get(META_MAX_PAGE_ID)?;
    let max_page_id: PageId = max_page_id.parse().map_err(|_| {
        RouteError::Corruption(format!("metadata maxPageId '{max_page_id}' is not a page id"))
    })?;

    Ok(StoreInfo {
        language_code: get(META_LANGUAGE_CODE)?,
        language_name: get(META_LANGUAGE_NAME)?,
        dump_date: get(META_DUMP_DATE)?,
        build_date: get(META_BUILD_DATE)?,
        max_page_id,
    })
}

/// A stable read view over one store, held for the duration of a query.
pub struct Snapshot {
    redirects: ReadOnlyTable<u32, u32>,
    incoming: ReadOnlyTable<u32, &'static [u8]>,
    outgoing: ReadOnlyTable<u32, &'static [u8]>,
    /// Read transaction the tables were opened under; pins the MVCC snapshot
    /// for as long as the tables are in use.
    _txn: ReadTransaction,
}

impl Snapshot {
    /// Terminal redirect target of a page, or `None` when the page is not a
    /// redirect. Missing keys are not an error.
    pub fn redirect(&self, page: PageId) -> Result<Option<PageId>> {
        Ok(self.redirects.get(page)?.map(|guard| guard.value()))
    }

    /// Ids of the pages linking to `target`. Empty when there is no row. A
    /// failed row read degrades to an empty list; it cannot be told apart
    /// from a missing row without a second lookup, and a missing neighbor
    /// list only prunes one branch of a search.
    pub fn incoming(&self, target: PageId) -> Result<Vec<PageId>> {
        decode_adjacency(self.incoming.get(target), target)
    }

    /// Ids of the pages `source` links to. Same conventions as `incoming`.
    pub fn outgoing(&self, source: PageId) -> Result<Vec<PageId>> {
        decode_adjacency(self.outgoing.get(source), source)
    }
}

fn decode_adjacency<'a>(
    row: std::result::Result<Option<redb::AccessGuard<'a, &'static [u8]>>, redb::StorageError>,
    page: PageId,
) -> Result<Vec<PageId>> {
    match row {
        Ok(Some(guard)) => blob::decode(guard.value()),
        Ok(None) => Ok(Vec::new()),
        Err(e) => {
            error!("adjacency read for page {page} failed: {e}");
            Ok(Vec::new())
        }
    }
}
