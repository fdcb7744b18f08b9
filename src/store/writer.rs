//! Build-side counterpart of [`Store`](super::Store).
//!
//! The writer populates a temporary `<name>.redb.tmp` file and atomically
//! renames it into place on `finish`. Until then readers never see the store,
//! and any error (or an early drop) unlinks the temporary file, so a crashed
//! build leaves nothing behind but a stale `.tmp` the next run removes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable};
use tracing::debug;

use crate::error::Result;
use crate::model::{PageId, StoreInfo, StoreName};
use crate::store::{
    blob, INCOMING, METADATA, META_BUILD_DATE, META_DUMP_DATE, META_LANGUAGE_CODE,
    META_LANGUAGE_NAME, META_MAX_PAGE_ID, OUTGOING, REDIRECTS,
};

pub struct StoreWriter {
    db: Option<Database>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    finished: bool,
}

impl StoreWriter {
    /// Create the temporary store file, removing any leftover from a
    /// previous crashed build first.
    pub fn create(databases_dir: &Path, name: &StoreName) -> Result<Self> {
        let tmp_path = databases_dir.join(name.tmp_file_name());
        let final_path = databases_dir.join(name.file_name());

        if tmp_path.exists() {
            debug!("removing stale temporary store {}", tmp_path.display());
            fs::remove_file(&tmp_path)?;
        }

        let db = Database::create(&tmp_path)?;
        Ok(Self {
            db: Some(db),
            tmp_path,
            final_path,
            finished: false,
        })
    }

    fn db(&self) -> &Database {
        self.db.as_ref().expect("writer used after finish")
    }

    pub fn put_info(&self, info: &StoreInfo) -> Result<()> {
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(METADATA)?;
            table.insert(META_DUMP_DATE, info.dump_date.as_str())?;
            table.insert(META_BUILD_DATE, info.build_date.as_str())?;
            table.insert(META_LANGUAGE_CODE, info.language_code.as_str())?;
            table.insert(META_LANGUAGE_NAME, info.language_name.as_str())?;
            table.insert(META_MAX_PAGE_ID, info.max_page_id.to_string().as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Insert the resolved redirect map. Targets are expected to be terminal
    /// already; the writer stores them as-is.
    pub fn put_redirects(&self, redirects: &HashMap<PageId, PageId>) -> Result<()> {
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(REDIRECTS)?;
            for (&source, &target) in redirects {
                table.insert(source, target)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Flush both adjacency maps into the store, merging with rows written by
    /// an earlier flush, and clear them. Returns the number of links flushed.
    pub fn flush_links(
        &self,
        incoming: &mut HashMap<PageId, Vec<PageId>>,
        outgoing: &mut HashMap<PageId, Vec<PageId>>,
    ) -> Result<u64> {
        let mut flushed = 0u64;
        let txn = self.db().begin_write()?;
        {
            let mut table = txn.open_table(INCOMING)?;
            for (target, mut sources) in incoming.drain() {
                flushed += sources.len() as u64;
                let existing = table.get(target)?.map(|guard| blob::decode(guard.value()));
                if let Some(existing) = existing.transpose()? {
                    sources.extend(existing);
                }
                table.insert(target, blob::encode(&sources).as_slice())?;
            }
        }
        {
            let mut table = txn.open_table(OUTGOING)?;
            for (source, mut targets) in outgoing.drain() {
                let existing = table.get(source)?.map(|guard| blob::decode(guard.value()));
                if let Some(existing) = existing.transpose()? {
                    targets.extend(existing);
                }
                table.insert(source, blob::encode(&targets).as_slice())?;
            }
        }
        txn.commit()?;
        Ok(flushed)
    }

    /// Commit is already durable per flush; closing the handle and renaming
    /// the file is what makes the store visible to readers.
    pub fn finish(mut self) -> Result<PathBuf> {
        drop(self.db.take());
        fs::rename(&self.tmp_path, &self.final_path)?;
        self.finished = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.db.take());
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}
