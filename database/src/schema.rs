//! On-disk layout versioning

use crate::{
    db::DB,
    errors::{StoreError, StoreResult, StoreResultExt},
    item::CachedDbItem,
    writer::DirectDbWriter,
};
use rocksdb::IteratorMode;

/// Layout revision this build reads and writes
pub const CURRENT_DB_SCHEME_VERSION: u32 = 2;

pub const DB_SCHEME_VERSION_KEY: &[u8] = b"db-scheme-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Brand-new store without any record
    Fresh,
    Current,
    /// Layout written by another build. `None` if the marker is absent or unreadable.
    Mismatch(Option<u32>),
}

fn marker(db: &DB) -> CachedDbItem<'_, u32> {
    CachedDbItem::new(db, DB_SCHEME_VERSION_KEY)
}

pub(crate) fn check(db: &DB) -> StoreResult<SchemaStatus> {
    match marker(db).read().optional() {
        Ok(Some(CURRENT_DB_SCHEME_VERSION)) => Ok(SchemaStatus::Current),
        Ok(Some(version)) => Ok(SchemaStatus::Mismatch(Some(version))),
        Ok(None) if is_empty(db)? => Ok(SchemaStatus::Fresh),
        Ok(None) | Err(StoreError::DeserializationError(_)) => Ok(SchemaStatus::Mismatch(None)),
        Err(err) => Err(err),
    }
}

pub(crate) fn read_version(db: &DB) -> StoreResult<Option<u32>> {
    marker(db).read().optional()
}

pub(crate) fn write_current(db: &DB) -> StoreResult<()> {
    marker(db).write(DirectDbWriter::new(db), &CURRENT_DB_SCHEME_VERSION)?;
    db.flush()?;
    Ok(())
}

fn is_empty(db: &DB) -> StoreResult<bool> {
    match db.iterator(IteratorMode::Start).next() {
        None => Ok(true),
        Some(entry) => entry.map(|_| false).map_err(Into::into),
    }
}
