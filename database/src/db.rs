use crate::errors::{StoreError, StoreResult};
use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::path::Path;

pub use conn_builder::{ConnBuilder, DbTuning};

mod conn_builder;

/// The DB type used for Karai stores
pub type DB = DBWithThreadMode<MultiThreaded>;

/// Physically removes the store files at `db_dir`, if any
pub fn delete_db(db_dir: &Path) -> StoreResult<()> {
    if !db_dir.exists() {
        return Ok(());
    }
    let options = rocksdb::Options::default();
    DB::destroy(&options, db_dir).map_err(|source| StoreError::Destroy { path: db_dir.to_path_buf(), source })
}
