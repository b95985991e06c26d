//! Acquisition, schema check and release of the node store

use crate::{
    db::{delete_db, ConnBuilder, DbTuning, DB},
    errors::StoreResult,
    schema::{self, SchemaStatus, CURRENT_DB_SCHEME_VERSION},
};
use karai_core::{info, scope::ScopeExit, trace, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The single owning handle to the node store.
///
/// The store is released exactly once, when the handle is dropped or passed to
/// [`StoreHandle::release`]. Everything borrowing [`StoreHandle::db`] must be gone by then.
pub struct StoreHandle {
    db: ScopeExit<'static, DB>,
    path: PathBuf,
}

fn connect<F>(path: &Path, tuning: DbTuning, on_release: F) -> StoreResult<ScopeExit<'static, DB>>
where
    F: FnOnce(&Path) + 'static,
{
    let db = ConnBuilder::default().with_db_path(path.to_path_buf()).with_tuning(tuning).build()?;
    let release_path = path.to_path_buf();
    Ok(ScopeExit::new(db, move |db: DB| {
        if let Err(err) = db.flush() {
            warn!("Failed flushing store at {} before release: {}", release_path.display(), err);
        }
        drop(db);
        info!("Store at {} released", release_path.display());
        on_release(&release_path);
    }))
}

impl StoreHandle {
    /// Opens the store at `path`, creating it if missing.
    ///
    /// A store written with another layout version is destroyed and recreated empty.
    /// The node then resynchronizes from the network.
    pub fn open(path: PathBuf, tuning: DbTuning) -> StoreResult<Self> {
        Self::open_with(path, tuning, |_: &Path| {})
    }

    /// Like [`StoreHandle::open`], calling `on_release` once the store is closed
    fn open_with<F>(path: PathBuf, tuning: DbTuning, on_release: F) -> StoreResult<Self>
    where
        F: Fn(&Path) + Clone + 'static,
    {
        fs::create_dir_all(&path)?;
        let mut db = connect(&path, tuning, on_release.clone())?;
        trace!("Store at {} opened", path.display());

        match schema::check(&db)? {
            SchemaStatus::Current => {
                info!("Store at {} has the current layout version {}", path.display(), CURRENT_DB_SCHEME_VERSION);
            }
            SchemaStatus::Fresh => {
                info!("Initializing new store at {} with layout version {}", path.display(), CURRENT_DB_SCHEME_VERSION);
                schema::write_current(&db)?;
            }
            SchemaStatus::Mismatch(found) => {
                match found {
                    Some(version) => warn!(
                        "Store at {} has layout version {} while {} is required, rebuilding it",
                        path.display(),
                        version,
                        CURRENT_DB_SCHEME_VERSION
                    ),
                    None => warn!("Store at {} has no readable layout version, rebuilding it", path.display()),
                }
                // The old handle must be closed and forgotten before its files go away
                let armed = db.cancel();
                debug_assert!(armed);
                drop(db.into_inner());

                delete_db(&path)?;
                fs::create_dir_all(&path)?;
                db = connect(&path, tuning, on_release)?;
                schema::write_current(&db)?;
                info!("Store at {} rebuilt with layout version {}", path.display(), CURRENT_DB_SCHEME_VERSION);
            }
        }

        Ok(Self { db, path })
    }

    pub fn db(&self) -> &DB {
        &self.db
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted layout version
    pub fn schema_version(&self) -> StoreResult<Option<u32>> {
        schema::read_version(&self.db)
    }

    /// Closes the store now rather than at the end of the owning scope
    pub fn release(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        prelude::{CachedDbItem, DirectDbWriter, DB_SCHEME_VERSION_KEY},
        utils::{get_karai_tempdir, test_tuning},
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const SENTINEL_KEY: &[u8] = b"sentinel";

    fn seed(path: &Path, marker: Option<&[u8]>) {
        let db = ConnBuilder::default().with_db_path(path.to_path_buf()).with_tuning(test_tuning()).build().unwrap();
        db.put(SENTINEL_KEY, b"survivor").unwrap();
        if let Some(marker) = marker {
            db.put(DB_SCHEME_VERSION_KEY, marker).unwrap();
        }
        db.flush().unwrap();
    }

    #[test]
    fn test_fresh_store_gets_marker() {
        let tempdir = get_karai_tempdir();
        let path = tempdir.path().join("DB");
        let store = StoreHandle::open(path.clone(), test_tuning()).unwrap();
        assert!(path.exists());
        assert_eq!(store.schema_version().unwrap(), Some(CURRENT_DB_SCHEME_VERSION));
        store.release();

        let store = StoreHandle::open(path, test_tuning()).unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(CURRENT_DB_SCHEME_VERSION));
    }

    #[test]
    fn test_version_mismatch_rebuilds_store() {
        for marker in [Some(bincode::serialize(&1u32).unwrap()), Some(vec![0xff]), None] {
            let tempdir = get_karai_tempdir();
            let path = tempdir.path().join("DB");
            seed(&path, marker.as_deref());

            let store = StoreHandle::open(path, test_tuning()).unwrap();
            assert_eq!(store.schema_version().unwrap(), Some(CURRENT_DB_SCHEME_VERSION));
            assert!(store.db().get(SENTINEL_KEY).unwrap().is_none());
        }
    }

    #[test]
    fn test_rebuild_releases_the_store_once() {
        let tempdir = get_karai_tempdir();
        let path = tempdir.path().join("DB");
        seed(&path, Some(&bincode::serialize(&1u32).unwrap()));

        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();
        let store = StoreHandle::open_with(path, test_tuning(), move |_: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        // The replaced handle was closed without running its release action
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        assert_eq!(store.schema_version().unwrap(), Some(CURRENT_DB_SCHEME_VERSION));

        store.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_current_version_is_preserved() {
        let tempdir = get_karai_tempdir();
        let path = tempdir.path().join("DB");
        seed(&path, Some(&bincode::serialize(&CURRENT_DB_SCHEME_VERSION).unwrap()));

        let store = StoreHandle::open(path.clone(), test_tuning()).unwrap();
        assert_eq!(store.db().get(SENTINEL_KEY).unwrap().as_deref(), Some(&b"survivor"[..]));

        let item = CachedDbItem::<u64>::new(store.db(), "extra");
        item.write(DirectDbWriter::new(store.db()), &7).unwrap();
        drop(item);
        store.release();

        let store = StoreHandle::open(path, test_tuning()).unwrap();
        assert_eq!(CachedDbItem::<u64>::new(store.db(), "extra").read().unwrap(), 7);
    }
}
