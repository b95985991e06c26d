use crate::prelude::DbTuning;
use tempfile::TempDir;

/// Creates a temp dir under the system temp location, removed on drop
pub fn get_karai_tempdir() -> TempDir {
    let global_tempdir = std::env::temp_dir();
    let karai_tempdir = global_tempdir.join("karai-rust");
    std::fs::create_dir_all(karai_tempdir.as_path()).expect("the system temp dir is writable");
    tempfile::tempdir_in(karai_tempdir.as_path()).expect("the karai temp dir is writable")
}

/// Small footprint tuning for tests
pub fn test_tuning() -> DbTuning {
    DbTuning { max_open_files: 64, read_buffer_mb: 1, write_buffer_mb: 4, threads: 1 }
}

/// Opens a [`StoreHandle`](crate::prelude::StoreHandle) inside a fresh temp dir.
///
/// Evaluates to `(StoreHandle, TempDir)`; the handle is dropped before the directory.
#[macro_export]
macro_rules! create_temp_db {
    ($tuning: expr) => {{
        let tempdir = $crate::utils::get_karai_tempdir();
        let store = $crate::prelude::StoreHandle::open(tempdir.path().join("DB"), $tuning).unwrap();
        (store, tempdir)
    }};
}
