use crate::{
    db::DB,
    errors::{StoreError, StoreResult},
};
use rocksdb::{BlockBasedOptions, Cache, DBCompressionType};
use std::path::PathBuf;

const KB: usize = 1024;
const MB: usize = 1024 * KB;

/// Operator-facing store tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbTuning {
    pub max_open_files: u32,
    /// Size of the LRU block cache, in megabytes
    pub read_buffer_mb: u32,
    /// Size of a single memtable, in megabytes
    pub write_buffer_mb: u32,
    /// Background flush and compaction threads
    pub threads: u32,
}

#[derive(Debug)]
pub struct Unspecified;

#[derive(Debug)]
pub struct ConnBuilder<Path> {
    db_path: Path,
    tuning: DbTuning,
}

impl Default for ConnBuilder<Unspecified> {
    fn default() -> Self {
        ConnBuilder {
            db_path: Unspecified,
            tuning: DbTuning { max_open_files: 100, read_buffer_mb: 10, write_buffer_mb: 256, threads: 2 },
        }
    }
}

impl<Path> ConnBuilder<Path> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf> {
        ConnBuilder { db_path, tuning: self.tuning }
    }
    pub fn with_tuning(self, tuning: DbTuning) -> ConnBuilder<Path> {
        ConnBuilder { tuning, ..self }
    }
}

impl ConnBuilder<PathBuf> {
    fn options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        let threads = self.tuning.threads.max(1) as i32;
        opts.increase_parallelism(threads);
        opts.set_max_background_jobs(threads);

        opts.set_write_buffer_size(self.tuning.write_buffer_mb.max(1) as usize * MB);
        opts.set_keep_log_file_num(1);
        opts.set_bytes_per_sync(MB as u64);
        opts.set_compression_per_level(&[
            DBCompressionType::None,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
        ]);

        let cache = Cache::new_lru_cache(self.tuning.read_buffer_mb as usize * MB);
        let mut b_opts = BlockBasedOptions::default();
        b_opts.set_block_cache(&cache);
        b_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&b_opts);

        // 0 in RocksDB means unlimited, which is never what the operator asked for
        opts.set_max_open_files(self.tuning.max_open_files.clamp(1, i32::MAX as u32) as i32);
        opts.create_if_missing(true);
        opts
    }

    pub fn build(self) -> StoreResult<DB> {
        let opts = self.options();
        DB::open(&opts, &self.db_path).map_err(|source| StoreError::Open { path: self.db_path, source })
    }
}
