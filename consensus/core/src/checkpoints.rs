//!
//! Trusted `(height, block hash)` pins loaded once at startup and handed to the chain core.
//!

use crate::{
    config::checkpoints::CHECKPOINTS,
    errors::checkpoints::{CheckpointLoadError, CheckpointLoadResult},
};
use karai_core::{debug, info};
use karai_hashes::Hash;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Selector value meaning "use the compiled-in checkpoint list"
pub const BUILTIN_CHECKPOINTS: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: u32,
    pub hash: Hash,
}

/// Where the checkpoint table comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    /// No checkpoint constraints at all
    Disabled,
    Builtin,
    File(PathBuf),
}

impl CheckpointSource {
    /// Maps the `--load-checkpoints` selector: empty disables loading, `"default"` selects the
    /// builtin list and anything else is a file path.
    pub fn from_selector(selector: &str) -> Self {
        match selector.trim() {
            "" => Self::Disabled,
            BUILTIN_CHECKPOINTS => Self::Builtin,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// An ordered checkpoint table. Heights are unique and strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoints {
    points: Vec<Checkpoint>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the table selected by `source`. A disabled source yields an empty table.
    pub fn load(source: &CheckpointSource) -> CheckpointLoadResult<Self> {
        let checkpoints = match source {
            CheckpointSource::Disabled => {
                debug!("Checkpoint loading is disabled");
                return Ok(Self::new());
            }
            CheckpointSource::Builtin => Self::from_builtin(),
            CheckpointSource::File(path) => Self::from_file(path)?,
        };
        info!("Loaded {} checkpoints", checkpoints.len());
        Ok(checkpoints)
    }

    /// Copies the compiled-in checkpoint list
    pub fn from_builtin() -> Self {
        let points = CHECKPOINTS
            .iter()
            .map(|cp| Checkpoint {
                height: cp.height,
                hash: Hash::from_str(cp.hash).expect("builtin checkpoint hashes are valid 64 character hex strings"),
            })
            .collect();
        Self { points }
    }

    /// Parses a checkpoint file made of `height,hash` lines. Blank lines are skipped and any
    /// malformed line fails the whole load.
    pub fn from_file(path: &Path) -> CheckpointLoadResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| CheckpointLoadError::Io { path: path.to_path_buf(), source })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> CheckpointLoadResult<Self> {
        let mut checkpoints = Self::new();
        for (index, record) in content.lines().enumerate() {
            let line = index + 1;
            let record = record.trim();
            if record.is_empty() {
                continue;
            }

            let malformed = || CheckpointLoadError::MalformedRecord { path: path.to_path_buf(), line, record: record.to_owned() };
            let (height, hash) = record.split_once(',').ok_or_else(malformed)?;
            let (height, hash) = (height.trim(), hash.trim());
            if hash.contains(',') {
                return Err(malformed());
            }

            let height = height.parse::<u32>().map_err(|source| CheckpointLoadError::InvalidHeight {
                path: path.to_path_buf(),
                line,
                value: height.to_owned(),
                source,
            })?;
            let hash = Hash::from_str(hash).map_err(|source| CheckpointLoadError::InvalidHash {
                path: path.to_path_buf(),
                line,
                value: hash.to_owned(),
                source,
            })?;

            if let Some(previous) = checkpoints.last() {
                if height <= previous.height {
                    return Err(CheckpointLoadError::NonIncreasingHeight {
                        path: path.to_path_buf(),
                        line,
                        height,
                        previous: previous.height,
                    });
                }
            }
            checkpoints.points.push(Checkpoint { height, hash });
        }
        Ok(checkpoints)
    }

    /// Appends a checkpoint. Returns `false` and leaves the table untouched if `height` does
    /// not extend the table.
    pub fn add_checkpoint(&mut self, height: u32, hash: Hash) -> bool {
        if self.last().is_some_and(|last| height <= last.height) {
            return false;
        }
        self.points.push(Checkpoint { height, hash });
        true
    }

    /// Whether `height` is at or below the highest checkpoint
    pub fn is_in_checkpoint_zone(&self, height: u32) -> bool {
        self.last().is_some_and(|last| height <= last.height)
    }

    /// The checkpoint pinned at exactly `height`
    pub fn get(&self, height: u32) -> Option<&Checkpoint> {
        self.points.binary_search_by_key(&height, |cp| cp.height).ok().map(|index| &self.points[index])
    }

    /// Returns `false` only if a checkpoint pins `height` to a different hash
    pub fn check_block(&self, height: u32, hash: &Hash) -> bool {
        self.get(height).is_none_or(|cp| cp.hash == *hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&Checkpoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
