use karai_hashes::HashParseError;
use std::{num::ParseIntError, path::PathBuf};
use thiserror::Error;

/// Failure to load an explicit checkpoint source. No partial table survives any of these.
#[derive(Error, Debug)]
pub enum CheckpointLoadError {
    #[error("cannot read checkpoint file {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{}:{line}: malformed checkpoint record '{record}', expected <height>,<hash>", .path.display())]
    MalformedRecord { path: PathBuf, line: usize, record: String },

    #[error("{}:{line}: invalid checkpoint height '{value}': {source}", .path.display())]
    InvalidHeight { path: PathBuf, line: usize, value: String, source: ParseIntError },

    #[error("{}:{line}: invalid checkpoint hash '{value}': {source}", .path.display())]
    InvalidHash { path: PathBuf, line: usize, value: String, source: HashParseError },

    #[error("{}:{line}: checkpoint height {height} must be greater than the previous height {previous}", .path.display())]
    NonIncreasingHeight { path: PathBuf, line: usize, height: u32, previous: u32 },
}

pub type CheckpointLoadResult<T> = std::result::Result<T, CheckpointLoadError>;
