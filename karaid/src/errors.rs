use crate::args::cli;
use karai_consensus_core::errors::{address::AddressError, checkpoints::CheckpointLoadError, genesis::GenesisConfigError};
use karai_core::log::LogInitError;
use karai_database::prelude::StoreError;
use karai_hashes::Hash;
use std::{io, net::SocketAddr, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--log-level must be between 0 (error) and 4 (trace), found {0}")]
    InvalidLogLevel(i64),

    #[error("--fee-address {0} is not a valid address: {1}")]
    InvalidFeeAddress(String, AddressError),

    #[error("--{option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("cannot determine {0}: {1}")]
    Environment(&'static str, String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("the store holds a chain with genesis {stored} while this node expects {expected}")]
    GenesisMismatch { stored: Hash, expected: Hash },

    #[error("persisted block {hash} at height {height} contradicts the checkpoint {expected}")]
    CheckpointConflict { height: u32, hash: Hash, expected: Hash },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum NetworkInitError {
    #[error("cannot bind the p2p listener to {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("cannot read the peer list {}: {source}", .path.display())]
    PeerState { path: PathBuf, source: io::Error },

    #[error("the peer list {} is corrupted: {source}", .path.display())]
    PeerStateFormat { path: PathBuf, source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("cannot bind the rpc listener to {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

#[derive(Error, Debug)]
pub enum StartError {
    #[error("core initialization failed: {0}")]
    Core(#[from] CoreError),

    #[error("p2p server initialization failed: {0}")]
    Network(#[from] NetworkInitError),

    #[error("rpc server start failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("cannot start the console: {0}")]
    Console(io::Error),
}

pub type StartResult<T> = std::result::Result<T, StartError>;

/// Every condition that ends the daemon with a non-zero exit code
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Genesis(#[from] GenesisConfigError),

    #[error("Failed to load checkpoints: {0}")]
    Checkpoints(#[from] CheckpointLoadError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Start(#[from] StartError),

    #[error("node shutdown failed: {0}")]
    Shutdown(CoreError),

    #[error("cannot initialize the logger: {0}")]
    Logger(#[from] LogInitError),

    #[error("cannot install the signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot build the async runtime: {0}")]
    Runtime(io::Error),
}

impl DaemonError {
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Text for stderr when the failure happens before the logger is up.
    /// Configuration errors are followed by the usage line.
    pub fn early_report(&self) -> Option<String> {
        match self {
            DaemonError::Config(_) => Some(format!("{self}\n\n{}", cli().render_usage())),
            DaemonError::Logger(_) => Some(self.to_string()),
            _ => None,
        }
    }
}

pub type DaemonResult<T> = std::result::Result<T, DaemonError>;
