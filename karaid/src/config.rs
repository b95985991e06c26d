//!
//! Resolution of the raw [`Args`] into the immutable node [`Config`].
//!

use crate::{
    args::Args,
    errors::{ConfigError, ConfigResult},
};
use karai_consensus_core::{
    address::AccountAddress,
    checkpoints::CheckpointSource,
    config::constants::{database::DATABASE_DIR, network::P2P_STATE_FILE},
};
use karai_core::log::LOG_FILE_EXTENSION;
use karai_database::prelude::DbTuning;
use log::LevelFilter;
use std::{
    net::SocketAddr,
    path::{Component, Path, PathBuf},
};

/// `--log-level` offsets, starting from the base severity `error`
const LOG_LEVELS: [LevelFilter; 5] = [LevelFilter::Error, LevelFilter::Warn, LevelFilter::Info, LevelFilter::Debug, LevelFilter::Trace];

/// Get the default data directory: `~/.karai` on unix, `%LOCALAPPDATA%/Karai` on Windows.
pub fn get_default_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    return dirs::data_local_dir().map(|dir| dir.join("Karai"));
    #[cfg(not(target_os = "windows"))]
    return dirs::home_dir().map(|dir| dir.join(".karai"));
}

/// Process environment the resolution depends on
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub exe_path: PathBuf,
    pub current_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub default_data_dir: PathBuf,
}

impl ResolveContext {
    pub fn from_env() -> ConfigResult<Self> {
        let exe_path = std::env::current_exe().map_err(|err| ConfigError::Environment("the executable path", err.to_string()))?;
        let current_dir = std::env::current_dir().map_err(|err| ConfigError::Environment("the working directory", err.to_string()))?;
        let default_data_dir = get_default_data_dir()
            .ok_or_else(|| ConfigError::Environment("the default data directory", "no home directory".to_string()))?;
        Ok(Self { exe_path, current_dir, home_dir: dirs::home_dir(), default_data_dir })
    }

    /// Expands a leading `~` and makes `path` absolute against the working directory
    fn normalize(&self, path: &str) -> PathBuf {
        let path = match (path.strip_prefix('~'), self.home_dir.as_ref()) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => PathBuf::from(path),
        };
        let path = if path.is_absolute() { path } else { self.current_dir.join(path) };
        lexical_clean(&path)
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    clean
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub dir: PathBuf,
    pub tuning: DbTuning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    pub bind: SocketAddr,
    /// NAT forwarded port, 0 if none
    pub external_port: u16,
    pub allow_local_ip: bool,
    pub hide_my_port: bool,
    pub exclusive_nodes: Vec<SocketAddr>,
    pub priority_nodes: Vec<SocketAddr>,
    pub peers: Vec<SocketAddr>,
    pub seed_nodes: Vec<SocketAddr>,
    /// Persisted peer list
    pub state_file: PathBuf,
}

impl NetConfig {
    /// The port announced to peers given the port the listener is bound to
    pub fn announced_port(&self, bound_port: u16) -> Option<u16> {
        match (self.hide_my_port, self.external_port) {
            (true, _) => None,
            (false, 0) => Some(bound_port),
            (false, external) => Some(external),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub bind: SocketAddr,
    pub fee_address: Option<AccountAddress>,
    pub fee_amount: u64,
    pub cors_origins: Vec<String>,
}

/// Immutable node configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// The data directory was not given explicitly, so it may be created
    pub data_dir_is_default: bool,
    pub checkpoints: CheckpointSource,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    pub no_console: bool,
    pub async_threads: usize,
    pub block_explorer: bool,
    pub db: DbConfig,
    pub net: NetConfig,
    pub rpc: RpcConfig,
}

impl Config {
    pub fn resolve(args: &Args, context: &ResolveContext) -> ConfigResult<Self> {
        let log_level = usize::try_from(args.log_level)
            .ok()
            .and_then(|offset| LOG_LEVELS.get(offset).copied())
            .ok_or(ConfigError::InvalidLogLevel(args.log_level))?;

        if args.async_threads == 0 {
            return Err(ConfigError::InvalidOption { option: "async-threads", reason: "must be at least 1".to_string() });
        }
        if args.enable_cors.iter().any(|origin| origin.trim().is_empty()) {
            return Err(ConfigError::InvalidOption { option: "enable-cors", reason: "origins cannot be empty".to_string() });
        }

        let fee_address = match args.fee_address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(address) => Some(address.parse().map_err(|err| ConfigError::InvalidFeeAddress(address.to_string(), err))?),
        };

        let (data_dir, data_dir_is_default) = match args.data_dir.as_deref().map(str::trim) {
            None | Some("") => (lexical_clean(&context.default_data_dir), true),
            Some(dir) => (context.normalize(dir), false),
        };

        let log_file = match args.log_file.as_deref().map(str::trim) {
            None | Some("") => context.exe_path.with_extension(LOG_FILE_EXTENSION),
            // A bare file name lands next to the executable
            Some(file) if Path::new(file).parent().is_none_or(|parent| parent.as_os_str().is_empty()) && !file.starts_with('~') => {
                context.exe_path.parent().map(|dir| dir.join(file)).unwrap_or_else(|| context.normalize(file))
            }
            Some(file) => context.normalize(file),
        };

        let checkpoints = match CheckpointSource::from_selector(&args.load_checkpoints) {
            CheckpointSource::File(path) => CheckpointSource::File(context.normalize(&path.to_string_lossy())),
            source => source,
        };

        let db = DbConfig {
            dir: data_dir.join(DATABASE_DIR),
            tuning: DbTuning {
                max_open_files: args.db_max_open_files,
                read_buffer_mb: args.db_read_buffer_size,
                write_buffer_mb: args.db_write_buffer_size,
                threads: args.db_threads,
            },
        };

        let net = NetConfig {
            bind: SocketAddr::new(args.p2p_bind_ip, args.p2p_bind_port),
            external_port: args.p2p_external_port,
            allow_local_ip: args.allow_local_ip,
            hide_my_port: args.hide_my_port,
            exclusive_nodes: args.add_exclusive_node.clone(),
            priority_nodes: args.add_priority_node.clone(),
            peers: args.add_peer.clone(),
            seed_nodes: args.seed_node.clone(),
            state_file: data_dir.join(P2P_STATE_FILE),
        };

        let rpc = RpcConfig {
            bind: SocketAddr::new(args.rpc_bind_ip, args.rpc_bind_port),
            fee_address,
            fee_amount: args.fee_amount,
            cors_origins: args.enable_cors.iter().map(|origin| origin.trim().to_string()).collect(),
        };

        Ok(Self {
            data_dir,
            data_dir_is_default,
            checkpoints,
            log_file,
            log_level,
            no_console: args.no_console,
            async_threads: args.async_threads,
            block_explorer: args.enable_block_explorer,
            db,
            net,
            rpc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ResolveContext {
        ResolveContext {
            exe_path: PathBuf::from("/opt/karai/bin/karaid"),
            current_dir: PathBuf::from("/work"),
            home_dir: Some(PathBuf::from("/home/karai")),
            default_data_dir: PathBuf::from("/home/karai/.karai"),
        }
    }

    fn resolve(argv: &[&str]) -> ConfigResult<Config> {
        let args = Args::parse(std::iter::once("karaid").chain(argv.iter().copied())).unwrap();
        Config::resolve(&args, &context())
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/home/karai/.karai"));
        assert!(config.data_dir_is_default);
        assert_eq!(config.db.dir, PathBuf::from("/home/karai/.karai/DB"));
        assert_eq!(config.net.state_file, PathBuf::from("/home/karai/.karai/p2pstate.json"));
        assert_eq!(config.log_file, PathBuf::from("/opt/karai/bin/karaid.log"));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.checkpoints, CheckpointSource::Builtin);
        assert_eq!(config.db.tuning, DbTuning { max_open_files: 100, read_buffer_mb: 10, write_buffer_mb: 256, threads: 2 });
        assert!(config.rpc.fee_address.is_none());
    }

    #[test]
    fn test_paths_are_normalized() {
        let config = resolve(&["--data-dir", "~/chain", "--log-file", "logs/../karai.log", "--load-checkpoints", "./cp.csv"]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/home/karai/chain"));
        assert!(!config.data_dir_is_default);
        assert_eq!(config.log_file, PathBuf::from("/work/karai.log"));
        assert_eq!(config.checkpoints, CheckpointSource::File(PathBuf::from("/work/cp.csv")));

        let config = resolve(&["--data-dir", "relative/dir", "--log-file", "daemon.log"]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/work/relative/dir"));
        assert_eq!(config.log_file, PathBuf::from("/opt/karai/bin/daemon.log"));
    }

    #[test]
    fn test_log_level_offsets() {
        let levels = ["0", "1", "2", "3", "4"].map(|level| resolve(&["--log-level", level]).unwrap().log_level);
        assert_eq!(levels, LOG_LEVELS);
        assert!(matches!(resolve(&["--log-level", "5"]), Err(ConfigError::InvalidLogLevel(5))));
        assert!(matches!(resolve(&["--log-level", "-1"]), Err(ConfigError::InvalidLogLevel(-1))));
    }

    #[test]
    fn test_rpc_and_network_options() {
        let address = format!("kai{}", "cd".repeat(32));
        let config = resolve(&[
            "--fee-address",
            address.as_str(),
            "--fee-amount",
            "100",
            "--enable-cors",
            "https://example.org",
            "--p2p-external-port",
            "40000",
            "--rpc-bind-port",
            "0",
        ])
        .unwrap();
        assert_eq!(config.rpc.fee_address, Some(address.parse().unwrap()));
        assert_eq!(config.rpc.fee_amount, 100);
        assert_eq!(config.rpc.cors_origins, vec!["https://example.org".to_string()]);
        assert_eq!(config.rpc.bind.port(), 0);
        assert_eq!(config.net.announced_port(11997), Some(40000));

        assert!(matches!(resolve(&["--fee-address", "bogus"]), Err(ConfigError::InvalidFeeAddress(..))));
        assert!(matches!(resolve(&["--async-threads", "0"]), Err(ConfigError::InvalidOption { option: "async-threads", .. })));
    }

    #[test]
    fn test_announced_port() {
        let mut net = resolve(&[]).unwrap().net;
        assert_eq!(net.announced_port(5000), Some(5000));
        net.hide_my_port = true;
        net.external_port = 6000;
        assert_eq!(net.announced_port(5000), None);
    }
}
