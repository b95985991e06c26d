use clap::{arg, error::ErrorKind, Arg, ArgAction, Command};
use karai_consensus_core::config::constants::{
    database::{
        DATABASE_DEFAULT_BACKGROUND_THREADS_COUNT, DATABASE_DEFAULT_MAX_OPEN_FILES, DATABASE_READ_BUFFER_MB_DEFAULT_SIZE,
        DATABASE_WRITE_BUFFER_MB_DEFAULT_SIZE,
    },
    network::{P2P_DEFAULT_PORT, RPC_DEFAULT_PORT},
};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use std::{
    ffi::OsString,
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    process::exit,
};
use toml::from_str;

use crate::version::program_header;

/// Config file used when `--config-file` is given without a value
pub const DEFAULT_CONFIG_FILE: &str = "karai.conf";

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Args {
    // NOTE: property names match config file fields
    #[serde(skip)]
    pub config_file: Option<String>,
    #[serde(skip)]
    pub version: bool,
    #[serde(skip)]
    pub os_version: bool,
    #[serde(skip)]
    pub print_genesis_tx: bool,
    pub genesis_block_reward_address: Vec<String>,

    pub data_dir: Option<String>,
    pub load_checkpoints: String,
    pub log_file: Option<String>,
    pub log_level: i64,
    pub no_console: bool,
    pub async_threads: usize,

    #[serde(rename = "enable-blockexplorer")]
    pub enable_block_explorer: bool,
    pub enable_cors: Vec<String>,
    pub fee_address: Option<String>,
    pub fee_amount: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub rpc_bind_ip: IpAddr,
    pub rpc_bind_port: u16,

    pub allow_local_ip: bool,
    pub hide_my_port: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub p2p_bind_ip: IpAddr,
    pub p2p_bind_port: u16,
    pub p2p_external_port: u16,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub add_exclusive_node: Vec<SocketAddr>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub add_peer: Vec<SocketAddr>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub add_priority_node: Vec<SocketAddr>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub seed_node: Vec<SocketAddr>,

    pub db_max_open_files: u32,
    pub db_read_buffer_size: u32,
    pub db_threads: u32,
    pub db_write_buffer_size: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_file: None,
            version: false,
            os_version: false,
            print_genesis_tx: false,
            genesis_block_reward_address: vec![],

            data_dir: None,
            load_checkpoints: "default".into(),
            log_file: None,
            log_level: 2,
            no_console: false,
            async_threads: num_cpus::get(),

            enable_block_explorer: false,
            enable_cors: vec![],
            fee_address: None,
            fee_amount: 0,
            rpc_bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            rpc_bind_port: RPC_DEFAULT_PORT,

            allow_local_ip: false,
            hide_my_port: false,
            p2p_bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            p2p_bind_port: P2P_DEFAULT_PORT,
            p2p_external_port: 0,
            add_exclusive_node: vec![],
            add_peer: vec![],
            add_priority_node: vec![],
            seed_node: vec![],

            db_max_open_files: DATABASE_DEFAULT_MAX_OPEN_FILES,
            db_read_buffer_size: DATABASE_READ_BUFFER_MB_DEFAULT_SIZE,
            db_threads: DATABASE_DEFAULT_BACKGROUND_THREADS_COUNT,
            db_write_buffer_size: DATABASE_WRITE_BUFFER_MB_DEFAULT_SIZE,
        }
    }
}

impl Args {
    /// Whether the invocation only prints information and exits
    pub fn is_informational(&self) -> bool {
        self.version || self.os_version || self.print_genesis_tx
    }
}

fn value_arg(id: &'static str, env: &'static str, value_name: &'static str, help: String) -> Arg {
    Arg::new(id).long(id).env(env).value_name(value_name).help(help)
}

fn peer_arg(id: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .env(env)
        .value_name("IP:PORT")
        .action(ArgAction::Append)
        .value_parser(clap::value_parser!(SocketAddr))
        .help(help)
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    Command::new("karaid")
        .about(program_header())
        .disable_version_flag(true)
        .arg(arg!(--version "Output daemon version information"))
        .arg(arg!(--"os-version" "Output Operating System version information"))
        .arg(arg!(--"print-genesis-tx" "Print the genesis block transaction hex and exit"))
        .arg(
            Arg::new("genesis-block-reward-address")
                .long("genesis-block-reward-address")
                .value_name("ADDRESS")
                .action(ArgAction::Append)
                .help("Specify the address for any premine genesis block rewards"),
        )
        .arg(
            Arg::new("config-file")
                .long("config-file")
                .env("KARAID_CONFIG_FILE")
                .value_name("PATH")
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value(DEFAULT_CONFIG_FILE)
                .help(format!("Specify the location of a configuration file (default when given without a value: {DEFAULT_CONFIG_FILE})")),
        )
        .arg(value_arg("data-dir", "KARAID_DATA_DIR", "PATH", "Specify blockchain data directory (default: ~/.karai)".to_string()))
        .arg(value_arg(
            "load-checkpoints",
            "KARAID_LOAD_CHECKPOINTS",
            "PATH",
            "Use builtin default checkpoints or checkpoint csv file for faster initial blockchain sync, empty to disable (default: default)"
                .to_string(),
        ))
        .arg(value_arg(
            "log-file",
            "KARAID_LOG_FILE",
            "PATH",
            "Specify log file location (default: the executable path with a .log extension)".to_string(),
        ))
        .arg(
            value_arg("log-level", "KARAID_LOG_LEVEL", "#", format!("Specify log level, 0 (error) to 4 (trace) (default: {})", defaults.log_level))
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(arg!(--"no-console" "Disable daemon console commands"))
        .arg(
            Arg::new("async-threads")
                .short('t')
                .long("async-threads")
                .env("KARAID_ASYNC_THREADS")
                .value_name("async_threads")
                .value_parser(clap::value_parser!(usize))
                .help(format!("Specify number of async threads (default: {}).", defaults.async_threads)),
        )
        .arg(arg!(--"enable-blockexplorer" "Enable the blockchain explorer RPC"))
        .arg(
            Arg::new("enable-cors")
                .long("enable-cors")
                .env("KARAID_ENABLE_CORS")
                .value_name("DOMAIN")
                .action(ArgAction::Append)
                .help("Adds header 'Access-Control-Allow-Origin' to the RPC responses. Uses the value specified as the domain. Use * for all."),
        )
        .arg(value_arg(
            "fee-address",
            "KARAID_FEE_ADDRESS",
            "ADDRESS",
            "Sets the convenience charge address for light wallets that use the daemon".to_string(),
        ))
        .arg(
            value_arg(
                "fee-amount",
                "KARAID_FEE_AMOUNT",
                "#",
                "Sets the convenience charge amount for light wallets that use the daemon".to_string(),
            )
            .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            value_arg("rpc-bind-ip", "KARAID_RPC_BIND_IP", "IP", format!("Interface IP address for the RPC service (default: {})", defaults.rpc_bind_ip))
                .value_parser(clap::value_parser!(IpAddr)),
        )
        .arg(
            value_arg("rpc-bind-port", "KARAID_RPC_BIND_PORT", "#", format!("TCP port for the RPC service (default: {})", defaults.rpc_bind_port))
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(arg!(--"allow-local-ip" "Allow the local IP to be added to the peer list"))
        .arg(arg!(--"hide-my-port" "Do not announce yourself as a peerlist candidate"))
        .arg(
            value_arg("p2p-bind-ip", "KARAID_P2P_BIND_IP", "IP", format!("Interface IP address for the P2P service (default: {})", defaults.p2p_bind_ip))
                .value_parser(clap::value_parser!(IpAddr)),
        )
        .arg(
            value_arg("p2p-bind-port", "KARAID_P2P_BIND_PORT", "#", format!("TCP port for the P2P service (default: {})", defaults.p2p_bind_port))
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            value_arg(
                "p2p-external-port",
                "KARAID_P2P_EXTERNAL_PORT",
                "#",
                "External TCP port for the P2P service (NAT port forward), 0 to announce the bound port".to_string(),
            )
            .value_parser(clap::value_parser!(u16)),
        )
        .arg(peer_arg(
            "add-exclusive-node",
            "KARAID_ADD_EXCLUSIVE_NODE",
            "Manually add a peer to the local peer list ONLY attempt connections to it",
        ))
        .arg(peer_arg("add-peer", "KARAID_ADD_PEER", "Manually add a peer to the local peer list"))
        .arg(peer_arg(
            "add-priority-node",
            "KARAID_ADD_PRIORITY_NODE",
            "Manually add a peer to the local peer list and attempt to maintain a connection to it",
        ))
        .arg(peer_arg("seed-node", "KARAID_SEED_NODE", "Connect to a node to retrieve the peer list and then disconnect"))
        .arg(
            value_arg(
                "db-max-open-files",
                "KARAID_DB_MAX_OPEN_FILES",
                "#",
                format!("Number of files that can be used by the database at one time (default: {})", defaults.db_max_open_files),
            )
            .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            value_arg(
                "db-read-buffer-size",
                "KARAID_DB_READ_BUFFER_SIZE",
                "#",
                format!("Size of the database read cache in megabytes (MB) (default: {})", defaults.db_read_buffer_size),
            )
            .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            value_arg(
                "db-threads",
                "KARAID_DB_THREADS",
                "#",
                format!("Number of background threads used for compaction and flush operations (default: {})", defaults.db_threads),
            )
            .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            value_arg(
                "db-write-buffer-size",
                "KARAID_DB_WRITE_BUFFER_SIZE",
                "#",
                format!("Size of the database write buffer in megabytes (MB) (default: {})", defaults.db_write_buffer_size),
            )
            .value_parser(clap::value_parser!(u32)),
        )
}

/// Parses the process arguments. Prints the help text and exits with 0 on `--help`,
/// prints the error with usage and exits with 1 on a malformed command line.
pub fn parse_args() -> Args {
    match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            let code = if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) { 0 } else { 1 };
            let _ = err.print();
            exit(code);
        }
    }
}

impl Args {
    pub fn parse<I, T>(itr: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m: clap::ArgMatches = cli().try_get_matches_from(itr)?;
        let mut defaults: Args = Default::default();

        let config_file = m.get_one::<String>("config-file").cloned();
        if let Some(config_file) = config_file.as_ref() {
            let config_str = fs::read_to_string(config_file)
                .map_err(|err| cli().error(ErrorKind::Io, format!("cannot read config file {config_file}: {err}")))?;
            defaults = from_str(&config_str).map_err(|toml_error| {
                cli().error(
                    ErrorKind::ValueValidation,
                    format!("failed parsing config file {config_file}, reason: {}", toml_error.message()),
                )
            })?;
        }

        let args = Args {
            config_file,
            version: arg_match_unwrap_or::<bool>(&m, "version", false),
            os_version: arg_match_unwrap_or::<bool>(&m, "os-version", false),
            print_genesis_tx: arg_match_unwrap_or::<bool>(&m, "print-genesis-tx", false),
            genesis_block_reward_address: arg_match_many_unwrap_or::<String>(
                &m,
                "genesis-block-reward-address",
                defaults.genesis_block_reward_address,
            ),

            data_dir: m.get_one::<String>("data-dir").cloned().or(defaults.data_dir),
            load_checkpoints: arg_match_unwrap_or::<String>(&m, "load-checkpoints", defaults.load_checkpoints),
            log_file: m.get_one::<String>("log-file").cloned().or(defaults.log_file),
            log_level: arg_match_unwrap_or::<i64>(&m, "log-level", defaults.log_level),
            no_console: arg_match_unwrap_or::<bool>(&m, "no-console", defaults.no_console),
            async_threads: arg_match_unwrap_or::<usize>(&m, "async-threads", defaults.async_threads),

            enable_block_explorer: arg_match_unwrap_or::<bool>(&m, "enable-blockexplorer", defaults.enable_block_explorer),
            enable_cors: arg_match_many_unwrap_or::<String>(&m, "enable-cors", defaults.enable_cors),
            fee_address: m.get_one::<String>("fee-address").cloned().or(defaults.fee_address),
            fee_amount: arg_match_unwrap_or::<u64>(&m, "fee-amount", defaults.fee_amount),
            rpc_bind_ip: arg_match_unwrap_or::<IpAddr>(&m, "rpc-bind-ip", defaults.rpc_bind_ip),
            rpc_bind_port: arg_match_unwrap_or::<u16>(&m, "rpc-bind-port", defaults.rpc_bind_port),

            allow_local_ip: arg_match_unwrap_or::<bool>(&m, "allow-local-ip", defaults.allow_local_ip),
            hide_my_port: arg_match_unwrap_or::<bool>(&m, "hide-my-port", defaults.hide_my_port),
            p2p_bind_ip: arg_match_unwrap_or::<IpAddr>(&m, "p2p-bind-ip", defaults.p2p_bind_ip),
            p2p_bind_port: arg_match_unwrap_or::<u16>(&m, "p2p-bind-port", defaults.p2p_bind_port),
            p2p_external_port: arg_match_unwrap_or::<u16>(&m, "p2p-external-port", defaults.p2p_external_port),
            add_exclusive_node: arg_match_many_unwrap_or::<SocketAddr>(&m, "add-exclusive-node", defaults.add_exclusive_node),
            add_peer: arg_match_many_unwrap_or::<SocketAddr>(&m, "add-peer", defaults.add_peer),
            add_priority_node: arg_match_many_unwrap_or::<SocketAddr>(&m, "add-priority-node", defaults.add_priority_node),
            seed_node: arg_match_many_unwrap_or::<SocketAddr>(&m, "seed-node", defaults.seed_node),

            db_max_open_files: arg_match_unwrap_or::<u32>(&m, "db-max-open-files", defaults.db_max_open_files),
            db_read_buffer_size: arg_match_unwrap_or::<u32>(&m, "db-read-buffer-size", defaults.db_read_buffer_size),
            db_threads: arg_match_unwrap_or::<u32>(&m, "db-threads", defaults.db_threads),
            db_write_buffer_size: arg_match_unwrap_or::<u32>(&m, "db-write-buffer-size", defaults.db_write_buffer_size),
        };

        Ok(args)
    }
}

use clap::parser::ValueSource::DefaultValue;
use std::marker::{Send, Sync};
fn arg_match_unwrap_or<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, arg_id: &str, default: T) -> T {
    m.get_one::<T>(arg_id).cloned().filter(|_| m.value_source(arg_id) != Some(DefaultValue)).unwrap_or(default)
}

fn arg_match_many_unwrap_or<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, arg_id: &str, default: Vec<T>) -> Vec<T> {
    match m.get_many::<T>(arg_id) {
        Some(val_ref) => val_ref.cloned().collect(),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let args = Args::parse(["karaid"]).unwrap();
        assert_eq!(args.load_checkpoints, "default");
        assert_eq!(args.log_level, 2);
        assert_eq!(args.p2p_bind_port, P2P_DEFAULT_PORT);
        assert_eq!(args.rpc_bind_port, RPC_DEFAULT_PORT);
        assert_eq!(args.db_max_open_files, 100);
        assert_eq!(args.db_write_buffer_size, 256);
        assert!(args.data_dir.is_none());
        assert!(!args.no_console);
        assert!(!args.is_informational());
    }

    #[test]
    fn test_command_line() {
        let args = Args::parse([
            "karaid",
            "--data-dir",
            "/tmp/karai",
            "--log-level",
            "4",
            "--no-console",
            "--p2p-bind-port",
            "0",
            "--add-peer",
            "10.0.0.1:11997",
            "--add-peer",
            "10.0.0.2:11997",
            "--enable-cors",
            "*",
            "--load-checkpoints",
            "",
        ])
        .unwrap();
        assert_eq!(args.data_dir.as_deref(), Some("/tmp/karai"));
        assert_eq!(args.log_level, 4);
        assert!(args.no_console);
        assert_eq!(args.p2p_bind_port, 0);
        assert_eq!(args.add_peer, vec!["10.0.0.1:11997".parse().unwrap(), "10.0.0.2:11997".parse().unwrap()]);
        assert_eq!(args.enable_cors, vec!["*".to_string()]);
        assert_eq!(args.load_checkpoints, "");
    }

    #[test]
    fn test_informational_flags() {
        assert!(Args::parse(["karaid", "--version"]).unwrap().version);
        assert!(Args::parse(["karaid", "--os-version"]).unwrap().os_version);
        let args = Args::parse(["karaid", "--print-genesis-tx", "--genesis-block-reward-address", "kai00"]).unwrap();
        assert!(args.print_genesis_tx && args.is_informational());
        assert_eq!(args.genesis_block_reward_address, vec!["kai00".to_string()]);

        let err = Args::parse(["karaid", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Args::parse(["karaid", "--p2p-bind-port", "65536"]).is_err());
        assert!(Args::parse(["karaid", "--db-threads", "-1"]).is_err());
        assert!(Args::parse(["karaid", "--add-peer", "not-an-address"]).is_err());
        assert!(Args::parse(["karaid", "--unknown-option"]).is_err());
    }

    #[test]
    fn test_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data-dir = "/srv/karai"
log-level = 3
add-exclusive-node = ["192.168.1.10:11997"]
p2p-bind-ip = "127.0.0.1"
enable-blockexplorer = true
"#
        )
        .unwrap();
        let config_file = format!("--config-file={}", file.path().display());

        let args = Args::parse(["karaid", config_file.as_str()]).unwrap();
        assert_eq!(args.data_dir.as_deref(), Some("/srv/karai"));
        assert_eq!(args.log_level, 3);
        assert_eq!(args.add_exclusive_node, vec!["192.168.1.10:11997".parse().unwrap()]);
        assert_eq!(args.p2p_bind_ip, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert!(args.enable_block_explorer);

        // Command line values take precedence over the config file
        let args = Args::parse(["karaid", config_file.as_str(), "--log-level", "1"]).unwrap();
        assert_eq!(args.log_level, 1);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "no-such-key = 1").unwrap();
        assert!(Args::parse(["karaid".to_string(), format!("--config-file={}", bad.path().display())]).is_err());
    }
}
