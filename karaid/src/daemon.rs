//!
//! Daemon lifecycle: informational modes, environment setup, store acquisition,
//! node start, the blocking run and the ordered release.
//!

use crate::{
    args::Args,
    components::DaemonFactory,
    config::{Config, ResolveContext},
    errors::{DaemonError, DaemonResult},
    node,
    version::{os_version_string, program_header},
};
use karai_consensus_core::{
    checkpoints::{CheckpointSource, Checkpoints},
    genesis::{generate_genesis_transaction, parse_reward_addresses, Currency},
};
use karai_core::{info, log::init_logger, panic::configure_panic, signals::ShutdownCoordinator};
use karai_database::prelude::StoreHandle;
use std::{fs, sync::Arc, time::Duration};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Describes the genesis transaction for `reward_addresses` together with the constant
/// line to compile in. Problems are reported in the text, not returned.
pub fn genesis_tx_report(reward_addresses: &[String]) -> String {
    let transaction = parse_reward_addresses(reward_addresses).and_then(|targets| generate_genesis_transaction(&targets));
    match transaction {
        Ok(transaction) => format!(
            "Replace the current GENESIS_COINBASE_TX_HEX line in consensus/core/src/config/constants.rs with:\n    pub const GENESIS_COINBASE_TX_HEX: &str = \"{}\";",
            transaction.to_hex()
        ),
        Err(err) => format!("Failed to generate the genesis transaction: {err}"),
    }
}

/// Creates the default data directory on demand. An explicitly chosen one must exist.
fn prepare_data_dir(config: &Config) -> DaemonResult<()> {
    if config.data_dir.is_dir() {
        return Ok(());
    }
    if !config.data_dir_is_default {
        return Err(DaemonError::DirectoryNotFound(config.data_dir.clone()));
    }
    fs::create_dir_all(&config.data_dir).map_err(|source| DaemonError::CreateDirectory { path: config.data_dir.clone(), source })?;
    info!("Created data directory {}", config.data_dir.display());
    Ok(())
}

fn print_information(args: &Args) {
    if args.version {
        print!("{}", program_header());
    } else if args.os_version {
        print!("{}", program_header());
        println!("OS: {}", os_version_string());
    } else if args.print_genesis_tx {
        println!("{}", genesis_tx_report(&args.genesis_block_reward_address));
    }
}

/// Entry point of the binary
pub fn run_daemon(args: Args) -> DaemonResult<()> {
    if args.is_informational() {
        print_information(&args);
        return Ok(());
    }

    let config = Arc::new(Config::resolve(&args, &ResolveContext::from_env()?)?);

    configure_panic();
    init_logger(Some(&config.log_file.to_string_lossy()), &config.log_level.to_string())?;
    info!("{}", program_header().trim_end());

    let coordinator = Arc::new(ShutdownCoordinator::new());
    coordinator.init()?;

    run(config, coordinator)
}

/// Runs the node until `coordinator` requests a stop, then tears it down and releases the store.
pub fn run(config: Arc<Config>, coordinator: Arc<ShutdownCoordinator>) -> DaemonResult<()> {
    info!("Log file: {}", config.log_file.display());

    let currency = Currency::new(config.block_explorer)?;
    info!("Genesis block {}", currency.genesis_block_hash());

    if config.checkpoints != CheckpointSource::Disabled {
        info!("Loading checkpoints...");
    }
    let checkpoints = Checkpoints::load(&config.checkpoints)?;

    prepare_data_dir(&config)?;
    info!("Data directory: {}", config.data_dir.display());
    let store = StoreHandle::open(config.db.dir.clone(), config.db.tuning)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.async_threads)
        .thread_name("karai-io")
        .enable_all()
        .build()
        .map_err(DaemonError::Runtime)?;
    let factory = DaemonFactory::new(currency, runtime.handle().clone(), coordinator.clone());

    let stopped = {
        let node = node::start(&config, store.db(), checkpoints, &factory)?;
        let signals = node.stop_signals();
        coordinator.install(move || signals.trigger());

        node.run();
        node.stop()
    };
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    store.release();
    stopped.map_err(DaemonError::Shutdown)?;

    info!("Node stopped.");
    Ok(())
}
