//! Logger and logging macros
//!
//! The node logs through the [`log`] facade. [`init_logger`] installs a [`log4rs`]
//! backend writing to the console and, optionally, to a size-rolled log file.

use appender::AppenderSpec;
use log4rs::config::{Config, Root};
use logger::Filters;
use thiserror::Error;

mod appender;
mod consts;
mod logger;

pub use consts::{DEFAULT_LOGGER_ENV, LOG_FILE_EXTENSION};

#[doc(hidden)]
pub mod __private_log {
    pub use log::{debug, error, info, log_enabled, trace, warn, Level};
}

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid logger configuration: {0}")]
    Config(String),

    #[error("cannot open log file {0}: {1}")]
    Appender(String, String),

    #[error("a logger is already installed: {0}")]
    SetLogger(#[from] log::SetLoggerError),
}

/// Installs the process-wide logger.
///
/// `filters` is a comma separated list of `<level>` (root level) and
/// `<module>=<level>` entries. The `RUST_LOG` environment variable, if set,
/// is applied after `filters` and takes precedence.
pub fn init_logger(log_file: Option<&str>, filters: &str) -> Result<(), LogInitError> {
    let mut specs = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_file) = log_file {
        specs.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_file)?);
    }
    let names = specs.iter().map(|spec| spec.name).collect::<Vec<_>>();

    let filters = Filters::parse(filters).merge(Filters::from_env(DEFAULT_LOGGER_ENV));
    let config = Config::builder()
        .appenders(specs.into_iter().map(|spec| spec.into_appender()))
        .loggers(filters.loggers(&names))
        .build(Root::builder().appenders(names).build(filters.root_level()))
        .map_err(|err| LogInitError::Config(err.to_string()))?;

    log4rs::init_config(config)?;
    Ok(())
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => (
        $crate::log::__private_log::trace!($($t)*)
    )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => (
        $crate::log::__private_log::debug!($($t)*)
    )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => (
        $crate::log::__private_log::info!($($t)*)
    )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => (
        $crate::log::__private_log::warn!($($t)*)
    )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => (
        $crate::log::__private_log::error!($($t)*)
    )
}
