use super::address::AddressError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GenesisConfigError {
    #[error("GENESIS_COINBASE_TX_HEX constant has an incorrect value ({0}). Please launch: karaid --print-genesis-tx")]
    InvalidGenesisConstant(String),

    #[error("genesis block reward addresses are not defined while the genesis block reward is {0}")]
    MissingRewardAddresses(u64),

    #[error("failed to parse genesis reward address {0}: {1}")]
    InvalidRewardAddress(String, AddressError),
}

pub type GenesisConfigResult<T> = std::result::Result<T, GenesisConfigError>;
