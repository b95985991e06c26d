//!
//! Genesis transaction construction and the compiled currency definition.
//!

use crate::{
    address::AccountAddress,
    config::constants::currency::{
        CURRENT_TRANSACTION_VERSION, GENESIS_BLOCK_REWARD, GENESIS_COINBASE_TX_HEX, GENESIS_TX_PUBLIC_KEY, MINED_MONEY_UNLOCK_WINDOW,
    },
    errors::genesis::{GenesisConfigError, GenesisConfigResult},
};
use karai_hashes::Hash;
use serde::{Deserialize, Serialize};

/// Extra field tag preceding the transaction public key
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: u64,
    pub key: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisTransaction {
    pub version: u8,
    pub unlock_time: u64,
    pub outputs: Vec<TransactionOutput>,
    pub extra: Vec<u8>,
}

impl GenesisTransaction {
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serializing a plain struct into memory cannot fail")
    }

    pub fn to_hex(&self) -> String {
        faster_hex::hex_string(&self.to_bytes())
    }

    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let mut bytes = vec![0u8; hex.len() / 2];
        faster_hex::hex_decode(hex.as_bytes(), &mut bytes).map_err(|err| err.to_string())?;
        let tx: Self = bincode::deserialize(&bytes).map_err(|err| err.to_string())?;
        // Trailing bytes or a non-canonical encoding do not round-trip
        if tx.to_bytes() != bytes {
            return Err("trailing or non-canonical bytes".to_owned());
        }
        Ok(tx)
    }

    pub fn total_amount(&self) -> u64 {
        self.outputs.iter().map(|output| output.amount).sum()
    }

    /// The genesis block is identified by the digest of its only transaction
    pub fn block_hash(&self) -> Hash {
        Hash::digest(&self.to_bytes())
    }
}

fn extra_field() -> Vec<u8> {
    let mut extra = Vec::with_capacity(1 + GENESIS_TX_PUBLIC_KEY.len());
    extra.push(TX_EXTRA_TAG_PUBKEY);
    extra.extend_from_slice(&GENESIS_TX_PUBLIC_KEY);
    extra
}

fn output_key(target: &AccountAddress, index: usize) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(GENESIS_TX_PUBLIC_KEY.len() + 32 + 8);
    preimage.extend_from_slice(&GENESIS_TX_PUBLIC_KEY);
    preimage.extend_from_slice(target.spend_key());
    preimage.extend_from_slice(&(index as u64).to_le_bytes());
    *Hash::digest(&preimage).as_bytes()
}

/// Builds the genesis transaction paying `GENESIS_BLOCK_REWARD` to `reward_targets`.
///
/// The reward is split evenly, the remainder going to the last target. With a zero reward
/// the transaction has no outputs and the targets are ignored.
pub fn generate_genesis_transaction(reward_targets: &[AccountAddress]) -> GenesisConfigResult<GenesisTransaction> {
    let mut outputs = Vec::new();
    if GENESIS_BLOCK_REWARD > 0 {
        if reward_targets.is_empty() {
            return Err(GenesisConfigError::MissingRewardAddresses(GENESIS_BLOCK_REWARD));
        }
        let share = GENESIS_BLOCK_REWARD / reward_targets.len() as u64;
        let remainder = GENESIS_BLOCK_REWARD % reward_targets.len() as u64;
        outputs = reward_targets
            .iter()
            .enumerate()
            .map(|(index, target)| {
                let amount = if index + 1 == reward_targets.len() { share + remainder } else { share };
                TransactionOutput { amount, key: output_key(target, index) }
            })
            .collect();
    }
    Ok(GenesisTransaction { version: CURRENT_TRANSACTION_VERSION, unlock_time: MINED_MONEY_UNLOCK_WINDOW, outputs, extra: extra_field() })
}

/// Parses reward addresses given on the command line
pub fn parse_reward_addresses<S: AsRef<str>>(addresses: &[S]) -> GenesisConfigResult<Vec<AccountAddress>> {
    addresses
        .iter()
        .map(|address| {
            let address = address.as_ref();
            address.parse().map_err(|err| GenesisConfigError::InvalidRewardAddress(address.to_owned(), err))
        })
        .collect()
}

/// The currency the node runs, built from the compiled constants
#[derive(Debug, Clone)]
pub struct Currency {
    genesis_transaction: GenesisTransaction,
    genesis_block_hash: Hash,
    block_explorer_mode: bool,
}

impl Currency {
    /// Decodes and validates `GENESIS_COINBASE_TX_HEX`
    pub fn new(block_explorer_mode: bool) -> GenesisConfigResult<Self> {
        let genesis_transaction = GenesisTransaction::from_hex(GENESIS_COINBASE_TX_HEX).map_err(GenesisConfigError::InvalidGenesisConstant)?;
        Self::validate_genesis(&genesis_transaction)?;
        let genesis_block_hash = genesis_transaction.block_hash();
        Ok(Self { genesis_transaction, genesis_block_hash, block_explorer_mode })
    }

    fn validate_genesis(tx: &GenesisTransaction) -> GenesisConfigResult<()> {
        let fail = |reason: String| Err(GenesisConfigError::InvalidGenesisConstant(reason));
        if tx.version != CURRENT_TRANSACTION_VERSION {
            return fail(format!("version {} instead of {}", tx.version, CURRENT_TRANSACTION_VERSION));
        }
        if tx.unlock_time != MINED_MONEY_UNLOCK_WINDOW {
            return fail(format!("unlock time {} instead of {}", tx.unlock_time, MINED_MONEY_UNLOCK_WINDOW));
        }
        if tx.total_amount() != GENESIS_BLOCK_REWARD {
            return fail(format!("pays {} instead of {}", tx.total_amount(), GENESIS_BLOCK_REWARD));
        }
        if tx.extra != extra_field() {
            return fail("unexpected transaction public key".to_owned());
        }
        Ok(())
    }

    pub fn genesis_transaction(&self) -> &GenesisTransaction {
        &self.genesis_transaction
    }

    pub fn genesis_block_hash(&self) -> Hash {
        self.genesis_block_hash
    }

    pub fn is_block_explorer(&self) -> bool {
        self.block_explorer_mode
    }
}
