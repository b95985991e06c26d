//!
//! Chain state owned by the node core and the snapshot of it shared with the services.
//!

use crate::{
    errors::{CoreError, CoreResult},
    node::api::{ChainTip, CoreApi},
};
use karai_consensus_core::{checkpoints::Checkpoints, genesis::Currency};
use karai_core::{debug, info};
use karai_database::prelude::{CachedDbItem, DirectDbWriter, StoreResultExt, DB};
use parking_lot::RwLock;
use std::sync::Arc;

const CHAIN_TIP_KEY: &[u8] = b"chain-tip";

/// Chain tip readable by the services outliving the store borrow
#[derive(Default)]
pub struct ChainStatus {
    tip: RwLock<ChainTip>,
}

impl ChainStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tip(&self) -> ChainTip {
        *self.tip.read()
    }

    fn publish(&self, tip: ChainTip) {
        *self.tip.write() = tip;
    }
}

pub struct ChainCore<'a> {
    currency: Currency,
    checkpoints: Arc<Checkpoints>,
    db: &'a DB,
    tip: CachedDbItem<'a, ChainTip>,
    status: Arc<ChainStatus>,
}

impl<'a> ChainCore<'a> {
    pub fn new(currency: Currency, checkpoints: Checkpoints, db: &'a DB, status: Arc<ChainStatus>) -> Self {
        Self { currency, checkpoints: Arc::new(checkpoints), db, tip: CachedDbItem::new(db, CHAIN_TIP_KEY), status }
    }

    fn genesis_tip(&self) -> ChainTip {
        let genesis = self.currency.genesis_block_hash();
        ChainTip { height: 0, hash: genesis, genesis }
    }
}

impl CoreApi for ChainCore<'_> {
    fn load(&self) -> CoreResult<()> {
        let expected = self.currency.genesis_block_hash();
        let tip = match self.tip.read().optional()? {
            Some(tip) => tip,
            None => {
                info!("Empty chain store, writing the genesis block {}", expected);
                let tip = self.genesis_tip();
                self.tip.write(DirectDbWriter::new(self.db), &tip)?;
                tip
            }
        };

        if tip.genesis != expected {
            return Err(CoreError::GenesisMismatch { stored: tip.genesis, expected });
        }
        if let Some(checkpoint) = self.checkpoints.get(tip.height) {
            if checkpoint.hash != tip.hash {
                return Err(CoreError::CheckpointConflict { height: tip.height, hash: tip.hash, expected: checkpoint.hash });
            }
        }

        info!("Chain loaded at height {} (top block {})", tip.height, tip.hash);
        if self.currency.is_block_explorer() {
            debug!("Block explorer indexes enabled");
        }
        self.status.publish(tip);
        Ok(())
    }

    fn save(&self) -> CoreResult<()> {
        let tip = self.status.tip();
        self.tip.write(DirectDbWriter::new(self.db), &tip)?;
        self.db.flush().map_err(|err| CoreError::Store(err.into()))?;
        debug!("Chain state saved at height {}", tip.height);
        Ok(())
    }

    fn tip(&self) -> ChainTip {
        self.status.tip()
    }

    fn checkpoints(&self) -> Arc<Checkpoints> {
        self.checkpoints.clone()
    }
}
