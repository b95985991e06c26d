//!
//! Concrete node components and the factory wiring them for the daemon.
//!

use crate::node::api::{CommandsApi, CoreApi, NetworkApi, NodeFactory, ProtocolApi, RpcApi};
use karai_consensus_core::{checkpoints::Checkpoints, genesis::Currency};
use karai_core::signals::ShutdownCoordinator;
use karai_database::prelude::DB;
use std::sync::Arc;
use tokio::runtime::Handle;

pub mod chain;
pub mod console;
pub mod p2p;
pub mod protocol;
pub mod rpc;

use chain::{ChainCore, ChainStatus};
use console::DaemonCommandsHandler;
use p2p::P2pServer;
use protocol::ProtocolHandler;
use rpc::RpcServer;

/// Builds the production components, all scheduled on one shared runtime
pub struct DaemonFactory {
    currency: Currency,
    runtime: Handle,
    status: Arc<ChainStatus>,
    coordinator: Arc<ShutdownCoordinator>,
    block_explorer: bool,
}

impl DaemonFactory {
    pub fn new(currency: Currency, runtime: Handle, coordinator: Arc<ShutdownCoordinator>) -> Self {
        let block_explorer = currency.is_block_explorer();
        Self { currency, runtime, status: Arc::new(ChainStatus::new()), coordinator, block_explorer }
    }
}

impl<'a> NodeFactory<'a> for DaemonFactory {
    fn core(&self, store: &'a DB, checkpoints: Checkpoints) -> Arc<dyn CoreApi + 'a> {
        Arc::new(ChainCore::new(self.currency.clone(), checkpoints, store, self.status.clone()))
    }

    fn protocol(&self, core: Arc<dyn CoreApi + 'a>) -> Arc<dyn ProtocolApi + 'a> {
        Arc::new(ProtocolHandler::new(core))
    }

    fn network(&self, protocol: Arc<dyn ProtocolApi + 'a>) -> Arc<dyn NetworkApi + 'a> {
        Arc::new(P2pServer::new(protocol, self.runtime.clone()))
    }

    fn rpc(&self, _core: Arc<dyn CoreApi + 'a>, network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn RpcApi + 'a> {
        Arc::new(RpcServer::new(self.runtime.clone(), self.status.clone(), network.endpoint(), self.block_explorer))
    }

    fn commands(&self, core: Arc<dyn CoreApi + 'a>, network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn CommandsApi + 'a> {
        Arc::new(DaemonCommandsHandler::new(self.status.clone(), core.checkpoints(), network.endpoint(), self.coordinator.clone()))
    }
}
