//! Seams between the orchestrator and the node components

use crate::{
    config::{NetConfig, RpcConfig},
    errors::{CoreResult, NetworkInitError, RpcError},
};
use karai_consensus_core::checkpoints::Checkpoints;
use karai_database::prelude::DB;
use karai_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};

/// One-shot, thread-safe request to leave a blocking loop
pub type StopSignal = triggered::Trigger;

/// Top of the local chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub height: u32,
    pub hash: Hash,
    pub genesis: Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    Connected { peer: SocketAddr, inbound: bool },
    Disconnected { peer: SocketAddr },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounts {
    pub incoming: usize,
    pub outgoing: usize,
}

/// Consensus engine bound to the store
pub trait CoreApi: Send + Sync {
    /// Reads the persisted chain state
    fn load(&self) -> CoreResult<()>;

    /// Persists the chain state and flushes the store
    fn save(&self) -> CoreResult<()>;

    fn tip(&self) -> ChainTip;

    /// The checkpoint table handed to the core at construction
    fn checkpoints(&self) -> Arc<Checkpoints>;
}

/// The view of the network service handed to the protocol handler
pub trait P2pEndpoint: Send + Sync {
    fn connection_counts(&self) -> ConnectionCounts;

    fn peer_list_size(&self) -> usize;
}

pub trait ProtocolApi: Send + Sync {
    fn set_p2p_endpoint(&self, endpoint: Option<Arc<dyn P2pEndpoint>>);

    fn on_peer_event(&self, event: PeerEvent);
}

pub trait NetworkApi: Send + Sync {
    /// Binds the listener and prepares the peer list
    fn init(&self, config: &NetConfig) -> Result<(), NetworkInitError>;

    fn endpoint(&self) -> Arc<dyn P2pEndpoint>;

    /// Blocks the calling thread until the stop signal fires
    fn run(&self);

    fn stop_signal(&self) -> StopSignal;

    fn deinit(&self);
}

pub trait RpcApi: Send + Sync {
    /// Opens the listener and applies the fee and CORS policy
    fn start(&self, config: &RpcConfig) -> Result<(), RpcError>;

    fn stop(&self);
}

/// Interactive operator commands
pub trait CommandsApi: Send + Sync {
    fn start_handling(&self) -> std::io::Result<()>;

    fn stop_signal(&self) -> StopSignal;

    /// Thread-safe
    fn stop_handling(&self);
}

/// Builds the node components, each bound to the ones it depends on
pub trait NodeFactory<'a> {
    fn core(&self, store: &'a DB, checkpoints: Checkpoints) -> Arc<dyn CoreApi + 'a>;

    fn protocol(&self, core: Arc<dyn CoreApi + 'a>) -> Arc<dyn ProtocolApi + 'a>;

    fn network(&self, protocol: Arc<dyn ProtocolApi + 'a>) -> Arc<dyn NetworkApi + 'a>;

    fn rpc(&self, core: Arc<dyn CoreApi + 'a>, network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn RpcApi + 'a>;

    fn commands(&self, core: Arc<dyn CoreApi + 'a>, network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn CommandsApi + 'a>;
}
