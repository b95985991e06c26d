//!
//! Node orchestration: ordered construction and start of the components, the blocking
//! network loop and the reverse-ordered teardown.
//!

use crate::{
    config::Config,
    errors::{CoreResult, StartError, StartResult},
};
use karai_consensus_core::checkpoints::Checkpoints;
use karai_core::{error, info};
use karai_database::prelude::DB;
use std::sync::Arc;

pub mod api;
pub mod state;

#[cfg(test)]
mod tests;

use api::{CommandsApi, CoreApi, NetworkApi, NodeFactory, ProtocolApi, RpcApi, StopSignal};
use state::{Component, ComponentState, ComponentStates};

/// The components constructed so far. Dropping a node tears down whatever was started.
struct Node<'a> {
    core: Option<Arc<dyn CoreApi + 'a>>,
    protocol: Option<Arc<dyn ProtocolApi + 'a>>,
    network: Option<Arc<dyn NetworkApi + 'a>>,
    rpc: Option<Arc<dyn RpcApi + 'a>>,
    commands: Option<Arc<dyn CommandsApi + 'a>>,
    states: ComponentStates,
}

impl<'a> Node<'a> {
    fn new() -> Self {
        Self { core: None, protocol: None, network: None, rpc: None, commands: None, states: ComponentStates::default() }
    }

    /// Stops the components in reverse start order, skipping those that never started.
    /// Each step runs at most once over the lifetime of the node.
    fn teardown(&mut self) -> CoreResult<()> {
        if let Some(commands) = self.commands.as_ref() {
            if self.states.transition(Component::Commands, ComponentState::Started, ComponentState::Stopped) {
                commands.stop_handling();
            }
        }

        if let Some(rpc) = self.rpc.as_ref() {
            if self.states.transition(Component::Rpc, ComponentState::Started, ComponentState::Stopped) {
                info!("Stopping core rpc server...");
                rpc.stop();
            }
        }

        if let Some(network) = self.network.as_ref() {
            if self.states.transition(Component::Network, ComponentState::Started, ComponentState::Stopped) {
                info!("Deinitializing p2p...");
                network.deinit();
            }
        }

        if let Some(protocol) = self.protocol.as_ref() {
            if self.states.transition(Component::Protocol, ComponentState::Attached, ComponentState::Detached) {
                protocol.set_p2p_endpoint(None);
            }
        }

        if let Some(core) = self.core.as_ref() {
            if self.states.transition(Component::Core, ComponentState::Started, ComponentState::Stopped) {
                info!("Saving core state...");
                core.save()?;
            }
        }
        Ok(())
    }
}

impl Drop for Node<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!("Failed saving the core state: {}", err);
        }
    }
}

/// Stop requests for the blocking parts of a running node
#[derive(Clone)]
pub struct StopSignals {
    commands: Option<StopSignal>,
    network: StopSignal,
}

impl StopSignals {
    /// Stops command handling, then unblocks the network loop
    pub fn trigger(&self) {
        if let Some(commands) = self.commands.as_ref() {
            commands.trigger();
        }
        self.network.trigger();
    }
}

/// A fully started node
pub struct RunningNode<'a> {
    network: Arc<dyn NetworkApi + 'a>,
    node: Node<'a>,
}

impl<'a> RunningNode<'a> {
    pub fn stop_signals(&self) -> StopSignals {
        StopSignals {
            commands: self.node.commands.as_ref().map(|commands| commands.stop_signal()),
            network: self.network.stop_signal(),
        }
    }

    /// Blocks on the network loop until a stop signal fires
    pub fn run(&self) {
        info!("Starting p2p net loop...");
        self.network.run();
        info!("p2p net loop stopped");
    }

    pub fn stop(mut self) -> CoreResult<()> {
        self.node.teardown()
    }
}

/// Constructs and starts the node components in dependency order.
///
/// On failure no later component is constructed and the started ones are torn down
/// before the error is returned.
pub fn start<'a, F>(config: &Config, store: &'a DB, checkpoints: Checkpoints, factory: &F) -> StartResult<RunningNode<'a>>
where
    F: NodeFactory<'a> + ?Sized,
{
    let mut node = Node::new();

    info!("Initializing core...");
    let core = factory.core(store, checkpoints);
    node.core = Some(core.clone());
    node.states.set(Component::Core, ComponentState::Constructed);
    core.load()?;
    node.states.set(Component::Core, ComponentState::Started);
    info!("Core initialized OK");

    let protocol = factory.protocol(core.clone());
    node.protocol = Some(protocol.clone());
    node.states.set(Component::Protocol, ComponentState::Constructed);

    let network = factory.network(protocol.clone());
    node.network = Some(network.clone());
    node.states.set(Component::Network, ComponentState::Constructed);
    protocol.set_p2p_endpoint(Some(network.endpoint()));
    node.states.set(Component::Protocol, ComponentState::Attached);

    let rpc = factory.rpc(core.clone(), network.clone());
    node.rpc = Some(rpc.clone());
    node.states.set(Component::Rpc, ComponentState::Constructed);

    info!("Initializing p2p server...");
    network.init(&config.net)?;
    node.states.set(Component::Network, ComponentState::Started);
    info!("P2p server initialized OK");

    info!("Starting core rpc server on address {}", config.rpc.bind);
    rpc.start(&config.rpc)?;
    node.states.set(Component::Rpc, ComponentState::Started);
    info!("Core rpc server started ok");

    if !config.no_console {
        let commands = factory.commands(core, network.clone());
        node.commands = Some(commands.clone());
        node.states.set(Component::Commands, ComponentState::Constructed);
        commands.start_handling().map_err(StartError::Console)?;
        node.states.set(Component::Commands, ComponentState::Started);
    }

    Ok(RunningNode { network, node })
}
