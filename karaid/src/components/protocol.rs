use crate::node::api::{CoreApi, P2pEndpoint, PeerEvent, ProtocolApi};
use karai_core::{debug, info, trace};
use parking_lot::RwLock;
use std::sync::Arc;

/// Relays peer events to the core, reading network state through the attached endpoint
pub struct ProtocolHandler<'a> {
    core: Arc<dyn CoreApi + 'a>,
    endpoint: RwLock<Option<Arc<dyn P2pEndpoint>>>,
}

impl<'a> ProtocolHandler<'a> {
    pub fn new(core: Arc<dyn CoreApi + 'a>) -> Self {
        Self { core, endpoint: RwLock::new(None) }
    }
}

impl ProtocolApi for ProtocolHandler<'_> {
    fn set_p2p_endpoint(&self, endpoint: Option<Arc<dyn P2pEndpoint>>) {
        trace!("Protocol handler {}", if endpoint.is_some() { "attached to the p2p endpoint" } else { "detached" });
        *self.endpoint.write() = endpoint;
    }

    fn on_peer_event(&self, event: PeerEvent) {
        let Some(endpoint) = self.endpoint.read().clone() else {
            debug!("Dropping {:?}, no p2p endpoint attached", event);
            return;
        };
        let counts = endpoint.connection_counts();
        let height = self.core.tip().height;
        match event {
            PeerEvent::Connected { peer, inbound } => info!(
                "{} connection with {} established at height {} ({} in / {} out)",
                if inbound { "Incoming" } else { "Outgoing" },
                peer,
                height,
                counts.incoming,
                counts.outgoing
            ),
            PeerEvent::Disconnected { peer } => {
                info!("Connection with {} closed ({} in / {} out)", peer, counts.incoming, counts.outgoing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::CoreResult,
        node::api::{ChainTip, ConnectionCounts},
    };
    use karai_consensus_core::checkpoints::Checkpoints;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticCore;

    impl CoreApi for StaticCore {
        fn load(&self) -> CoreResult<()> {
            Ok(())
        }

        fn save(&self) -> CoreResult<()> {
            Ok(())
        }

        fn tip(&self) -> ChainTip {
            ChainTip::default()
        }

        fn checkpoints(&self) -> Arc<Checkpoints> {
            Arc::new(Checkpoints::new())
        }
    }

    #[derive(Default)]
    struct CountingEndpoint {
        queries: AtomicUsize,
    }

    impl P2pEndpoint for CountingEndpoint {
        fn connection_counts(&self) -> ConnectionCounts {
            self.queries.fetch_add(1, Ordering::SeqCst);
            ConnectionCounts { incoming: 1, outgoing: 0 }
        }

        fn peer_list_size(&self) -> usize {
            0
        }
    }

    #[test]
    fn test_events_reach_the_attached_endpoint_only() {
        let handler = ProtocolHandler::new(Arc::new(StaticCore));
        let endpoint = Arc::new(CountingEndpoint::default());
        let event = PeerEvent::Connected { peer: "10.0.0.1:11997".parse().unwrap(), inbound: true };

        handler.on_peer_event(event);
        assert_eq!(endpoint.queries.load(Ordering::SeqCst), 0);

        handler.set_p2p_endpoint(Some(endpoint.clone()));
        handler.on_peer_event(event);
        assert_eq!(endpoint.queries.load(Ordering::SeqCst), 1);

        handler.set_p2p_endpoint(None);
        handler.on_peer_event(PeerEvent::Disconnected { peer: "10.0.0.1:11997".parse().unwrap() });
        assert_eq!(endpoint.queries.load(Ordering::SeqCst), 1);
    }
}
