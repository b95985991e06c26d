//!
//! Minimal p2p service: peer list persistence, the inbound listener and the initial dials.
//!

use crate::{
    config::NetConfig,
    errors::NetworkInitError,
    node::api::{ConnectionCounts, NetworkApi, P2pEndpoint, PeerEvent, ProtocolApi, StopSignal},
};
use karai_core::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fs, io,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
    runtime::Handle,
    select,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::timeout,
};
use triggered::{Listener, Trigger};

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified(),
        IpAddr::V6(ip) => ip.is_loopback() || ip.is_unspecified(),
    }
}

/// Known peers and live connections, shared with the connection tasks
#[derive(Default)]
pub struct PeerTable {
    allow_local_ip: AtomicBool,
    known: RwLock<BTreeSet<SocketAddr>>,
    connections: Mutex<HashMap<SocketAddr, bool>>,
}

impl PeerTable {
    /// Adds `peer` to the known list. Local addresses are only accepted when allowed.
    pub fn add_known(&self, peer: SocketAddr) -> bool {
        if is_local(peer.ip()) && !self.allow_local_ip.load(Ordering::Relaxed) {
            trace!("Ignoring local peer address {}", peer);
            return false;
        }
        self.known.write().insert(peer)
    }

    pub fn known(&self) -> Vec<SocketAddr> {
        self.known.read().iter().copied().collect()
    }

    fn connected(&self, peer: SocketAddr, inbound: bool) {
        self.connections.lock().insert(peer, inbound);
    }

    fn disconnected(&self, peer: SocketAddr) {
        self.connections.lock().remove(&peer);
    }
}

impl P2pEndpoint for PeerTable {
    fn connection_counts(&self) -> ConnectionCounts {
        let connections = self.connections.lock();
        let incoming = connections.values().filter(|inbound| **inbound).count();
        ConnectionCounts { incoming, outgoing: connections.len() - incoming }
    }

    fn peer_list_size(&self) -> usize {
        self.known.read().len()
    }
}

/// The persisted peer list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerState {
    pub peers: Vec<SocketAddr>,
}

impl PeerState {
    /// Reads the peer list at `path`. A missing file yields an empty list.
    pub fn load(path: &Path) -> Result<Self, NetworkInitError> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| NetworkInitError::PeerStateFormat { path: path.to_path_buf(), source }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(NetworkInitError::PeerState { path: path.to_path_buf(), source }),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    inbound: bool,
    peers: Arc<PeerTable>,
    events: UnboundedSender<PeerEvent>,
    shutdown: Listener,
) {
    peers.connected(peer, inbound);
    let _ = events.send(PeerEvent::Connected { peer, inbound });

    let mut buf = [0u8; 1024];
    loop {
        select! {
            biased;
            _ = shutdown.clone() => break,
            read = stream.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => trace!("{} bytes from {}", n, peer),
                Err(err) => {
                    debug!("Connection with {} failed: {}", peer, err);
                    break;
                }
            },
        }
    }

    peers.disconnected(peer);
    let _ = events.send(PeerEvent::Disconnected { peer });
}

async fn accept_loop(listener: TcpListener, peers: Arc<PeerTable>, events: UnboundedSender<PeerEvent>, shutdown: Listener) {
    loop {
        select! {
            biased;
            _ = shutdown.clone() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, true, peers.clone(), events.clone(), shutdown.clone()));
                }
                Err(err) => warn!("Failed accepting a p2p connection: {}", err),
            },
        }
    }
    trace!("p2p accept loop exited");
}

async fn dial(
    targets: Vec<SocketAddr>,
    seeds: Vec<SocketAddr>,
    peers: Arc<PeerTable>,
    events: UnboundedSender<PeerEvent>,
    shutdown: Listener,
) {
    for target in targets {
        if shutdown.is_triggered() {
            return;
        }
        match timeout(DIAL_TIMEOUT, TcpStream::connect(target)).await {
            Ok(Ok(stream)) => {
                tokio::spawn(serve_connection(stream, target, false, peers.clone(), events.clone(), shutdown.clone()));
            }
            Ok(Err(err)) => debug!("Cannot connect to {}: {}", target, err),
            Err(_) => debug!("Connecting to {} timed out", target),
        }
    }
    // Seeds are only asked for addresses, never kept as connections
    for seed in seeds {
        if shutdown.is_triggered() {
            return;
        }
        if let Ok(Ok(_)) = timeout(DIAL_TIMEOUT, TcpStream::connect(seed)).await {
            peers.add_known(seed);
        }
    }
}

pub struct P2pServer<'a> {
    protocol: Arc<dyn ProtocolApi + 'a>,
    runtime: Handle,
    peers: Arc<PeerTable>,
    events: UnboundedSender<PeerEvent>,
    receiver: Mutex<Option<UnboundedReceiver<PeerEvent>>>,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    state_file: Mutex<Option<PathBuf>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<'a> P2pServer<'a> {
    pub fn new(protocol: Arc<dyn ProtocolApi + 'a>, runtime: Handle) -> Self {
        let (events, receiver) = unbounded_channel();
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        Self {
            protocol,
            runtime,
            peers: Arc::new(PeerTable::default()),
            events,
            receiver: Mutex::new(Some(receiver)),
            shutdown_trigger,
            shutdown_listener,
            tasks: Mutex::new(Vec::new()),
            state_file: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// The address the listener is bound to, once initialized
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

impl NetworkApi for P2pServer<'_> {
    fn init(&self, config: &NetConfig) -> Result<(), NetworkInitError> {
        self.peers.allow_local_ip.store(config.allow_local_ip, Ordering::Relaxed);
        let state = PeerState::load(&config.state_file)?;
        state.peers.iter().chain(&config.peers).chain(&config.priority_nodes).for_each(|peer| {
            self.peers.add_known(*peer);
        });
        debug!("Loaded {} peers from {}", self.peers.peer_list_size(), config.state_file.display());
        *self.state_file.lock() = Some(config.state_file.clone());

        let listener = self
            .runtime
            .block_on(TcpListener::bind(config.bind))
            .map_err(|source| NetworkInitError::Bind { addr: config.bind, source })?;
        let local_addr = listener.local_addr().map_err(|source| NetworkInitError::Bind { addr: config.bind, source })?;
        *self.local_addr.lock() = Some(local_addr);
        info!("Binding on {}", local_addr);
        match config.announced_port(local_addr.port()) {
            Some(port) => info!("Net service bound on {}, announcing port {}", local_addr, port),
            None => info!("Net service bound on {}, incoming port hidden", local_addr),
        }

        let (targets, seeds) = if config.exclusive_nodes.is_empty() {
            // Priority nodes first, plain peers in random order
            let mut peers = config.peers.clone();
            peers.shuffle(&mut rand::thread_rng());
            let targets: Vec<_> = config.priority_nodes.iter().copied().chain(peers).collect();
            (targets, config.seed_nodes.clone())
        } else {
            info!("Connecting to exclusive nodes only");
            (config.exclusive_nodes.clone(), Vec::new())
        };

        let mut tasks = self.tasks.lock();
        tasks.push(self.runtime.spawn(accept_loop(
            listener,
            self.peers.clone(),
            self.events.clone(),
            self.shutdown_listener.clone(),
        )));
        tasks.push(self.runtime.spawn(dial(targets, seeds, self.peers.clone(), self.events.clone(), self.shutdown_listener.clone())));
        Ok(())
    }

    fn endpoint(&self) -> Arc<dyn P2pEndpoint> {
        self.peers.clone()
    }

    fn run(&self) {
        let Some(mut receiver) = self.receiver.lock().take() else {
            warn!("p2p loop is already running");
            return;
        };
        let shutdown = self.shutdown_listener.clone();
        self.runtime.block_on(async {
            loop {
                select! {
                    biased;
                    _ = shutdown.clone() => break,
                    event = receiver.recv() => match event {
                        Some(event) => self.protocol.on_peer_event(event),
                        None => break,
                    },
                }
            }
        });
    }

    fn stop_signal(&self) -> StopSignal {
        self.shutdown_trigger.clone()
    }

    fn deinit(&self) {
        self.shutdown_trigger.trigger();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        if let Some(path) = self.state_file.lock().take() {
            let state = PeerState { peers: self.peers.known() };
            match state.save(&path) {
                Ok(()) => debug!("Saved {} peers to {}", state.peers.len(), path.display()),
                Err(err) => warn!("Failed saving the peer list to {}: {}", path.display(), err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::config::{Config, ResolveContext};
    use std::{
        net::TcpStream as StdTcpStream,
        thread,
        time::{Duration, Instant},
    };

    #[derive(Default)]
    struct RecordingProtocol {
        events: Mutex<Vec<PeerEvent>>,
    }

    impl ProtocolApi for RecordingProtocol {
        fn set_p2p_endpoint(&self, _endpoint: Option<Arc<dyn P2pEndpoint>>) {}

        fn on_peer_event(&self, event: PeerEvent) {
            self.events.lock().push(event);
        }
    }

    fn net_config(data_dir: &Path, port: u16, extra: &[&str]) -> NetConfig {
        let mut argv = vec!["karaid".to_string(), "--p2p-bind-ip=127.0.0.1".to_string(), format!("--p2p-bind-port={port}")];
        argv.extend(extra.iter().map(|arg| arg.to_string()));
        let args = Args::parse(argv).unwrap();
        let context = ResolveContext {
            exe_path: data_dir.join("karaid"),
            current_dir: data_dir.to_path_buf(),
            home_dir: None,
            default_data_dir: data_dir.to_path_buf(),
        };
        Config::resolve(&args, &context).unwrap().net
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_all().build().unwrap()
    }

    #[test]
    fn test_peer_table_filters_local_addresses() {
        let table = PeerTable::default();
        assert!(!table.add_known("127.0.0.1:11997".parse().unwrap()));
        assert!(!table.add_known("192.168.1.4:11997".parse().unwrap()));
        assert!(table.add_known("8.8.8.8:11997".parse().unwrap()));
        assert!(!table.add_known("8.8.8.8:11997".parse().unwrap()));

        table.allow_local_ip.store(true, Ordering::Relaxed);
        assert!(table.add_known("127.0.0.1:11997".parse().unwrap()));
        assert_eq!(table.peer_list_size(), 2);
    }

    #[test]
    fn test_peer_state_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p2pstate.json");
        assert_eq!(PeerState::load(&path).unwrap(), PeerState::default());

        let state = PeerState { peers: vec!["1.2.3.4:11997".parse().unwrap()] };
        state.save(&path).unwrap();
        assert_eq!(PeerState::load(&path).unwrap(), state);

        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(PeerState::load(&path), Err(NetworkInitError::PeerStateFormat { .. })));
    }

    #[test]
    fn test_inbound_connection_reaches_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let config = net_config(dir.path(), 0, &["--allow-local-ip", "--add-peer=203.0.113.7:11997"]);
        let runtime = runtime();
        let protocol = Arc::new(RecordingProtocol::default());
        let server = P2pServer::new(protocol.clone(), runtime.handle().clone());
        server.init(&config).unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        thread::scope(|s| {
            let loop_thread = s.spawn(|| server.run());
            let _client = StdTcpStream::connect(addr).unwrap();

            let deadline = Instant::now() + Duration::from_secs(10);
            while protocol.events.lock().is_empty() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            server.stop_signal().trigger();
            loop_thread.join().unwrap();
        });

        assert!(matches!(protocol.events.lock().first(), Some(PeerEvent::Connected { inbound: true, .. })));
        server.deinit();
        let saved = PeerState::load(&config.state_file).unwrap();
        assert_eq!(saved.peers, vec!["203.0.113.7:11997".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_occupied_port() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = net_config(dir.path(), port, &[]);
        let runtime = runtime();
        let server = P2pServer::new(Arc::new(RecordingProtocol::default()), runtime.handle().clone());
        assert!(matches!(server.init(&config), Err(NetworkInitError::Bind { .. })));
    }
}
