use super::*;
use crate::{
    args::Args,
    config::{NetConfig, ResolveContext, RpcConfig},
    errors::{CoreError, NetworkInitError, RpcError},
};
use super::api::{ChainTip, ConnectionCounts, P2pEndpoint, PeerEvent};
use karai_database::{create_temp_db, utils::test_tuning};
use karai_hashes::Hash;
use parking_lot::Mutex;
use std::{io, path::PathBuf, thread};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<&'static str>>,
}

impl Recorder {
    fn push(&self, event: &'static str) {
        self.events.lock().push(event);
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }
}

struct MockCore {
    recorder: Arc<Recorder>,
    fail_load: bool,
}

impl CoreApi for MockCore {
    fn load(&self) -> CoreResult<()> {
        self.recorder.push("core.load");
        if self.fail_load {
            return Err(CoreError::GenesisMismatch { stored: Hash::from_bytes([1; 32]), expected: Hash::from_bytes([2; 32]) });
        }
        Ok(())
    }

    fn save(&self) -> CoreResult<()> {
        self.recorder.push("core.save");
        Ok(())
    }

    fn tip(&self) -> ChainTip {
        ChainTip::default()
    }

    fn checkpoints(&self) -> Arc<Checkpoints> {
        Arc::new(Checkpoints::new())
    }
}

struct MockProtocol {
    recorder: Arc<Recorder>,
}

impl ProtocolApi for MockProtocol {
    fn set_p2p_endpoint(&self, endpoint: Option<Arc<dyn P2pEndpoint>>) {
        self.recorder.push(if endpoint.is_some() { "protocol.attach" } else { "protocol.detach" });
    }

    fn on_peer_event(&self, _event: PeerEvent) {}
}

struct MockEndpoint;

impl P2pEndpoint for MockEndpoint {
    fn connection_counts(&self) -> ConnectionCounts {
        ConnectionCounts::default()
    }

    fn peer_list_size(&self) -> usize {
        0
    }
}

struct MockNetwork {
    recorder: Arc<Recorder>,
    fail_init: bool,
    stop: (triggered::Trigger, triggered::Listener),
}

impl NetworkApi for MockNetwork {
    fn init(&self, config: &NetConfig) -> Result<(), NetworkInitError> {
        self.recorder.push("network.init");
        if self.fail_init {
            return Err(NetworkInitError::Bind { addr: config.bind, source: io::Error::from(io::ErrorKind::AddrInUse) });
        }
        Ok(())
    }

    fn endpoint(&self) -> Arc<dyn P2pEndpoint> {
        Arc::new(MockEndpoint)
    }

    fn run(&self) {
        self.recorder.push("network.run");
        self.stop.1.wait();
    }

    fn stop_signal(&self) -> StopSignal {
        self.stop.0.clone()
    }

    fn deinit(&self) {
        self.recorder.push("network.deinit");
    }
}

struct MockRpc {
    recorder: Arc<Recorder>,
    fail_start: bool,
}

impl RpcApi for MockRpc {
    fn start(&self, config: &RpcConfig) -> Result<(), RpcError> {
        self.recorder.push("rpc.start");
        if self.fail_start {
            return Err(RpcError::Bind { addr: config.bind, source: io::Error::from(io::ErrorKind::AddrInUse) });
        }
        Ok(())
    }

    fn stop(&self) {
        self.recorder.push("rpc.stop");
    }
}

struct MockCommands {
    recorder: Arc<Recorder>,
    stop: (triggered::Trigger, triggered::Listener),
}

impl CommandsApi for MockCommands {
    fn start_handling(&self) -> io::Result<()> {
        self.recorder.push("commands.start");
        Ok(())
    }

    fn stop_signal(&self) -> StopSignal {
        self.stop.0.clone()
    }

    fn stop_handling(&self) {
        self.recorder.push("commands.stop");
    }
}

#[derive(Default)]
struct MockFactory {
    recorder: Arc<Recorder>,
    fail_core_load: bool,
    fail_network_init: bool,
    fail_rpc_start: bool,
}

impl<'a> NodeFactory<'a> for MockFactory {
    fn core(&self, _store: &'a DB, _checkpoints: Checkpoints) -> Arc<dyn CoreApi + 'a> {
        self.recorder.push("core.new");
        Arc::new(MockCore { recorder: self.recorder.clone(), fail_load: self.fail_core_load })
    }

    fn protocol(&self, _core: Arc<dyn CoreApi + 'a>) -> Arc<dyn ProtocolApi + 'a> {
        self.recorder.push("protocol.new");
        Arc::new(MockProtocol { recorder: self.recorder.clone() })
    }

    fn network(&self, _protocol: Arc<dyn ProtocolApi + 'a>) -> Arc<dyn NetworkApi + 'a> {
        self.recorder.push("network.new");
        Arc::new(MockNetwork { recorder: self.recorder.clone(), fail_init: self.fail_network_init, stop: triggered::trigger() })
    }

    fn rpc(&self, _core: Arc<dyn CoreApi + 'a>, _network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn RpcApi + 'a> {
        self.recorder.push("rpc.new");
        Arc::new(MockRpc { recorder: self.recorder.clone(), fail_start: self.fail_rpc_start })
    }

    fn commands(&self, _core: Arc<dyn CoreApi + 'a>, _network: Arc<dyn NetworkApi + 'a>) -> Arc<dyn CommandsApi + 'a> {
        self.recorder.push("commands.new");
        Arc::new(MockCommands { recorder: self.recorder.clone(), stop: triggered::trigger() })
    }
}

fn config(with_console: bool) -> Config {
    let mut argv = vec!["karaid"];
    if !with_console {
        argv.push("--no-console");
    }
    let args = Args::parse(argv).unwrap();
    let context = ResolveContext {
        exe_path: PathBuf::from("/opt/karai/karaid"),
        current_dir: PathBuf::from("/work"),
        home_dir: None,
        default_data_dir: PathBuf::from("/work/.karai"),
    };
    Config::resolve(&args, &context).unwrap()
}

const STARTUP: [&str; 11] = [
    "core.new",
    "core.load",
    "protocol.new",
    "network.new",
    "protocol.attach",
    "rpc.new",
    "network.init",
    "rpc.start",
    "commands.new",
    "commands.start",
    "network.run",
];

#[test]
fn test_stop_order_reverses_start_order() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory::default();
    let node = start(&config(true), store.db(), Checkpoints::new(), &factory).unwrap();

    let signals = node.stop_signals();
    signals.trigger();
    node.run();
    node.stop().unwrap();

    let mut expected = STARTUP.to_vec();
    expected.extend(["commands.stop", "rpc.stop", "network.deinit", "protocol.detach", "core.save"]);
    assert_eq!(factory.recorder.events(), expected);
}

#[test]
fn test_no_console_skips_commands() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory::default();
    let node = start(&config(false), store.db(), Checkpoints::new(), &factory).unwrap();
    node.stop().unwrap();

    let events = factory.recorder.events();
    assert!(!events.iter().any(|e| e.starts_with("commands.")));
    assert_eq!(events[events.len() - 4..], ["rpc.stop", "network.deinit", "protocol.detach", "core.save"]);
}

#[test]
fn test_repeated_stop_requests_tear_down_once() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory::default();
    let node = start(&config(true), store.db(), Checkpoints::new(), &factory).unwrap();

    let signals = node.stop_signals();
    let remote = {
        let signals = signals.clone();
        thread::spawn(move || signals.trigger())
    };
    signals.trigger();
    node.run();
    remote.join().unwrap();
    signals.trigger();
    node.stop().unwrap();

    for event in ["commands.stop", "rpc.stop", "network.deinit", "protocol.detach", "core.save"] {
        assert_eq!(factory.recorder.count(event), 1, "{event}");
    }
}

#[test]
fn test_teardown_is_idempotent() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory::default();
    let mut node = start(&config(true), store.db(), Checkpoints::new(), &factory).unwrap();

    node.node.teardown().unwrap();
    let after_first = factory.recorder.events();
    node.node.teardown().unwrap();
    drop(node);

    assert_eq!(factory.recorder.events(), after_first);
    assert_eq!(factory.recorder.count("core.save"), 1);
}

#[test]
fn test_network_init_failure() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory { fail_network_init: true, ..Default::default() };
    let result = start(&config(true), store.db(), Checkpoints::new(), &factory);

    assert!(matches!(result, Err(StartError::Network(NetworkInitError::Bind { .. }))));
    let mut expected = STARTUP[..7].to_vec();
    expected.extend(["protocol.detach", "core.save"]);
    assert_eq!(factory.recorder.events(), expected);
}

#[test]
fn test_rpc_start_failure() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory { fail_rpc_start: true, ..Default::default() };
    let result = start(&config(true), store.db(), Checkpoints::new(), &factory);

    assert!(matches!(result, Err(StartError::Rpc(_))));
    let mut expected = STARTUP[..8].to_vec();
    expected.extend(["network.deinit", "protocol.detach", "core.save"]);
    assert_eq!(factory.recorder.events(), expected);
}

#[test]
fn test_core_load_failure() {
    let (store, _tempdir) = create_temp_db!(test_tuning());
    let factory = MockFactory { fail_core_load: true, ..Default::default() };
    let result = start(&config(true), store.db(), Checkpoints::new(), &factory);

    assert!(matches!(result, Err(StartError::Core(CoreError::GenesisMismatch { .. }))));
    assert_eq!(factory.recorder.events(), ["core.new", "core.load"]);
}

#[test]
fn test_component_states() {
    let mut states = ComponentStates::default();
    assert!(Component::ALL.iter().all(|c| states.get(*c) == ComponentState::Unconstructed));
    assert!(!states.transition(Component::Rpc, ComponentState::Started, ComponentState::Stopped));
    states.set(Component::Rpc, ComponentState::Started);
    assert!(states.transition(Component::Rpc, ComponentState::Started, ComponentState::Stopped));
    assert_eq!(states.get(Component::Rpc), ComponentState::Stopped);
    assert_eq!(states.get(Component::Core), ComponentState::Unconstructed);
}
