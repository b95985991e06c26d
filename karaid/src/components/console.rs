use super::chain::ChainStatus;
use crate::node::api::{CommandsApi, P2pEndpoint, StopSignal};
use karai_consensus_core::checkpoints::Checkpoints;
use karai_core::{debug, signals::ShutdownCoordinator, warn};
use parking_lot::Mutex;
use std::{
    io::{self, BufRead},
    sync::Arc,
    thread::{self, JoinHandle},
};
use triggered::{Listener, Trigger};

const HELP: &str = "Commands:
  help       Show this help
  status     Show the chain height and the connection counts
  print_cp   Print the loaded checkpoints
  exit       Stop the daemon";

struct Commands {
    status: Arc<ChainStatus>,
    checkpoints: Arc<Checkpoints>,
    endpoint: Arc<dyn P2pEndpoint>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Commands {
    /// Runs one console line, returning the text to print
    fn execute(&self, line: &str) -> Option<String> {
        let command = line.split_whitespace().next()?;
        let reply = match command {
            "help" => HELP.to_string(),
            "status" => {
                let tip = self.status.tip();
                let counts = self.endpoint.connection_counts();
                format!(
                    "Height: {}, top block: {}, connections: {} in / {} out, known peers: {}",
                    tip.height,
                    tip.hash,
                    counts.incoming,
                    counts.outgoing,
                    self.endpoint.peer_list_size()
                )
            }
            "print_cp" => {
                if self.checkpoints.is_empty() {
                    "No checkpoints loaded".to_string()
                } else {
                    self.checkpoints.iter().map(|cp| format!("{},{}", cp.height, cp.hash)).collect::<Vec<_>>().join("\n")
                }
            }
            "exit" => {
                self.coordinator.trigger();
                "Stopping the daemon...".to_string()
            }
            unknown => format!("Unknown command: {}. Type help for the list of commands", unknown),
        };
        Some(reply)
    }
}

/// Operator commands read from stdin on a dedicated thread
pub struct DaemonCommandsHandler {
    commands: Arc<Commands>,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl DaemonCommandsHandler {
    pub fn new(
        status: Arc<ChainStatus>,
        checkpoints: Arc<Checkpoints>,
        endpoint: Arc<dyn P2pEndpoint>,
        coordinator: Arc<ShutdownCoordinator>,
    ) -> Self {
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        Self {
            commands: Arc::new(Commands { status, checkpoints, endpoint, coordinator }),
            shutdown_trigger,
            shutdown_listener,
            reader: Mutex::new(None),
        }
    }
}

impl CommandsApi for DaemonCommandsHandler {
    fn start_handling(&self) -> io::Result<()> {
        let commands = self.commands.clone();
        let shutdown = self.shutdown_listener.clone();
        let reader = thread::Builder::new().name("console".to_string()).spawn(move || {
            let stdin = io::stdin();
            let mut line = String::new();
            while !shutdown.is_triggered() {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("Console input failed: {}", err);
                        break;
                    }
                }
                if shutdown.is_triggered() {
                    break;
                }
                if let Some(reply) = commands.execute(&line) {
                    println!("{reply}");
                }
            }
            debug!("Console handler exited");
        })?;
        *self.reader.lock() = Some(reader);
        Ok(())
    }

    fn stop_signal(&self) -> StopSignal {
        self.shutdown_trigger.clone()
    }

    fn stop_handling(&self) {
        self.shutdown_trigger.trigger();
        if let Some(reader) = self.reader.lock().take() {
            // A reader blocked on stdin is detached, it ends with the process
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
    }
}
