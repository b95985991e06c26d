//! Cooperative shutdown on process termination signals

use crate::{info, warn};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

type StopAction = Box<dyn FnOnce() + Send>;

/// Converts a process-wide stop trigger (SIGINT/SIGTERM, or an explicit
/// [`ShutdownCoordinator::trigger`] call) into a single invocation of the
/// installed stop action.
///
/// The stop action must restrict itself to thread-safe stop requests. Actual
/// teardown runs on the thread that owns the node, after its run loop returns.
#[derive(Default)]
pub struct ShutdownCoordinator {
    requested: AtomicBool,
    deliveries: AtomicU64,
    on_stop: Mutex<Option<StopAction>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes the OS termination signals to [`ShutdownCoordinator::trigger`].
    /// Can be called once per process.
    pub fn init(self: &Arc<Self>) -> Result<(), ctrlc::Error> {
        let coordinator = self.clone();
        ctrlc::set_handler(move || {
            if coordinator.trigger() {
                println!("^SIGNAL - shutting down node...");
            } else {
                println!("^SIGNAL - shutdown already in progress");
            }
        })
    }

    /// Installs the stop action. If a stop was already requested, the action runs immediately.
    pub fn install(&self, on_stop: impl FnOnce() + Send + 'static) {
        let mut slot = self.on_stop.lock();
        if self.requested.load(Ordering::SeqCst) {
            drop(slot);
            on_stop();
        } else {
            *slot = Some(Box::new(on_stop));
        }
    }

    /// Requests a shutdown. Returns `true` for the first request only; later
    /// requests are counted and otherwise ignored.
    pub fn trigger(&self) -> bool {
        let delivery = self.deliveries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.requested.swap(true, Ordering::SeqCst) {
            warn!("Stop requested again (#{}) while shutting down, ignoring", delivery);
            return false;
        }
        info!("Stop requested, signaling node shutdown...");
        let on_stop = self.on_stop.lock().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
        true
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Number of stop requests received so far
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::atomic::AtomicUsize, thread};

    #[test]
    fn test_stop_action_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = ShutdownCoordinator::new();
        let c = calls.clone();
        coordinator.install(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!coordinator.is_requested());

        assert!(coordinator.trigger());
        assert!(!coordinator.trigger());
        assert!(!coordinator.trigger());

        assert!(coordinator.is_requested());
        assert_eq!(coordinator.deliveries(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_requested_before_install() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = ShutdownCoordinator::new();
        assert!(coordinator.trigger());

        let c = calls.clone();
        coordinator.install(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(!coordinator.trigger());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_triggers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let c = calls.clone();
        coordinator.install(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let workers = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                thread::spawn(move || coordinator.trigger())
            })
            .collect::<Vec<_>>();
        let firsts = workers.into_iter().map(|w| w.join().unwrap()).filter(|first| *first).count();

        assert_eq!(firsts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.deliveries(), 8);
    }
}
