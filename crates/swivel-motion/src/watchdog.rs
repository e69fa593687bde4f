//! Producer health tracking and shutdown acknowledgement.
//!
//! Each offset producer (camera tracker, speech wobbler) holds a
//! [`HeartbeatHandle`] and beats it from its own thread every cycle.  The
//! supervisor polls [`Watchdog::silent_components`] to detect dead producers
//! (a crashed thread simply stops beating) and waits on
//! [`Watchdog::all_retired`] during shutdown so the loop is not considered
//! stopped until every producer has acknowledged termination.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Health state of a single producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerHealth {
    /// Beat received within the deadline.
    Alive,
    /// No beat within the deadline; the thread is stuck or dead.
    Silent,
    /// The producer exited cleanly and acknowledged shutdown.
    Retired,
}

#[derive(Debug)]
struct ProducerEntry {
    last_beat: Instant,
    timeout: Duration,
    retired: bool,
}

#[derive(Default)]
struct Registry {
    producers: HashMap<String, ProducerEntry>,
}

/// Tracks heartbeats from producer threads.
///
/// Cloning shares the underlying registry; hand each producer a
/// [`HeartbeatHandle`] via [`Watchdog::register`] and keep the watchdog on
/// the supervisor side.
#[derive(Clone, Default)]
pub struct Watchdog {
    registry: Arc<Mutex<Registry>>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with a heartbeat `timeout` and return the handle the
    /// producer beats from its own thread.  Re-registering resets the entry.
    pub fn register(&self, name: &str, timeout: Duration) -> HeartbeatHandle {
        self.registry.lock().producers.insert(
            name.to_string(),
            ProducerEntry {
                last_beat: Instant::now(),
                timeout,
                retired: false,
            },
        );
        HeartbeatHandle {
            name: name.to_string(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Health of a single producer.  Unknown names count as [`ProducerHealth::Silent`].
    pub fn health(&self, name: &str) -> ProducerHealth {
        let registry = self.registry.lock();
        match registry.producers.get(name) {
            Some(entry) if entry.retired => ProducerHealth::Retired,
            Some(entry) if entry.last_beat.elapsed() <= entry.timeout => ProducerHealth::Alive,
            _ => ProducerHealth::Silent,
        }
    }

    /// Names of all producers whose deadline has been exceeded and that have
    /// not retired.  Order is unspecified.
    pub fn silent_components(&self) -> Vec<String> {
        let registry = self.registry.lock();
        registry
            .producers
            .iter()
            .filter(|(_, e)| !e.retired && e.last_beat.elapsed() > e.timeout)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `true` once every registered producer has acknowledged shutdown.
    pub fn all_retired(&self) -> bool {
        let registry = self.registry.lock();
        registry.producers.values().all(|e| e.retired)
    }

    /// Block until every producer retires or `timeout` elapses.  Returns
    /// `true` on full acknowledgement, `false` when termination had to be
    /// forced.
    pub fn wait_all_retired(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.all_retired() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.all_retired()
    }
}

/// Per-producer heartbeat handle.  Beat it every cycle; retire it on clean
/// exit.
pub struct HeartbeatHandle {
    name: String,
    registry: Arc<Mutex<Registry>>,
}

impl HeartbeatHandle {
    /// Record a heartbeat, resetting the deadline.
    pub fn beat(&self) {
        if let Some(entry) = self.registry.lock().producers.get_mut(&self.name) {
            entry.last_beat = Instant::now();
        }
    }

    /// Acknowledge shutdown.  The producer no longer counts as silent.
    pub fn retire(&self) {
        if let Some(entry) = self.registry.lock().producers.get_mut(&self.name) {
            entry.retired = true;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
