//! Two-lane diagnostics bus.
//!
//! Built on [`tokio::sync::broadcast`] so every subscriber receives every
//! event without any single subscriber blocking the others.  Publishing never
//! blocks the tick path; slow subscribers lag and drop old events instead.
//!
//! | Lane | Typical traffic |
//! |---|---|
//! | [`Lane::Telemetry`] | Per-tick counters, clamp activations, move transitions |
//! | [`Lane::Alerts`] | Actuator faults, producer faults |

use swivel_types::StatusEvent;
use tokio::sync::broadcast;
use tracing::warn;

/// Default per-lane capacity (buffered events before old ones are dropped for
/// slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the status bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// High-frequency diagnostics: tick stats, clamp counters, transitions.
    Telemetry,
    /// Faults the operator layer should see.
    Alerts,
}

/// Shared status bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct StatusBus {
    telemetry: broadcast::Sender<StatusEvent>,
    alerts: broadcast::Sender<StatusEvent>,
}

impl StatusBus {
    /// Create a bus with the given per-lane capacity.
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self { telemetry, alerts }
    }

    /// Publish `event` to `lane`.  No subscribers is a normal condition, not
    /// an error: diagnostics are optional.
    pub fn publish(&self, lane: Lane, event: StatusEvent) {
        let _ = self.lane_sender(lane).send(event);
    }

    /// Subscribe to one lane.
    pub fn subscribe(&self, lane: Lane) -> LaneReceiver {
        LaneReceiver {
            lane,
            receiver: self.lane_sender(lane).subscribe(),
        }
    }

    fn lane_sender(&self, lane: Lane) -> &broadcast::Sender<StatusEvent> {
        match lane {
            Lane::Telemetry => &self.telemetry,
            Lane::Alerts => &self.alerts,
        }
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Lane`].
pub struct LaneReceiver {
    lane: Lane,
    receiver: broadcast::Receiver<StatusEvent>,
}

impl LaneReceiver {
    /// Wait for the next event on this lane.  Lagged gaps are logged and
    /// skipped; returns `None` when the bus has shut down.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lane = ?self.lane, lagged_by = n, "status subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for an already-buffered event.
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }
}
