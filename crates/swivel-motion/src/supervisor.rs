//! Producer supervision and coordinated shutdown.
//!
//! The supervisor spawns each offset producer on its own OS thread, hands it
//! a stop token and a watchdog heartbeat, and owns the shared stop flag the
//! motion loop checks between ticks.  Shutdown signals every context, then
//! waits for acknowledgement through the watchdog with a bounded timeout;
//! producers that fail to acknowledge are abandoned (their threads are
//! detached) and reported.
//!
//! A panic inside a producer thread never propagates: the thread dies, its
//! heartbeat goes silent, and the watchdog reports it while the loop keeps
//! composing from the remaining sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use swivel_types::SwivelError;
use tracing::{info, warn};

use crate::watchdog::{HeartbeatHandle, Watchdog};

/// Cooperative stop signal shared by every execution context.
#[derive(Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag (e.g. the motion loop's).
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

struct Producer {
    name: String,
    handle: JoinHandle<()>,
}

/// Spawns producer threads and coordinates their shutdown.
pub struct Supervisor {
    stop: StopToken,
    watchdog: Watchdog,
    producers: Vec<Producer>,
}

impl Supervisor {
    pub fn new(stop: StopToken) -> Self {
        Self {
            stop,
            watchdog: Watchdog::new(),
            producers: Vec::new(),
        }
    }

    /// The shared stop token.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Watchdog handle for health queries.
    pub fn watchdog(&self) -> Watchdog {
        self.watchdog.clone()
    }

    /// Spawn `body` on a dedicated thread.
    ///
    /// The closure receives the stop token and its heartbeat handle; it is
    /// expected to beat every cycle, check the token, and retire the
    /// heartbeat on clean exit.
    ///
    /// # Errors
    ///
    /// Returns [`SwivelError::SourceFault`] when the OS refuses to spawn the
    /// thread.
    pub fn spawn_producer<F>(
        &mut self,
        name: &str,
        heartbeat_timeout: Duration,
        body: F,
    ) -> Result<(), SwivelError>
    where
        F: FnOnce(StopToken, HeartbeatHandle) + Send + 'static,
    {
        let heartbeat = self.watchdog.register(name, heartbeat_timeout);
        let token = self.stop.clone();
        let thread_name = name.to_string();
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || body(token, heartbeat))
            .map_err(|e| SwivelError::SourceFault {
                source_id: thread_name.clone(),
                details: format!("thread spawn failed: {e}"),
            })?;
        info!(producer = %thread_name, "producer spawned");
        self.producers.push(Producer {
            name: thread_name,
            handle,
        });
        Ok(())
    }

    /// Names of producers whose heartbeat deadline has been exceeded.
    pub fn silent_producers(&self) -> Vec<String> {
        self.watchdog.silent_components()
    }

    /// Signal every context to stop and wait for acknowledgement.
    ///
    /// Returns `true` when every producer retired within `timeout`;
    /// otherwise the stragglers are detached and `false` is returned.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        info!("shutdown requested");
        self.stop.stop();

        let acknowledged = self.watchdog.wait_all_retired(timeout);
        for producer in self.producers.drain(..) {
            if producer.handle.is_finished() {
                // Join also surfaces a producer panic as a warning.
                if producer.handle.join().is_err() {
                    warn!(producer = %producer.name, "producer thread panicked");
                }
            } else {
                warn!(producer = %producer.name, "producer did not acknowledge shutdown; detaching");
            }
        }
        if acknowledged {
            info!("all producers acknowledged shutdown");
        }
        acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producers_run_and_acknowledge_shutdown() {
        let mut sup = Supervisor::new(StopToken::new());
        sup.spawn_producer("ticker", Duration::from_millis(200), |stop, heartbeat| {
            while !stop.is_stopped() {
                heartbeat.beat();
                std::thread::sleep(Duration::from_millis(5));
            }
            heartbeat.retire();
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(sup.silent_producers().is_empty());
        assert!(sup.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn stuck_producer_forces_timeout() {
        let mut sup = Supervisor::new(StopToken::new());
        let release = Arc::new(AtomicBool::new(false));
        let release_clone = Arc::clone(&release);
        sup.spawn_producer("stuck", Duration::from_millis(50), move |_stop, _hb| {
            // Ignores the stop token until released.
            while !release_clone.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();
        assert!(!sup.shutdown(Duration::from_millis(50)));
        release.store(true, Ordering::Release);
    }

    #[test]
    fn panicking_producer_is_isolated() {
        let mut sup = Supervisor::new(StopToken::new());
        sup.spawn_producer("doomed", Duration::from_millis(20), |_stop, heartbeat| {
            heartbeat.beat();
            panic!("simulated producer crash");
        })
        .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        // The crash shows up as a silent heartbeat, nothing more.
        assert_eq!(sup.silent_producers(), vec!["doomed".to_string()]);
        assert!(!sup.shutdown(Duration::from_millis(20)));
    }

    #[test]
    fn stop_token_is_shared() {
        let token = StopToken::new();
        let clone = token.clone();
        assert!(!clone.is_stopped());
        token.stop();
        assert!(clone.is_stopped());
    }
}
