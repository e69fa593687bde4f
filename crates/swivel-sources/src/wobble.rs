//! Speech-driven head wobble producer.
//!
//! [`WobbleState`] is the dt-parameterised core: while speech activity is
//! detected the oscillation phase advances at a fixed angular frequency and
//! the amplitude ramps up toward the configured cap; when activity stops the
//! amplitude ramps back to zero over the release window instead of cutting
//! instantly.  [`SpeechWobbler`] wraps the state in a thread consuming the
//! audio pipeline's activity stream at its native rate.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use swivel_hal::source::{CellSource, OffsetCell};
use swivel_motion::supervisor::StopToken;
use swivel_motion::watchdog::HeartbeatHandle;
use swivel_types::{PoseOffset, WobbleConfig};
use tracing::{info, warn};

/// How long the consumer waits for an activity sample before treating the
/// gap as silence.
const ACTIVITY_POLL: Duration = Duration::from_millis(20);

// ────────────────────────────────────────────────────────────────────────────
// Oscillator core
// ────────────────────────────────────────────────────────────────────────────

/// Amplitude-shaped sinusoid, separated from the thread for deterministic
/// tests.
pub struct WobbleState {
    config: WobbleConfig,
    phase: f32,
    amplitude_deg: f32,
}

impl WobbleState {
    pub fn new(config: WobbleConfig) -> Self {
        Self {
            config,
            phase: 0.0,
            amplitude_deg: 0.0,
        }
    }

    /// Current amplitude, for tests and diagnostics.
    pub fn amplitude_deg(&self) -> f32 {
        self.amplitude_deg
    }

    /// Advance by `dt` with the latest activity `level` (0–1).
    ///
    /// Returns the offset to publish and its validity.
    pub fn update(&mut self, level: f32, dt: Duration) -> (PoseOffset, bool) {
        let dt_s = dt.as_secs_f32();
        let cap = self.config.amplitude_cap_deg;
        let speaking = level >= self.config.activity_threshold;

        if speaking {
            let attack_s = (self.config.attack_ms.max(1) as f32) / 1000.0;
            self.amplitude_deg = (self.amplitude_deg + cap * dt_s / attack_s).min(cap);
        } else {
            let release_s = (self.config.release_ms.max(1) as f32) / 1000.0;
            self.amplitude_deg = (self.amplitude_deg - cap * dt_s / release_s).max(0.0);
        }

        if self.amplitude_deg <= 0.0 {
            self.phase = 0.0;
            return (PoseOffset::ZERO, false);
        }

        self.phase = (self.phase + TAU * self.config.frequency_hz * dt_s) % TAU;
        let offset = PoseOffset {
            head_roll_deg: self.amplitude_deg * self.phase.sin(),
            // Slower half-amplitude nod layered under the roll.
            head_pitch_deg: self.amplitude_deg * 0.5 * (self.phase * 0.5).sin(),
            ..PoseOffset::ZERO
        };
        (offset, true)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Consumer thread
// ────────────────────────────────────────────────────────────────────────────

/// Continuously-running wobble producer fed by the audio pipeline.
pub struct SpeechWobbler {
    state: WobbleState,
    activity: Receiver<f32>,
    cell: OffsetCell,
}

impl SpeechWobbler {
    pub const SOURCE_ID: &'static str = "speech_wobble";

    /// `activity` carries the pipeline's speech-activity levels (short-term
    /// energy or VAD probability, 0–1) at its native rate.
    pub fn new(config: WobbleConfig, activity: Receiver<f32>) -> Self {
        Self {
            state: WobbleState::new(config),
            activity,
            cell: OffsetCell::new(),
        }
    }

    /// The polling facade to register with the source registry.
    pub fn source(&self) -> CellSource {
        CellSource::new(Self::SOURCE_ID, self.cell.clone())
    }

    /// Blocking consume loop; run this on a dedicated thread via the
    /// supervisor.  Blocks only on activity-sample arrival.
    pub fn run(mut self, stop: StopToken, heartbeat: HeartbeatHandle) {
        info!("speech wobbler running");
        let mut last = Instant::now();
        while !stop.is_stopped() {
            heartbeat.beat();
            let level = match self.activity.recv_timeout(ACTIVITY_POLL) {
                Ok(level) => level,
                // A gap in the stream counts as silence, not a fault.
                Err(RecvTimeoutError::Timeout) => 0.0,
                Err(RecvTimeoutError::Disconnected) => {
                    // Audio pipeline is gone: hold invalid until stopped.
                    warn!("activity channel disconnected; wobble held invalid");
                    self.cell.invalidate();
                    while !stop.is_stopped() {
                        heartbeat.beat();
                        std::thread::sleep(ACTIVITY_POLL);
                    }
                    break;
                }
            };
            let now = Instant::now();
            let dt = now.duration_since(last);
            last = now;
            let (offset, valid) = self.state.update(level, dt);
            self.cell.publish(offset, valid);
        }
        self.cell.invalidate();
        heartbeat.retire();
        info!("speech wobbler stopped");
    }
}
