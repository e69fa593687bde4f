//! Face-following offset producer.
//!
//! [`FaceOffsetFilter`] is the dt-parameterised core: detection → target
//! offset proportional to the face's displacement from frame centre,
//! exponentially smoothed; loss → a fixed-window linear fade of the last
//! offset down to exactly zero, after which the source reports invalid.
//! [`FaceTracker`] wraps the filter in the capture thread and publishes
//! through an [`OffsetCell`].

use std::time::{Duration, Instant};

use swivel_hal::camera::{Camera, FaceDetection, FaceDetector};
use swivel_hal::source::{CellSource, OffsetCell};
use swivel_motion::supervisor::StopToken;
use swivel_motion::watchdog::HeartbeatHandle;
use swivel_types::{FaceTrackingConfig, PoseOffset};
use tracing::{debug, info, warn};

// ────────────────────────────────────────────────────────────────────────────
// Filter core
// ────────────────────────────────────────────────────────────────────────────

struct FadeState {
    from: PoseOffset,
    elapsed: Duration,
}

/// Smoothing and fade-out state machine, separated from the capture thread
/// so it can be driven deterministically in tests.
pub struct FaceOffsetFilter {
    config: FaceTrackingConfig,
    current: PoseOffset,
    valid: bool,
    fade: Option<FadeState>,
}

impl FaceOffsetFilter {
    pub fn new(config: FaceTrackingConfig) -> Self {
        Self {
            config,
            current: PoseOffset::ZERO,
            valid: false,
            fade: None,
        }
    }

    /// Advance the filter by `dt` with the latest detection result.
    ///
    /// Returns the offset to publish and its validity.
    pub fn update(&mut self, detection: Option<FaceDetection>, dt: Duration) -> (PoseOffset, bool) {
        match detection {
            Some(face) => {
                // Any active fade is cancelled by a fresh detection.
                self.fade = None;
                let target = PoseOffset {
                    head_yaw_deg: face.x * self.config.yaw_gain_deg,
                    head_pitch_deg: face.y * self.config.pitch_gain_deg,
                    ..PoseOffset::ZERO
                };
                // Exponential smoothing toward the target, never an instant
                // jump.
                let alpha = 1.0 - (-self.config.smoothing_rate_hz * dt.as_secs_f32()).exp();
                let delta = target.add(&self.current.scale(-1.0));
                self.current = self.current.add(&delta.scale(alpha));
                self.valid = true;
            }
            None if self.valid => {
                let window = Duration::from_millis(self.config.fade_ms.max(1));
                let fade = self.fade.get_or_insert_with(|| FadeState {
                    from: self.current,
                    elapsed: Duration::ZERO,
                });
                fade.elapsed += dt;
                if fade.elapsed >= window {
                    self.current = PoseOffset::ZERO;
                    self.valid = false;
                    self.fade = None;
                } else {
                    let remaining = 1.0 - fade.elapsed.as_secs_f32() / window.as_secs_f32();
                    self.current = fade.from.scale(remaining);
                }
            }
            None => {}
        }
        (self.current, self.valid)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Capture thread
// ────────────────────────────────────────────────────────────────────────────

/// Continuously-running face-tracking producer.
///
/// Owns the camera and detector; the motion loop only ever sees the
/// published cell through [`FaceTracker::source`].
pub struct FaceTracker {
    config: FaceTrackingConfig,
    camera: Box<dyn Camera>,
    detector: Box<dyn FaceDetector>,
    filter: FaceOffsetFilter,
    cell: OffsetCell,
}

impl FaceTracker {
    pub const SOURCE_ID: &'static str = "face_tracker";

    pub fn new(
        config: FaceTrackingConfig,
        camera: Box<dyn Camera>,
        detector: Box<dyn FaceDetector>,
    ) -> Self {
        Self {
            config,
            camera,
            detector,
            filter: FaceOffsetFilter::new(config),
            cell: OffsetCell::new(),
        }
    }

    /// The polling facade to register with the source registry.
    pub fn source(&self) -> CellSource {
        CellSource::new(Self::SOURCE_ID, self.cell.clone())
    }

    /// Writer handle to the published cell, mainly for tests.
    pub fn cell(&self) -> OffsetCell {
        self.cell.clone()
    }

    /// Blocking capture loop; run this on a dedicated thread via the
    /// supervisor.  May block on frame arrival, never on the motion loop.
    pub fn run(mut self, stop: StopToken, heartbeat: HeartbeatHandle) {
        info!(camera = self.camera.id(), "face tracker running");
        let min_interval = Duration::from_millis(self.config.min_frame_interval_ms.max(1));
        let mut last = Instant::now();
        while !stop.is_stopped() {
            heartbeat.beat();
            let loop_started = Instant::now();

            match self.camera.capture() {
                Ok(frame) => {
                    let detection = self.detector.detect(&frame);
                    let now = Instant::now();
                    let dt = now.duration_since(last);
                    last = now;
                    let (offset, valid) = self.filter.update(detection, dt);
                    self.cell.publish(offset, valid);
                    if detection.is_none() && !valid {
                        debug!("tracking lost and faded out");
                    }
                }
                Err(err) => {
                    // Capture failure is non-fatal: report invalid and retry.
                    warn!(error = %err, "frame capture failed");
                    self.cell.invalidate();
                    last = Instant::now();
                }
            }

            let spent = loop_started.elapsed();
            if spent < min_interval {
                std::thread::sleep(min_interval - spent);
            }
        }
        self.cell.invalidate();
        heartbeat.retire();
        info!("face tracker stopped");
    }
}
