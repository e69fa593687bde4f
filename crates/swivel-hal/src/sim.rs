//! In-process simulated drivers for tests and the demo binary.
//!
//! These stubs let the full Swivel stack run headless: the actuator records
//! every commanded pose, the camera emits blank frames at a configurable
//! pace, and the face detector replays a script.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use swivel_types::{Pose, SwivelError};

use crate::actuator::ActuatorSink;
use crate::camera::{Camera, CameraFrame, FaceDetection, FaceDetector};

// ────────────────────────────────────────────────────────────────────────────
// Simulated actuator
// ────────────────────────────────────────────────────────────────────────────

/// Shared handle to the poses a [`SimActuator`] has received.
#[derive(Clone, Default)]
pub struct PoseLog {
    poses: Arc<Mutex<Vec<Pose>>>,
}

impl PoseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every commanded pose so far.
    pub fn all(&self) -> Vec<Pose> {
        self.poses.lock().clone()
    }

    /// The most recently commanded pose.
    pub fn last(&self) -> Option<Pose> {
        self.poses.lock().last().copied()
    }

    pub fn len(&self) -> usize {
        self.poses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.lock().is_empty()
    }

    fn push(&self, pose: Pose) {
        self.poses.lock().push(pose);
    }
}

/// A simulated actuator sink that records every commanded pose and can be
/// scripted to fail after a fixed number of targets (for fatal-path tests).
pub struct SimActuator {
    id: String,
    log: PoseLog,
    fail_after: Option<usize>,
    received: usize,
}

impl SimActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: PoseLog::new(),
            fail_after: None,
            received: 0,
        }
    }

    /// Make `set_target` fail once `n` poses have been accepted.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Handle for inspecting commanded poses from another thread.
    pub fn pose_log(&self) -> PoseLog {
        self.log.clone()
    }
}

impl ActuatorSink for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_target(&mut self, target: &Pose) -> Result<(), SwivelError> {
        if let Some(limit) = self.fail_after
            && self.received >= limit
        {
            return Err(SwivelError::ActuatorFault {
                component: self.id.clone(),
                details: "simulated hardware failure".to_string(),
            });
        }
        self.received += 1;
        self.log.push(*target);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated camera producing blank greyscale frames, pacing `capture` to
/// the given frame interval the way a real device blocks on frame arrival.
pub struct SimCamera {
    id: String,
    frame_interval: Duration,
    last_capture: Option<Instant>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, frame_interval: Duration) -> Self {
        Self {
            id: id.into(),
            frame_interval,
            last_capture: None,
        }
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, SwivelError> {
        if let Some(last) = self.last_capture {
            let since = last.elapsed();
            if since < self.frame_interval {
                std::thread::sleep(self.frame_interval - since);
            }
        }
        self.last_capture = Some(Instant::now());
        Ok(CameraFrame {
            width: 64,
            height: 48,
            data: vec![0u8; 64 * 48],
            captured_at: Instant::now(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted face detector
// ────────────────────────────────────────────────────────────────────────────

/// A face detector that replays a fixed script of detections, then repeats
/// the final entry forever.
pub struct ScriptedFaceDetector {
    script: Vec<Option<FaceDetection>>,
    cursor: usize,
}

impl ScriptedFaceDetector {
    pub fn new(script: Vec<Option<FaceDetection>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// A detector that always sees a face at the given normalised position.
    pub fn fixed(x: f32, y: f32) -> Self {
        Self::new(vec![Some(FaceDetection { x, y })])
    }

    /// A detector that never sees a face.
    pub fn blind() -> Self {
        Self::new(vec![None])
    }
}

impl FaceDetector for ScriptedFaceDetector {
    fn detect(&mut self, _frame: &CameraFrame) -> Option<FaceDetection> {
        if self.script.is_empty() {
            return None;
        }
        let last = self.script.len() - 1;
        let entry = self.script[self.cursor.min(last)];
        self.cursor = (self.cursor + 1).min(last);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_actuator_records_poses() {
        let mut sink = SimActuator::new("sim");
        let log = sink.pose_log();
        sink.set_target(&Pose {
            head_yaw_deg: 5.0,
            ..Pose::neutral()
        })
        .unwrap();
        sink.set_target(&Pose {
            head_yaw_deg: 6.0,
            ..Pose::neutral()
        })
        .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().head_yaw_deg, 6.0);
    }

    #[test]
    fn sim_actuator_fails_on_schedule() {
        let mut sink = SimActuator::new("sim").failing_after(1);
        assert!(sink.set_target(&Pose::neutral()).is_ok());
        let err = sink.set_target(&Pose::neutral()).unwrap_err();
        assert!(matches!(err, SwivelError::ActuatorFault { .. }));
    }

    #[test]
    fn scripted_detector_replays_then_holds() {
        let mut det = ScriptedFaceDetector::new(vec![
            Some(FaceDetection { x: 0.5, y: 0.0 }),
            None,
            Some(FaceDetection { x: -0.5, y: 0.1 }),
        ]);
        let frame = CameraFrame {
            width: 1,
            height: 1,
            data: vec![0],
            captured_at: Instant::now(),
        };
        assert_eq!(det.detect(&frame), Some(FaceDetection { x: 0.5, y: 0.0 }));
        assert_eq!(det.detect(&frame), None);
        assert_eq!(det.detect(&frame), Some(FaceDetection { x: -0.5, y: 0.1 }));
        // Script exhausted: final entry repeats.
        assert_eq!(det.detect(&frame), Some(FaceDetection { x: -0.5, y: 0.1 }));
    }

    #[test]
    fn sim_camera_produces_frames() {
        let mut cam = SimCamera::new("sim_rgb", Duration::from_millis(0));
        let frame = cam.capture().unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.data.len(), 64 * 48);
    }
}
