//! `Camera` and `FaceDetector` traits for the face-tracking producer.

use std::time::Instant;

use swivel_types::SwivelError;

/// A raw image frame with its capture timestamp.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. RGB24 or greyscale).
    pub data: Vec<u8>,
    /// Monotonic capture time.
    pub captured_at: Instant,
}

/// A camera or image-capture device.
///
/// `capture` may block waiting for frame arrival; the face tracker runs it on
/// its own thread, never on the tick path.
pub trait Camera: Send {
    /// Stable identifier, e.g. `"head_rgb"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`SwivelError::SourceFault`] when the frame cannot be
    /// captured.  Capture failure is non-fatal: the tracker marks its offset
    /// invalid and retries.
    fn capture(&mut self) -> Result<CameraFrame, SwivelError>;
}

/// A detected face position, normalised to the frame.
///
/// Both components are in `[-1, 1]`: `(0, 0)` is the frame centre, `x = 1`
/// the right edge, `y = 1` the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub x: f32,
    pub y: f32,
}

/// Estimates the most prominent face position in a frame.
pub trait FaceDetector: Send {
    /// Return the face position, or `None` when no face is visible.
    fn detect(&mut self, frame: &CameraFrame) -> Option<FaceDetection>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlankCamera;

    impl Camera for BlankCamera {
        fn id(&self) -> &str {
            "blank"
        }

        fn capture(&mut self) -> Result<CameraFrame, SwivelError> {
            Ok(CameraFrame {
                width: 4,
                height: 4,
                data: vec![0u8; 4 * 4 * 3],
                captured_at: Instant::now(),
            })
        }
    }

    struct CentreDetector;

    impl FaceDetector for CentreDetector {
        fn detect(&mut self, _frame: &CameraFrame) -> Option<FaceDetection> {
            Some(FaceDetection { x: 0.0, y: 0.0 })
        }
    }

    #[test]
    fn capture_and_detect() {
        let mut cam = BlankCamera;
        let frame = cam.capture().unwrap();
        assert_eq!(frame.data.len(), 48);

        let mut det = CentreDetector;
        let face = det.detect(&frame).unwrap();
        assert_eq!(face, FaceDetection { x: 0.0, y: 0.0 });
    }
}
