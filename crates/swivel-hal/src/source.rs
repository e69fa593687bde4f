//! `OffsetSource` capability and the `OffsetCell` publish mechanism.
//!
//! An offset source produces `(offset, valid, timestamp)` continuously on its
//! own execution context; the motion loop polls the most recently published
//! triple at every tick.  Last-write-wins with staleness bounded by the tick
//! period.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use swivel_types::PoseOffset;

/// One published offset triple.
#[derive(Debug, Clone, Copy)]
pub struct OffsetSample {
    pub offset: PoseOffset,
    /// `false` while the producer has nothing to contribute (tracking lost
    /// and faded out, audio silent, thread dead).
    pub valid: bool,
    /// Monotonic time of publication.
    pub published_at: Instant,
}

impl OffsetSample {
    /// An invalid, zero-offset sample.
    pub fn invalid() -> Self {
        Self {
            offset: PoseOffset::ZERO,
            valid: false,
            published_at: Instant::now(),
        }
    }
}

/// Capability contract consumed by the motion loop.
///
/// `poll` must complete in bounded, small time: it runs on the tick path.
pub trait OffsetSource: Send {
    /// Stable identifier, e.g. `"face_tracker"` or `"speech_wobble"`.
    fn source_id(&self) -> &str;

    /// Return the most recently published sample.
    fn poll(&self) -> OffsetSample;
}

/// Single-writer/single-reader published state.
///
/// The writer swaps the whole sample in one short critical section; the
/// reader copies it out.  Neither side can observe a partially-updated
/// offset, and neither side blocks the other beyond the copy.  The lock is
/// never held across a tick boundary.
#[derive(Clone)]
pub struct OffsetCell {
    inner: Arc<Mutex<OffsetSample>>,
}

impl OffsetCell {
    /// Create a cell holding an invalid zero sample.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(OffsetSample::invalid())),
        }
    }

    /// Publish a new sample, stamping it with the current monotonic time.
    pub fn publish(&self, offset: PoseOffset, valid: bool) {
        let sample = OffsetSample {
            offset,
            valid,
            published_at: Instant::now(),
        };
        *self.inner.lock() = sample;
    }

    /// Mark the source invalid without disturbing the stored offset history.
    pub fn invalidate(&self) {
        let mut guard = self.inner.lock();
        guard.valid = false;
        guard.offset = PoseOffset::ZERO;
        guard.published_at = Instant::now();
    }

    /// Copy out the last-published sample.
    pub fn read(&self) -> OffsetSample {
        *self.inner.lock()
    }
}

impl Default for OffsetCell {
    fn default() -> Self {
        Self::new()
    }
}

/// An [`OffsetSource`] facade over an [`OffsetCell`], handed to the registry
/// while the producer keeps the writing clone.
pub struct CellSource {
    source_id: String,
    cell: OffsetCell,
}

impl CellSource {
    pub fn new(source_id: impl Into<String>, cell: OffsetCell) -> Self {
        Self {
            source_id: source_id.into(),
            cell,
        }
    }
}

impl OffsetSource for CellSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn poll(&self) -> OffsetSample {
        self.cell.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cell_is_invalid_and_zero() {
        let cell = OffsetCell::new();
        let sample = cell.read();
        assert!(!sample.valid);
        assert!(sample.offset.is_zero());
    }

    #[test]
    fn publish_then_read_returns_whole_sample() {
        let cell = OffsetCell::new();
        let off = PoseOffset {
            head_yaw_deg: 12.0,
            head_pitch_deg: -3.0,
            ..PoseOffset::ZERO
        };
        cell.publish(off, true);
        let sample = cell.read();
        assert!(sample.valid);
        assert_eq!(sample.offset, off);
    }

    #[test]
    fn last_write_wins() {
        let cell = OffsetCell::new();
        cell.publish(
            PoseOffset {
                head_yaw_deg: 1.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        cell.publish(
            PoseOffset {
                head_yaw_deg: 2.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        assert_eq!(cell.read().offset.head_yaw_deg, 2.0);
    }

    #[test]
    fn invalidate_zeroes_and_marks_invalid() {
        let cell = OffsetCell::new();
        cell.publish(
            PoseOffset {
                head_roll_deg: 4.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        cell.invalidate();
        let sample = cell.read();
        assert!(!sample.valid);
        assert!(sample.offset.is_zero());
    }

    #[test]
    fn cell_source_polls_through() {
        let cell = OffsetCell::new();
        let source = CellSource::new("face_tracker", cell.clone());
        cell.publish(
            PoseOffset {
                head_yaw_deg: 7.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        assert_eq!(source.source_id(), "face_tracker");
        assert_eq!(source.poll().offset.head_yaw_deg, 7.0);
    }

    #[test]
    fn cell_is_readable_across_threads() {
        let cell = OffsetCell::new();
        let writer = cell.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                writer.publish(
                    PoseOffset {
                        head_yaw_deg: i as f32,
                        ..PoseOffset::ZERO
                    },
                    true,
                );
            }
        });
        // Reads must always observe a consistent sample.
        for _ in 0..100 {
            let s = cell.read();
            assert!(s.offset.head_yaw_deg >= 0.0);
        }
        handle.join().unwrap();
        assert_eq!(cell.read().offset.head_yaw_deg, 99.0);
    }
}
