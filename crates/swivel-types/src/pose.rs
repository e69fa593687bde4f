//! Pose and offset value types.
//!
//! A [`Pose`] is the full actuator-space target for one control tick: three
//! head rotations, the body rotation, and the head's vertical translation.
//! A [`PoseOffset`] is an additive correction in the same axis space,
//! produced by the secondary sources and blended on top of the primary move.

use serde::{Deserialize, Serialize};

/// A fixed-size target for every driven axis.  Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Head rotation around the vertical axis (degrees, 0 = forward).
    pub head_yaw_deg: f32,
    /// Head rotation around the lateral axis (degrees, positive = up).
    pub head_pitch_deg: f32,
    /// Head rotation around the forward axis (degrees, positive = right ear down).
    pub head_roll_deg: f32,
    /// Body rotation around the vertical axis (degrees).
    pub body_yaw_deg: f32,
    /// Head vertical translation relative to neutral (millimetres).
    pub head_z_mm: f32,
}

impl Pose {
    /// The rest pose: all axes at zero.
    pub fn neutral() -> Self {
        Self {
            head_yaw_deg: 0.0,
            head_pitch_deg: 0.0,
            head_roll_deg: 0.0,
            body_yaw_deg: 0.0,
            head_z_mm: 0.0,
        }
    }

    /// Component-wise sum of this pose and an offset.
    pub fn offset_by(&self, offset: &PoseOffset) -> Pose {
        Pose {
            head_yaw_deg: self.head_yaw_deg + offset.head_yaw_deg,
            head_pitch_deg: self.head_pitch_deg + offset.head_pitch_deg,
            head_roll_deg: self.head_roll_deg + offset.head_roll_deg,
            body_yaw_deg: self.body_yaw_deg + offset.body_yaw_deg,
            head_z_mm: self.head_z_mm + offset.head_z_mm,
        }
    }

    /// Linear interpolation from `self` toward `other`.  `t` is clamped to
    /// `[0, 1]`.
    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Pose {
            head_yaw_deg: mix(self.head_yaw_deg, other.head_yaw_deg),
            head_pitch_deg: mix(self.head_pitch_deg, other.head_pitch_deg),
            head_roll_deg: mix(self.head_roll_deg, other.head_roll_deg),
            body_yaw_deg: mix(self.body_yaw_deg, other.body_yaw_deg),
            head_z_mm: mix(self.head_z_mm, other.head_z_mm),
        }
    }

    /// Largest absolute per-axis difference to `other`, with rotations in
    /// degrees and translation in millimetres treated as commensurate.
    pub fn max_axis_delta(&self, other: &Pose) -> f32 {
        [
            (self.head_yaw_deg - other.head_yaw_deg).abs(),
            (self.head_pitch_deg - other.head_pitch_deg).abs(),
            (self.head_roll_deg - other.head_roll_deg).abs(),
            (self.body_yaw_deg - other.body_yaw_deg).abs(),
            (self.head_z_mm - other.head_z_mm).abs(),
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::neutral()
    }
}

/// An additive correction in the same axis space as [`Pose`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseOffset {
    pub head_yaw_deg: f32,
    pub head_pitch_deg: f32,
    pub head_roll_deg: f32,
    pub body_yaw_deg: f32,
    pub head_z_mm: f32,
}

impl PoseOffset {
    pub const ZERO: PoseOffset = PoseOffset {
        head_yaw_deg: 0.0,
        head_pitch_deg: 0.0,
        head_roll_deg: 0.0,
        body_yaw_deg: 0.0,
        head_z_mm: 0.0,
    };

    /// Component-wise sum.
    pub fn add(&self, other: &PoseOffset) -> PoseOffset {
        PoseOffset {
            head_yaw_deg: self.head_yaw_deg + other.head_yaw_deg,
            head_pitch_deg: self.head_pitch_deg + other.head_pitch_deg,
            head_roll_deg: self.head_roll_deg + other.head_roll_deg,
            body_yaw_deg: self.body_yaw_deg + other.body_yaw_deg,
            head_z_mm: self.head_z_mm + other.head_z_mm,
        }
    }

    /// Uniform scale of every component.
    pub fn scale(&self, factor: f32) -> PoseOffset {
        PoseOffset {
            head_yaw_deg: self.head_yaw_deg * factor,
            head_pitch_deg: self.head_pitch_deg * factor,
            head_roll_deg: self.head_roll_deg * factor,
            body_yaw_deg: self.body_yaw_deg * factor,
            head_z_mm: self.head_z_mm * factor,
        }
    }

    /// Largest absolute component.  Used to decide when a decaying offset
    /// has reached zero.
    pub fn magnitude(&self) -> f32 {
        [
            self.head_yaw_deg.abs(),
            self.head_pitch_deg.abs(),
            self.head_roll_deg.abs(),
            self.body_yaw_deg.abs(),
            self.head_z_mm.abs(),
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }

    /// `true` when every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.magnitude() == 0.0
    }
}

impl Default for PoseOffset {
    fn default() -> Self {
        Self::ZERO
    }
}
