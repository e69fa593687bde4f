//! Pose composition and safety clamping.
//!
//! [`compose`] is a pure function: it adds the summed secondary offset to the
//! primary pose, then enforces the hardware envelope.  The yaw-delta rule
//! reduces the *offset's* head-yaw contribution rather than the primary pose,
//! preserving the sign of the intended correction; per-axis absolute ranges
//! are applied afterwards.  Clamp activation is a designed correction, not an
//! error, and is reported through the `clamped` flag so the loop can count it.

use swivel_types::{HardwareLimits, Pose, PoseOffset};

/// Tolerance below which a correction does not count as a clamp activation.
const CLAMP_EPSILON: f32 = 1e-4;

/// Result of composing one tick's pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composed {
    pub pose: Pose,
    /// `true` when the safety envelope altered the candidate pose.
    pub clamped: bool,
}

/// Combine a primary pose with a summed secondary offset and clamp the result
/// into the hardware envelope.
///
/// No side effects, no internal state.
pub fn compose(primary: &Pose, offset: &PoseOffset, limits: &HardwareLimits) -> Composed {
    let candidate = primary.offset_by(offset);

    // Body yaw first: the head window is measured relative to it.
    let body_yaw = clamp_axis(candidate.body_yaw_deg, limits.body_yaw_range_deg);

    // Yaw-delta rule.  Clamping the sum into the window is equivalent to
    // shrinking the offset's head-yaw contribution while keeping its sign:
    // the primary's own yaw is inside the window whenever it respects the
    // envelope, so only the offset portion is eaten.
    let window = (
        body_yaw - limits.max_yaw_delta_deg,
        body_yaw + limits.max_yaw_delta_deg,
    );
    let head_yaw = clamp_axis(
        clamp_axis(candidate.head_yaw_deg, window),
        limits.head_yaw_range_deg,
    );

    let pose = Pose {
        head_yaw_deg: head_yaw,
        head_pitch_deg: clamp_axis(candidate.head_pitch_deg, limits.head_pitch_range_deg),
        head_roll_deg: clamp_axis(candidate.head_roll_deg, limits.head_roll_range_deg),
        body_yaw_deg: body_yaw,
        head_z_mm: clamp_axis(candidate.head_z_mm, limits.head_z_range_mm),
    };

    Composed {
        clamped: pose.max_axis_delta(&candidate) > CLAMP_EPSILON,
        pose,
    }
}

fn clamp_axis(value: f32, (min, max): (f32, f32)) -> f32 {
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swivel_types::HardwareLimits;

    fn limits() -> HardwareLimits {
        HardwareLimits::default()
    }

    #[test]
    fn zero_offset_passes_through() {
        let primary = Pose {
            head_yaw_deg: 30.0,
            body_yaw_deg: 10.0,
            ..Pose::neutral()
        };
        let out = compose(&primary, &PoseOffset::ZERO, &limits());
        assert!(!out.clamped);
        assert_eq!(out.pose, primary);
    }

    #[test]
    fn in_envelope_offset_is_added_unclamped() {
        let primary = Pose {
            head_yaw_deg: 10.0,
            ..Pose::neutral()
        };
        let offset = PoseOffset {
            head_yaw_deg: 20.0,
            head_pitch_deg: 5.0,
            ..PoseOffset::ZERO
        };
        let out = compose(&primary, &offset, &limits());
        assert!(!out.clamped);
        assert!((out.pose.head_yaw_deg - 30.0).abs() < 1e-5);
        assert!((out.pose.head_pitch_deg - 5.0).abs() < 1e-5);
    }

    #[test]
    fn yaw_delta_is_capped_at_sixty_five() {
        // A 50° tracking offset on top of a 20° primary yaw with the body at
        // zero must be cut back to the 65° window, not emitted at 70°.
        let primary = Pose {
            head_yaw_deg: 20.0,
            body_yaw_deg: 0.0,
            ..Pose::neutral()
        };
        let offset = PoseOffset {
            head_yaw_deg: 50.0,
            ..PoseOffset::ZERO
        };
        let out = compose(&primary, &offset, &limits());
        assert!(out.clamped);
        assert!((out.pose.head_yaw_deg - 65.0).abs() < 1e-5);
        assert!(out.pose.head_yaw_deg - out.pose.body_yaw_deg <= 65.0 + 1e-5);
    }

    #[test]
    fn yaw_delta_clamp_preserves_direction() {
        let primary = Pose {
            head_yaw_deg: -30.0,
            body_yaw_deg: 0.0,
            ..Pose::neutral()
        };
        let offset = PoseOffset {
            head_yaw_deg: -60.0,
            ..PoseOffset::ZERO
        };
        let out = compose(&primary, &offset, &limits());
        assert!(out.clamped);
        // Still leftward, held at the window edge.
        assert!((out.pose.head_yaw_deg + 65.0).abs() < 1e-5);
    }

    #[test]
    fn window_follows_body_yaw() {
        let primary = Pose {
            head_yaw_deg: 90.0,
            body_yaw_deg: 40.0,
            ..Pose::neutral()
        };
        let out = compose(&primary, &PoseOffset::ZERO, &limits());
        // 90 − 40 = 50 ≤ 65: no clamp.
        assert!(!out.clamped);

        let offset = PoseOffset {
            head_yaw_deg: 30.0,
            ..PoseOffset::ZERO
        };
        let out = compose(&primary, &offset, &limits());
        assert!(out.clamped);
        assert!((out.pose.head_yaw_deg - 105.0).abs() < 1e-5); // 40 + 65
    }

    #[test]
    fn absolute_axis_ranges_apply() {
        let primary = Pose::neutral();
        let offset = PoseOffset {
            head_pitch_deg: 90.0,
            head_roll_deg: -90.0,
            head_z_mm: 100.0,
            ..PoseOffset::ZERO
        };
        let out = compose(&primary, &offset, &limits());
        assert!(out.clamped);
        assert_eq!(out.pose.head_pitch_deg, limits().head_pitch_range_deg.1);
        assert_eq!(out.pose.head_roll_deg, limits().head_roll_range_deg.0);
        assert_eq!(out.pose.head_z_mm, limits().head_z_range_mm.1);
    }

    #[test]
    fn every_composition_satisfies_the_envelope() {
        // Coarse sweep over primary yaw and offset yaw combinations; the
        // emitted delta must never exceed the limit.
        let lims = limits();
        for primary_yaw in (-160..=160).step_by(20) {
            for body_yaw in (-180..=180).step_by(30) {
                for offset_yaw in (-90..=90).step_by(15) {
                    let primary = Pose {
                        head_yaw_deg: primary_yaw as f32,
                        body_yaw_deg: body_yaw as f32,
                        ..Pose::neutral()
                    };
                    let offset = PoseOffset {
                        head_yaw_deg: offset_yaw as f32,
                        ..PoseOffset::ZERO
                    };
                    let out = compose(&primary, &offset, &lims);
                    let delta = (out.pose.head_yaw_deg - out.pose.body_yaw_deg).abs();
                    assert!(
                        delta <= lims.max_yaw_delta_deg + 1e-4,
                        "delta {delta} for primary {primary_yaw}/{body_yaw} offset {offset_yaw}"
                    );
                }
            }
        }
    }
}
