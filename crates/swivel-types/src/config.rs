//! Construction-time configuration for the motion stack.
//!
//! One [`MotionConfig`] is built at startup (from defaults or the CLI config
//! vault) and passed by reference into every constructor.  No implicit global
//! state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hardware safety envelope: per-axis absolute ranges plus the coupled
/// head/body yaw constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareLimits {
    pub head_yaw_range_deg: (f32, f32),
    pub head_pitch_range_deg: (f32, f32),
    pub head_roll_range_deg: (f32, f32),
    pub body_yaw_range_deg: (f32, f32),
    pub head_z_range_mm: (f32, f32),
    /// Maximum |head_yaw − body_yaw| the neck can physically sustain.
    pub max_yaw_delta_deg: f32,
}

impl Default for HardwareLimits {
    fn default() -> Self {
        Self {
            head_yaw_range_deg: (-160.0, 160.0),
            head_pitch_range_deg: (-45.0, 45.0),
            head_roll_range_deg: (-40.0, 40.0),
            body_yaw_range_deg: (-180.0, 180.0),
            head_z_range_mm: (-20.0, 20.0),
            max_yaw_delta_deg: 65.0,
        }
    }
}

/// Face-tracking producer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceTrackingConfig {
    /// Exponential smoothing rate toward the detected target (1/s).  Higher
    /// values converge faster.
    pub smoothing_rate_hz: f32,
    /// Window over which a lost-face offset decays linearly to zero.
    pub fade_ms: u64,
    /// Head-yaw offset produced by a face at the horizontal frame edge.
    pub yaw_gain_deg: f32,
    /// Head-pitch offset produced by a face at the vertical frame edge.
    pub pitch_gain_deg: f32,
    /// Lower bound on the capture loop period.
    pub min_frame_interval_ms: u64,
}

impl Default for FaceTrackingConfig {
    fn default() -> Self {
        Self {
            smoothing_rate_hz: 6.0,
            fade_ms: 2000,
            yaw_gain_deg: 35.0,
            pitch_gain_deg: 20.0,
            min_frame_interval_ms: 33,
        }
    }
}

/// Speech-wobble producer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WobbleConfig {
    /// Oscillation frequency of the head-roll sinusoid (Hz).
    pub frequency_hz: f32,
    /// Amplitude cap of the roll component (degrees).
    pub amplitude_cap_deg: f32,
    /// Ramp-up time from silence to full amplitude.
    pub attack_ms: u64,
    /// Ramp-down time from full amplitude back to zero.
    pub release_ms: u64,
    /// Speech-activity level at or above which the robot counts as speaking.
    pub activity_threshold: f32,
}

impl Default for WobbleConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1.8,
            amplitude_cap_deg: 4.0,
            attack_ms: 400,
            release_ms: 600,
            activity_threshold: 0.3,
        }
    }
}

/// Top-level configuration bundle for the whole motion stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Control-loop rate.  100 Hz gives a 10 ms budget per tick.
    pub tick_hz: u32,
    /// Emit a `TickStats` status event every this many ticks.
    pub status_every_ticks: u64,
    /// Default breathing amplitude when the queue is idle (millimetres).
    pub breathing_amplitude_mm: f32,
    /// Default breathing period when the queue is idle.
    pub breathing_period_ms: u64,
    pub limits: HardwareLimits,
    pub face: FaceTrackingConfig,
    pub wobble: WobbleConfig,
}

impl MotionConfig {
    /// The fixed tick period derived from `tick_hz`.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            status_every_ticks: 100,
            breathing_amplitude_mm: 3.0,
            breathing_period_ms: 4000,
            limits: HardwareLimits::default(),
            face: FaceTrackingConfig::default(),
            wobble: WobbleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_period_is_10ms() {
        let cfg = MotionConfig::default();
        assert_eq!(cfg.tick_period(), Duration::from_millis(10));
    }

    #[test]
    fn tick_period_guards_against_zero_rate() {
        let cfg = MotionConfig {
            tick_hz: 0,
            ..MotionConfig::default()
        };
        assert_eq!(cfg.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn default_limits_match_hardware() {
        let limits = HardwareLimits::default();
        assert_eq!(limits.max_yaw_delta_deg, 65.0);
        assert!(limits.head_yaw_range_deg.0 < limits.head_yaw_range_deg.1);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = MotionConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MotionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
