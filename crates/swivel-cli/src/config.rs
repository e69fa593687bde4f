//! Configuration Vault – reads/writes `~/.swivel/config.toml`.
//!
//! Only the numbers an operator actually tunes are exposed here; the full
//! [`MotionConfig`] is derived from them plus the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use swivel_types::{FaceTrackingConfig, HardwareLimits, MotionConfig, WobbleConfig};

/// Persisted operator configuration stored in `~/.swivel/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-loop rate in Hz.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Face-loss fade-out window in milliseconds.
    #[serde(default = "default_fade_ms")]
    pub face_fade_ms: u64,

    /// Exponential smoothing rate for face tracking (1/s).
    #[serde(default = "default_smoothing")]
    pub face_smoothing_rate_hz: f32,

    /// Head/body yaw-delta safety limit in degrees.
    #[serde(default = "default_yaw_delta")]
    pub max_yaw_delta_deg: f32,

    /// Speech-wobble oscillation frequency in Hz.
    #[serde(default = "default_wobble_hz")]
    pub wobble_frequency_hz: f32,

    /// Speech-wobble amplitude cap in degrees.
    #[serde(default = "default_wobble_amp")]
    pub wobble_amplitude_deg: f32,
}

impl Config {
    /// Expand the operator knobs into the full motion configuration.
    pub fn motion_config(&self) -> MotionConfig {
        MotionConfig {
            tick_hz: self.tick_hz,
            limits: HardwareLimits {
                max_yaw_delta_deg: self.max_yaw_delta_deg,
                ..HardwareLimits::default()
            },
            face: FaceTrackingConfig {
                fade_ms: self.face_fade_ms,
                smoothing_rate_hz: self.face_smoothing_rate_hz,
                ..FaceTrackingConfig::default()
            },
            wobble: WobbleConfig {
                frequency_hz: self.wobble_frequency_hz,
                amplitude_cap_deg: self.wobble_amplitude_deg,
                ..WobbleConfig::default()
            },
            ..MotionConfig::default()
        }
    }
}

fn default_tick_hz() -> u32 {
    100
}
fn default_fade_ms() -> u64 {
    2000
}
fn default_smoothing() -> f32 {
    6.0
}
fn default_yaw_delta() -> f32 {
    65.0
}
fn default_wobble_hz() -> f32 {
    1.8
}
fn default_wobble_amp() -> f32 {
    4.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            face_fade_ms: default_fade_ms(),
            face_smoothing_rate_hz: default_smoothing(),
            max_yaw_delta_deg: default_yaw_delta(),
            wobble_frequency_hz: default_wobble_hz(),
            wobble_amplitude_deg: default_wobble_amp(),
        }
    }
}

/// Return the path to `~/.swivel/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".swivel").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SWIVEL_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SWIVEL_TICK_HZ` | `tick_hz` |
/// | `SWIVEL_FADE_MS` | `face_fade_ms` |
/// | `SWIVEL_WOBBLE_HZ` | `wobble_frequency_hz` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SWIVEL_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("SWIVEL_FADE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.face_fade_ms = ms;
    }
    if let Ok(v) = std::env::var("SWIVEL_WOBBLE_HZ")
        && let Ok(hz) = v.parse::<f32>()
    {
        cfg.wobble_frequency_hz = hz;
    }
}

/// Save the config to disk, creating `~/.swivel/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.tick_hz, 100);
        assert_eq!(loaded.face_fade_ms, 2000);
        assert_eq!(loaded.max_yaw_delta_deg, 65.0);
    }

    #[test]
    fn partial_file_gets_field_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "tick_hz = 50\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.tick_hz, 50);
        assert_eq!(loaded.face_fade_ms, 2000);
        assert_eq!(loaded.wobble_amplitude_deg, 4.0);
    }

    #[test]
    fn config_path_points_to_swivel_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".swivel"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn motion_config_carries_the_knobs() {
        let cfg = Config {
            tick_hz: 50,
            face_fade_ms: 1500,
            max_yaw_delta_deg: 45.0,
            ..Config::default()
        };
        let motion = cfg.motion_config();
        assert_eq!(motion.tick_hz, 50);
        assert_eq!(motion.face.fade_ms, 1500);
        assert_eq!(motion.limits.max_yaw_delta_deg, 45.0);
        // Untouched knobs keep their defaults.
        assert_eq!(motion.limits.head_pitch_range_deg, (-45.0, 45.0));
    }

    #[test]
    fn apply_env_overrides_changes_tick_rate() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("SWIVEL_TICK_HZ", "200") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tick_hz, 200);
        unsafe { std::env::remove_var("SWIVEL_TICK_HZ") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_values() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("SWIVEL_TICK_HZ", "not-a-rate") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tick_hz, 100);
        unsafe { std::env::remove_var("SWIVEL_TICK_HZ") };
    }
}
