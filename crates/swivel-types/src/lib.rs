//! `swivel-types` – shared vocabulary of the Swivel motion stack.
//!
//! Every other crate speaks these types: the pose/offset value types, the
//! [`PrimaryMove`] command sum type consumed by the motion loop, the
//! [`StatusEvent`] envelope published on the diagnostics bus, the global
//! [`SwivelError`] taxonomy, and the [`MotionConfig`] bundle handed to every
//! constructor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;
pub mod pose;

pub use config::{FaceTrackingConfig, HardwareLimits, MotionConfig, WobbleConfig};
pub use pose::{Pose, PoseOffset};

/// A sequential, mutually-exclusive motion command.
///
/// Exactly one `PrimaryMove` is active at any instant; `Breathing` is the
/// implicit idle when the queue is empty.  Serialized with an adjacent tag so
/// the external tool-dispatch layer can submit moves as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "move", content = "params")]
pub enum PrimaryMove {
    /// Play a named dance sequence `repeat` times.
    Dance { sequence: String, repeat: u32 },
    /// Play a named one-shot emotion clip.
    Emotion { clip: String },
    /// Interpolate to `target` over `duration_ms` milliseconds.
    Goto { target: Pose, duration_ms: u64 },
    /// Periodic idle trajectory.  Never terminates on its own.
    Breathing { amplitude_mm: f32, period_ms: u64 },
}

impl PrimaryMove {
    /// The variant discriminant, used by queue clearing.
    pub fn tag(&self) -> MoveTag {
        match self {
            PrimaryMove::Dance { .. } => MoveTag::Dance,
            PrimaryMove::Emotion { .. } => MoveTag::Emotion,
            PrimaryMove::Goto { .. } => MoveTag::Goto,
            PrimaryMove::Breathing { .. } => MoveTag::Breathing,
        }
    }
}

/// Bare discriminant of a [`PrimaryMove`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveTag {
    Dance,
    Emotion,
    Goto,
    Breathing,
}

impl std::fmt::Display for MoveTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveTag::Dance => write!(f, "dance"),
            MoveTag::Emotion => write!(f, "emotion"),
            MoveTag::Goto => write!(f, "goto"),
            MoveTag::Breathing => write!(f, "breathing"),
        }
    }
}

/// A command submitted to the motion loop by external producers.
///
/// All variants are applied during the non-blocking drain at the start of a
/// tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Append a move to the tail of the queue.
    Enqueue(PrimaryMove),
    /// Remove every queued move with the given tag; aborts the active move if
    /// it matches.
    ClearQueue(MoveTag),
    /// Enable or disable a registered offset source.
    SetSourceEnabled { source_id: String, enabled: bool },
}

/// Envelope for events published on the diagnostics bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "swivel-motion::loop"
    pub source: String,
    pub payload: StatusPayload,
}

impl StatusEvent {
    /// Build an event stamped with a fresh id and the current wall-clock time.
    pub fn now(source: impl Into<String>, payload: StatusPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of diagnostic data routed over the status bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatusPayload {
    /// Periodic loop counters.
    TickStats {
        ticks: u64,
        clamp_activations: u64,
        overruns: u64,
        rejected_commands: u64,
        active_move: MoveTag,
    },
    /// A primary move left the queue and started executing.
    MoveStarted { tag: MoveTag },
    /// The active move completed or was aborted.
    MoveFinished { tag: MoveTag, aborted: bool },
    /// The safety envelope corrected a composed pose.  Not an error.
    ClampActivated {
        head_yaw_deg: f32,
        body_yaw_deg: f32,
    },
    /// An offset source went invalid or its thread died.
    SourceFault { source_id: String, details: String },
    /// The actuator sink rejected a target pose.  Fatal to the loop.
    ActuatorFault { component: String, details: String },
}

/// Global error type spanning command rejection, hardware faults, and
/// channel/config failures.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SwivelError {
    #[error("command rejected: {reason}")]
    RejectedCommand { reason: String },

    #[error("actuator fault on {component}: {details}")]
    ActuatorFault { component: String, details: String },

    #[error("offset source '{source_id}': {details}")]
    SourceFault { source_id: String, details: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("configuration error: {0}")]
    Config(String),
}
