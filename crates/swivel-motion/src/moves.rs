//! Move resolution and per-variant time→pose evaluation.
//!
//! [`MoveLibrary`] maps the string references carried by
//! [`PrimaryMove::Dance`] and [`PrimaryMove::Emotion`] to keyframe
//! [`Clip`]s.  Resolution happens before a move reaches the queue, so an
//! unresolvable reference is rejected at the submitter and can never disturb
//! the loop.  [`ActiveMove`] owns each variant's pose evaluation; the loop
//! only ever calls [`ActiveMove::pose_at`] and
//! [`ActiveMove::is_finished`].

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use swivel_types::{MoveTag, Pose, PrimaryMove, SwivelError};

/// How long breathing takes to settle back toward neutral after a move ends.
const BREATHING_RETURN_WINDOW: Duration = Duration::from_millis(1000);

// ────────────────────────────────────────────────────────────────────────────
// Clips
// ────────────────────────────────────────────────────────────────────────────

/// A pre-defined pose trajectory: keyframes at a fixed period, linearly
/// interpolated.
#[derive(Debug, Clone)]
pub struct Clip {
    name: String,
    frames: Vec<Pose>,
    frame_period: Duration,
}

impl Clip {
    /// Build a clip.  A clip needs at least two frames to have any duration.
    pub fn new(name: impl Into<String>, frames: Vec<Pose>, frame_period: Duration) -> Self {
        Self {
            name: name.into(),
            frames,
            frame_period,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total playback time of one pass.
    pub fn duration(&self) -> Duration {
        match self.frames.len() {
            0 | 1 => Duration::ZERO,
            n => self.frame_period * (n as u32 - 1),
        }
    }

    /// Sample the trajectory at `elapsed`, holding the final frame once the
    /// clip is exhausted.
    pub fn sample(&self, elapsed: Duration) -> Pose {
        match self.frames.len() {
            0 => Pose::neutral(),
            1 => self.frames[0],
            _ => {
                let period = self.frame_period.as_secs_f32();
                let t = elapsed.as_secs_f32() / period;
                let idx = (t.floor() as usize).min(self.frames.len() - 2);
                let frac = (t - idx as f32).clamp(0.0, 1.0);
                self.frames[idx].lerp(&self.frames[idx + 1], frac)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MoveLibrary
// ────────────────────────────────────────────────────────────────────────────

/// Named clip registry resolving the asset references in dance and emotion
/// moves.
pub struct MoveLibrary {
    sequences: HashMap<String, Arc<Clip>>,
    emotions: HashMap<String, Arc<Clip>>,
}

impl MoveLibrary {
    /// An empty library.  Most callers want [`MoveLibrary::builtin`].
    pub fn new() -> Self {
        Self {
            sequences: HashMap::new(),
            emotions: HashMap::new(),
        }
    }

    /// The stock clip set shipped with the robot.
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        for clip in builtin_sequences() {
            lib.register_sequence(clip);
        }
        for clip in builtin_emotions() {
            lib.register_emotion(clip);
        }
        lib
    }

    pub fn register_sequence(&mut self, clip: Clip) {
        self.sequences
            .insert(clip.name().to_string(), Arc::new(clip));
    }

    pub fn register_emotion(&mut self, clip: Clip) {
        self.emotions.insert(clip.name().to_string(), Arc::new(clip));
    }

    pub fn sequence_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sequences.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn emotion_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.emotions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a submitted move into an executable [`ActiveMove`].
    ///
    /// # Errors
    ///
    /// Returns [`SwivelError::RejectedCommand`] for unknown sequence/clip
    /// names or a zero-length `Goto`; the queue is never disturbed by a
    /// rejected move.
    pub fn resolve(&self, mv: &PrimaryMove) -> Result<ActiveMove, SwivelError> {
        match mv {
            PrimaryMove::Dance { sequence, repeat } => {
                let clip = self.sequences.get(sequence).cloned().ok_or_else(|| {
                    SwivelError::RejectedCommand {
                        reason: format!("unknown dance sequence '{sequence}'"),
                    }
                })?;
                Ok(ActiveMove::Dance {
                    clip,
                    repeat: (*repeat).max(1),
                })
            }
            PrimaryMove::Emotion { clip } => {
                let clip = self.emotions.get(clip).cloned().ok_or_else(|| {
                    SwivelError::RejectedCommand {
                        reason: format!("unknown emotion clip '{clip}'"),
                    }
                })?;
                Ok(ActiveMove::Emotion { clip })
            }
            PrimaryMove::Goto {
                target,
                duration_ms,
            } => {
                if *duration_ms == 0 {
                    return Err(SwivelError::RejectedCommand {
                        reason: "goto duration must be positive".to_string(),
                    });
                }
                Ok(ActiveMove::Goto {
                    target: *target,
                    duration: Duration::from_millis(*duration_ms),
                })
            }
            PrimaryMove::Breathing {
                amplitude_mm,
                period_ms,
            } => Ok(ActiveMove::Breathing {
                amplitude_mm: *amplitude_mm,
                period: Duration::from_millis((*period_ms).max(1)),
            }),
        }
    }
}

impl Default for MoveLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ActiveMove
// ────────────────────────────────────────────────────────────────────────────

/// A resolved, executing primary move.
///
/// Each variant owns its time→pose function.  `start` is the primary pose at
/// the instant the move began, used for continuity.
#[derive(Debug, Clone)]
pub enum ActiveMove {
    Dance { clip: Arc<Clip>, repeat: u32 },
    Emotion { clip: Arc<Clip> },
    Goto { target: Pose, duration: Duration },
    Breathing { amplitude_mm: f32, period: Duration },
}

impl ActiveMove {
    pub fn tag(&self) -> MoveTag {
        match self {
            ActiveMove::Dance { .. } => MoveTag::Dance,
            ActiveMove::Emotion { .. } => MoveTag::Emotion,
            ActiveMove::Goto { .. } => MoveTag::Goto,
            ActiveMove::Breathing { .. } => MoveTag::Breathing,
        }
    }

    /// Total running time, or `None` for moves that never terminate.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            ActiveMove::Dance { clip, repeat } => Some(clip.duration() * *repeat),
            ActiveMove::Emotion { clip } => Some(clip.duration()),
            ActiveMove::Goto { duration, .. } => Some(*duration),
            ActiveMove::Breathing { .. } => None,
        }
    }

    /// `true` once `elapsed` has consumed the move's whole duration.
    /// Breathing never finishes.
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        match self.duration() {
            Some(total) => elapsed >= total,
            None => false,
        }
    }

    /// Evaluate the move's pose at `elapsed` since it started.
    pub fn pose_at(&self, elapsed: Duration, start: &Pose) -> Pose {
        match self {
            ActiveMove::Dance { clip, .. } => {
                let single = clip.duration();
                if single.is_zero() {
                    return clip.sample(Duration::ZERO);
                }
                // Wrap into the current repetition; the final instant holds
                // the last frame instead of wrapping to frame zero.
                let within = if self.is_finished(elapsed) {
                    single
                } else {
                    Duration::from_secs_f64(
                        elapsed.as_secs_f64() % single.as_secs_f64(),
                    )
                };
                clip.sample(within)
            }
            ActiveMove::Emotion { clip } => clip.sample(elapsed),
            ActiveMove::Goto { target, duration } => {
                let t = elapsed.as_secs_f32() / duration.as_secs_f32();
                start.lerp(target, t)
            }
            ActiveMove::Breathing {
                amplitude_mm,
                period,
            } => {
                // Settle from wherever the last move left the head back
                // toward neutral, then oscillate around it.
                let settle =
                    (elapsed.as_secs_f32() / BREATHING_RETURN_WINDOW.as_secs_f32()).min(1.0);
                let base = start.lerp(&Pose::neutral(), settle);
                let phase = TAU * elapsed.as_secs_f32() / period.as_secs_f32();
                Pose {
                    head_z_mm: base.head_z_mm + amplitude_mm * phase.sin(),
                    head_pitch_deg: base.head_pitch_deg
                        + amplitude_mm * 0.25 * phase.sin(),
                    ..base
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builtin clips
// ────────────────────────────────────────────────────────────────────────────

fn pose(yaw: f32, pitch: f32, roll: f32, body: f32, z: f32) -> Pose {
    Pose {
        head_yaw_deg: yaw,
        head_pitch_deg: pitch,
        head_roll_deg: roll,
        body_yaw_deg: body,
        head_z_mm: z,
    }
}

fn builtin_sequences() -> Vec<Clip> {
    let period = Duration::from_millis(400);
    vec![
        Clip::new(
            "sway",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(25.0, 0.0, 8.0, 10.0, 2.0),
                pose(0.0, 0.0, 0.0, 0.0, 4.0),
                pose(-25.0, 0.0, -8.0, -10.0, 2.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
        Clip::new(
            "spin",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(40.0, -5.0, 0.0, 60.0, 0.0),
                pose(70.0, -10.0, 0.0, 120.0, 0.0),
                pose(40.0, -5.0, 0.0, 60.0, 0.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
        Clip::new(
            "bounce",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(0.0, 10.0, 0.0, 0.0, 12.0),
                pose(0.0, -8.0, 0.0, 0.0, -10.0),
                pose(0.0, 10.0, 0.0, 0.0, 12.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
    ]
}

fn builtin_emotions() -> Vec<Clip> {
    let period = Duration::from_millis(300);
    vec![
        Clip::new(
            "happy",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(0.0, 18.0, 0.0, 0.0, 8.0),
                pose(0.0, 12.0, 10.0, 0.0, 6.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
        Clip::new(
            "sad",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(0.0, -20.0, 0.0, 0.0, -8.0),
                pose(8.0, -22.0, 5.0, 0.0, -10.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
        Clip::new(
            "surprised",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(0.0, 15.0, 0.0, 0.0, 14.0),
                pose(0.0, 15.0, 0.0, 0.0, 14.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
        Clip::new(
            "curious",
            vec![
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
                pose(15.0, 5.0, 18.0, 0.0, 2.0),
                pose(-10.0, 8.0, -12.0, 0.0, 2.0),
                pose(0.0, 0.0, 0.0, 0.0, 0.0),
            ],
            period,
        ),
    ]
}
