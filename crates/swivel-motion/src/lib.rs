//! `swivel-motion` – the real-time motion composition core.
//!
//! A fixed-cadence control loop sequences mutually-exclusive primary moves,
//! blends additive offsets from independent producers, enforces the hardware
//! safety envelope, and drives the actuator sink – every tick, without ever
//! blocking on I/O.
//!
//! # Modules
//!
//! - [`composer`] – pure [`compose`][composer::compose]: primary pose +
//!   summed offset → safety-clamped target.  The yaw-delta rule eats the
//!   offset's contribution, never the primary's.
//! - [`queue`] – [`MoveQueue`][queue::MoveQueue]: FIFO of pending primary
//!   moves with tag-based clearing.
//! - [`moves`] – [`MoveLibrary`][moves::MoveLibrary] (named keyframe clips)
//!   and [`ActiveMove`][moves::ActiveMove] (per-variant time→pose
//!   evaluation).
//! - [`motion_loop`] – [`MotionLoop`][motion_loop::MotionLoop]: the 100 Hz
//!   orchestrator, plus the [`CommandSender`][motion_loop::CommandSender]
//!   handle external producers submit through.
//! - [`bus`] – [`StatusBus`][bus::StatusBus]: two-lane broadcast diagnostics
//!   (telemetry and alerts).
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: producer heartbeat
//!   tracking and shutdown acknowledgement.
//! - [`supervisor`] – [`Supervisor`][supervisor::Supervisor]: producer
//!   thread lifecycle and coordinated, bounded-timeout shutdown.

pub mod bus;
pub mod composer;
pub mod motion_loop;
pub mod moves;
pub mod queue;
pub mod supervisor;
pub mod watchdog;

pub use bus::{Lane, LaneReceiver, StatusBus};
pub use composer::{Composed, compose};
pub use motion_loop::{CommandSender, LoopStats, MotionLoop, TickReport};
pub use moves::{ActiveMove, Clip, MoveLibrary};
pub use queue::MoveQueue;
pub use supervisor::{StopToken, Supervisor};
pub use watchdog::{HeartbeatHandle, ProducerHealth, Watchdog};
