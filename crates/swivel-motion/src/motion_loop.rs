//! [`MotionLoop`] – the fixed-cadence motion composition orchestrator.
//!
//! Each tick:
//!
//! 1. **Drain** – apply every pending [`Command`] without blocking.
//! 2. **Sequence** – pop the next queued move when none is active; fall back
//!    to the implicit breathing idle when the queue is empty.
//! 3. **Evaluate** – compute the active move's pose at its elapsed time.
//! 4. **Complete** – a finished move hands over to the next queued move, or
//!    back to breathing.
//! 5. **Blend** – poll every enabled offset source and sum the valid samples.
//! 6. **Clamp** – compose the candidate pose and enforce the safety envelope.
//! 7. **Act** – push the result to the actuator sink.  A sink failure is
//!    fatal: the loop stops rather than keep computing targets against
//!    unreachable hardware.
//!
//! The tick body is synchronous and deterministic ([`MotionLoop::tick`]
//! takes the elapsed `dt`), which is what the unit tests drive directly;
//! [`MotionLoop::run`] wraps it in a `tokio` interval at the configured
//! cadence and logs budget overruns as latency faults.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use swivel_hal::{ActuatorSink, SourceRegistry};
use swivel_types::{
    Command, MotionConfig, MoveTag, Pose, PrimaryMove, StatusEvent, StatusPayload, SwivelError,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::bus::{Lane, StatusBus};
use crate::composer::compose;
use crate::moves::{ActiveMove, MoveLibrary};
use crate::queue::MoveQueue;

const EVENT_SOURCE: &str = "swivel-motion::loop";

// ────────────────────────────────────────────────────────────────────────────
// Command submission
// ────────────────────────────────────────────────────────────────────────────

/// Cloneable handle used by external producers (tool dispatch, UI) to submit
/// commands to the loop.
///
/// Submission is non-blocking.  Malformed enqueues are rejected here,
/// synchronously, against the same [`MoveLibrary`] the loop resolves with, so
/// the submitter gets the reason and the queue is never disturbed.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
    library: Arc<MoveLibrary>,
}

impl CommandSender {
    /// Submit a command.
    ///
    /// # Errors
    ///
    /// [`SwivelError::RejectedCommand`] for unresolvable moves;
    /// [`SwivelError::Channel`] when the loop has stopped.
    pub fn submit(&self, command: Command) -> Result<(), SwivelError> {
        if let Command::Enqueue(mv) = &command {
            self.library.resolve(mv)?;
        }
        self.tx
            .send(command)
            .map_err(|_| SwivelError::Channel("motion loop has stopped".to_string()))
    }

    /// Convenience: enqueue a primary move.
    pub fn enqueue(&self, mv: PrimaryMove) -> Result<(), SwivelError> {
        self.submit(Command::Enqueue(mv))
    }

    /// Convenience: clear all queued moves with `tag` (aborting a matching
    /// active move).
    pub fn clear(&self, tag: MoveTag) -> Result<(), SwivelError> {
        self.submit(Command::ClearQueue(tag))
    }

    /// Convenience: toggle an offset source.
    pub fn set_source_enabled(&self, source_id: &str, enabled: bool) -> Result<(), SwivelError> {
        self.submit(Command::SetSourceEnabled {
            source_id: source_id.to_string(),
            enabled,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loop state
// ────────────────────────────────────────────────────────────────────────────

enum LoopState {
    /// Implicit idle: queue empty, nothing executing.
    Breathing { elapsed: Duration, from: Pose },
    /// A primary move is executing.
    Executing {
        mv: ActiveMove,
        elapsed: Duration,
        start: Pose,
    },
}

/// Counters exposed for diagnostics.  Clamp activations are designed
/// corrections, counted but never raised as errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopStats {
    pub ticks: u64,
    pub clamp_activations: u64,
    pub overruns: u64,
    pub rejected_commands: u64,
}

/// Outcome of one tick, mainly for tests and the demo binary.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    /// The pose pushed to the actuator sink this tick.
    pub pose: Pose,
    /// Whether the safety envelope altered the candidate pose.
    pub clamped: bool,
    /// Number of offset sources that contributed.
    pub contributing_sources: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// MotionLoop
// ────────────────────────────────────────────────────────────────────────────

/// The orchestrator.  Owns the queue, the source registry, and the actuator
/// sink; everything else reaches it through the command channel.
pub struct MotionLoop {
    config: MotionConfig,
    library: Arc<MoveLibrary>,
    queue: MoveQueue,
    state: LoopState,
    idle: ActiveMove,
    sources: SourceRegistry,
    sink: Box<dyn ActuatorSink>,
    commands: mpsc::UnboundedReceiver<Command>,
    bus: StatusBus,
    stats: LoopStats,
    last_primary: Pose,
    stop: Arc<AtomicBool>,
}

impl MotionLoop {
    /// Build a loop and its command handle.
    pub fn new(
        config: MotionConfig,
        library: Arc<MoveLibrary>,
        sources: SourceRegistry,
        sink: Box<dyn ActuatorSink>,
        bus: StatusBus,
    ) -> (Self, CommandSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let idle = ActiveMove::Breathing {
            amplitude_mm: config.breathing_amplitude_mm,
            period: Duration::from_millis(config.breathing_period_ms.max(1)),
        };
        let motion_loop = Self {
            config,
            library: Arc::clone(&library),
            queue: MoveQueue::new(),
            state: LoopState::Breathing {
                elapsed: Duration::ZERO,
                from: Pose::neutral(),
            },
            idle,
            sources,
            sink,
            commands: rx,
            bus,
            stats: LoopStats::default(),
            last_primary: Pose::neutral(),
            stop: Arc::new(AtomicBool::new(false)),
        };
        let sender = CommandSender { tx, library };
        (motion_loop, sender)
    }

    /// Flag the async runner checks between ticks; shared with the
    /// supervisor.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// `true` iff the queue is empty and no move is executing.
    pub fn is_breathing(&self) -> bool {
        matches!(self.state, LoopState::Breathing { .. })
    }

    /// Tag of the currently active move (`Breathing` for the implicit idle).
    pub fn active_tag(&self) -> MoveTag {
        match &self.state {
            LoopState::Breathing { .. } => MoveTag::Breathing,
            LoopState::Executing { mv, .. } => mv.tag(),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn queued_moves(&self) -> usize {
        self.queue.len()
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    /// Execute one tick with `dt` elapsed since the previous one.
    ///
    /// # Errors
    ///
    /// Only an actuator sink failure errors out; everything else is handled
    /// inside the tick.
    pub fn tick(&mut self, dt: Duration) -> Result<TickReport, SwivelError> {
        // 1. Drain pending commands without blocking.
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }

        // 2. Sequence: leave breathing as soon as work is queued.
        if self.is_breathing() && !self.queue.is_empty() {
            self.start_next_move();
        }

        // 3. Evaluate the active move's pose at its elapsed time.
        let primary = match &self.state {
            LoopState::Breathing { elapsed, from } => self.idle.pose_at(*elapsed, from),
            LoopState::Executing { mv, elapsed, start } => mv.pose_at(*elapsed, start),
        };

        // 4. Completion hand-over.
        let finished_tag = match &self.state {
            LoopState::Executing { mv, elapsed, .. } if mv.is_finished(*elapsed) => Some(mv.tag()),
            _ => None,
        };
        if let Some(tag) = finished_tag {
            debug!(%tag, "primary move finished");
            self.publish(
                Lane::Telemetry,
                StatusPayload::MoveFinished {
                    tag,
                    aborted: false,
                },
            );
            self.last_primary = primary;
            if self.queue.is_empty() {
                self.state = LoopState::Breathing {
                    elapsed: Duration::ZERO,
                    from: primary,
                };
            } else {
                self.start_next_move();
            }
        }

        // 5. Blend: most recently published offset from each enabled source.
        let polled = self.sources.poll_enabled();

        // 6. Clamp into the hardware envelope.
        let composed = compose(&primary, &polled.combined, &self.config.limits);
        if composed.clamped {
            self.stats.clamp_activations += 1;
            self.publish(
                Lane::Telemetry,
                StatusPayload::ClampActivated {
                    head_yaw_deg: composed.pose.head_yaw_deg,
                    body_yaw_deg: composed.pose.body_yaw_deg,
                },
            );
        }

        // 7. Act.  Sink failure is fatal.
        if let Err(err) = self.sink.set_target(&composed.pose) {
            let details = err.to_string();
            error!(error = %details, "actuator sink failed; stopping loop");
            self.publish(
                Lane::Alerts,
                StatusPayload::ActuatorFault {
                    component: self.sink.id().to_string(),
                    details,
                },
            );
            return Err(err);
        }

        // Bookkeeping.
        self.last_primary = primary;
        self.advance_elapsed(dt);
        self.stats.ticks += 1;
        if self.config.status_every_ticks > 0
            && self.stats.ticks % self.config.status_every_ticks == 0
        {
            self.publish(
                Lane::Telemetry,
                StatusPayload::TickStats {
                    ticks: self.stats.ticks,
                    clamp_activations: self.stats.clamp_activations,
                    overruns: self.stats.overruns,
                    rejected_commands: self.stats.rejected_commands,
                    active_move: self.active_tag(),
                },
            );
        }

        Ok(TickReport {
            pose: composed.pose,
            clamped: composed.clamped,
            contributing_sources: polled.contributing,
        })
    }

    /// Drive [`tick`][Self::tick] at the configured cadence until the stop
    /// flag is raised or the sink fails.
    pub async fn run(mut self) -> Result<(), SwivelError> {
        let period = self.config.tick_period();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_hz = self.config.tick_hz, "motion loop running");

        let mut last = Instant::now();
        while !self.stop.load(Ordering::Acquire) {
            interval.tick().await;
            let now = Instant::now();
            let dt = now.duration_since(last);
            last = now;

            let started = Instant::now();
            self.tick(dt)?;
            let spent = started.elapsed();
            if spent > period {
                // Latency fault: log it, never block or skip composition.
                self.stats.overruns += 1;
                warn!(
                    spent_us = spent.as_micros() as u64,
                    budget_us = period.as_micros() as u64,
                    "tick overran its budget"
                );
            }
        }
        info!(ticks = self.stats.ticks, "motion loop stopped");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enqueue(mv) => match self.library.resolve(&mv) {
                Ok(_) => {
                    debug!(tag = %mv.tag(), "move enqueued");
                    self.queue.enqueue(mv);
                }
                Err(err) => {
                    // Submitters using CommandSender were already told; this
                    // guards raw-channel writers.
                    self.stats.rejected_commands += 1;
                    warn!(error = %err, "rejected malformed enqueue");
                }
            },
            Command::ClearQueue(tag) => {
                let removed = self.queue.clear(tag);
                debug!(%tag, removed, "queue cleared");
                let abort_active =
                    matches!(&self.state, LoopState::Executing { mv, .. } if mv.tag() == tag);
                if abort_active {
                    self.publish(
                        Lane::Telemetry,
                        StatusPayload::MoveFinished { tag, aborted: true },
                    );
                    self.state = LoopState::Breathing {
                        elapsed: Duration::ZERO,
                        from: self.last_primary,
                    };
                }
            }
            Command::SetSourceEnabled { source_id, enabled } => {
                if let Err(err) = self.sources.set_enabled(&source_id, enabled) {
                    warn!(error = %err, "source toggle failed");
                }
            }
        }
    }

    /// Pop queued moves until one resolves, and start executing it.
    fn start_next_move(&mut self) {
        while let Some(mv) = self.queue.pop() {
            match self.library.resolve(&mv) {
                Ok(active) => {
                    let tag = active.tag();
                    debug!(%tag, "primary move started");
                    self.publish(Lane::Telemetry, StatusPayload::MoveStarted { tag });
                    self.state = LoopState::Executing {
                        mv: active,
                        elapsed: Duration::ZERO,
                        start: self.last_primary,
                    };
                    return;
                }
                Err(err) => {
                    self.stats.rejected_commands += 1;
                    warn!(error = %err, "queued move no longer resolvable; skipped");
                }
            }
        }
        self.state = LoopState::Breathing {
            elapsed: Duration::ZERO,
            from: self.last_primary,
        };
    }

    fn advance_elapsed(&mut self, dt: Duration) {
        match &mut self.state {
            LoopState::Breathing { elapsed, .. } => *elapsed += dt,
            LoopState::Executing { elapsed, .. } => *elapsed += dt,
        }
    }

    fn publish(&self, lane: Lane, payload: StatusPayload) {
        self.bus.publish(lane, StatusEvent::now(EVENT_SOURCE, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swivel_hal::sim::SimActuator;
    use swivel_hal::source::{CellSource, OffsetCell};
    use swivel_types::PoseOffset;

    const DT: Duration = Duration::from_millis(10);

    fn build_loop(
        sink: SimActuator,
        sources: SourceRegistry,
    ) -> (MotionLoop, CommandSender) {
        MotionLoop::new(
            MotionConfig::default(),
            Arc::new(MoveLibrary::builtin()),
            sources,
            Box::new(sink),
            StatusBus::default(),
        )
    }

    fn tick_n(motion_loop: &mut MotionLoop, n: usize) -> TickReport {
        let mut report = None;
        for _ in 0..n {
            report = Some(motion_loop.tick(DT).unwrap());
        }
        report.unwrap()
    }

    #[test]
    fn starts_breathing() {
        let (mut ml, _tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        assert!(ml.is_breathing());
        ml.tick(DT).unwrap();
        assert!(ml.is_breathing());
        assert_eq!(ml.active_tag(), MoveTag::Breathing);
    }

    #[test]
    fn goto_interpolates_linearly_and_returns_to_breathing() {
        let sink = SimActuator::new("sim");
        let (mut ml, tx) = build_loop(sink, SourceRegistry::new());
        tx.enqueue(PrimaryMove::Goto {
            target: Pose {
                head_yaw_deg: 40.0,
                ..Pose::neutral()
            },
            duration_ms: 1000,
        })
        .unwrap();

        // Tick 1 drains + starts the move and evaluates at elapsed = 0.
        let first = ml.tick(DT).unwrap();
        assert!(first.pose.head_yaw_deg.abs() < 1e-3);
        assert!(!ml.is_breathing());

        // Tick 51 evaluates at elapsed = 500 ms: the linear midpoint.
        let mid = tick_n(&mut ml, 50);
        assert!(
            (mid.pose.head_yaw_deg - 20.0).abs() < 0.5,
            "midpoint was {}",
            mid.pose.head_yaw_deg
        );

        // Past 1000 ms the move completes and breathing resumes.
        tick_n(&mut ml, 52);
        assert!(ml.is_breathing());
    }

    #[test]
    fn fifo_across_moves() {
        let (mut ml, tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        tx.enqueue(PrimaryMove::Goto {
            target: Pose {
                head_yaw_deg: 10.0,
                ..Pose::neutral()
            },
            duration_ms: 20,
        })
        .unwrap();
        tx.enqueue(PrimaryMove::Emotion {
            clip: "happy".to_string(),
        })
        .unwrap();

        ml.tick(DT).unwrap();
        assert_eq!(ml.active_tag(), MoveTag::Goto);
        // Goto (20 ms) finishes; the emotion must start without returning to
        // breathing in between.
        tick_n(&mut ml, 3);
        assert_eq!(ml.active_tag(), MoveTag::Emotion);
        assert!(!ml.is_breathing());
    }

    #[test]
    fn clear_aborts_active_dance_within_one_tick() {
        let (mut ml, tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        tx.enqueue(PrimaryMove::Dance {
            sequence: "sway".to_string(),
            repeat: 10,
        })
        .unwrap();
        ml.tick(DT).unwrap();
        assert_eq!(ml.active_tag(), MoveTag::Dance);

        tx.clear(MoveTag::Dance).unwrap();
        ml.tick(DT).unwrap();
        assert!(ml.is_breathing());
        assert_eq!(ml.queued_moves(), 0);
    }

    #[test]
    fn clear_removes_queued_moves_of_tag_only() {
        let (mut ml, tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        tx.enqueue(PrimaryMove::Goto {
            target: Pose::neutral(),
            duration_ms: 10_000,
        })
        .unwrap();
        tx.enqueue(PrimaryMove::Dance {
            sequence: "spin".to_string(),
            repeat: 1,
        })
        .unwrap();
        tx.enqueue(PrimaryMove::Emotion {
            clip: "sad".to_string(),
        })
        .unwrap();
        ml.tick(DT).unwrap();
        assert_eq!(ml.active_tag(), MoveTag::Goto);
        assert_eq!(ml.queued_moves(), 2);

        tx.clear(MoveTag::Dance).unwrap();
        ml.tick(DT).unwrap();
        // Active goto untouched, dance removed, emotion still queued.
        assert_eq!(ml.active_tag(), MoveTag::Goto);
        assert_eq!(ml.queued_moves(), 1);
    }

    #[test]
    fn malformed_enqueue_is_rejected_at_submit() {
        let (_ml, tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        let err = tx
            .enqueue(PrimaryMove::Emotion {
                clip: "gleeful".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, SwivelError::RejectedCommand { .. }));
    }

    #[test]
    fn malformed_enqueue_on_raw_channel_is_dropped_at_drain() {
        let (mut ml, _tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        // Bypass CommandSender validation.
        ml.handle_command(Command::Enqueue(PrimaryMove::Dance {
            sequence: "moonwalk".to_string(),
            repeat: 1,
        }));
        assert_eq!(ml.queued_moves(), 0);
        assert_eq!(ml.stats().rejected_commands, 1);
        ml.tick(DT).unwrap();
        assert!(ml.is_breathing());
    }

    #[test]
    fn oversized_offset_is_clamped_and_counted() {
        let cell = OffsetCell::new();
        cell.publish(
            PoseOffset {
                head_yaw_deg: 80.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        let mut sources = SourceRegistry::new();
        sources.register(Box::new(CellSource::new("face", cell)));

        let (mut ml, _tx) = build_loop(SimActuator::new("sim"), sources);
        let report = ml.tick(DT).unwrap();
        assert!(report.clamped);
        assert_eq!(report.contributing_sources, 1);
        assert!(report.pose.head_yaw_deg - report.pose.body_yaw_deg <= 65.0 + 1e-4);
        assert!(ml.stats().clamp_activations >= 1);
    }

    #[test]
    fn disabled_source_stops_contributing() {
        let cell = OffsetCell::new();
        cell.publish(
            PoseOffset {
                head_yaw_deg: 10.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        let mut sources = SourceRegistry::new();
        sources.register(Box::new(CellSource::new("face", cell)));

        let (mut ml, tx) = build_loop(SimActuator::new("sim"), sources);
        assert_eq!(ml.tick(DT).unwrap().contributing_sources, 1);

        tx.set_source_enabled("face", false).unwrap();
        assert_eq!(ml.tick(DT).unwrap().contributing_sources, 0);

        tx.set_source_enabled("face", true).unwrap();
        assert_eq!(ml.tick(DT).unwrap().contributing_sources, 1);
    }

    #[test]
    fn actuator_failure_is_fatal() {
        let sink = SimActuator::new("sim").failing_after(2);
        let (mut ml, _tx) = build_loop(sink, SourceRegistry::new());
        assert!(ml.tick(DT).is_ok());
        assert!(ml.tick(DT).is_ok());
        let err = ml.tick(DT).unwrap_err();
        assert!(matches!(err, SwivelError::ActuatorFault { .. }));
    }

    #[test]
    fn breathing_iff_queue_empty_and_idle() {
        let (mut ml, tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        assert!(ml.is_breathing() && ml.queued_moves() == 0);

        tx.enqueue(PrimaryMove::Goto {
            target: Pose::neutral(),
            duration_ms: 50,
        })
        .unwrap();
        ml.tick(DT).unwrap();
        assert!(!ml.is_breathing());

        // Move runs 50 ms; by 70 ms it is gone and breathing holds again.
        tick_n(&mut ml, 7);
        assert!(ml.is_breathing() && ml.queued_moves() == 0);
    }

    #[test]
    fn every_emitted_pose_respects_the_envelope() {
        let cell = OffsetCell::new();
        cell.publish(
            PoseOffset {
                head_yaw_deg: 120.0,
                head_pitch_deg: 80.0,
                ..PoseOffset::ZERO
            },
            true,
        );
        let mut sources = SourceRegistry::new();
        sources.register(Box::new(CellSource::new("face", cell)));
        let sink = SimActuator::new("sim");
        let log = sink.pose_log();
        let (mut ml, tx) = build_loop(sink, sources);

        tx.enqueue(PrimaryMove::Dance {
            sequence: "spin".to_string(),
            repeat: 1,
        })
        .unwrap();
        for _ in 0..250 {
            ml.tick(DT).unwrap();
        }
        let limits = MotionConfig::default().limits;
        for pose in log.all() {
            assert!(
                (pose.head_yaw_deg - pose.body_yaw_deg).abs() <= limits.max_yaw_delta_deg + 1e-3
            );
            assert!(pose.head_pitch_deg <= limits.head_pitch_range_deg.1 + 1e-3);
        }
    }

    #[tokio::test]
    async fn run_stops_on_stop_flag() {
        let (ml, _tx) = build_loop(SimActuator::new("sim"), SourceRegistry::new());
        let stop = ml.stop_flag();
        let handle = tokio::spawn(ml.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.store(true, Ordering::Release);
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop must stop promptly")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn run_surfaces_actuator_failure() {
        let sink = SimActuator::new("sim").failing_after(3);
        let (ml, _tx) = build_loop(sink, SourceRegistry::new());
        let result = tokio::time::timeout(Duration::from_secs(2), ml.run())
            .await
            .expect("loop must exit on sink failure");
        assert!(matches!(result, Err(SwivelError::ActuatorFault { .. })));
    }
}
