//! `swivel-cli` – the Swivel demo binary.
//!
//! Boots the full motion stack against simulated hardware:
//!
//! 1. Loads `~/.swivel/config.toml` (or defaults) and initialises tracing.
//! 2. Wires the sim actuator, sim camera, and a scripted face detector into
//!    the motion loop, the face tracker, and the speech wobbler.
//! 3. Runs a short demo script (emotion, dance, goto, simulated speech) while
//!    tailing the status bus to the console.
//! 4. Intercepts **Ctrl-C** for a graceful, acknowledged shutdown.

mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use crossbeam_channel::Sender;
use swivel_hal::SourceRegistry;
use swivel_hal::sim::{ScriptedFaceDetector, SimActuator, SimCamera};
use swivel_motion::supervisor::{StopToken, Supervisor};
use swivel_motion::{CommandSender, Lane, MotionLoop, MoveLibrary, StatusBus};
use swivel_sources::{FaceTracker, SpeechWobbler};
use swivel_types::{MotionConfig, MoveTag, Pose, PrimaryMove, StatusPayload, SwivelError};
use tracing::warn;

fn main() {
    // Telemetry first; the Tokio runtime is created afterwards.
    let _guard = telemetry::init_tracing("swivel");

    print_banner();

    match config::load() {
        Ok(Some(_)) => println!(
            "  Config loaded from {}",
            config::config_path().display().to_string().bold()
        ),
        Ok(None) => {
            println!("  No config found; using defaults.");
            if let Err(e) = config::save(&config::Config::default()) {
                warn!(error = %e, "could not write default config");
            }
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }
    let cfg = config::load().ok().flatten().unwrap_or_default();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start runtime".red(), e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(cfg.motion_config())) {
        Ok(()) => println!("\n  {}", "✓ Swivel stopped cleanly.".green()),
        Err(e) => {
            eprintln!("\n  {}: {}", "Fatal".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(motion_config: MotionConfig) -> Result<(), SwivelError> {
    // ── Simulated hardware ────────────────────────────────────────────────
    let sink = SimActuator::new("sim_head");
    let pose_log = sink.pose_log();

    // A face drifts to the right, lingers, and disappears – enough to watch
    // tracking, clamping, and the fade-out in the logs.
    let face_script = vec![
        None,
        Some(swivel_hal::FaceDetection { x: 0.3, y: 0.1 }),
        Some(swivel_hal::FaceDetection { x: 0.8, y: 0.2 }),
        Some(swivel_hal::FaceDetection { x: 1.0, y: 0.0 }),
        None,
    ];
    let camera = SimCamera::new("sim_rgb", Duration::from_millis(33));
    let detector = ScriptedFaceDetector::new(face_script);

    // ── Producers ─────────────────────────────────────────────────────────
    let face_tracker = FaceTracker::new(motion_config.face, Box::new(camera), Box::new(detector));
    let (activity_tx, activity_rx) = crossbeam_channel::bounded(256);
    let wobbler = SpeechWobbler::new(motion_config.wobble, activity_rx);

    let mut sources = SourceRegistry::new();
    sources.register(Box::new(face_tracker.source()));
    sources.register(Box::new(wobbler.source()));

    // ── Core loop ─────────────────────────────────────────────────────────
    let bus = StatusBus::default();
    let (motion_loop, commands) = MotionLoop::new(
        motion_config,
        Arc::new(MoveLibrary::builtin()),
        sources,
        Box::new(sink),
        bus.clone(),
    );

    let stop = StopToken::from_flag(motion_loop.stop_flag());
    let mut supervisor = Supervisor::new(stop.clone());
    supervisor.spawn_producer(
        FaceTracker::SOURCE_ID,
        Duration::from_secs(1),
        move |token, heartbeat| face_tracker.run(token, heartbeat),
    )?;
    supervisor.spawn_producer(
        SpeechWobbler::SOURCE_ID,
        Duration::from_secs(1),
        move |token, heartbeat| wobbler.run(token, heartbeat),
    )?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop_for_ctrlc = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – initiating graceful shutdown …"
                .yellow()
                .bold()
        );
        stop_for_ctrlc.stop();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Status tail ───────────────────────────────────────────────────────
    let mut alerts = bus.subscribe(Lane::Alerts);
    tokio::spawn(async move {
        while let Some(event) = alerts.recv().await {
            println!("  {} {:?}", "ALERT".red().bold(), event.payload);
        }
    });
    let mut diagnostics = bus.subscribe(Lane::Telemetry);
    tokio::spawn(async move {
        while let Some(event) = diagnostics.recv().await {
            if let StatusPayload::TickStats {
                ticks,
                clamp_activations,
                active_move,
                ..
            } = event.payload
            {
                println!(
                    "  {} tick {} – active: {}, clamps: {}",
                    "·".dimmed(),
                    ticks,
                    active_move.to_string().cyan(),
                    clamp_activations
                );
            }
        }
    });

    // ── Demo script ───────────────────────────────────────────────────────
    // Keep one sender alive so the wobbler sees silence, not a disconnect,
    // once the script finishes.
    let _activity_keepalive = activity_tx.clone();
    let demo_stop = stop.clone();
    tokio::spawn(demo_script(commands.clone(), activity_tx, demo_stop));

    // ── Run until Ctrl-C or a fatal actuator fault ────────────────────────
    let result = motion_loop.run().await;

    let acknowledged =
        tokio::task::spawn_blocking(move || supervisor.shutdown(Duration::from_secs(2)))
            .await
            .unwrap_or(false);
    if !acknowledged {
        println!("  {}", "⚠ producer shutdown timed out".yellow());
    }

    println!(
        "  {} {} poses emitted",
        "Σ".bold(),
        pose_log.len().to_string().bold()
    );
    result
}

/// Exercises the public command surface: an emotion, a dance, a goto, some
/// simulated speech, and a queue clear.
async fn demo_script(commands: CommandSender, activity: Sender<f32>, stop: StopToken) {
    let step = Duration::from_millis(500);
    tokio::time::sleep(step).await;

    submit(&commands, PrimaryMove::Emotion {
        clip: "curious".to_string(),
    });
    tokio::time::sleep(step * 3).await;

    submit(&commands, PrimaryMove::Dance {
        sequence: "sway".to_string(),
        repeat: 2,
    });

    // Speak for three seconds while the dance plays.
    for _ in 0..150 {
        if stop.is_stopped() {
            return;
        }
        let _ = activity.try_send(1.0);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    submit(&commands, PrimaryMove::Goto {
        target: Pose {
            head_yaw_deg: 40.0,
            body_yaw_deg: 10.0,
            ..Pose::neutral()
        },
        duration_ms: 1000,
    });
    tokio::time::sleep(step * 4).await;

    // Clear whatever dance frames remain and settle back to breathing.
    if commands.clear(MoveTag::Dance).is_ok() {
        println!("  {} dance queue cleared", "·".dimmed());
    }
}

fn submit(commands: &CommandSender, mv: PrimaryMove) {
    match commands.enqueue(mv) {
        Ok(()) => {}
        Err(e) => println!("  {} {}", "rejected:".yellow(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____         _           __"#.bold().cyan());
    println!("{}", r#"  / __/      __(_)  _____  / /"#.bold().cyan());
    println!("{}", r#" _\ \| | /| / / / | / / _ \/ / "#.bold().cyan());
    println!("{}", r#"/___/| |/ |/ / /| |/ /  __/ /  "#.bold().cyan());
    println!("{}", r#"     |__/|__/_/ |___/\___/_/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Swivel".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Real-time head/body motion composition");
    println!();
}
