//! # Lift Control Unit
//!
//! Host build of the lift actuator controller. The lift hardware is the
//! [`SimulatedLift`] plant; commands arrive as serial bytes, either from
//! `--height`/`--target` on the command line or streamed on stdin.
//!
//! Three threads mirror the firmware's execution contexts:
//! - ticker: raises the tick flag every `cycle_time_ms` (the timer interrupt),
//! - serial reader: decodes stdin into the command mailboxes (the UART
//!   interrupt),
//! - main: the poll loop running one cycle per raised tick.

use clap::Parser;
use lift_common::config::{LiftConfig, LogLevel};
use lift_common::consts::DEFAULT_CONFIG_PATH;
use lift_common::protocol::{absolute_target_frame, height_adjust_frame};
use lift_common::time::{Clock, NonBlockingDelay, SystemClock};
use lift_control_unit::command::{Mailboxes, SerialReceiver};
use lift_control_unit::cycle::CycleRunner;
use lift_control_unit::sim::SimulatedLift;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Lift Control Unit: state machine and PID loop on a simulated lift
#[derive(Parser, Debug)]
#[command(name = "lift_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Hierarchical state machine and PID control loop for a lift actuator")]
struct Args {
    /// Path to the lift configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many cycles (runs until Ctrl-C otherwise).
    #[arg(long)]
    cycles: Option<u64>,

    /// Send a relative height adjustment [mm] at startup.
    #[arg(long, allow_hyphen_values = true)]
    height: Option<f32>,

    /// Send an absolute target [mm, 0-999] at startup.
    #[arg(long)]
    target: Option<u16>,

    /// Decode serial command bytes from stdin.
    #[arg(long)]
    stdin: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = LiftConfig::load(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.logging.level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Lift Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Lift Control Unit shutdown complete");
}

fn run(args: &Args, config: LiftConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: cycle_time={}ms, tolerance={}mm, pid={:?}/{:?}",
        config.control.cycle_time_ms,
        config.control.position_tolerance_mm,
        config.pid.mode,
        config.pid.features,
    );

    let mailboxes = Arc::new(Mailboxes::new());
    let hw = SimulatedLift::new(&config);
    let mut runner = CycleRunner::new(&config, hw, Arc::clone(&mailboxes))?;
    let mut receiver = SerialReceiver::new(Arc::clone(&mailboxes));

    if let Some(delta) = args.height {
        receiver.feed(height_adjust_frame(delta).as_bytes());
    }
    if let Some(target) = args.target {
        let frame = absolute_target_frame(target)
            .ok_or_else(|| format!("absolute target {target} exceeds 999 mm"))?;
        receiver.feed(&frame);
    }

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let ticker = spawn_ticker(
        Arc::clone(&mailboxes),
        Arc::clone(&running),
        config.control.cycle_time_ms,
    )?;

    if args.stdin {
        let running = Arc::clone(&running);
        // Detached: a blocking stdin read cannot be interrupted.
        thread::Builder::new()
            .name("lift-serial".into())
            .spawn(move || {
                if let Err(e) = receiver.pump(std::io::stdin().lock(), &running) {
                    warn!("serial input error: {e}");
                }
            })?;
    }

    info!("CycleRunner initialized, entering control loop");
    let mut last_state = runner.state();
    while running.load(Ordering::SeqCst) {
        let Some(report) = runner.poll() else {
            thread::sleep(Duration::from_millis(1));
            continue;
        };
        // Frames were already logged when sent.
        runner.hardware_mut().drain_frames();

        if report.state != last_state {
            info!(
                "{:?} -> {:?} at {:.1}mm (target {:.1}mm)",
                last_state, report.state, report.position, report.target
            );
            last_state = report.state;
        }
        debug!(
            position = report.position,
            target = report.target,
            effort = report.effort,
            jog = ?report.jog,
            "cycle"
        );

        if args.cycles.is_some_and(|n| runner.stats().cycle_count >= n) {
            info!("Cycle limit reached");
            break;
        }
    }

    running.store(false, Ordering::SeqCst);
    if ticker.join().is_err() {
        warn!("ticker thread panicked");
    }

    let stats = runner.stats();
    info!(
        "Stats: cycles={}, avg={}ns, max={}ns, overruns={}, final position={:.1}mm",
        stats.cycle_count,
        stats.avg_cycle_ns(),
        stats.max_cycle_ns,
        stats.overruns,
        runner.hardware().carriage_mm(),
    );

    Ok(())
}

/// Raise the tick flag once per `period_ms` until `running` clears.
fn spawn_ticker(
    mailboxes: Arc<Mailboxes>,
    running: Arc<AtomicBool>,
    period_ms: u32,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("lift-ticker".into())
        .spawn(move || {
            let clock = SystemClock::new();
            let mut delay = NonBlockingDelay::new();
            delay.poll_ms(&clock, period_ms);
            while running.load(Ordering::SeqCst) {
                if delay.poll_ms(&clock, period_ms) {
                    mailboxes.tick.raise();
                    // Re-arm from this tick.
                    delay.poll_ms(&clock, period_ms);
                }
                thread::sleep(Duration::from_micros(200));
            }
            debug!("ticker stopped at {}ms", clock.now_ms());
        })
}

/// Setup tracing subscriber from the configured level and CLI flags.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
