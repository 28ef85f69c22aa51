//! Poll-loop cycle: mailboxes → state machine → manual override → PID.
//!
//! ## Tick Body
//! 1. Relative height command: `target = position + delta`, arm the
//!    completion acknowledgement, reset the PID.
//! 2. Absolute target command: `target = value`, reset the PID.
//! 3. One state machine step.
//! 4. Manual jog overrides the relay after the automatic logic; releasing
//!    the jog stops the relay once.
//! 5. `$LIFTER:OK#` once the lift settles in tolerance of an acknowledged
//!    target.
//! 6. PID drive effort for the (target, position) pair and cycle statistics.
//!
//! ## Faults
//! [`CycleRunner::fault`] sends the lift to `Error`, where it stays until
//! [`CycleRunner::recover`].
//!
//! ## Pacing
//! [`CycleRunner::poll`] runs a tick only when the tick flag was raised by
//! the ticker, so the loop body never blocks.

use std::sync::Arc;
use std::time::Instant;

use lift_common::config::LiftConfig;
use lift_common::consts::LIFTER_ACK_FRAME;
use lift_common::hal::{LiftHardware, RelayDirection};
use lift_common::protocol::JogIntent;
use tracing::{debug, info, warn};

use crate::command::Mailboxes;
use crate::control::PidController;
use crate::error::CycleError;
use crate::state::{LiftContext, LiftEvent, LiftMachine, LiftState};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total ticks executed.
    pub cycle_count: u64,
    /// Last tick body duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum tick body duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum tick body duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Ticks whose body exceeded the tick period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a tick duration against the tick budget. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average tick time [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot returned by every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub state: LiftState,
    /// Last sampled position [mm].
    pub position: f64,
    /// Absolute target [mm].
    pub target: f64,
    /// PID drive effort.
    pub effort: f64,
    /// Manual override in effect.
    pub jog: JogIntent,
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the lift machine, its hardware and the PID.
pub struct CycleRunner<H> {
    machine: LiftMachine,
    ctx: LiftContext<H>,
    mailboxes: Arc<Mailboxes>,
    pid: PidController,
    /// PID period [s].
    dt_s: f64,
    budget_ns: i64,
    max_stroke_mm: f64,
    ack_armed: bool,
    last_jog: JogIntent,
    effort: f64,
    stats: CycleStats,
}

impl<H: LiftHardware> CycleRunner<H> {
    /// Build a runner starting in `Idle`.
    ///
    /// # Errors
    /// `CycleError::Config` on an invalid configuration,
    /// `CycleError::Machine` if the state tree fails validation.
    pub fn new(config: &LiftConfig, hw: H, mailboxes: Arc<Mailboxes>) -> Result<Self, CycleError> {
        config.validate()?;
        let machine = LiftMachine::new(LiftState::Idle)?;

        let mut ctx = LiftContext::new(hw);
        ctx.tolerance = config.control.position_tolerance_mm;
        ctx.target_position = config.control.initial_target_mm;

        let cycle_ms = config.control.cycle_time_ms;
        Ok(Self {
            machine,
            ctx,
            mailboxes,
            pid: PidController::from_config(&config.pid),
            dt_s: f64::from(cycle_ms) / 1000.0,
            budget_ns: i64::from(cycle_ms) * 1_000_000,
            max_stroke_mm: config.encoder.max_stroke_mm,
            ack_armed: false,
            last_jog: JogIntent::Stop,
            effort: 0.0,
            stats: CycleStats::new(),
        })
    }

    /// Run one tick if the ticker raised the tick flag.
    pub fn poll(&mut self) -> Option<CycleReport> {
        if self.mailboxes.tick.take() {
            Some(self.tick())
        } else {
            None
        }
    }

    /// Run one tick unconditionally.
    pub fn tick(&mut self) -> CycleReport {
        let start = Instant::now();

        self.apply_commands();
        self.machine.process(&mut self.ctx);
        let jog = self.apply_jog();
        self.acknowledge();

        let position = self.ctx.hw.position();
        self.effort = self
            .pid
            .calculate(self.ctx.target_position, position, self.dt_s);

        let duration_ns = start.elapsed().as_nanos() as i64;
        self.stats.record(duration_ns, self.budget_ns);
        if duration_ns > self.budget_ns {
            warn!(
                "tick overrun: {duration_ns}ns > {}ns budget",
                self.budget_ns
            );
        }

        CycleReport {
            state: self.machine.current(),
            position,
            target: self.ctx.target_position,
            effort: self.effort,
            jog,
        }
    }

    /// Force the machine into its error handling on the next tick.
    pub fn fault(&mut self) {
        warn!("fault raised");
        self.machine.trigger(LiftEvent::Error);
    }

    /// Leave `Error` on the next tick. `Error` holds until this is called.
    pub fn recover(&mut self) {
        info!("fault cleared");
        self.machine.trigger(LiftEvent::Ok);
    }

    /// Set the absolute target directly.
    pub fn set_target(&mut self, target_mm: f64) {
        self.ctx.target_position = self.clamp_target(target_mm);
        self.pid.reset();
    }

    fn apply_commands(&mut self) {
        if let Some(delta) = self.mailboxes.height_delta.take() {
            let target = self.ctx.hw.position() + f64::from(delta);
            self.ctx.target_position = self.clamp_target(target);
            self.ack_armed = true;
            self.pid.reset();
            info!(
                delta,
                target = self.ctx.target_position,
                "height adjustment"
            );
        }

        if let Some(target) = self.mailboxes.absolute_target.take() {
            self.ctx.target_position = self.clamp_target(f64::from(target));
            self.pid.reset();
            info!(target = self.ctx.target_position, "absolute target");
        }
    }

    fn clamp_target(&self, target: f64) -> f64 {
        let clamped = target.clamp(0.0, self.max_stroke_mm);
        if clamped != target {
            warn!(
                requested = target,
                clamped, "target outside stroke, clamped"
            );
        }
        clamped
    }

    fn apply_jog(&mut self) -> JogIntent {
        let jog = self.mailboxes.jog.current();
        match jog {
            JogIntent::Up => self.ctx.hw.set_direction(RelayDirection::Extend),
            JogIntent::Down => self.ctx.hw.set_direction(RelayDirection::Retract),
            JogIntent::Stop if self.last_jog.is_active() => {
                debug!("jog released");
                self.ctx.hw.stop();
            }
            JogIntent::Stop => {}
        }
        self.last_jog = jog;
        jog
    }

    fn acknowledge(&mut self) {
        if self.ack_armed
            && self.machine.current() == LiftState::Idle
            && self.ctx.in_tolerance()
        {
            self.ctx.hw.send_frame(LIFTER_ACK_FRAME);
            self.ack_armed = false;
        }
    }

    // ── Accessors ──

    #[inline]
    pub fn state(&self) -> LiftState {
        self.machine.current()
    }

    #[inline]
    pub fn machine(&self) -> &LiftMachine {
        &self.machine
    }

    #[inline]
    pub fn target(&self) -> f64 {
        self.ctx.target_position
    }

    #[inline]
    pub fn effort(&self) -> f64 {
        self.effort
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    #[inline]
    pub fn mailboxes(&self) -> &Arc<Mailboxes> {
        &self.mailboxes
    }

    #[inline]
    pub fn hardware(&self) -> &H {
        &self.ctx.hw
    }

    #[inline]
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.ctx.hw
    }

    /// Consume the runner and return its hardware.
    pub fn into_hardware(self) -> H {
        self.ctx.hw
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
