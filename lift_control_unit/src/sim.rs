//! Simulated lift hardware.
//!
//! A carriage driven by the relay at a fixed speed, clamped to the stroke.
//! Travel is converted to encoder pulses in a wrapping 16-bit counter which
//! is read-and-reset through [`QuadratureDecoder`] on every sample, the same
//! way the real counter is.

use lift_common::config::LiftConfig;
use lift_common::hal::{FrameSink, Gripper, LinkProcessor, PositionSensor, RelayDirection, RelayDriver};
use tracing::{debug, info};

use crate::encoder::{EncoderSample, QuadratureDecoder};

/// Frames kept by [`SimulatedLift`]; older frames are dropped first.
pub const FRAME_LOG_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct SimulatedLift {
    /// True carriage position [mm].
    carriage_mm: f64,
    travel_speed_mm_s: f64,
    max_stroke_mm: f64,
    /// Time advanced per sample [s].
    sample_dt_s: f64,
    counter: u16,
    /// Fractional pulses not yet counted.
    pulse_residual: f64,
    decoder: QuadratureDecoder,
    sample: EncoderSample,
    direction: Option<RelayDirection>,
    frames: Vec<String>,
    gripper_opens: u32,
    link_steps: u64,
}

impl SimulatedLift {
    pub fn new(config: &LiftConfig) -> Self {
        let start = config.simulation.start_position_mm;
        let mut decoder = QuadratureDecoder::new(&config.encoder);
        decoder.preset_position(start);

        Self {
            carriage_mm: start,
            travel_speed_mm_s: config.simulation.travel_speed_mm_s,
            max_stroke_mm: config.encoder.max_stroke_mm,
            sample_dt_s: f64::from(config.control.cycle_time_ms) / 1000.0,
            counter: 0,
            pulse_residual: 0.0,
            sample: EncoderSample {
                position_mm: decoder.position_mm(),
                ..EncoderSample::default()
            },
            decoder,
            direction: None,
            frames: Vec::new(),
            gripper_opens: 0,
            link_steps: 0,
        }
    }

    /// True carriage position [mm].
    #[inline]
    pub fn carriage_mm(&self) -> f64 {
        self.carriage_mm
    }

    #[inline]
    pub fn direction(&self) -> Option<RelayDirection> {
        self.direction
    }

    /// The most recent frames, oldest first, at most [`FRAME_LOG_CAPACITY`].
    #[inline]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Remove and return the recorded frames.
    pub fn drain_frames(&mut self) -> Vec<String> {
        std::mem::take(&mut self.frames)
    }

    #[inline]
    pub fn gripper_opens(&self) -> u32 {
        self.gripper_opens
    }

    #[inline]
    pub fn link_steps(&self) -> u64 {
        self.link_steps
    }

    #[inline]
    pub fn last_sample(&self) -> EncoderSample {
        self.sample
    }

    /// Move the carriage for one sample period and count the pulses.
    fn advance(&mut self) {
        let Some(direction) = self.direction else {
            return;
        };
        let step = direction.sign() * self.travel_speed_mm_s * self.sample_dt_s;
        let next = (self.carriage_mm + step).clamp(0.0, self.max_stroke_mm);
        let moved = next - self.carriage_mm;
        self.carriage_mm = next;

        let pulses = moved * self.decoder.pulses_per_mm() + self.pulse_residual;
        let whole = pulses.trunc();
        self.pulse_residual = pulses - whole;
        self.counter = self.counter.wrapping_add(whole as i32 as u16);
    }
}

impl PositionSensor for SimulatedLift {
    fn update(&mut self) {
        self.advance();
        let raw = std::mem::take(&mut self.counter);
        self.sample = self.decoder.update(raw);
    }

    fn position(&self) -> f64 {
        self.sample.position_mm
    }

    fn speed(&self) -> f64 {
        self.sample.speed_mm_s
    }
}

impl RelayDriver for SimulatedLift {
    fn set_direction(&mut self, direction: RelayDirection) {
        if self.direction != Some(direction) {
            debug!(?direction, "relay on");
        }
        self.direction = Some(direction);
    }

    fn stop(&mut self) {
        if self.direction.is_some() {
            debug!("relay off");
        }
        self.direction = None;
    }
}

impl Gripper for SimulatedLift {
    fn open(&mut self) {
        self.gripper_opens += 1;
        info!("gripper open");
    }
}

impl LinkProcessor for SimulatedLift {
    fn process_link(&mut self) {
        self.link_steps += 1;
    }
}

impl FrameSink for SimulatedLift {
    fn send_frame(&mut self, frame: &str) {
        info!("{frame}");
        if self.frames.len() == FRAME_LOG_CAPACITY {
            self.frames.remove(0);
        }
        self.frames.push(frame.to_string());
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
