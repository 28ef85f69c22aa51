//! Quadrature encoder decoding.
//!
//! The hardware counter is 16 bits wide and is read-and-reset once per
//! sampling period. A reading below [`ENCODER_FORWARD_LIMIT`] is forward
//! travel; anything above it is backward travel that wrapped the counter.

use lift_common::config::EncoderConfig;
use lift_common::consts::{ENCODER_COUNTER_RANGE, ENCODER_FORWARD_LIMIT};

/// Result of one encoder sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncoderSample {
    /// Absolute position, rounded to whole millimetres.
    pub position_mm: f64,
    /// Speed over the last sampling period [mm/s].
    pub speed_mm_s: f64,
    /// Signed pulses counted in the last period.
    pub delta: i32,
}

/// Signed pulse delta of a raw 16-bit counter reading.
#[inline]
pub const fn decode_delta(raw: u16) -> i32 {
    if raw < ENCODER_FORWARD_LIMIT {
        raw as i32
    } else {
        -((ENCODER_COUNTER_RANGE - raw as u32) as i32)
    }
}

/// Accumulates counter readings into an absolute position.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureDecoder {
    pulses_per_mm: f64,
    sampling_period_s: f64,
    total_pulses: i64,
}

impl QuadratureDecoder {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            pulses_per_mm: config.pulses_per_mm,
            sampling_period_s: f64::from(config.sampling_period_ms) / 1000.0,
            total_pulses: 0,
        }
    }

    /// Set the accumulated count to match `position_mm`.
    pub fn preset_position(&mut self, position_mm: f64) {
        self.total_pulses = (position_mm * self.pulses_per_mm).round() as i64;
    }

    #[inline]
    pub const fn total_pulses(&self) -> i64 {
        self.total_pulses
    }

    #[inline]
    pub const fn pulses_per_mm(&self) -> f64 {
        self.pulses_per_mm
    }

    /// Position implied by the accumulated count, without sampling.
    pub fn position_mm(&self) -> f64 {
        (self.total_pulses as f64 / self.pulses_per_mm).round()
    }

    /// Fold one raw counter reading into the total.
    pub fn update(&mut self, raw: u16) -> EncoderSample {
        let delta = decode_delta(raw);
        self.total_pulses += i64::from(delta);

        EncoderSample {
            position_mm: self.position_mm(),
            speed_mm_s: f64::from(delta) / self.pulses_per_mm / self.sampling_period_s,
            delta,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
