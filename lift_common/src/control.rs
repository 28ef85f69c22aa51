//! PID configuration types shared between the controller and the config loader.
//!
//! The mode and feature sets are `bitflags` types so every combination is a
//! typed value. Both serialize as `"P | I | D"` style strings in TOML.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Active PID terms.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PidMode: u8 {
        /// Proportional term.
        const P   = 0b100;
        /// Integral term.
        const I   = 0b010;
        /// Derivative term.
        const D   = 0b001;
        const PI  = Self::P.bits() | Self::I.bits();
        const PD  = Self::P.bits() | Self::D.bits();
        const PID = Self::P.bits() | Self::I.bits() | Self::D.bits();
    }
}

impl Default for PidMode {
    fn default() -> Self {
        Self::PID
    }
}

bitflags! {
    /// Optional PID behaviours. Each flag is independent; clearing one skips
    /// exactly its step of the evaluation order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PidFeatures: u8 {
        /// Clamp output to `±max_output`.
        const OUTPUT_LIMIT              = 1 << 0;
        /// Drop the integral contribution while `|error|` is large.
        const INTEGRAL_SEPARATION       = 1 << 1;
        /// Treat `|error| < deadband` as zero.
        const DEADBAND                  = 1 << 2;
        /// One-pole low-pass on the derivative.
        const DERIVATIVE_FILTER         = 1 << 3;
        /// Derivative of the measurement instead of the error.
        const DERIVATIVE_ON_MEASUREMENT = 1 << 4;
        /// Conditional integration plus back-calculation.
        const ANTI_WINDUP               = 1 << 5;
        /// Limit output slew rate.
        const OUTPUT_RATE_LIMIT         = 1 << 6;
        /// Add a constant feedforward value.
        const FEEDFORWARD               = 1 << 7;
    }
}

impl Default for PidFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Tuning limits of a PID controller.
///
/// A limit only has an effect while its feature flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PidLimits {
    /// Output clamp and anti-windup saturation bound.
    #[serde(default)]
    pub max_output: f64,
    /// Integral separation threshold on `|error|`.
    #[serde(default)]
    pub integral_separation: f64,
    /// Error deadband.
    #[serde(default)]
    pub deadband: f64,
    /// Derivative filter coefficient α in `[0, 1]` (1 = unfiltered).
    #[serde(default)]
    pub derivative_filter_alpha: f64,
    /// Maximum output change per second.
    #[serde(default)]
    pub output_max_rate: f64,
}

/// Complete PID configuration record.
///
/// # TOML Example
///
/// ```toml
/// [pid]
/// mode = "PID"
/// features = "OUTPUT_LIMIT | ANTI_WINDUP | DERIVATIVE_FILTER"
/// kp = 2.0
/// ki = 0.5
/// kd = 0.1
///
/// [pid.limits]
/// max_output = 1000.0
/// derivative_filter_alpha = 0.3
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PidConfig {
    #[serde(default)]
    pub mode: PidMode,
    #[serde(default)]
    pub features: PidFeatures,
    #[serde(default)]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    #[serde(default)]
    pub limits: PidLimits,
    /// Constant feedforward value (used with `FEEDFORWARD`).
    #[serde(default)]
    pub feedforward: f64,
}

impl PidConfig {
    /// Validate gains and limits.
    pub fn validate(&self) -> Result<(), String> {
        let gains = [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)];
        for (name, value) in gains {
            if !value.is_finite() {
                return Err(format!("pid.{name} must be finite, got {value}"));
            }
        }

        let l = &self.limits;
        let limits = [
            ("max_output", l.max_output),
            ("integral_separation", l.integral_separation),
            ("deadband", l.deadband),
            ("output_max_rate", l.output_max_rate),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "pid.limits.{name} must be finite and >= 0, got {value}"
                ));
            }
        }

        if !(0.0..=1.0).contains(&l.derivative_filter_alpha) {
            return Err(format!(
                "pid.limits.derivative_filter_alpha must be in [0, 1], got {}",
                l.derivative_filter_alpha
            ));
        }

        if self.features.contains(PidFeatures::OUTPUT_LIMIT) && l.max_output == 0.0 {
            return Err("pid.limits.max_output must be > 0 with OUTPUT_LIMIT".to_string());
        }

        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
