//! Configurable PID controller.
//!
//! Each [`PidFeatures`] flag enables exactly one step of the evaluation order
//! in [`PidController::calculate`]; a cleared flag skips that step and leaves
//! every other step untouched. Zero `dt` selects the discrete fallback
//! (integral accumulates raw error, derivative contributes nothing).

use lift_common::control::{PidConfig, PidFeatures, PidLimits, PidMode};

/// Gains below this magnitude disable the back-calculation correction.
const EPSILON: f64 = 1e-6;

/// Internal state of the PID controller.
///
/// Mutated only by [`PidController::calculate`], zeroed only by
/// [`PidState::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Last committed output.
    output: f64,
    /// Integral accumulator.
    integral: f64,
    /// Previous error (derivative on error).
    prev_error: f64,
    /// Filtered derivative.
    filtered_derivative: f64,
    /// Previous committed output (conditional integration, slew limit).
    prev_output: f64,
    /// Previous measurement (derivative on measurement).
    prev_measurement: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// PID gains.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// PID controller with mode/feature selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidController {
    mode: PidMode,
    features: PidFeatures,
    gains: PidGains,
    limits: PidLimits,
    feedforward: f64,
    state: PidState,
}

impl PidController {
    /// New controller with zero gains and limits.
    pub fn new(mode: PidMode, features: PidFeatures) -> Self {
        Self {
            mode,
            features,
            gains: PidGains::default(),
            limits: PidLimits::default(),
            feedforward: 0.0,
            state: PidState::default(),
        }
    }

    /// Build a controller from a configuration record.
    pub fn from_config(config: &PidConfig) -> Self {
        let mut pid = Self::new(config.mode, config.features);
        pid.set_gains(config.kp, config.ki, config.kd);
        pid.set_limits(config.limits);
        pid.set_feedforward(config.feedforward);
        pid
    }

    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.gains = PidGains { kp, ki, kd };
    }

    pub fn set_limits(&mut self, limits: PidLimits) {
        self.limits = limits;
    }

    pub fn set_feedforward(&mut self, value: f64) {
        self.feedforward = value;
    }

    pub fn set_mode(&mut self, mode: PidMode) {
        self.mode = mode;
    }

    pub fn set_features(&mut self, features: PidFeatures) {
        self.features = features;
    }

    #[inline]
    pub const fn mode(&self) -> PidMode {
        self.mode
    }

    #[inline]
    pub const fn features(&self) -> PidFeatures {
        self.features
    }

    #[inline]
    pub const fn gains(&self) -> PidGains {
        self.gains
    }

    /// Last committed output.
    #[inline]
    pub const fn output(&self) -> f64 {
        self.state.output
    }

    /// Integral accumulator.
    #[inline]
    pub const fn integral(&self) -> f64 {
        self.state.integral
    }

    #[inline]
    pub const fn state(&self) -> &PidState {
        &self.state
    }

    /// Zero the internal state. Gains, mode, features and limits are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Compute one control step.
    ///
    /// # Arguments
    /// - `target`: Setpoint.
    /// - `actual`: Measurement.
    /// - `dt`: Elapsed time [s]; `<= 0` selects the discrete fallback.
    pub fn calculate(&mut self, target: f64, actual: f64, dt: f64) -> f64 {
        let g = self.gains;
        let l = self.limits;
        let s = &mut self.state;
        let features = self.features;
        let mode = self.mode;

        // ── Error ───────────────────────────────────────────────
        let mut error = target - actual;
        if features.contains(PidFeatures::DEADBAND) && error.abs() < l.deadband {
            error = 0.0;
        }

        let mut out = 0.0;

        // ── P term ──────────────────────────────────────────────
        if mode.contains(PidMode::P) {
            out += g.kp * error;
        }

        // ── I term ──────────────────────────────────────────────
        if mode.contains(PidMode::I) {
            let saturated = features.contains(PidFeatures::ANTI_WINDUP)
                && ((s.prev_output >= l.max_output && error > 0.0)
                    || (s.prev_output <= -l.max_output && error < 0.0));
            if !saturated {
                s.integral += if dt > 0.0 { error * dt } else { error };
            }

            let separated = features.contains(PidFeatures::INTEGRAL_SEPARATION)
                && error.abs() > l.integral_separation;
            if !separated {
                out += g.ki * s.integral;
            }
        }

        // ── D term ──────────────────────────────────────────────
        if mode.contains(PidMode::D) {
            let mut diff = if features.contains(PidFeatures::DERIVATIVE_ON_MEASUREMENT) {
                let d = if dt > 0.0 {
                    -(actual - s.prev_measurement) / dt
                } else {
                    0.0
                };
                s.prev_measurement = actual;
                d
            } else {
                let d = if dt > 0.0 {
                    (error - s.prev_error) / dt
                } else {
                    0.0
                };
                s.prev_error = error;
                d
            };

            if features.contains(PidFeatures::DERIVATIVE_FILTER) {
                let alpha = l.derivative_filter_alpha;
                diff = alpha * diff + (1.0 - alpha) * s.filtered_derivative;
                s.filtered_derivative = diff;
            }

            out += g.kd * diff;
        }

        // ── Feedforward ─────────────────────────────────────────
        if features.contains(PidFeatures::FEEDFORWARD) {
            out += self.feedforward;
        }

        let raw = out;

        // ── Output stage ────────────────────────────────────────
        if features.contains(PidFeatures::OUTPUT_LIMIT) {
            // Plain comparisons: unvalidated limits never fault.
            let max = l.max_output;
            out = if out > max {
                max
            } else if out < -max {
                -max
            } else {
                out
            };
        }

        if features.contains(PidFeatures::OUTPUT_RATE_LIMIT) && dt > 0.0 {
            let max_step = l.output_max_rate * dt;
            let step = out - s.prev_output;
            if step > max_step {
                out = s.prev_output + max_step;
            } else if step < -max_step {
                out = s.prev_output - max_step;
            }
        }

        // ── Back-calculation ────────────────────────────────────
        if mode.contains(PidMode::I)
            && features.contains(PidFeatures::ANTI_WINDUP | PidFeatures::OUTPUT_LIMIT)
            && g.kp.abs() > EPSILON
            && g.ki.abs() > EPSILON
        {
            s.integral -= (raw - out) * (g.ki / g.kp) * dt;
        }

        s.output = out;
        s.prev_output = out;
        out
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(PidMode::PID, PidFeatures::empty())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
