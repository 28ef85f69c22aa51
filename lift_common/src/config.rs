//! Configuration loading traits and types.
//!
//! The lift controller reads a single TOML file with one table per concern.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lift_common::config::{ConfigError, LiftConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = LiftConfig::load(Path::new("config/lift.toml"))?;
//!     println!("tick period: {} ms", config.control.cycle_time_ms);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::consts::{
    ENCODER_SAMPLING_PERIOD_MS, MAX_STROKE_MM, POSITION_TOLERANCE_MM, PULSES_PER_MM,
    TICK_PERIOD_MS,
};
use crate::control::PidConfig;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Sections ───────────────────────────────────────────────────────

/// `[control]`: poll loop timing and positioning tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// Tick period [ms] (default: 10).
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u32,

    /// Position tolerance [mm] (default: 5.0).
    #[serde(default = "default_tolerance")]
    pub position_tolerance_mm: f64,

    /// Absolute target at startup [mm] (default: 0.0).
    #[serde(default)]
    pub initial_target_mm: f64,
}

fn default_cycle_time_ms() -> u32 {
    TICK_PERIOD_MS
}
fn default_tolerance() -> f64 {
    POSITION_TOLERANCE_MM
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: default_cycle_time_ms(),
            position_tolerance_mm: default_tolerance(),
            initial_target_mm: 0.0,
        }
    }
}

/// `[encoder]`: quadrature encoder scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    /// Encoder pulses per millimetre (default: 37.48).
    #[serde(default = "default_pulses_per_mm")]
    pub pulses_per_mm: f64,

    /// Sampling period used for speed estimation [ms] (default: 10).
    #[serde(default = "default_sampling_period_ms")]
    pub sampling_period_ms: u32,

    /// Mechanical stroke [mm] (default: 1000.0).
    #[serde(default = "default_max_stroke")]
    pub max_stroke_mm: f64,
}

fn default_pulses_per_mm() -> f64 {
    PULSES_PER_MM
}
fn default_sampling_period_ms() -> u32 {
    ENCODER_SAMPLING_PERIOD_MS
}
fn default_max_stroke() -> f64 {
    MAX_STROKE_MM
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            pulses_per_mm: default_pulses_per_mm(),
            sampling_period_ms: default_sampling_period_ms(),
            max_stroke_mm: default_max_stroke(),
        }
    }
}

/// `[simulation]`: host-side plant used by the binary and the tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Carriage speed while the relay is driven [mm/s] (default: 50.0).
    #[serde(default = "default_travel_speed")]
    pub travel_speed_mm_s: f64,

    /// Carriage position at power-on [mm] (default: 0.0).
    #[serde(default)]
    pub start_position_mm: f64,
}

fn default_travel_speed() -> f64 {
    50.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            travel_speed_mm_s: default_travel_speed(),
            start_position_mm: 0.0,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Complete lift controller configuration.
///
/// # TOML Example
///
/// ```toml
/// [control]
/// cycle_time_ms = 10
/// position_tolerance_mm = 5.0
///
/// [encoder]
/// pulses_per_mm = 37.48
///
/// [pid]
/// mode = "PID"
/// features = "OUTPUT_LIMIT"
/// kp = 0.8
/// ki = 0.01
/// kd = 0.5
///
/// [pid.limits]
/// max_output = 10.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LiftConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub pid: PidConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LiftConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = <Self as ConfigLoader>::load(path)?;
        config.validate()?;
        debug!("Loaded lift config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter bounds across all sections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.control;
        if c.cycle_time_ms == 0 {
            return Err(invalid("control.cycle_time_ms must be > 0"));
        }
        if !c.position_tolerance_mm.is_finite() || c.position_tolerance_mm < 0.0 {
            return Err(invalid(format!(
                "control.position_tolerance_mm must be >= 0, got {}",
                c.position_tolerance_mm
            )));
        }
        if !c.initial_target_mm.is_finite() {
            return Err(invalid("control.initial_target_mm must be finite"));
        }

        let e = &self.encoder;
        if !e.pulses_per_mm.is_finite() || e.pulses_per_mm <= 0.0 {
            return Err(invalid(format!(
                "encoder.pulses_per_mm must be > 0, got {}",
                e.pulses_per_mm
            )));
        }
        if e.sampling_period_ms == 0 {
            return Err(invalid("encoder.sampling_period_ms must be > 0"));
        }
        if !e.max_stroke_mm.is_finite() || e.max_stroke_mm <= 0.0 {
            return Err(invalid(format!(
                "encoder.max_stroke_mm must be > 0, got {}",
                e.max_stroke_mm
            )));
        }

        let s = &self.simulation;
        if !s.travel_speed_mm_s.is_finite() || s.travel_speed_mm_s < 0.0 {
            return Err(invalid(format!(
                "simulation.travel_speed_mm_s must be >= 0, got {}",
                s.travel_speed_mm_s
            )));
        }
        if !(0.0..=e.max_stroke_mm).contains(&s.start_position_mm) {
            return Err(invalid(format!(
                "simulation.start_position_mm {} outside stroke [0, {}]",
                s.start_position_mm, e.max_stroke_mm
            )));
        }

        self.pid.validate().map_err(ConfigError::ValidationError)
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}
