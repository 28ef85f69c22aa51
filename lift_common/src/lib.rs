//! Lift Common Library
//!
//! Shared constants, configuration, time source and hardware traits for the
//! lift controller workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide constants and protocol literals
//! - [`config`] - Configuration loading traits and types
//! - [`control`] - PID mode/feature flags and tuning records
//! - [`hal`] - Collaborator traits the state actions drive
//! - [`protocol`] - Serial command types and frame encoders
//! - [`time`] - Wrapping tick counters, timeouts and non-blocking delays
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lift_common::prelude::*;
//!
//! let config = LiftConfig::default();
//! assert_eq!(config.control.cycle_time_ms, TICK_PERIOD_MS);
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod hal;
pub mod prelude;
pub mod protocol;
pub mod time;
