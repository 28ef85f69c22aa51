//! Prelude module for common re-exports.
//!
//! ```rust
//! use lift_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LiftConfig};
pub use crate::control::{PidConfig, PidFeatures, PidLimits, PidMode};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FSM_DEPTH, POSITION_TOLERANCE_MM, TICK_PERIOD_MS};

// ─── Hardware & Protocol ────────────────────────────────────────────
pub use crate::hal::{
    FrameSink, Gripper, LiftHardware, LinkProcessor, PositionSensor, RelayDirection, RelayDriver,
};
pub use crate::protocol::{Command, JogIntent};

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::time::{Clock, ManualClock, NonBlockingDelay, SystemClock};
