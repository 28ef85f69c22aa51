//! System-wide constants for the lift workspace.
//!
//! Single source of truth for numeric limits, protocol literals and default
//! paths. Imported by all crates, no duplication permitted.

use static_assertions::const_assert;

/// Maximum nesting depth of any state tree run by the state machine engine.
///
/// Sizes the fixed-capacity entry path buffer.
pub const FSM_DEPTH: usize = 5;

/// Default control tick period in milliseconds (100 Hz).
pub const TICK_PERIOD_MS: u32 = 10;

/// Default position tolerance around the target [mm].
pub const POSITION_TOLERANCE_MM: f64 = 5.0;

/// Measured encoder pulses per millimetre of lift travel.
pub const PULSES_PER_MM: f64 = 37.48;

/// Encoder sampling period in milliseconds.
pub const ENCODER_SAMPLING_PERIOD_MS: u32 = 10;

/// Maximum mechanical stroke of the lift [mm].
pub const MAX_STROKE_MM: f64 = 1000.0;

/// Full range of the 16-bit hardware encoder counter.
pub const ENCODER_COUNTER_RANGE: u32 = 65536;

/// Counter readings below this value are forward deltas; the rest wrap backwards.
pub const ENCODER_FORWARD_LIMIT: u16 = 32767;

/// Serial receive buffer capacity for text frames.
pub const RX_BUFFER_SIZE: usize = 50;

/// Prefix of the relative height adjustment frame.
pub const LIFTER_FRAME_PREFIX: &[u8] = b"$LIFTER:";

/// Completion acknowledgement frame.
pub const LIFTER_ACK_FRAME: &str = "$LIFTER:OK#";

/// Marker emitted when the lift starts moving.
pub const LIFT_START_MARKER: &str = "$LIFT:START#";

/// Marker emitted when the lift stops moving.
pub const LIFT_END_MARKER: &str = "$LIFT:END#";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/lift.toml";

// A text frame must fit the prefix, at least one digit and the terminator.
const_assert!(RX_BUFFER_SIZE > LIFTER_FRAME_PREFIX.len() + 1);
const_assert!(FSM_DEPTH > 0);
