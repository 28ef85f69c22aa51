//! Control engine root.
//!
//! Configurable PID used to turn a target/measurement pair into a drive
//! effort. Independent of the state machine.

pub mod pid;

pub use pid::{PidController, PidGains, PidState};
