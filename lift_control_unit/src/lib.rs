//! # Lift Control Unit Library
//!
//! Control core of a relay-driven lift actuator: a hierarchical state
//! machine engine running the lift state tree, a configurable PID, the
//! serial command intake and a polling cycle runner.
//!
//! ## Data Flow
//!
//! 1. A ticker raises the tick flag once per period.
//! 2. The serial receiver decodes commands into lock-free mailboxes.
//! 3. [`cycle::CycleRunner::poll`] consumes the mailboxes, steps the state
//!    machine, applies the manual override and computes the PID effort.
//!
//! [`sim::SimulatedLift`] implements the hardware traits for host runs.

pub mod command;
pub mod control;
pub mod cycle;
pub mod encoder;
pub mod error;
pub mod sim;
pub mod state;
