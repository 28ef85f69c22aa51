//! State machine module root.
//!
//! Generic hierarchical engine plus the lift state tree it runs.

pub mod lift;
pub mod machine;

pub use lift::{LiftContext, LiftEvent, LiftMachine, LiftState};
pub use machine::{EventSlot, Hsm, HsmError, StateBehavior, StateTree};
