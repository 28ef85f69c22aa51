//! Collaborator traits consumed by the lift state actions.
//!
//! The state machine never touches registers. It drives the lift through
//! these narrow capabilities:
//!
//! | Trait | Capability |
//! |-------|------------|
//! | [`PositionSensor`] | sample the encoder, report position and speed |
//! | [`RelayDriver`] | drive the relay in one of two directions, or stop |
//! | [`Gripper`] | open the auxiliary gripper |
//! | [`LinkProcessor`] | run one step of the wireless link |
//! | [`FrameSink`] | emit outbound protocol frames |
//!
//! [`LiftHardware`] is the union of all of them and is implemented
//! automatically for any type providing every capability.

/// Relay drive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayDirection {
    /// Direction A: increases the measured position.
    Extend,
    /// Direction B: decreases the measured position.
    Retract,
}

impl RelayDirection {
    /// Sign of the position change produced by this direction.
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Extend => 1.0,
            Self::Retract => -1.0,
        }
    }
}

/// Position/speed sampler.
pub trait PositionSensor {
    /// Take a new sample from the encoder.
    fn update(&mut self);

    /// Position of the last sample [mm].
    fn position(&self) -> f64;

    /// Speed of the last sample [mm/s].
    fn speed(&self) -> f64;
}

/// Relay-based lift drive.
pub trait RelayDriver {
    fn set_direction(&mut self, direction: RelayDirection);

    fn stop(&mut self);
}

/// Auxiliary gripper actuator.
pub trait Gripper {
    fn open(&mut self);
}

/// Opaque per-tick wireless link step.
pub trait LinkProcessor {
    fn process_link(&mut self);
}

/// Outbound serial frame writer.
pub trait FrameSink {
    fn send_frame(&mut self, frame: &str);
}

/// Everything the lift state tree needs from the hardware.
pub trait LiftHardware: PositionSensor + RelayDriver + Gripper + LinkProcessor + FrameSink {}

impl<T> LiftHardware for T where
    T: PositionSensor + RelayDriver + Gripper + LinkProcessor + FrameSink
{
}
