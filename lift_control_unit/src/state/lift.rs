//! Lift state tree.
//!
//! ```text
//! Normal ─┬─ Idle          Error
//!         └─ LiftMoving
//! ```
//!
//! `Normal` steps the wireless link and samples the encoder every tick.
//! `Idle` requests motion once the target is out of tolerance; `LiftMoving`
//! drives the relay until it is back in tolerance. `Error` stops the relay
//! and opens the gripper. Its entry requests `Ok`, but the engine clears
//! events raised during a transition, so `Error` holds until `Ok` is
//! triggered again from outside.

use lift_common::consts::{FSM_DEPTH, LIFT_END_MARKER, LIFT_START_MARKER, POSITION_TOLERANCE_MM};
use lift_common::hal::{LiftHardware, RelayDirection};
use static_assertions::const_assert;

use super::machine::{EventSlot, Hsm, StateBehavior, StateTree};

/// Lift control states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiftState {
    /// Super-state of normal operation.
    Normal,
    /// Within tolerance of the target.
    Idle,
    /// Relay driven towards the target.
    LiftMoving,
    /// Fault handling.
    Error,
}

/// Lift events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiftEvent {
    Ok,
    Error,
    LiftMove,
    LiftStop,
}

impl LiftState {
    pub const ALL: [Self; 4] = [Self::Normal, Self::Idle, Self::LiftMoving, Self::Error];

    pub const fn parent_of(self) -> Option<Self> {
        match self {
            Self::Idle | Self::LiftMoving => Some(Self::Normal),
            Self::Normal | Self::Error => None,
        }
    }

    /// Deepest level count of the lift tree.
    pub const TREE_DEPTH: usize = {
        let mut max = 0;
        let mut i = 0;
        while i < Self::ALL.len() {
            let mut levels = 1;
            let mut state = Self::ALL[i];
            while let Some(parent) = state.parent_of() {
                levels += 1;
                state = parent;
            }
            if levels > max {
                max = levels;
            }
            i += 1;
        }
        max
    };
}

const_assert!(LiftState::TREE_DEPTH <= FSM_DEPTH);

impl StateTree for LiftState {
    type Event = LiftEvent;
    const STATES: &'static [Self] = &Self::ALL;

    fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Idle => "Idle",
            Self::LiftMoving => "LiftMoving",
            Self::Error => "Error",
        }
    }

    fn parent(self) -> Option<Self> {
        self.parent_of()
    }

    fn handle_event(self, event: LiftEvent) -> Option<Self> {
        use LiftEvent as E;
        use LiftState::*;

        match (self, event) {
            (Normal, E::Error) => Some(Error),
            (Idle, E::LiftMove) => Some(LiftMoving),
            (LiftMoving, E::LiftStop) => Some(Idle),
            (Error, E::Ok) => Some(Idle),
            _ => None,
        }
    }
}

/// Data the lift states act on.
#[derive(Debug)]
pub struct LiftContext<H> {
    pub hw: H,
    /// Absolute target [mm].
    pub target_position: f64,
    /// Dead zone around the target [mm].
    pub tolerance: f64,
}

impl<H> LiftContext<H> {
    pub fn new(hw: H) -> Self {
        Self {
            hw,
            target_position: 0.0,
            tolerance: POSITION_TOLERANCE_MM,
        }
    }
}

impl<H: LiftHardware> LiftContext<H> {
    /// Signed distance from the last sampled position to the target.
    #[inline]
    pub fn position_error(&self) -> f64 {
        self.target_position - self.hw.position()
    }

    #[inline]
    pub fn in_tolerance(&self) -> bool {
        self.position_error().abs() <= self.tolerance
    }
}

impl<H: LiftHardware> StateBehavior<LiftContext<H>> for LiftState {
    fn action(self, ctx: &mut LiftContext<H>, events: &mut EventSlot<LiftEvent>) {
        match self {
            Self::Normal => {
                ctx.hw.process_link();
                ctx.hw.update();
            }
            Self::Idle => {
                if !ctx.in_tolerance() {
                    events.trigger(LiftEvent::LiftMove);
                }
            }
            Self::LiftMoving => {
                let diff = ctx.position_error();
                if diff > ctx.tolerance {
                    ctx.hw.set_direction(RelayDirection::Extend);
                } else if diff < -ctx.tolerance {
                    ctx.hw.set_direction(RelayDirection::Retract);
                } else {
                    ctx.hw.stop();
                    events.trigger(LiftEvent::LiftStop);
                }
            }
            Self::Error => {}
        }
    }

    fn entry(self, ctx: &mut LiftContext<H>, events: &mut EventSlot<LiftEvent>) {
        match self {
            Self::LiftMoving => ctx.hw.send_frame(LIFT_START_MARKER),
            Self::Error => {
                ctx.hw.stop();
                ctx.hw.open();
                events.trigger(LiftEvent::Ok);
            }
            Self::Normal | Self::Idle => {}
        }
    }

    fn exit(self, ctx: &mut LiftContext<H>, _events: &mut EventSlot<LiftEvent>) {
        match self {
            Self::LiftMoving => ctx.hw.send_frame(LIFT_END_MARKER),
            Self::Normal | Self::Idle | Self::Error => {}
        }
    }
}

/// The lift machine.
pub type LiftMachine = Hsm<LiftState, FSM_DEPTH>;

// ─── Tests ──────────────────────────────────────────────────────────
