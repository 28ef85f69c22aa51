//! The lift state tree driving the simulated plant.

use std::sync::Arc;

use lift_common::config::LiftConfig;
use lift_common::consts::{LIFT_END_MARKER, LIFT_START_MARKER, LIFTER_ACK_FRAME};
use lift_common::hal::{PositionSensor, RelayDirection};
use lift_control_unit::command::Mailboxes;
use lift_control_unit::cycle::CycleRunner;
use lift_control_unit::sim::SimulatedLift;
use lift_control_unit::state::{LiftContext, LiftEvent, LiftMachine, LiftState};

fn context(start: f64, target: f64) -> LiftContext<SimulatedLift> {
    let mut config = LiftConfig::default();
    config.simulation.start_position_mm = start;
    let mut ctx = LiftContext::new(SimulatedLift::new(&config));
    ctx.target_position = target;
    ctx.tolerance = 5.0;
    ctx
}

#[test]
fn idle_to_moving_to_idle() {
    let mut machine = LiftMachine::new(LiftState::Idle).unwrap();
    let mut ctx = context(0.0, 50.0);

    // Out of tolerance: Idle requests the move, the link still steps.
    machine.process(&mut ctx);
    assert_eq!(machine.current(), LiftState::Idle);
    assert_eq!(machine.pending(), Some(LiftEvent::LiftMove));
    assert_eq!(ctx.hw.link_steps(), 1);

    machine.process(&mut ctx);
    assert_eq!(machine.current(), LiftState::LiftMoving);
    assert_eq!(ctx.hw.frames(), [LIFT_START_MARKER]);
    assert_eq!(ctx.hw.direction(), Some(RelayDirection::Extend));

    let mut ticks = 0;
    while machine.current() == LiftState::LiftMoving {
        machine.process(&mut ctx);
        ticks += 1;
        assert!(ticks < 1_000, "lift never settled");
    }

    assert_eq!(machine.current(), LiftState::Idle);
    assert_eq!(ctx.hw.frames(), [LIFT_START_MARKER, LIFT_END_MARKER]);
    assert_eq!(ctx.hw.direction(), None);
    assert!((ctx.hw.position() - 50.0).abs() <= 5.0);
    assert!(machine.pending().is_none());
}

#[test]
fn moving_down_uses_retract() {
    let mut machine = LiftMachine::new(LiftState::Idle).unwrap();
    let mut ctx = context(300.0, 200.0);

    machine.process(&mut ctx);
    machine.process(&mut ctx);
    assert_eq!(ctx.hw.direction(), Some(RelayDirection::Retract));

    for _ in 0..1_000 {
        machine.process(&mut ctx);
    }
    assert_eq!(machine.current(), LiftState::Idle);
    assert!(ctx.hw.position() <= 205.0);
    assert!(ctx.hw.position() >= 195.0);
}

#[test]
fn unhandled_event_stays_pending() {
    let mut machine = LiftMachine::new(LiftState::Idle).unwrap();
    let mut ctx = context(0.0, 0.0);

    machine.trigger(LiftEvent::LiftStop);
    for _ in 0..3 {
        machine.process(&mut ctx);
        assert_eq!(machine.current(), LiftState::Idle);
        assert_eq!(machine.pending(), Some(LiftEvent::LiftStop));
    }

    // A later trigger overwrites the retained event.
    machine.trigger(LiftEvent::Error);
    machine.process(&mut ctx);
    assert_eq!(machine.current(), LiftState::Error);
    assert_eq!(ctx.hw.gripper_opens(), 1);
}

#[test]
fn error_while_moving_stops_relay_and_recovers() {
    let mut machine = LiftMachine::new(LiftState::Idle).unwrap();
    let mut ctx = context(0.0, 500.0);

    machine.process(&mut ctx);
    machine.process(&mut ctx);
    assert_eq!(ctx.hw.direction(), Some(RelayDirection::Extend));

    machine.trigger(LiftEvent::Error);
    machine.process(&mut ctx);
    assert_eq!(machine.current(), LiftState::Error);
    assert_eq!(ctx.hw.direction(), None);
    assert_eq!(ctx.hw.frames().last().map(String::as_str), Some(LIFT_END_MARKER));

    // The Ok raised by Error's entry is cleared with the transition, so the
    // relay stays off and the carriage stays put until Ok comes from outside.
    assert_eq!(machine.pending(), None);
    let parked = ctx.hw.carriage_mm();
    for _ in 0..10 {
        machine.process(&mut ctx);
    }
    assert_eq!(machine.current(), LiftState::Error);
    assert_eq!(ctx.hw.carriage_mm(), parked);

    // Back in Idle the target is still far away, so motion is requested.
    machine.trigger(LiftEvent::Ok);
    machine.process(&mut ctx);
    assert_eq!(machine.current(), LiftState::Idle);
    assert_eq!(machine.pending(), Some(LiftEvent::LiftMove));
}

#[test]
fn runner_full_round_trip() {
    let config = LiftConfig::default();
    let boxes = Arc::new(Mailboxes::new());
    let mut runner =
        CycleRunner::new(&config, SimulatedLift::new(&config), Arc::clone(&boxes)).unwrap();

    boxes.height_delta.publish(80.0);
    for _ in 0..400 {
        runner.tick();
    }
    assert_eq!(runner.state(), LiftState::Idle);
    assert!((runner.hardware().position() - 80.0).abs() <= 5.0);

    boxes.height_delta.publish(-60.0);
    for _ in 0..400 {
        runner.tick();
    }
    assert_eq!(runner.state(), LiftState::Idle);

    let frames = runner.into_hardware().drain_frames();
    assert_eq!(
        frames,
        [
            LIFT_START_MARKER,
            LIFT_END_MARKER,
            LIFTER_ACK_FRAME,
            LIFT_START_MARKER,
            LIFT_END_MARKER,
            LIFTER_ACK_FRAME,
        ]
    );
}
