//! Serial bytes through the receiver into the cycle runner.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use lift_common::config::LiftConfig;
use lift_common::consts::LIFTER_ACK_FRAME;
use lift_common::hal::RelayDirection;
use lift_common::protocol::{JogIntent, absolute_target_frame, height_adjust_frame};
use lift_control_unit::command::{Mailboxes, SerialReceiver};
use lift_control_unit::cycle::CycleRunner;
use lift_control_unit::sim::SimulatedLift;
use lift_control_unit::state::LiftState;

fn setup() -> (SerialReceiver, CycleRunner<SimulatedLift>) {
    let config = LiftConfig::default();
    let boxes = Arc::new(Mailboxes::new());
    let rx = SerialReceiver::new(Arc::clone(&boxes));
    let runner = CycleRunner::new(&config, SimulatedLift::new(&config), boxes).unwrap();
    (rx, runner)
}

fn run_until_idle(runner: &mut CycleRunner<SimulatedLift>, max_ticks: usize) {
    // Give the machine a chance to leave Idle first.
    runner.tick();
    runner.tick();
    for _ in 0..max_ticks {
        if runner.state() == LiftState::Idle {
            return;
        }
        runner.tick();
    }
    panic!("lift still {:?} after {max_ticks} ticks", runner.state());
}

#[test]
fn height_frame_moves_lift_and_acknowledges() {
    let (mut rx, mut runner) = setup();

    assert_eq!(rx.feed(height_adjust_frame(40.0).as_bytes()), 1);
    run_until_idle(&mut runner, 500);
    runner.tick();

    assert_eq!(runner.target(), 40.0);
    assert!(runner.hardware().frames().iter().any(|f| f == LIFTER_ACK_FRAME));
}

#[test]
fn absolute_frame_sets_target_without_ack() {
    let (mut rx, mut runner) = setup();

    let frame = absolute_target_frame(120).unwrap();
    assert_eq!(rx.feed(&frame), 1);
    run_until_idle(&mut runner, 1_000);

    assert_eq!(runner.target(), 120.0);
    assert!(!runner.hardware().frames().iter().any(|f| f == LIFTER_ACK_FRAME));
}

#[test]
fn noise_between_frames_is_ignored() {
    let (mut rx, mut runner) = setup();

    let mut bytes = b"garbage$OTHER:1#".to_vec();
    bytes.extend_from_slice(&[0x0F, 1, 0x20, 0x1F]);
    bytes.extend_from_slice(b"$LIFTER:15#");
    assert_eq!(rx.feed(&bytes), 1);

    runner.tick();
    assert_eq!(runner.target(), 15.0);
}

#[test]
fn jog_bytes_override_automatic_control() {
    let (mut rx, mut runner) = setup();

    rx.feed(&[JogIntent::Up.as_byte()]);
    let report = runner.tick();
    assert_eq!(report.jog, JogIntent::Up);
    assert_eq!(runner.hardware().direction(), Some(RelayDirection::Extend));

    for _ in 0..20 {
        runner.tick();
    }
    assert!(runner.hardware().carriage_mm() > 0.0);

    rx.feed(&[JogIntent::Stop.as_byte()]);
    runner.tick();
    assert_eq!(runner.hardware().direction(), None);
}

#[test]
fn receiver_thread_feeds_poll_loop() {
    let (mut rx, mut runner) = setup();
    let boxes = Arc::clone(runner.mailboxes());

    let reader = thread::spawn(move || {
        let running = AtomicBool::new(true);
        rx.pump(&b"$LIFTER:25#"[..], &running).unwrap();
    });
    reader.join().unwrap();

    assert!(runner.poll().is_none());
    boxes.tick.raise();
    let report = runner.poll().unwrap();
    assert_eq!(report.target, 25.0);
}
