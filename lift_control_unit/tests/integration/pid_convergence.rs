//! PID closed-loop behaviour on an integrating plant.
//!
//! `position += effort * dt`: the drive effort is a commanded speed [mm/s],
//! saturated at ±10 mm/s. Without anti-windup the integral collected during
//! saturation overshoots the target badly; with it the approach is clean.

use lift_common::control::{PidConfig, PidFeatures, PidLimits, PidMode};
use lift_control_unit::control::PidController;

const DT: f64 = 0.01;
const TARGET: f64 = 100.0;

fn config(features: PidFeatures) -> PidConfig {
    PidConfig {
        mode: PidMode::PI,
        features,
        kp: 2.0,
        ki: 0.5,
        kd: 0.0,
        limits: PidLimits {
            max_output: 10.0,
            ..PidLimits::default()
        },
        feedforward: 0.0,
    }
}

/// Run the loop for `ticks`; returns (final position, peak position).
fn run(pid: &mut PidController, ticks: usize) -> (f64, f64) {
    let mut position = 0.0;
    let mut peak = f64::MIN;
    for _ in 0..ticks {
        let effort = pid.calculate(TARGET, position, DT);
        position += effort * DT;
        peak = peak.max(position);
    }
    (position, peak)
}

#[test]
fn anti_windup_converges_without_overshoot() {
    let mut pid = PidController::from_config(&config(
        PidFeatures::OUTPUT_LIMIT | PidFeatures::ANTI_WINDUP,
    ));
    let (position, peak) = run(&mut pid, 5000);
    assert!((position - TARGET).abs() < 0.1, "settled at {position}");
    assert!(peak < TARGET + 0.5, "overshoot to {peak}");
}

#[test]
fn windup_overshoots_without_protection() {
    let mut plain = PidController::from_config(&config(PidFeatures::OUTPUT_LIMIT));
    let (_, plain_peak) = run(&mut plain, 5000);

    let mut protected = PidController::from_config(&config(
        PidFeatures::OUTPUT_LIMIT | PidFeatures::ANTI_WINDUP,
    ));
    let (_, protected_peak) = run(&mut protected, 5000);

    assert!(plain_peak > TARGET + 30.0, "peak {plain_peak}");
    assert!(protected_peak < plain_peak);
}

#[test]
fn rate_limited_output_ramps() {
    let mut cfg = config(PidFeatures::OUTPUT_LIMIT | PidFeatures::OUTPUT_RATE_LIMIT);
    cfg.limits.output_max_rate = 20.0;
    let mut pid = PidController::from_config(&cfg);

    let mut prev = 0.0;
    for _ in 0..100 {
        let out = pid.calculate(TARGET, 0.0, DT);
        assert!(out - prev <= 20.0 * DT + 1e-12);
        prev = out;
    }
    // 20 /s for 1 s reaches the 10.0 clamp.
    assert_eq!(prev, 10.0);
}
