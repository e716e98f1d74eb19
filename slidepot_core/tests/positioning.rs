use proptest::prelude::*;
use slidepot_core::error::classify;
use slidepot_core::{ActuatorError, PositionCfg, SensorCfg, SlidePotController};
use slidepot_hardware::{SimParams, SimulatedActuator, SimulatedMotor, SimulatedSensor};
use slidepot_traits::ManualClock;
use std::sync::Arc;
use std::time::Duration;

type SimController = SlidePotController<SimulatedMotor, SimulatedSensor>;

fn rig_with(params: SimParams, position: PositionCfg) -> (ManualClock, SimulatedActuator, SimController) {
    let clock = ManualClock::new();
    let sim = SimulatedActuator::new(params, clock.clone());
    let ctl = SlidePotController::builder()
        .with_motor(sim.motor())
        .with_sensor(sim.sensor())
        .with_clock(clock.clone())
        .with_position_cfg(position)
        .with_sensor_cfg(SensorCfg {
            averaged_samples: 1,
            ..SensorCfg::default()
        })
        .try_build()
        .unwrap();
    (clock, sim, ctl)
}

fn calibrated(params: SimParams, position: PositionCfg) -> (ManualClock, SimulatedActuator, SimController) {
    let (clock, sim, mut ctl) = rig_with(params, position);
    ctl.calibrate(20, 0.05, Duration::from_millis(100)).unwrap();
    (clock, sim, ctl)
}

fn travel(forward_ms: u64, backward_ms: u64) -> SimParams {
    SimParams {
        forward_travel: Duration::from_millis(forward_ms),
        backward_travel: Duration::from_millis(backward_ms),
        ..SimParams::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn converges_within_tolerance(
        forward_ms in 600u64..3000,
        backward_ms in 600u64..3000,
        target in 0.2f32..3.1,
        tol in 0.05f32..0.5,
    ) {
        let (_clock, sim, mut ctl) = calibrated(travel(forward_ms, backward_ms), PositionCfg::default());
        ctl.slide_to_voltage(target, tol).unwrap();
        prop_assert!((sim.voltage() - target).abs() <= tol, "v={} target={}", sim.voltage(), target);
        prop_assert!(!sim.is_energized());
    }
}

#[test]
fn successive_targets_are_reached() {
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    for target in [1.0f32, 2.5, 0.4, 3.0, 1.65] {
        ctl.slide_to_voltage(target, 0.1).unwrap();
        assert!((sim.voltage() - target).abs() <= 0.1, "target {target}");
        assert!((ctl.state().current_voltage - target).abs() <= 0.1);
    }
}

#[test]
fn noisy_averaged_readings_still_converge() {
    let clock = ManualClock::new();
    let params = SimParams {
        noise_v: 0.02,
        ..travel(1200, 1200)
    };
    let sim = SimulatedActuator::new(params, clock.clone());
    let mut ctl = SlidePotController::builder()
        .with_motor(sim.motor())
        .with_sensor(sim.sensor())
        .with_clock(clock)
        .with_sensor_cfg(SensorCfg {
            averaged_samples: 8,
            ..SensorCfg::default()
        })
        .try_build()
        .unwrap();
    ctl.calibrate(20, 0.05, Duration::from_millis(100)).unwrap();

    for target in [0.8f32, 2.6, 1.65] {
        ctl.slide_to_voltage(target, 0.1).unwrap();
        assert!((ctl.state().current_voltage - target).abs() <= 0.1, "target {target}");
        // The accepted reading may be off by at most the noise amplitude.
        assert!((sim.voltage() - target).abs() <= 0.12, "target {target}");
        assert!(!sim.is_energized());
    }
}

#[test]
fn interrupt_stops_positioning_before_the_next_pulse() {
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    let before = sim.drive_commands();
    ctl.set_interrupt_check(Some(Arc::new(|| true)));
    let err = ctl.slide_to_voltage(0.5, 0.05).unwrap_err();
    assert_eq!(classify(&err), Some(&ActuatorError::Interrupted));
    assert_eq!(sim.drive_commands(), before);
    assert!(!sim.is_energized());

    ctl.set_interrupt_check(None);
    ctl.slide_to_voltage(0.5, 0.05).unwrap();
}

#[test]
fn inverted_wiring_still_converges() {
    let params = SimParams {
        backward_voltage: 3.3,
        forward_voltage: 0.0,
        ..travel(1200, 1200)
    };
    let (_clock, sim, mut ctl) = calibrated(params, PositionCfg::default());
    assert!(ctl.calibration().unwrap().forward_effect < 0.0);
    ctl.slide_to_voltage(1.0, 0.05).unwrap();
    assert!((sim.voltage() - 1.0).abs() <= 0.05);
}

#[test]
fn exhausted_iterations_fail_and_leave_motor_coasting() {
    let position = PositionCfg {
        max_iterations: 1,
        ..PositionCfg::default()
    };
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), position);
    // From the backward extreme a single 0.8-gain pulse stops short of 3.0 V.
    let err = ctl.slide_to_voltage(3.0, 0.05).unwrap_err();
    match classify(&err) {
        Some(ActuatorError::Convergence {
            iterations: 1,
            target_v,
            ..
        }) => assert!((target_v - 3.0).abs() < 1e-6),
        other => panic!("expected Convergence, got {other:?}"),
    }
    assert!(!sim.is_energized());
}

#[test]
fn closed_loop_requires_calibration() {
    let (_clock, sim, mut ctl) = rig_with(SimParams::default(), PositionCfg::default());
    let err = ctl.slide_to_voltage(1.0, 0.1).unwrap_err();
    assert_eq!(classify(&err), Some(&ActuatorError::NotCalibrated));
    assert_eq!(sim.drive_commands(), 0);
}

#[test]
fn bad_tolerance_is_invalid_input() {
    let (_clock, _sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    for tol in [-0.1f32, f32::NAN, f32::INFINITY] {
        let err = ctl.slide_to_voltage(1.0, tol).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(ActuatorError::InvalidInput(_))
        ));
    }
}

#[test]
fn out_of_range_target_is_clamped_to_extreme() {
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    ctl.slide_to_voltage(100.0, 0.1).unwrap();
    assert!(sim.voltage() >= 3.2);
    ctl.slide_to_voltage(-5.0, 0.1).unwrap();
    assert!(sim.voltage() <= 0.1);
}

#[test]
fn slide_forward_is_idempotent_at_extreme() {
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    ctl.slide_forward().unwrap();
    assert_eq!(sim.position(), 1.0);
    ctl.slide_forward().unwrap();
    assert_eq!(sim.position(), 1.0);
    assert!(!sim.is_energized());
}

#[test]
fn uncalibrated_slide_uses_configured_time() {
    let position = PositionCfg {
        uncalibrated_slide: Duration::from_millis(2000),
        ..PositionCfg::default()
    };
    let (clock, sim, mut ctl) = rig_with(travel(1200, 1200), position);
    ctl.slide_backward().unwrap();
    assert_eq!(clock.elapsed(), Duration::from_millis(2000));
    assert_eq!(sim.position(), 0.0);
    assert!(!sim.is_energized());
}

#[test]
fn calibrated_slide_adds_margin() {
    let (clock, _sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    let slide = ctl.calibration().unwrap().min_forward_slide;
    let before = clock.elapsed();
    ctl.slide_forward().unwrap();
    assert_eq!(clock.elapsed() - before, slide + Duration::from_millis(250));
}

#[test]
fn drive_fault_is_a_drive_failure() {
    let (_clock, sim, mut ctl) = calibrated(travel(1200, 1200), PositionCfg::default());
    sim.set_drive_fault(true);
    let err = ctl.slide_forward().unwrap_err();
    assert!(matches!(classify(&err), Some(ActuatorError::Drive(_))));
    let err = ctl.slide_to_voltage(2.0, 0.1).unwrap_err();
    assert!(matches!(classify(&err), Some(ActuatorError::Drive(_))));
    assert!(!sim.is_energized());
}
