//! Start-up sequence and controller thread lifecycle.

use slidepot_core::error::classify;
use slidepot_core::mocks::{CountingMotor, UnavailableSensor};
use slidepot_core::runner::{self, RunOptions};
use slidepot_core::{
    ActuatorError, CalibrationCfg, ControllerThread, MonitorCfg, MonitorMode, MonitorState,
    SensorCfg, SlidePotController,
};
use slidepot_hardware::{SimParams, SimulatedActuator, SimulatedMotor, SimulatedSensor};
use slidepot_traits::ManualClock;
use std::time::Duration;

fn quick_calibration() -> CalibrationCfg {
    CalibrationCfg {
        sample_count: 20,
        voltage_tolerance: 0.05,
        settle: Duration::from_millis(100),
        ..CalibrationCfg::default()
    }
}

fn sim_controller(
    clock: &ManualClock,
) -> (SimulatedActuator, SlidePotController<SimulatedMotor, SimulatedSensor>) {
    let sim = SimulatedActuator::new(SimParams::default(), clock.clone());
    let ctl = SlidePotController::builder()
        .with_motor(sim.motor())
        .with_sensor(sim.sensor())
        .with_clock(clock.clone())
        .with_calibration_cfg(quick_calibration())
        .with_sensor_cfg(SensorCfg {
            averaged_samples: 1,
            ..SensorCfg::default()
        })
        .try_build()
        .unwrap();
    (sim, ctl)
}

fn opts(max_cycles: u64) -> RunOptions {
    RunOptions {
        calibrate: true,
        monitor: MonitorCfg {
            dwell: Duration::from_millis(100),
            ..MonitorCfg::default()
        },
        max_cycles: Some(max_cycles),
    }
}

#[test]
fn run_waits_calibrates_then_cycles() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    let (tx, rx) = crossbeam_channel::unbounded();
    runner::run(ctl, &opts(2), Some(tx), || false).unwrap();

    // Five-second start-up delay before anything moves.
    assert!(clock.elapsed() > Duration::from_secs(5));
    let reports: Vec<_> = rx.try_iter().collect();
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].state, MonitorState::DrivingForward);
    assert!(!sim.is_energized());
}

#[test]
fn shutdown_before_calibration_moves_nothing() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    runner::run(ctl, &opts(5), None, || true).unwrap();
    assert_eq!(sim.drive_commands(), 0);
}

#[test]
fn shutdown_during_startup_delay_moves_nothing() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    let watch = clock.clone();
    runner::run(ctl, &opts(5), None, move || {
        watch.elapsed() >= Duration::from_secs(2)
    })
    .unwrap();
    assert_eq!(sim.drive_commands(), 0);
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}

#[test]
fn shutdown_mid_calibration_returns_promptly_and_coasts() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    let watch = clock.clone();
    // Five seconds of delay, then 700 ms into the homing pass.
    runner::run(ctl, &opts(5), None, move || {
        watch.elapsed() >= Duration::from_millis(5700)
    })
    .unwrap();
    assert_eq!(sim.drive_commands(), 1);
    assert!(!sim.is_energized());
    assert!(clock.elapsed() < Duration::from_secs(6));
}

#[test]
fn unavailable_sensor_degrades_to_uncalibrated_cycling() {
    let ctl = SlidePotController::builder()
        .with_motor(CountingMotor::default())
        .with_sensor(UnavailableSensor)
        .with_clock(ManualClock::new())
        .try_build()
        .unwrap();
    runner::run(ctl, &opts(3), None, || false).unwrap();
}

#[test]
fn unavailable_sensor_is_fatal_in_hold_mode() {
    let ctl = SlidePotController::builder()
        .with_motor(CountingMotor::default())
        .with_sensor(UnavailableSensor)
        .with_clock(ManualClock::new())
        .try_build()
        .unwrap();
    let mut o = opts(3);
    o.monitor.mode = MonitorMode::Hold { target: 1.0 };
    let err = runner::run(ctl, &o, None, || false).unwrap_err();
    assert!(matches!(
        classify(&err),
        Some(ActuatorError::SensorUnavailable(_))
    ));
}

#[test]
fn controller_thread_runs_to_completion() {
    let clock = ManualClock::new();
    let (_sim, ctl) = sim_controller(&clock);
    let thread = ControllerThread::spawn(ctl, opts(3)).unwrap();
    let reports = thread.reports().clone();
    thread.join().unwrap();
    assert_eq!(reports.try_iter().count(), 6);
}

#[test]
fn controller_thread_surfaces_fatal_error() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    sim.set_drive_fault(true);
    let thread = ControllerThread::spawn(ctl, opts(3)).unwrap();
    let err = thread.join().unwrap_err();
    assert!(matches!(classify(&err), Some(ActuatorError::Drive(_))));
}

#[test]
fn dropping_the_handle_stops_the_thread() {
    let clock = ManualClock::new();
    let (sim, ctl) = sim_controller(&clock);
    let o = RunOptions {
        max_cycles: None,
        ..opts(0)
    };
    let thread = ControllerThread::spawn(ctl, o).unwrap();
    // Wait for the first report so the monitor is running.
    let first = thread.reports().recv_timeout(Duration::from_secs(10));
    assert!(first.is_ok());
    thread.request_shutdown();
    drop(thread);
    assert!(!sim.is_energized());
}
