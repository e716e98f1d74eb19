//! Backend assembly, config mapping, and the subcommand bodies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;
use slidepot_config::Config;
use slidepot_core::error::{ActuatorError, Result, classify};
use slidepot_core::{
    CalibrationResult, ControllerThread, InterruptCheck, MonitorCfg, MonitorMode, RunOptions,
    SlidePotController, VoltageReport,
};
use slidepot_traits::{Clock, MotorDriver, PositionSensor};

pub type DynMotor = Box<dyn MotorDriver + Send>;
pub type DynSensor = Box<dyn PositionSensor + Send>;
pub type DynClock = Arc<dyn Clock + Send + Sync>;
pub type Controller = SlidePotController<DynMotor, DynSensor>;

/// How often the host wakes to check the shutdown flag while waiting for reports.
const REPORT_POLL: Duration = Duration::from_millis(100);

/// Real drive and sense ports on a Raspberry Pi.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn backend(cfg: &Config) -> Result<(DynMotor, DynSensor, DynClock)> {
    use slidepot_config::DriveSchemeKind;
    use slidepot_hardware::{HBridge, Mcp3008Sensor};

    let bridge = match cfg.drive.scheme {
        DriveSchemeKind::HardwarePwm => HBridge::hardware_pwm(cfg.drive.pwm_frequency_hz),
        DriveSchemeKind::SoftwarePwm => HBridge::software_pwm(
            cfg.pins.hbridge_in1,
            cfg.pins.hbridge_in2,
            cfg.drive.pwm_frequency_hz,
        ),
    }
    .wrap_err("open pwm h-bridge")?;
    let adc = Mcp3008Sensor::new(cfg.pins.adc_channel, cfg.sensor.spi_clock_hz, cfg.sensor.vref_v)
        .wrap_err("open spi adc")?;
    tracing::info!(scheme = ?cfg.drive.scheme, adc_channel = cfg.pins.adc_channel, "hardware backend");
    Ok((
        Box::new(bridge),
        Box::new(adc),
        Arc::new(slidepot_traits::MonotonicClock::new()),
    ))
}

/// Hardware requested on a platform without drive or sense support.
#[cfg(all(feature = "hardware", not(target_os = "linux")))]
fn backend(_cfg: &Config) -> Result<(DynMotor, DynSensor, DynClock)> {
    use slidepot_hardware::{UnsupportedMotor, UnsupportedSensor};

    tracing::warn!("no actuator support on this platform; ports report not implemented");
    Ok((
        Box::new(UnsupportedMotor),
        Box::new(UnsupportedSensor),
        Arc::new(slidepot_traits::MonotonicClock::new()),
    ))
}

/// Simulated actuator driven by the [simulation] section.
///
/// Test hooks: `SLIDEPOT_TEST_SIM_SENSOR=unavailable|fault` changes how the
/// simulated ADC answers, `SLIDEPOT_TEST_SIM_CLOCK=manual` runs on virtual time.
#[cfg(not(feature = "hardware"))]
fn backend(cfg: &Config) -> Result<(DynMotor, DynSensor, DynClock)> {
    use slidepot_hardware::{SensorBehavior, SimParams, SimulatedActuator};
    use slidepot_traits::{ManualClock, MonotonicClock};

    let params = SimParams {
        forward_travel: Duration::from_millis(cfg.simulation.forward_travel_ms),
        backward_travel: Duration::from_millis(cfg.simulation.backward_travel_ms),
        backward_voltage: cfg.sensor.min_voltage_drop_v,
        forward_voltage: cfg.sensor.max_voltage_drop_v,
        start_position: cfg.simulation.start_position,
        noise_v: cfg.simulation.noise_v,
    };
    let clock: DynClock = match std::env::var("SLIDEPOT_TEST_SIM_CLOCK").as_deref() {
        Ok("manual") => Arc::new(ManualClock::new()),
        _ => Arc::new(MonotonicClock::new()),
    };
    let sim = SimulatedActuator::new(params, clock.clone());
    match std::env::var("SLIDEPOT_TEST_SIM_SENSOR").as_deref() {
        Ok("unavailable") => sim.set_sensor_behavior(SensorBehavior::Unavailable),
        Ok("fault") => sim.set_sensor_behavior(SensorBehavior::FaultOnce { after: 0 }),
        _ => {}
    }
    tracing::info!(
        forward_travel_ms = cfg.simulation.forward_travel_ms,
        backward_travel_ms = cfg.simulation.backward_travel_ms,
        "simulated backend"
    );
    Ok((Box::new(sim.motor()), Box::new(sim.sensor()), clock))
}

/// Assemble a controller from the config, mapping sections through the core `From` impls.
pub fn build_controller(cfg: &Config) -> Result<Controller> {
    let (motor, sensor, clock) = backend(cfg)?;
    SlidePotController::builder()
        .with_motor(motor)
        .with_sensor(sensor)
        .with_clock(clock)
        .with_calibration_cfg((&cfg.calibration).into())
        .with_position_cfg((&cfg.positioning).into())
        .with_drive_cfg((&cfg.drive).into())
        .with_sensor_cfg((&cfg.sensor).into())
        .try_build()
}

fn calibration_json(c: &CalibrationResult) -> serde_json::Value {
    json!({
        "min_forward_slide_ms": slidepot_core::util::duration_ms(c.min_forward_slide),
        "min_backward_slide_ms": slidepot_core::util::duration_ms(c.min_backward_slide),
        "forward_effect_v": c.forward_effect,
        "backward_effect_v": c.backward_effect,
        "forward_extreme_v": c.forward_extreme_v,
        "backward_extreme_v": c.backward_extreme_v,
    })
}

fn print_calibration(c: &CalibrationResult, json_mode: bool) {
    if json_mode {
        println!("{}", json!({ "calibration": calibration_json(c) }));
    } else {
        println!(
            "calibrated: forward {} ms ({:+.3} V), backward {} ms ({:+.3} V), range {:.3}..{:.3} V",
            slidepot_core::util::duration_ms(c.min_forward_slide),
            c.forward_effect,
            slidepot_core::util::duration_ms(c.min_backward_slide),
            c.backward_effect,
            c.voltage_range().0,
            c.voltage_range().1,
        );
    }
}

fn print_report(r: &VoltageReport, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({ "voltage": r.voltage, "state": r.state.to_string(), "cycle": r.cycle })
        );
    } else {
        println!("voltage {:.3} V ({}, cycle {})", r.voltage, r.state, r.cycle);
    }
}

/// Abort calibration and positioning once Ctrl-C has been pressed.
fn interruptible(controller: &mut Controller, shutdown: &Arc<AtomicBool>) {
    let flag = shutdown.clone();
    let check: InterruptCheck = Arc::new(move || flag.load(Ordering::Relaxed));
    controller.set_interrupt_check(Some(check));
}

/// `calibrate`: measure once and print the result.
pub fn calibrate(cfg: &Config, json_mode: bool, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let mut controller = build_controller(cfg)?;
    interruptible(&mut controller, shutdown);
    let result = controller.calibrate_from_config()?;
    print_calibration(&result, json_mode);
    Ok(())
}

/// `goto`: calibrate, then close the loop on `voltage`.
pub fn goto(
    cfg: &Config,
    voltage: f32,
    tolerance: Option<f32>,
    json_mode: bool,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let mut controller = build_controller(cfg)?;
    interruptible(&mut controller, shutdown);
    let result = controller.calibrate_from_config()?;
    print_calibration(&result, json_mode);

    let tolerance = tolerance.unwrap_or(cfg.positioning.tolerance_v);
    controller.slide_to_voltage(voltage, tolerance)?;
    let reached = controller.state().current_voltage;
    if json_mode {
        println!(
            "{}",
            json!({ "target_v": voltage, "voltage": reached, "tolerance_v": tolerance })
        );
    } else {
        println!("reached {reached:.3} V (target {voltage:.3} V ± {tolerance:.3})");
    }
    Ok(())
}

/// `run`: the controller thread plus report forwarding until it stops.
pub fn run(
    cfg: &Config,
    skip_calibration: bool,
    cycles: Option<u64>,
    hold: Option<f32>,
    json_mode: bool,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let controller = build_controller(cfg)?;
    let mut monitor: MonitorCfg = (&cfg.monitor).into();
    if let Some(target) = hold {
        monitor.mode = MonitorMode::Hold { target };
    }
    let opts = RunOptions {
        calibrate: cfg.calibration.enabled && !skip_calibration,
        monitor,
        max_cycles: cycles,
    };
    tracing::info!(
        calibrate = opts.calibrate,
        mode = ?opts.monitor.mode,
        max_cycles = ?opts.max_cycles,
        "starting controller"
    );

    let thread = ControllerThread::spawn(controller, opts).wrap_err("spawn controller thread")?;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            thread.request_shutdown();
        }
        match thread.reports().recv_timeout(REPORT_POLL) {
            Ok(r) => print_report(&r, json_mode),
            Err(e) if e.is_timeout() => {
                if thread.is_finished() {
                    break;
                }
            }
            // Sender dropped: the controller thread is done.
            Err(_) => break,
        }
    }
    for r in thread.reports().try_iter() {
        print_report(&r, json_mode);
    }
    thread.join()?;
    tracing::info!("controller stopped");
    Ok(())
}

/// `self-check`: coast the motor and take one reading.
pub fn self_check(cfg: &Config, json_mode: bool) -> Result<()> {
    let mut controller = build_controller(cfg)?;
    controller.coast().wrap_err("coast motor")?;
    let voltage = match controller.sample_voltage() {
        Ok(v) => Some(v),
        Err(e) => match classify(&e) {
            Some(ActuatorError::SensorUnavailable(_)) => {
                tracing::warn!(error = %e, "voltage sensing unavailable");
                None
            }
            _ => return Err(e),
        },
    };
    if json_mode {
        println!("{}", json!({ "status": "ok", "voltage": voltage }));
    } else {
        match voltage {
            Some(v) => println!("OK (wiper at {v:.3} V)"),
            None => println!("OK (voltage sensing unavailable)"),
        }
    }
    Ok(())
}
