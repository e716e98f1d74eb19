//! Start-up sequence: optional delayed calibration, then the monitor loop.

use std::sync::Arc;

use crossbeam_channel as xch;
use eyre::WrapErr;
use slidepot_traits::{MotorDriver, PositionSensor};

use crate::config::{MonitorCfg, MonitorMode};
use crate::controller::{InterruptCheck, SlidePotController};
use crate::error::{ActuatorError, Result, classify};
use crate::monitor::{Monitor, VoltageReport};
use crate::util::duration_ms;

/// How a controller run is orchestrated.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Calibrate before the monitor loop starts.
    pub calibrate: bool,
    pub monitor: MonitorCfg,
    /// Stop after this many completed cycles.
    pub max_cycles: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            calibrate: true,
            monitor: MonitorCfg::default(),
            max_cycles: None,
        }
    }
}

/// Calibrate as configured, degrading to uncalibrated operation in cycle
/// mode when the platform cannot sense voltage.
///
/// The start-up delay and the calibration passes honour the controller's
/// interrupt check.
pub fn startup_calibration<M: MotorDriver, S: PositionSensor>(
    controller: &mut SlidePotController<M, S>,
    mode: MonitorMode,
) -> Result<()> {
    let delay = controller.calibration_cfg().startup_delay;
    if !delay.is_zero() {
        tracing::info!(delay_ms = duration_ms(delay), "waiting before calibration");
        controller.wait(delay)?;
    }

    match controller.calibrate_from_config() {
        Ok(_) => Ok(()),
        Err(e) => match (classify(&e), mode) {
            (Some(ActuatorError::SensorUnavailable(_)), MonitorMode::Cycle) => {
                tracing::warn!(error = %e, "voltage sensing unavailable; running uncalibrated");
                Ok(())
            }
            _ => Err(e).wrap_err("startup calibration"),
        },
    }
}

/// Run the controller until a fatal error or a shutdown request.
///
/// `reports` receives every sample admitted by the hysteresis filter.
/// `shutdown` is polled throughout start-up; once the monitor runs it is
/// only checked at cycle boundaries. An interrupted start-up returns `Ok`.
pub fn run<M, S, F>(
    mut controller: SlidePotController<M, S>,
    opts: &RunOptions,
    reports: Option<xch::Sender<VoltageReport>>,
    shutdown: F,
) -> Result<()>
where
    M: MotorDriver,
    S: PositionSensor,
    F: Fn() -> bool + Send + Sync + 'static,
{
    let shutdown = Arc::new(shutdown);
    if opts.calibrate {
        if shutdown() {
            return Ok(());
        }
        let check: InterruptCheck = shutdown.clone();
        controller.set_interrupt_check(Some(check));
        let res = startup_calibration(&mut controller, opts.monitor.mode);
        controller.set_interrupt_check(None);
        match res {
            Err(e) if matches!(classify(&e), Some(ActuatorError::Interrupted)) => {
                tracing::info!("shutdown requested during start-up");
                return Ok(());
            }
            other => other?,
        }
    } else {
        tracing::info!("calibration skipped");
    }

    let mut monitor = Monitor::new(controller, opts.monitor.clone())
        .with_shutdown_check(move || shutdown());
    if let Some(tx) = reports {
        monitor = monitor.with_reports(tx);
    }
    if let Some(n) = opts.max_cycles {
        monitor = monitor.with_max_cycles(n);
    }
    monitor.run()
}
