//! The slide-potentiometer controller: exclusive owner of the motor and
//! sensor ports.
//!
//! Calibration (`calibration`) and positioning (`positioning`) are
//! implemented as further `impl` blocks on `SlidePotController`; this module
//! holds the state and the port plumbing they share.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use slidepot_traits::{Clock, MotorDriver, PositionSensor};

use crate::calibration::CalibrationResult;
use crate::config::{CalibrationCfg, DriveCfg, PositionCfg, SensorCfg};
use crate::error::{ActuatorError, Report, Result};
use crate::hw_error::{map_motor_error, map_sensor_error};
use crate::types::{ActuatorState, Direction};

/// Polled during calibration, positioning and long waits; `true` aborts
/// the operation with `ActuatorError::Interrupted`.
pub type InterruptCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Longest uninterrupted sleep inside `wait`.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

pub struct SlidePotController<M: MotorDriver, S: PositionSensor> {
    pub(crate) motor: M,
    pub(crate) sensor: S,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) calibration_cfg: CalibrationCfg,
    pub(crate) position: PositionCfg,
    pub(crate) drive: DriveCfg,
    pub(crate) sensor_cfg: SensorCfg,
    pub(crate) calibration: Option<CalibrationResult>,
    pub(crate) state: ActuatorState,
    pub(crate) interrupt: Option<InterruptCheck>,
}

impl<M: MotorDriver, S: PositionSensor> core::fmt::Debug for SlidePotController<M, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlidePotController")
            .field("state", &self.state)
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}

impl<M: MotorDriver, S: PositionSensor> SlidePotController<M, S> {
    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn calibration(&self) -> Option<&CalibrationResult> {
        self.calibration.as_ref()
    }

    /// Install or clear a calibration, e.g. one measured by an earlier run.
    pub fn set_calibration(&mut self, calibration: Option<CalibrationResult>) {
        self.calibration = calibration;
    }

    pub fn calibration_cfg(&self) -> &CalibrationCfg {
        &self.calibration_cfg
    }

    pub fn position_cfg(&self) -> &PositionCfg {
        &self.position
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    /// Install or clear the check that aborts long-running operations.
    pub fn set_interrupt_check(&mut self, check: Option<InterruptCheck>) {
        self.interrupt = check;
    }

    pub(crate) fn check_interrupt(&self) -> Result<()> {
        if self.interrupt.as_ref().is_some_and(|f| f()) {
            tracing::info!("interrupted");
            return Err(Report::new(ActuatorError::Interrupted));
        }
        Ok(())
    }

    /// Sleep for `d` in slices, checking for an interrupt before each one.
    pub fn wait(&self, d: Duration) -> Result<()> {
        let mut remaining = d;
        while !remaining.is_zero() {
            self.check_interrupt()?;
            let slice = remaining.min(INTERRUPT_POLL);
            self.clock.sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        Ok(())
    }

    /// Sample the wiper, averaged over the configured number of conversions.
    pub fn sample_voltage(&mut self) -> Result<f32> {
        let v = self
            .sensor
            .sample_averaged(self.sensor_cfg.averaged_samples)
            .map_err(|e| Report::new(map_sensor_error(&*e)))
            .wrap_err("sampling wiper voltage")?;
        self.state.current_voltage = v;
        Ok(v)
    }

    /// De-energize the bridge.
    pub fn coast(&mut self) -> Result<()> {
        self.motor
            .coast()
            .map_err(|e| Report::new(map_motor_error(&*e)))
            .wrap_err("coast")?;
        self.state.direction = Direction::Coasting;
        Ok(())
    }

    pub(crate) fn drive(&mut self, direction: Direction) -> Result<()> {
        let duty = self.drive.duty_percent;
        let res = match direction {
            Direction::Forward => self.motor.drive_forward(duty),
            Direction::Backward => self.motor.drive_backward(duty),
            Direction::Coasting => return self.coast(),
        };
        res.map_err(|e| Report::new(map_motor_error(&*e)))
            .wrap_err_with(|| format!("drive {direction}"))?;
        self.state.direction = direction;
        tracing::debug!(%direction, duty_percent = duty, "drive");
        Ok(())
    }

    /// Coast after a drive sequence and merge the outcomes: the sequence's
    /// own error wins, a coast failure alone is reported as a drive failure.
    pub(crate) fn finish_drive<T>(&mut self, outcome: Result<T>) -> Result<T> {
        let coasted = self.coast();
        match (outcome, coasted) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(ce)) => {
                tracing::warn!(error = %ce, "coast failed after error");
                Err(e)
            }
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut ActuatorState {
        &mut self.state
    }
}

impl<M: MotorDriver, S: PositionSensor> Drop for SlidePotController<M, S> {
    fn drop(&mut self) {
        if let Err(e) = self.motor.coast() {
            tracing::warn!(error = %e, "coast failed on controller drop");
        }
    }
}
