//! Builder for `SlidePotController`.
//!
//! Ports are moved in, so the controller owns them exclusively for its
//! lifetime. `try_build()` reports the first missing piece or invalid
//! parameter as a typed `BuildError`.

use std::sync::Arc;

use slidepot_traits::{Clock, MonotonicClock, MotorDriver, PositionSensor};

use crate::calibration::CalibrationResult;
use crate::config::{CalibrationCfg, DriveCfg, PositionCfg, SensorCfg};
use crate::controller::SlidePotController;
use crate::error::{BuildError, Report, Result};
use crate::types::ActuatorState;

pub struct ControllerBuilder<M, S> {
    motor: Option<M>,
    sensor: Option<S>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    calibration_cfg: Option<CalibrationCfg>,
    position: Option<PositionCfg>,
    drive: Option<DriveCfg>,
    sensor_cfg: Option<SensorCfg>,
    calibration: Option<CalibrationResult>,
}

impl<M, S> Default for ControllerBuilder<M, S> {
    fn default() -> Self {
        Self {
            motor: None,
            sensor: None,
            clock: None,
            calibration_cfg: None,
            position: None,
            drive: None,
            sensor_cfg: None,
            calibration: None,
        }
    }
}

impl<M: MotorDriver, S: PositionSensor> SlidePotController<M, S> {
    /// Start building a controller.
    pub fn builder() -> ControllerBuilder<M, S> {
        ControllerBuilder::default()
    }
}

impl<M: MotorDriver, S: PositionSensor> ControllerBuilder<M, S> {
    pub fn with_motor(mut self, motor: M) -> Self {
        self.motor = Some(motor);
        self
    }
    pub fn with_sensor(mut self, sensor: S) -> Self {
        self.sensor = Some(sensor);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }
    pub fn with_calibration_cfg(mut self, cfg: CalibrationCfg) -> Self {
        self.calibration_cfg = Some(cfg);
        self
    }
    pub fn with_position_cfg(mut self, cfg: PositionCfg) -> Self {
        self.position = Some(cfg);
        self
    }
    pub fn with_drive_cfg(mut self, cfg: DriveCfg) -> Self {
        self.drive = Some(cfg);
        self
    }
    pub fn with_sensor_cfg(mut self, cfg: SensorCfg) -> Self {
        self.sensor_cfg = Some(cfg);
        self
    }
    /// Start with a known calibration instead of measuring one.
    pub fn with_calibration(mut self, calibration: CalibrationResult) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn try_build(self) -> Result<SlidePotController<M, S>> {
        let motor = self
            .motor
            .ok_or_else(|| Report::new(BuildError::MissingMotor))?;
        let sensor = self
            .sensor
            .ok_or_else(|| Report::new(BuildError::MissingSensor))?;
        let position = self.position.unwrap_or_default();
        let drive = self.drive.unwrap_or_default();
        let sensor_cfg = self.sensor_cfg.unwrap_or_default();

        validate(&position, &drive, &sensor_cfg).map_err(Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(SlidePotController {
            motor,
            sensor,
            clock,
            calibration_cfg: self.calibration_cfg.unwrap_or_default(),
            position,
            drive,
            sensor_cfg,
            calibration: self.calibration,
            state: ActuatorState::default(),
            interrupt: None,
        })
    }
}

fn validate(
    position: &PositionCfg,
    drive: &DriveCfg,
    sensor: &SensorCfg,
) -> std::result::Result<(), BuildError> {
    if !(drive.duty_percent > 0.0 && drive.duty_percent <= 100.0) {
        return Err(BuildError::InvalidConfig("duty_percent must be in (0, 100]"));
    }
    if position.max_iterations == 0 {
        return Err(BuildError::InvalidConfig("max_iterations must be >= 1"));
    }
    if !(position.approach_gain > 0.0 && position.approach_gain <= 1.0) {
        return Err(BuildError::InvalidConfig(
            "approach_gain must be in (0.0, 1.0]",
        ));
    }
    if !(position.backoff > 0.0 && position.backoff <= 1.0) {
        return Err(BuildError::InvalidConfig("backoff must be in (0.0, 1.0]"));
    }
    if position.uncalibrated_slide.is_zero() {
        return Err(BuildError::InvalidConfig(
            "uncalibrated_slide must be > 0",
        ));
    }
    if !(sensor.min_voltage.is_finite() && sensor.max_voltage.is_finite())
        || sensor.min_voltage >= sensor.max_voltage
    {
        return Err(BuildError::InvalidConfig(
            "min_voltage must be < max_voltage",
        ));
    }
    Ok(())
}
