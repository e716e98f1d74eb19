//! Empirical characterization of the actuator.
//!
//! Calibration homes the wiper at the backward extreme, then times one full
//! forward pass and one full backward pass. Each pass keeps a reference
//! voltage: a sample that moves more than the tolerance away from it becomes
//! the new reference and stamps the candidate slide time, and the pass ends
//! once `sample_count` samples (reference included) agree. The slide time is
//! therefore the moment the extreme was first observed, quantized to the
//! settle interval.

use std::time::{Duration, Instant};

use eyre::WrapErr;
use slidepot_traits::{Clock, MotorDriver, PositionSensor};

use crate::config::CalibrationCfg;
use crate::controller::SlidePotController;
use crate::error::{ActuatorError, CalibrationFailure, Result};
use crate::types::Direction;
use crate::util::duration_ms;

/// Measured behavior of the actuator; read-only once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub min_forward_slide: Duration,
    pub min_backward_slide: Duration,
    /// Volts per second of forward drive; negative when forward lowers the wiper voltage.
    pub forward_effect: f32,
    /// Volts per second of backward drive.
    pub backward_effect: f32,
    pub forward_extreme_v: f32,
    pub backward_extreme_v: f32,
}

impl CalibrationResult {
    pub fn min_slide(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Forward => self.min_forward_slide,
            Direction::Backward => self.min_backward_slide,
            Direction::Coasting => Duration::ZERO,
        }
    }

    pub fn effect(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Forward => self.forward_effect,
            Direction::Backward => self.backward_effect,
            Direction::Coasting => 0.0,
        }
    }

    /// Observed voltage range as `(low, high)`.
    pub fn voltage_range(&self) -> (f32, f32) {
        let (a, b) = (self.forward_extreme_v, self.backward_extreme_v);
        (a.min(b), a.max(b))
    }

    /// Direction that raises (`true`) or lowers the wiper voltage.
    pub fn direction_for(&self, raise: bool) -> Direction {
        if raise == (self.forward_effect > 0.0) {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Outcome of a single pass.
#[derive(Debug, Clone, Copy)]
struct Pass {
    start_v: f32,
    extreme_v: f32,
    slide: Duration,
}

impl Pass {
    fn effect(&self) -> f32 {
        (self.extreme_v - self.start_v) / self.slide.as_secs_f32()
    }
}

fn check_params(cfg: &CalibrationCfg) -> std::result::Result<(), ActuatorError> {
    // The reference sample counts towards sample_count, so at least one
    // sample must be taken after the drive starts.
    if cfg.sample_count < 2 {
        return Err(ActuatorError::InvalidInput(
            "calibration sample count must be >= 2".into(),
        ));
    }
    if !(cfg.voltage_tolerance.is_finite() && cfg.voltage_tolerance > 0.0) {
        return Err(ActuatorError::InvalidInput(
            "calibration voltage tolerance must be > 0".into(),
        ));
    }
    if cfg.settle.is_zero() {
        return Err(ActuatorError::InvalidInput(
            "calibration settle time must be > 0".into(),
        ));
    }
    Ok(())
}

impl<M: MotorDriver, S: PositionSensor> SlidePotController<M, S> {
    /// Characterize the actuator with explicit sampling parameters.
    ///
    /// Moves the actuator across its full range three times. On success the
    /// result is stored and used by every later positioning call.
    pub fn calibrate(
        &mut self,
        sample_count: u32,
        voltage_tolerance: f32,
        settle: Duration,
    ) -> Result<CalibrationResult> {
        let cfg = CalibrationCfg {
            sample_count,
            voltage_tolerance,
            settle,
            ..self.calibration_cfg().clone()
        };
        self.calibrate_with(&cfg)
    }

    /// Characterize the actuator with the configured parameters.
    pub fn calibrate_from_config(&mut self) -> Result<CalibrationResult> {
        let cfg = self.calibration_cfg().clone();
        self.calibrate_with(&cfg)
    }

    fn calibrate_with(&mut self, cfg: &CalibrationCfg) -> Result<CalibrationResult> {
        check_params(cfg).map_err(eyre::Report::new)?;
        tracing::info!(
            sample_count = cfg.sample_count,
            tolerance_v = cfg.voltage_tolerance,
            settle_ms = duration_ms(cfg.settle),
            "calibration start"
        );

        let homing = self.guarded_pass(Direction::Backward, cfg);
        let homing = homing.wrap_err("homing backward")?;
        tracing::debug!(voltage = homing.extreme_v, "homed");

        let forward = self
            .guarded_pass(Direction::Forward, cfg)
            .wrap_err("timing forward pass")?;
        validate_pass(&forward, Direction::Forward).map_err(eyre::Report::new)?;

        let backward = self
            .guarded_pass(Direction::Backward, cfg)
            .wrap_err("timing backward pass")?;
        validate_pass(&backward, Direction::Backward).map_err(eyre::Report::new)?;

        let result = CalibrationResult {
            min_forward_slide: forward.slide,
            min_backward_slide: backward.slide,
            forward_effect: forward.effect(),
            backward_effect: backward.effect(),
            forward_extreme_v: forward.extreme_v,
            backward_extreme_v: backward.extreme_v,
        };
        tracing::info!(
            min_forward_slide_ms = duration_ms(result.min_forward_slide),
            min_backward_slide_ms = duration_ms(result.min_backward_slide),
            forward_effect_v_per_s = result.forward_effect,
            backward_effect_v_per_s = result.backward_effect,
            "calibrated"
        );
        self.set_calibration(Some(result));
        Ok(result)
    }

    /// One pass with the bridge coasted on every exit path.
    fn guarded_pass(&mut self, direction: Direction, cfg: &CalibrationCfg) -> Result<Pass> {
        let outcome = self.pass(direction, cfg);
        self.finish_drive(outcome)
    }

    fn pass(&mut self, direction: Direction, cfg: &CalibrationCfg) -> Result<Pass> {
        let clock = self.clock();
        let deadline = cfg.pass_deadline();
        let t0: Instant = clock.now();

        let start_v = self.sample_voltage()?;
        let mut reference = start_v;
        let mut candidate = Duration::ZERO;
        let mut agreeing: u32 = 1;

        self.drive(direction)?;
        while agreeing < cfg.sample_count {
            if clock.since(t0) >= deadline {
                return Err(eyre::Report::new(ActuatorError::Calibration(
                    CalibrationFailure::ExtremeNotReached {
                        direction,
                        limit_ms: duration_ms(deadline),
                    },
                )));
            }
            self.check_interrupt()?;
            clock.sleep(cfg.settle);
            let v = self.sample_voltage()?;
            if (v - reference).abs() > cfg.voltage_tolerance {
                reference = v;
                candidate = clock.since(t0);
                agreeing = 1;
            } else {
                agreeing += 1;
            }
            tracing::trace!(%direction, voltage = v, agreeing, "calibration sample");
        }

        Ok(Pass {
            start_v,
            extreme_v: reference,
            slide: candidate,
        })
    }
}

fn validate_pass(pass: &Pass, direction: Direction) -> std::result::Result<(), ActuatorError> {
    if pass.slide.is_zero() {
        return Err(CalibrationFailure::NoMotion { direction }.into());
    }
    let effect = pass.effect();
    if !effect.is_normal() {
        return Err(CalibrationFailure::NoVoltageChange { direction }.into());
    }
    Ok(())
}
