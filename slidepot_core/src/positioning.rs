//! Closed-loop positioning: predict a pulse from the calibrated voltage
//! effect, drive it, coast, re-sample, repeat.

use std::time::Duration;

use eyre::WrapErr;
use slidepot_traits::{MotorDriver, PositionSensor};

use crate::calibration::CalibrationResult;
use crate::controller::SlidePotController;
use crate::error::{ActuatorError, Report, Result};
use crate::types::Direction;
use crate::util::{duration_ms, secs_to_duration};

impl<M: MotorDriver, S: PositionSensor> SlidePotController<M, S> {
    /// Drive until the sampled voltage is within `tolerance` volts of `target`.
    ///
    /// The target is clamped into the configured range and the calibrated
    /// extremes. Fails with `NotCalibrated` without a calibration and with
    /// `Convergence` once `max_iterations` pulses did not get there. The
    /// bridge is coasting when this returns, whatever the outcome.
    pub fn slide_to_voltage(&mut self, target: f32, tolerance: f32) -> Result<()> {
        let cal = self
            .calibration
            .ok_or_else(|| Report::new(ActuatorError::NotCalibrated))?;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(Report::new(ActuatorError::InvalidInput(format!(
                "tolerance must be a finite, non-negative voltage (got {tolerance})"
            ))));
        }
        if target.is_nan() {
            return Err(Report::new(ActuatorError::InvalidInput(
                "target voltage is NaN".into(),
            )));
        }

        let target = self.clamp_target(target, &cal);
        let outcome = self.approach(target, tolerance, &cal);
        self.finish_drive(outcome)
            .wrap_err_with(|| format!("slide to {target:.3} V"))
    }

    /// Drive to the forward extreme and coast.
    pub fn slide_forward(&mut self) -> Result<()> {
        self.slide(Direction::Forward)
    }

    /// Drive to the backward extreme and coast.
    pub fn slide_backward(&mut self) -> Result<()> {
        self.slide(Direction::Backward)
    }

    /// Drive unconditionally for the calibrated slide time plus margin, or
    /// for the uncalibrated slide time without a calibration.
    pub fn slide(&mut self, direction: Direction) -> Result<()> {
        let duration = match self.calibration {
            Some(cal) => cal
                .min_slide(direction)
                .saturating_add(self.position.slide_margin),
            None => self.position.uncalibrated_slide,
        };
        tracing::debug!(%direction, duration_ms = duration_ms(duration), "slide to extreme");
        let clock = self.clock();
        let outcome = self.drive(direction).map(|()| clock.sleep(duration));
        self.finish_drive(outcome)
    }

    fn clamp_target(&self, target: f32, cal: &CalibrationResult) -> f32 {
        let (cal_lo, cal_hi) = cal.voltage_range();
        let lo = self.sensor_cfg.min_voltage.max(cal_lo);
        let hi = self.sensor_cfg.max_voltage.min(cal_hi);
        let clamped = if lo <= hi {
            target.clamp(lo, hi)
        } else {
            target.clamp(cal_lo, cal_hi)
        };
        if (clamped - target).abs() > f32::EPSILON {
            tracing::debug!(requested = target, clamped, "target clamped");
        }
        clamped
    }

    fn approach(&mut self, target: f32, tolerance: f32, cal: &CalibrationResult) -> Result<()> {
        let clock = self.clock();
        let cfg = self.position.clone();
        let mut gain = cfg.approach_gain;
        let mut last_raise: Option<bool> = None;
        let mut pulses: u32 = 0;
        let mut v = self.sample_voltage()?;

        loop {
            let err = target - v;
            if err.abs() <= tolerance {
                tracing::debug!(target, voltage = v, pulses, "in tolerance");
                return Ok(());
            }
            if pulses >= cfg.max_iterations {
                return Err(Report::new(ActuatorError::Convergence {
                    target_v: target,
                    last_v: v,
                    iterations: pulses,
                }));
            }

            self.check_interrupt()?;

            let raise = err > 0.0;
            if last_raise.is_some_and(|prev| prev != raise) {
                gain *= cfg.backoff;
                tracing::debug!(gain, "overshoot, backing off");
            }
            last_raise = Some(raise);

            let direction = cal.direction_for(raise);
            let pulse = pulse_for(err, gain, cal, direction, cfg.min_pulse);
            self.drive(direction)?;
            clock.sleep(pulse);
            self.coast()?;
            clock.sleep(cfg.pulse_settle);
            pulses += 1;

            v = self.sample_voltage()?;
            tracing::debug!(%direction, pulse_ms = duration_ms(pulse), voltage = v, "pulse");
        }
    }
}

/// Predicted drive time for `err` volts, clamped to
/// `[min_pulse, calibrated slide time]`.
fn pulse_for(
    err: f32,
    gain: f32,
    cal: &CalibrationResult,
    direction: Direction,
    min_pulse: Duration,
) -> Duration {
    let effect = cal.effect(direction).abs();
    let ceiling = cal.min_slide(direction).max(min_pulse);
    if !effect.is_normal() {
        return ceiling;
    }
    secs_to_duration(gain * err.abs() / effect).clamp(min_pulse, ceiling)
}
