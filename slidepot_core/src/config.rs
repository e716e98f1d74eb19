//! Runtime configuration for the controller and monitor loop.
//!
//! These are separate from the TOML-deserialized config in `slidepot_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

/// Calibration sampling parameters.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Samples that must agree (reference included) before an extreme counts as reached.
    pub sample_count: u32,
    /// Samples within this many volts of the reference agree with it.
    pub voltage_tolerance: f32,
    /// Wait between calibration samples.
    pub settle: Duration,
    /// Longest plausible full-travel time; the pass deadline adds
    /// `sample_count × settle` on top.
    pub max_slide: Duration,
    /// Wait before the first calibration move.
    pub startup_delay: Duration,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            sample_count: 150,
            voltage_tolerance: 0.2,
            settle: Duration::from_millis(300),
            max_slide: Duration::from_secs(10),
            startup_delay: Duration::from_secs(5),
        }
    }
}

impl CalibrationCfg {
    /// Upper bound on one timed pass.
    pub fn pass_deadline(&self) -> Duration {
        self.max_slide
            .saturating_add(self.settle.saturating_mul(self.sample_count))
    }
}

/// Closed-loop positioning policy.
#[derive(Debug, Clone)]
pub struct PositionCfg {
    /// Default tolerance for hold mode and `goto`.
    pub tolerance: f32,
    /// Drive pulses allowed per `slide_to_voltage` call.
    pub max_iterations: u32,
    /// Fraction of the predicted pulse actually driven, (0.0, 1.0].
    pub approach_gain: f32,
    /// Gain multiplier applied on every overshoot, (0.0, 1.0].
    pub backoff: f32,
    pub min_pulse: Duration,
    /// Wait after coasting before re-sampling.
    pub pulse_settle: Duration,
    /// Added to the calibrated slide time when seeking an extreme.
    pub slide_margin: Duration,
    /// Drive time to an extreme without a calibration.
    pub uncalibrated_slide: Duration,
}

impl Default for PositionCfg {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_iterations: 20,
            approach_gain: 0.8,
            backoff: 0.5,
            min_pulse: Duration::from_millis(5),
            pulse_settle: Duration::from_millis(50),
            slide_margin: Duration::from_millis(250),
            uncalibrated_slide: Duration::from_secs(2),
        }
    }
}

/// Motor drive parameters.
#[derive(Debug, Clone)]
pub struct DriveCfg {
    pub duty_percent: f32,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            duty_percent: 100.0,
        }
    }
}

/// Sensor sampling and target range.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Conversions averaged per sample.
    pub averaged_samples: u32,
    /// Targets are clamped into `[min_voltage, max_voltage]`.
    pub min_voltage: f32,
    pub max_voltage: f32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            averaged_samples: 10,
            min_voltage: 0.0,
            max_voltage: 3.3,
        }
    }
}

/// What the monitor loop does with the actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorMode {
    /// Alternate between the forward and backward extremes.
    Cycle,
    /// Hold the target voltage, re-correcting after every dwell.
    Hold { target: f32 },
}

#[derive(Debug, Clone)]
pub struct MonitorCfg {
    pub mode: MonitorMode,
    /// Reports are emitted only when the voltage moved more than this.
    pub hysteresis: f32,
    /// Wait between directional phases.
    pub dwell: Duration,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Cycle,
            hysteresis: 0.05,
            dwell: Duration::from_secs(1),
        }
    }
}
