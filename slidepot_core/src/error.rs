use thiserror::Error;

use crate::types::Direction;

/// Why a calibration pass could not characterize the actuator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationFailure {
    #[error("{direction} extreme not reached within {limit_ms} ms")]
    ExtremeNotReached { direction: Direction, limit_ms: u64 },
    #[error("no motion detected while sliding {direction}")]
    NoMotion { direction: Direction },
    #[error("sliding {direction} produced no voltage change")]
    NoVoltageChange { direction: Direction },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("calibration failed: {0}")]
    Calibration(CalibrationFailure),
    #[error(
        "did not converge to {target_v:.3} V after {iterations} pulses (last sample {last_v:.3} V)"
    )]
    Convergence {
        target_v: f32,
        last_v: f32,
        iterations: u32,
    },
    #[error("drive failure: {0}")]
    Drive(String),
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("sensor fault: {0}")]
    SensorFault(String),
    #[error("closed-loop positioning requires a calibration")]
    NotCalibrated,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("interrupted")]
    Interrupted,
}

impl ActuatorError {
    /// Only a missing sensing capability is tolerated by the monitor loop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ActuatorError::SensorUnavailable(_))
    }

    /// Stable machine-readable class name.
    pub fn class(&self) -> &'static str {
        match self {
            ActuatorError::Calibration(_) => "calibration",
            ActuatorError::Convergence { .. } => "convergence",
            ActuatorError::Drive(_) => "drive",
            ActuatorError::SensorUnavailable(_) => "sensor_unavailable",
            ActuatorError::SensorFault(_) => "sensor_fault",
            ActuatorError::NotCalibrated => "not_calibrated",
            ActuatorError::InvalidInput(_) => "invalid_input",
            ActuatorError::Interrupted => "interrupted",
        }
    }
}

impl From<CalibrationFailure> for ActuatorError {
    fn from(f: CalibrationFailure) -> Self {
        ActuatorError::Calibration(f)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing motor")]
    MissingMotor,
    #[error("missing sensor")]
    MissingSensor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Typed classification carried by a report, if any.
pub fn classify(report: &Report) -> Option<&ActuatorError> {
    report.downcast_ref::<ActuatorError>()
}
