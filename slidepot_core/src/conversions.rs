//! `From` implementations bridging `slidepot_config` types to `slidepot_core` types.

use std::time::Duration;

use crate::config::{CalibrationCfg, DriveCfg, MonitorCfg, MonitorMode, PositionCfg, SensorCfg};

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&slidepot_config::Calibration> for CalibrationCfg {
    fn from(c: &slidepot_config::Calibration) -> Self {
        Self {
            sample_count: c.sample_count,
            voltage_tolerance: c.voltage_tolerance_v,
            settle: Duration::from_millis(c.settle_ms),
            max_slide: Duration::from_millis(c.max_slide_ms),
            startup_delay: Duration::from_millis(c.startup_delay_ms),
        }
    }
}

// ── PositionCfg ──────────────────────────────────────────────────────────────

impl From<&slidepot_config::Positioning> for PositionCfg {
    fn from(c: &slidepot_config::Positioning) -> Self {
        Self {
            tolerance: c.tolerance_v,
            max_iterations: c.max_iterations,
            approach_gain: c.approach_gain,
            backoff: c.backoff,
            min_pulse: Duration::from_millis(c.min_pulse_ms),
            pulse_settle: Duration::from_millis(c.pulse_settle_ms),
            slide_margin: Duration::from_millis(c.slide_margin_ms),
            uncalibrated_slide: Duration::from_millis(c.uncalibrated_slide_ms),
        }
    }
}

// ── DriveCfg / SensorCfg ─────────────────────────────────────────────────────

impl From<&slidepot_config::Drive> for DriveCfg {
    fn from(c: &slidepot_config::Drive) -> Self {
        Self {
            duty_percent: c.duty_percent,
        }
    }
}

impl From<&slidepot_config::Sensor> for SensorCfg {
    fn from(c: &slidepot_config::Sensor) -> Self {
        Self {
            averaged_samples: c.averaged_samples,
            min_voltage: c.min_voltage_drop_v,
            max_voltage: c.max_voltage_drop_v,
        }
    }
}

// ── MonitorCfg ───────────────────────────────────────────────────────────────

impl From<&slidepot_config::Monitor> for MonitorCfg {
    fn from(c: &slidepot_config::Monitor) -> Self {
        let mode = match c.mode {
            slidepot_config::MonitorMode::Cycle => MonitorMode::Cycle,
            // validate() guarantees a target in hold mode
            slidepot_config::MonitorMode::Hold => MonitorMode::Hold {
                target: c.hold_target_v.unwrap_or_default(),
            },
        };
        Self {
            mode,
            hysteresis: c.hysteresis_v,
            dwell: Duration::from_millis(c.dwell_ms),
        }
    }
}
