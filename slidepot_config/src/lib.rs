#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the slide-potentiometer controller.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! `Config::validate`. Every section except `[pins]` has defaults that match
//! the stock firmware (150-sample calibration at 0.2 V / 300 ms, 0.1 V
//! positioning tolerance, 5 s start-up delay).
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// BCM pin (software PWM) for H-bridge input 1; ignored with hardware PWM.
    pub hbridge_in1: u8,
    /// BCM pin (software PWM) for H-bridge input 2; ignored with hardware PWM.
    pub hbridge_in2: u8,
    /// MCP3008 channel wired to the wiper.
    pub adc_channel: u8,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriveSchemeKind {
    /// Both bridge inputs on the shared hardware PWM peripheral
    #[default]
    HardwarePwm,
    /// Two GPIO pins with independent software PWM
    SoftwarePwm,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Drive {
    pub scheme: DriveSchemeKind,
    pub duty_percent: f32,
    pub pwm_frequency_hz: f64,
}

impl Default for Drive {
    fn default() -> Self {
        Self {
            scheme: DriveSchemeKind::HardwarePwm,
            duty_percent: 100.0,
            pwm_frequency_hz: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensor {
    pub vref_v: f32,
    pub spi_clock_hz: u32,
    /// Conversions averaged per reported sample
    pub averaged_samples: u32,
    /// Lowest wiper voltage a target may ask for
    pub min_voltage_drop_v: f32,
    /// Highest wiper voltage a target may ask for
    pub max_voltage_drop_v: f32,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            vref_v: 3.3,
            spi_clock_hz: 1_000_000,
            averaged_samples: 10,
            min_voltage_drop_v: 0.0,
            max_voltage_drop_v: 3.3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Skip calibration entirely when false (open-loop extremes only)
    pub enabled: bool,
    /// Wait before the first calibration move
    pub startup_delay_ms: u64,
    pub sample_count: u32,
    pub voltage_tolerance_v: f32,
    pub settle_ms: u64,
    /// Longest plausible full-travel time; bounds each calibration pass
    pub max_slide_ms: u64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            enabled: true,
            startup_delay_ms: 5000,
            sample_count: 150,
            voltage_tolerance_v: 0.2,
            settle_ms: 300,
            max_slide_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Positioning {
    pub tolerance_v: f32,
    pub max_iterations: u32,
    /// Fraction of the predicted pulse actually driven
    pub approach_gain: f32,
    /// Gain multiplier applied after each overshoot
    pub backoff: f32,
    pub min_pulse_ms: u64,
    pub pulse_settle_ms: u64,
    /// Extra drive time past the calibrated slide time when seeking an extreme
    pub slide_margin_ms: u64,
    /// Drive time used to reach an extreme without a calibration
    pub uncalibrated_slide_ms: u64,
}

impl Default for Positioning {
    fn default() -> Self {
        Self {
            tolerance_v: 0.1,
            max_iterations: 20,
            approach_gain: 0.8,
            backoff: 0.5,
            min_pulse_ms: 5,
            pulse_settle_ms: 50,
            slide_margin_ms: 250,
            uncalibrated_slide_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Alternate between the forward and backward extremes
    #[default]
    Cycle,
    /// Hold `hold_target_v`, re-correcting after every dwell
    Hold,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Monitor {
    pub mode: MonitorMode,
    pub hold_target_v: Option<f32>,
    pub hysteresis_v: f32,
    pub dwell_ms: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Cycle,
            hold_target_v: None,
            hysteresis_v: 0.05,
            dwell_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    pub forward_travel_ms: u64,
    pub backward_travel_ms: u64,
    /// 0.0 = backward extreme, 1.0 = forward extreme
    pub start_position: f32,
    /// Peak amplitude of simulated ADC noise, in volts
    pub noise_v: f32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            forward_travel_ms: 1200,
            backward_travel_ms: 1200,
            start_position: 0.5,
            noise_v: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub drive: Drive,
    #[serde(default)]
    pub sensor: Sensor,
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub positioning: Positioning,
    #[serde(default)]
    pub monitor: Monitor,
    #[serde(default)]
    pub logging: Logging,
    /// Simulated actuator used when no hardware backend is compiled in
    #[serde(default)]
    pub simulation: Simulation,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Finite and strictly positive.
fn positive(x: f32) -> bool {
    x.is_finite() && x > 0.0
}

/// In (0.0, 1.0].
fn unit_fraction(x: f32) -> bool {
    positive(x) && x <= 1.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.adc_channel > 7 {
            eyre::bail!("pins.adc_channel must be in 0..=7");
        }
        if self.drive.scheme == DriveSchemeKind::SoftwarePwm
            && self.pins.hbridge_in1 == self.pins.hbridge_in2
        {
            eyre::bail!("pins.hbridge_in1 and pins.hbridge_in2 must differ");
        }

        // Drive
        if !(positive(self.drive.duty_percent) && self.drive.duty_percent <= 100.0) {
            eyre::bail!("drive.duty_percent must be in (0, 100]");
        }
        if !(self.drive.pwm_frequency_hz.is_finite() && self.drive.pwm_frequency_hz > 0.0) {
            eyre::bail!("drive.pwm_frequency_hz must be > 0");
        }

        // Sensor
        if !(self.sensor.vref_v.is_finite() && self.sensor.vref_v > 0.0) {
            eyre::bail!("sensor.vref_v must be > 0");
        }
        if self.sensor.spi_clock_hz == 0 {
            eyre::bail!("sensor.spi_clock_hz must be > 0");
        }
        if self.sensor.averaged_samples == 0 {
            eyre::bail!("sensor.averaged_samples must be >= 1");
        }
        if !self.sensor.min_voltage_drop_v.is_finite()
            || !self.sensor.max_voltage_drop_v.is_finite()
            || self.sensor.min_voltage_drop_v >= self.sensor.max_voltage_drop_v
        {
            eyre::bail!("sensor.min_voltage_drop_v must be < sensor.max_voltage_drop_v");
        }

        // Calibration
        // The reference sample counts, so 1 would end every pass before it starts.
        if self.calibration.sample_count < 2 {
            eyre::bail!("calibration.sample_count must be >= 2");
        }
        if !positive(self.calibration.voltage_tolerance_v) {
            eyre::bail!("calibration.voltage_tolerance_v must be > 0");
        }
        if self.calibration.settle_ms == 0 {
            eyre::bail!("calibration.settle_ms must be >= 1");
        }
        if self.calibration.max_slide_ms == 0 {
            eyre::bail!("calibration.max_slide_ms must be >= 1");
        }
        if self.calibration.startup_delay_ms > 10 * 60 * 1000 {
            eyre::bail!("calibration.startup_delay_ms is unreasonably large (>10min)");
        }

        // Positioning
        if !positive(self.positioning.tolerance_v) {
            eyre::bail!("positioning.tolerance_v must be > 0");
        }
        if self.positioning.max_iterations == 0 {
            eyre::bail!("positioning.max_iterations must be >= 1");
        }
        if !unit_fraction(self.positioning.approach_gain) {
            eyre::bail!("positioning.approach_gain must be in (0.0, 1.0]");
        }
        if !unit_fraction(self.positioning.backoff) {
            eyre::bail!("positioning.backoff must be in (0.0, 1.0]");
        }
        if self.positioning.uncalibrated_slide_ms == 0 {
            eyre::bail!("positioning.uncalibrated_slide_ms must be >= 1");
        }

        // Monitor
        if !(self.monitor.hysteresis_v.is_finite() && self.monitor.hysteresis_v >= 0.0) {
            eyre::bail!("monitor.hysteresis_v must be >= 0");
        }
        if self.monitor.mode == MonitorMode::Hold {
            match self.monitor.hold_target_v {
                None => eyre::bail!("monitor.hold_target_v is required when monitor.mode = \"hold\""),
                Some(v) if !v.is_finite() => eyre::bail!("monitor.hold_target_v must be finite"),
                Some(_) => {}
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        // Simulation
        if self.simulation.forward_travel_ms == 0 || self.simulation.backward_travel_ms == 0 {
            eyre::bail!("simulation travel times must be >= 1 ms");
        }
        if !(0.0..=1.0).contains(&self.simulation.start_position) {
            eyre::bail!("simulation.start_position must be in [0.0, 1.0]");
        }
        if !self.simulation.noise_v.is_finite() || self.simulation.noise_v < 0.0 {
            eyre::bail!("simulation.noise_v must be >= 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pins]
hbridge_in1 = 12
hbridge_in2 = 13
adc_channel = 4
"#;

    #[test]
    fn minimal_config_uses_firmware_defaults() {
        let cfg = load_toml(MINIMAL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.calibration.sample_count, 150);
        assert!((cfg.calibration.voltage_tolerance_v - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.calibration.settle_ms, 300);
        assert_eq!(cfg.calibration.startup_delay_ms, 5000);
        assert!((cfg.positioning.tolerance_v - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.monitor.mode, MonitorMode::Cycle);
        assert_eq!(cfg.drive.scheme, DriveSchemeKind::HardwarePwm);
    }

    #[test]
    fn drive_scheme_parses_snake_case() {
        let text = format!("{MINIMAL}\n[drive]\nscheme = \"software_pwm\"\n");
        let cfg = load_toml(&text).unwrap();
        assert_eq!(cfg.drive.scheme, DriveSchemeKind::SoftwarePwm);
    }

    #[test]
    fn missing_pins_is_a_parse_error() {
        assert!(load_toml("[drive]\nduty_percent = 50.0\n").is_err());
    }
}
