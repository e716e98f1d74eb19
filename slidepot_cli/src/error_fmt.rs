//! Human-readable error descriptions and structured JSON error formatting.

use slidepot_core::error::{ActuatorError, BuildError, CalibrationFailure};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No motor driver was provided to the controller.\nLikely causes: The H-bridge failed to initialize or was not wired into the builder.\nHow to fix: Ensure the drive backend is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::MissingSensor => {
                "What happened: No position sensor was provided to the controller.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor backend is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/slidepot.toml for a sample."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<ActuatorError>() {
        return match ae {
            ActuatorError::Calibration(CalibrationFailure::ExtremeNotReached { direction, limit_ms }) => format!(
                "What happened: The wiper voltage never settled while sliding {direction} (gave up after {limit_ms} ms).\nLikely causes: Slider jammed short of its end stop, a noisy wiper, or calibration.voltage_tolerance_v too tight.\nHow to fix: Check the mechanics, then raise calibration.max_slide_ms or calibration.voltage_tolerance_v."
            ),
            ActuatorError::Calibration(CalibrationFailure::NoMotion { direction }) => format!(
                "What happened: The slider did not move while driving {direction}.\nLikely causes: Motor not powered, H-bridge miswired, the slider already parked against a stuck end stop, or an actuator so slow that it moves less than calibration.voltage_tolerance_v within calibration.sample_count × calibration.settle_ms.\nHow to fix: Verify motor supply and [pins] hbridge_in1/hbridge_in2. For slow travel, raise calibration.settle_ms or lower calibration.voltage_tolerance_v so one settle interval spans a measurable move, then recalibrate."
            ),
            ActuatorError::Calibration(CalibrationFailure::NoVoltageChange { direction }) => format!(
                "What happened: Sliding {direction} did not change the wiper voltage.\nLikely causes: Wiper not connected to the ADC, wrong pins.adc_channel, or a broken track.\nHow to fix: Check the potentiometer wiring and pins.adc_channel."
            ),
            ActuatorError::Convergence { target_v, last_v, iterations } => format!(
                "What happened: Could not reach {target_v:.3} V within {iterations} correction pulses (last sample {last_v:.3} V).\nLikely causes: Tolerance tighter than the mechanics allow, or backlash near the target.\nHow to fix: Raise positioning.tolerance_v or positioning.max_iterations, or lower positioning.approach_gain."
            ),
            ActuatorError::Drive(msg) => format!(
                "What happened: The motor driver rejected a command ({msg}).\nLikely causes: PWM peripheral unavailable, missing GPIO permissions, or a faulty H-bridge.\nHow to fix: Check the PWM overlay and [drive] settings; ensure the process may access GPIO/PWM."
            ),
            ActuatorError::SensorFault(msg) => format!(
                "What happened: The position sensor failed ({msg}).\nLikely causes: Loose SPI wiring, wrong sensor.spi_clock_hz, or no power to the ADC.\nHow to fix: Verify the MCP3008 wiring and supply, then rerun."
            ),
            ActuatorError::SensorUnavailable(msg) => format!(
                "What happened: Voltage sensing is not available on this platform ({msg}).\nLikely causes: Built without the hardware feature, or running on a board without an ADC.\nHow to fix: Use `run` in cycle mode, or rebuild with --features hardware on the target."
            ),
            ActuatorError::NotCalibrated => {
                "What happened: Closed-loop positioning was requested without a calibration.\nLikely causes: Calibration disabled, skipped, or not possible on this platform.\nHow to fix: Enable [calibration] or drop --skip-calibration, and make sure voltage sensing works.".to_string()
            }
            ActuatorError::InvalidInput(msg) => format!(
                "What happened: Invalid request ({msg}).\nLikely causes: A negative or non-numeric --tolerance or --voltage.\nHow to fix: Pass finite, non-negative values."
            ),
            ActuatorError::Interrupted => {
                "What happened: Interrupted by Ctrl-C; the motor was coasted.\nLikely causes: A shutdown was requested before the operation finished.\nHow to fix: Rerun the command to start over.".to_string()
            }
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE>; see etc/slidepot.toml for a sample."
        );
    }

    if lower.contains("parse config") || lower.contains(" must ") {
        let detail = err.root_cause().to_string();
        return format!(
            "What happened: Configuration is invalid or incomplete ({detail}).\nLikely causes: Missing [pins] (hbridge_in1, hbridge_in2, adc_channel), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open pwm") || lower.contains("open spi") || lower.contains("gpio") {
        return "What happened: Failed to initialize hardware.\nLikely causes: PWM/SPI not enabled in the device tree, or insufficient permissions.\nHow to fix: Enable the pwm-2chan and spi overlays; run as a user in the gpio/spi groups.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; unclassified errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ActuatorError>() {
        Some(ActuatorError::Calibration(_)) => 3,
        Some(ActuatorError::Convergence { .. }) => 4,
        Some(ActuatorError::Drive(_)) => 5,
        Some(ActuatorError::SensorFault(_)) => 6,
        Some(ActuatorError::NotCalibrated) => 7,
        Some(ActuatorError::Interrupted) => 130,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = err
        .downcast_ref::<ActuatorError>()
        .map_or("error", ActuatorError::class);
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
