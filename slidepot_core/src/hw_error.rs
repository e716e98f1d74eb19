//! Maps `Box<dyn Error>` from the port traits to typed `ActuatorError`s.
//!
//! The traits in `slidepot_traits` box their errors so each backend keeps its
//! own type; this module converts them, with a feature-gated path for
//! `slidepot_hardware::HwError` downcasting.

use crate::error::ActuatorError;

/// True when the error says the capability is missing rather than broken.
///
/// Attempts to downcast known error types first, then falls back to
/// message heuristics.
pub fn is_platform_limitation(e: &(dyn std::error::Error + 'static)) -> bool {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<slidepot_hardware::error::HwError>() {
            return hw.is_platform_limitation();
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return io.kind() == std::io::ErrorKind::Unsupported;
    }

    // Fallback: string-based detection
    let s = e.to_string().to_lowercase();
    s.contains("not implemented") || s.contains("not supported") || s.contains("not available")
}

/// Map a sensor-port error: platform limitations are `SensorUnavailable`,
/// everything else is a `SensorFault`.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> ActuatorError {
    if is_platform_limitation(e) {
        ActuatorError::SensorUnavailable(e.to_string())
    } else {
        ActuatorError::SensorFault(e.to_string())
    }
}

/// Map a motor-port error. Drive failures are never tolerated.
pub fn map_motor_error(e: &(dyn std::error::Error + 'static)) -> ActuatorError {
    ActuatorError::Drive(e.to_string())
}
