/// Clamp a duty percentage to 0..=100 and return it as a 0.0..=1.0 fraction.
/// Non-finite input maps to 0 so a bad command can never energize the bridge.
#[inline]
pub fn duty_fraction(duty_percent: f32) -> f64 {
    if !duty_percent.is_finite() {
        return 0.0;
    }
    f64::from(duty_percent.clamp(0.0, 100.0)) / 100.0
}

/// Full-scale count of a 10-bit converter such as the MCP3008.
pub const ADC_MAX_RAW: u16 = 1023;

/// Convert a 10-bit ADC count to volts against `vref`.
#[inline]
pub fn raw_to_volts(raw: u16, vref: f32) -> f32 {
    f32::from(raw.min(ADC_MAX_RAW)) / f32::from(ADC_MAX_RAW) * vref
}

#[cfg(test)]
mod tests {
    use super::{duty_fraction, raw_to_volts};

    #[test]
    fn raw_counts_scale_to_vref() {
        assert_eq!(raw_to_volts(0, 3.3), 0.0);
        assert!((raw_to_volts(1023, 3.3) - 3.3).abs() < 1e-6);
        // Out-of-range counts saturate at full scale.
        assert!((raw_to_volts(4095, 3.3) - 3.3).abs() < 1e-6);
    }

    #[test]
    fn clamps_and_scales() {
        assert_eq!(duty_fraction(50.0), 0.5);
        assert_eq!(duty_fraction(150.0), 1.0);
        assert_eq!(duty_fraction(-3.0), 0.0);
        assert_eq!(duty_fraction(f32::NAN), 0.0);
    }
}
