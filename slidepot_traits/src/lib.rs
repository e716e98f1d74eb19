//! Port traits for the slide-potentiometer controller.
//!
//! The controller never talks to registers directly: it owns one `MotorDriver`
//! (the H-bridge) and one `PositionSensor` (the ADC on the wiper) and drives
//! them through these traits. Errors cross the boundary boxed so each backend
//! can keep its own error type.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error returned by every port call.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Two-terminal actuator behind an H-bridge.
///
/// Every call must be safe to repeat and must leave the bridge in a
/// deterministic state when it fails.
pub trait MotorDriver {
    /// Drive towards the forward extreme at `duty_percent` (0..=100).
    fn drive_forward(&mut self, duty_percent: f32) -> Result<(), PortError>;
    /// Drive towards the backward extreme at `duty_percent` (0..=100).
    fn drive_backward(&mut self, duty_percent: f32) -> Result<(), PortError>;
    /// De-energize both bridge outputs.
    fn coast(&mut self) -> Result<(), PortError>;
}

/// Wiper voltage sensor.
pub trait PositionSensor {
    /// One conversion, in volts.
    fn sample(&mut self) -> Result<f32, PortError>;

    /// Mean of `n` consecutive conversions; `n == 0` behaves like `n == 1`.
    /// Stops at the first failing conversion.
    fn sample_averaged(&mut self, n: u32) -> Result<f32, PortError> {
        let n = n.max(1);
        let mut sum = 0.0f32;
        for _ in 0..n {
            sum += self.sample()?;
        }
        Ok(sum / n as f32)
    }
}

impl<T: MotorDriver + ?Sized> MotorDriver for Box<T> {
    fn drive_forward(&mut self, duty_percent: f32) -> Result<(), PortError> {
        (**self).drive_forward(duty_percent)
    }
    fn drive_backward(&mut self, duty_percent: f32) -> Result<(), PortError> {
        (**self).drive_backward(duty_percent)
    }
    fn coast(&mut self) -> Result<(), PortError> {
        (**self).coast()
    }
}

impl<T: PositionSensor + ?Sized> PositionSensor for Box<T> {
    fn sample(&mut self) -> Result<f32, PortError> {
        (**self).sample()
    }
    fn sample_averaged(&mut self, n: u32) -> Result<f32, PortError> {
        (**self).sample_averaged(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(f32);
    impl PositionSensor for Ramp {
        fn sample(&mut self) -> Result<f32, PortError> {
            self.0 += 1.0;
            Ok(self.0)
        }
    }

    struct Broken;
    impl PositionSensor for Broken {
        fn sample(&mut self) -> Result<f32, PortError> {
            Err("adc offline".into())
        }
    }

    #[test]
    fn averaged_is_mean_of_samples() {
        let mut s = Ramp(0.0);
        // 1 + 2 + 3 + 4 = 10
        let v = s.sample_averaged(4).unwrap();
        assert!((v - 2.5).abs() < 1e-6);
    }

    #[test]
    fn averaged_zero_behaves_like_one() {
        let mut s = Ramp(0.0);
        assert_eq!(s.sample_averaged(0).unwrap(), 1.0);
    }

    #[test]
    fn averaged_propagates_first_error() {
        let mut s = Broken;
        let err = s.sample_averaged(8).unwrap_err();
        assert_eq!(err.to_string(), "adc offline");
    }
}
