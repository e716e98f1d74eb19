//! Test and helper mocks for slidepot_core

use slidepot_traits::{MotorDriver, PortError, PositionSensor};

/// A sensor whose platform has no ADC: every read is `ErrorKind::Unsupported`.
pub struct UnavailableSensor;

impl PositionSensor for UnavailableSensor {
    fn sample(&mut self) -> Result<f32, PortError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no adc on this platform",
        )))
    }
}

/// A sensor that returns a fixed voltage.
pub struct FixedSensor(pub f32);

impl PositionSensor for FixedSensor {
    fn sample(&mut self) -> Result<f32, PortError> {
        Ok(self.0)
    }
}

/// A motor that accepts every command and counts them.
#[derive(Debug, Default)]
pub struct CountingMotor {
    pub drives: u32,
    pub coasts: u32,
}

impl MotorDriver for CountingMotor {
    fn drive_forward(&mut self, _duty_percent: f32) -> Result<(), PortError> {
        self.drives += 1;
        Ok(())
    }
    fn drive_backward(&mut self, _duty_percent: f32) -> Result<(), PortError> {
        self.drives += 1;
        Ok(())
    }
    fn coast(&mut self) -> Result<(), PortError> {
        self.coasts += 1;
        Ok(())
    }
}
