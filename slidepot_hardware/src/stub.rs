//! Ports for platforms that have no H-bridge or ADC support.
//!
//! Every call reports `HwError::NotImplemented`, which the controller treats
//! as a platform limitation for sensing and as a drive failure for motion.

use slidepot_traits::{MotorDriver, PortError, PositionSensor};

use crate::error::HwError;

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedMotor;

impl MotorDriver for UnsupportedMotor {
    fn drive_forward(&mut self, _duty_percent: f32) -> Result<(), PortError> {
        Err(Box::new(HwError::NotImplemented("h-bridge drive")))
    }
    fn drive_backward(&mut self, _duty_percent: f32) -> Result<(), PortError> {
        Err(Box::new(HwError::NotImplemented("h-bridge drive")))
    }
    fn coast(&mut self) -> Result<(), PortError> {
        // Nothing can be energized on this platform.
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSensor;

impl PositionSensor for UnsupportedSensor {
    fn sample(&mut self) -> Result<f32, PortError> {
        Err(Box::new(HwError::NotImplemented("voltage sensing")))
    }
}
