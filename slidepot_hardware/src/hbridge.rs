//! H-bridge drive over Raspberry Pi PWM.
//!
//! Truth table used for both schemes (IN1/IN2 as duty fractions):
//!
//! | IN1 | IN2 | Effect   |
//! |-----|-----|----------|
//! | d   | 0   | forward  |
//! | 0   | d   | backward |
//! | 0   | 0   | coast    |

use rppal::gpio::{Gpio, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use slidepot_traits::{MotorDriver, PortError};
use tracing::debug;

use crate::error::{HwError, Result};
use crate::util::duty_fraction;

/// How the two bridge inputs are generated. Picked once at construction.
pub enum DriveScheme {
    /// Both inputs on the two channels of the SoC's shared PWM peripheral.
    HardwarePwm { in1: Pwm, in2: Pwm },
    /// Two standalone GPIO pins, each with its own software PWM generator.
    SoftwarePwm {
        in1: OutputPin,
        in2: OutputPin,
        frequency_hz: f64,
    },
}

pub struct HBridge {
    scheme: DriveScheme,
}

impl HBridge {
    /// Bridge on PWM0/PWM1. Pin muxing is fixed by the device tree overlay.
    pub fn hardware_pwm(frequency_hz: f64) -> Result<Self> {
        let open = |ch| {
            Pwm::with_frequency(ch, frequency_hz, 0.0, Polarity::Normal, true)
                .map_err(|e| HwError::Pwm(format!("open {ch:?}: {e}")))
        };
        Ok(Self {
            scheme: DriveScheme::HardwarePwm {
                in1: open(Channel::Pwm0)?,
                in2: open(Channel::Pwm1)?,
            },
        })
    }

    /// Bridge on two arbitrary BCM pins with software PWM.
    pub fn software_pwm(in1_pin: u8, in2_pin: u8, frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let output = |pin: u8| -> Result<OutputPin> {
            let mut p = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
                .into_output();
            p.set_low();
            Ok(p)
        };
        let in1 = output(in1_pin)?;
        let in2 = output(in2_pin)?;
        Ok(Self {
            scheme: DriveScheme::SoftwarePwm {
                in1,
                in2,
                frequency_hz,
            },
        })
    }

    fn set(&mut self, d1: f64, d2: f64) -> Result<()> {
        debug!(in1 = d1, in2 = d2, "h-bridge set");
        match &mut self.scheme {
            DriveScheme::HardwarePwm { in1, in2 } => {
                // Release the active side first so both inputs are never high together.
                let (first, first_d, second, second_d) = if d1 > 0.0 {
                    (&*in2, d2, &*in1, d1)
                } else {
                    (&*in1, d1, &*in2, d2)
                };
                first
                    .set_duty_cycle(first_d)
                    .map_err(|e| HwError::Pwm(e.to_string()))?;
                second
                    .set_duty_cycle(second_d)
                    .map_err(|e| HwError::Pwm(e.to_string()))?;
            }
            DriveScheme::SoftwarePwm {
                in1,
                in2,
                frequency_hz,
            } => {
                let freq = *frequency_hz;
                let apply = |pin: &mut OutputPin, d: f64| -> Result<()> {
                    if d <= 0.0 {
                        pin.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
                        pin.set_low();
                        Ok(())
                    } else {
                        pin.set_pwm_frequency(freq, d)
                            .map_err(|e| HwError::Gpio(e.to_string()))
                    }
                };
                if d1 > 0.0 {
                    apply(in2, d2)?;
                    apply(in1, d1)?;
                } else {
                    apply(in1, d1)?;
                    apply(in2, d2)?;
                }
            }
        }
        Ok(())
    }

    /// Coast, then surface the original failure.
    fn set_or_coast(&mut self, d1: f64, d2: f64) -> std::result::Result<(), PortError> {
        if let Err(e) = self.set(d1, d2) {
            if let Err(ce) = self.set(0.0, 0.0) {
                tracing::warn!(error = %ce, "coast after failed drive command also failed");
            }
            return Err(Box::new(e));
        }
        Ok(())
    }
}

impl MotorDriver for HBridge {
    fn drive_forward(&mut self, duty_percent: f32) -> std::result::Result<(), PortError> {
        self.set_or_coast(duty_fraction(duty_percent), 0.0)
    }
    fn drive_backward(&mut self, duty_percent: f32) -> std::result::Result<(), PortError> {
        self.set_or_coast(0.0, duty_fraction(duty_percent))
    }
    fn coast(&mut self) -> std::result::Result<(), PortError> {
        self.set(0.0, 0.0).map_err(|e| Box::new(e) as PortError)
    }
}

impl Drop for HBridge {
    fn drop(&mut self) {
        if let Err(e) = self.set(0.0, 0.0) {
            tracing::warn!(error = %e, "failed to coast h-bridge on drop");
        }
    }
}
