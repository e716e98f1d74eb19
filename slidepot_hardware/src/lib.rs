//! Motor and sensor ports for the slide-potentiometer controller.
//!
//! - `sim`: simulated actuator used by tests and by the CLI without hardware
//! - `stub`: ports for platforms with no drive or sensing support
//! - `hbridge` / `mcp3008` (feature `hardware`, Linux): Raspberry Pi backends

pub mod error;
pub mod sim;
pub mod stub;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hbridge;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod mcp3008;

pub use error::HwError;
pub use sim::{SensorBehavior, SimParams, SimulatedActuator, SimulatedMotor, SimulatedSensor};
pub use stub::{UnsupportedMotor, UnsupportedSensor};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use hbridge::{DriveScheme, HBridge};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use mcp3008::Mcp3008Sensor;
