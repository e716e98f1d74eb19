#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Slide-potentiometer controller (hardware-agnostic).
//!
//! All hardware access goes through `slidepot_traits::MotorDriver` and
//! `slidepot_traits::PositionSensor`; every wait goes through
//! `slidepot_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Calibration**: homing plus timed forward/backward passes (`calibration`)
//! - **Positioning**: predict-then-correct pulses to a target voltage (`positioning`)
//! - **Monitor**: cycle/hold state machine with hysteresis-gated reports (`monitor`)
//! - **Errors**: typed taxonomy and port error classification (`error`, `hw_error`)
//! - **Threading**: the `slidePot` controller thread (`worker`)

pub mod builder;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod hysteresis;
pub mod mocks;
pub mod monitor;
pub mod positioning;
pub mod runner;
pub mod types;
pub mod util;
pub mod worker;

pub use builder::ControllerBuilder;
pub use calibration::CalibrationResult;
pub use config::{CalibrationCfg, DriveCfg, MonitorCfg, MonitorMode, PositionCfg, SensorCfg};
pub use controller::{InterruptCheck, SlidePotController};
pub use error::{ActuatorError, BuildError, CalibrationFailure};
pub use hysteresis::HysteresisFilter;
pub use monitor::{Monitor, MonitorState, StepOutcome, VoltageReport};
pub use runner::RunOptions;
pub use types::{ActuatorState, Direction};
pub use worker::ControllerThread;
