//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "slidepot", version, about = "Slide-potentiometer actuator controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/slidepot.toml")]
    pub config: PathBuf,

    /// Log and print results as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate, then cycle between the extremes (or hold a voltage) until interrupted
    Run {
        /// Start without calibrating, even if [calibration] enabled = true
        #[arg(long, action = ArgAction::SetTrue)]
        skip_calibration: bool,
        /// Stop after this many completed cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Hold this wiper voltage instead of cycling (overrides [monitor] mode)
        #[arg(long, value_name = "VOLTS")]
        hold: Option<f32>,
    },
    /// Measure slide times and voltage effects, then print them
    Calibrate,
    /// Calibrate, then slide to a target wiper voltage
    Goto {
        /// Target wiper voltage
        #[arg(long, value_name = "VOLTS")]
        voltage: f32,
        /// Acceptable deviation in volts (defaults to [positioning] tolerance_v)
        #[arg(long, value_name = "VOLTS")]
        tolerance: Option<f32>,
    },
    /// Quick health check (drive and sense ports respond)
    SelfCheck,
}
