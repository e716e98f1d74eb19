#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `slidepot`: command-line host for the slide-potentiometer controller.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error report handler: {e}");
    }
    // Usage errors exit 2 and --help/--version exit 0 through clap.
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let code = exit_code_for_error(&e);
        tracing::error!(code, error = %format!("{e:#}"), "exiting with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(code);
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = slidepot_config::load_file(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::Run {
            skip_calibration,
            cycles,
            hold,
        } => run::run(&cfg, skip_calibration, cycles, hold, cli.json, &shutdown),
        Commands::Calibrate => run::calibrate(&cfg, cli.json, &shutdown),
        Commands::Goto { voltage, tolerance } => {
            run::goto(&cfg, voltage, tolerance, cli.json, &shutdown)
        }
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}

/// Console logs go to stderr so stdout carries only results and reports.
fn init_tracing(json: bool, level: &str, logging: &slidepot_config::Logging) {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or(path.as_os_str());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or(level));
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        eprintln!("tracing subscriber already installed");
    }
}
