//! Dedicated controller thread.
//!
//! The thread owns the controller and its ports; the handle owns the join
//! handle, the shutdown flag and the report receiver. Dropping the handle
//! requests shutdown and joins, so the thread cannot leak.
use crossbeam_channel as xch;
use slidepot_traits::{MotorDriver, PositionSensor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::controller::SlidePotController;
use crate::error::Result;
use crate::monitor::VoltageReport;
use crate::runner::{self, RunOptions};

pub const THREAD_NAME: &str = "slidePot";

pub struct ControllerThread {
    reports: xch::Receiver<VoltageReport>,
    /// Shutdown flag, polled during start-up and at cycle boundaries
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<Result<()>>>,
}

impl ControllerThread {
    pub fn spawn<M, S>(controller: SlidePotController<M, S>, opts: RunOptions) -> std::io::Result<Self>
    where
        M: MotorDriver + Send + 'static,
        S: PositionSensor + Send + 'static,
    {
        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let check = move || shutdown_clone.load(Ordering::Relaxed);
                let res = runner::run(controller, &opts, Some(tx), check);
                match &res {
                    Ok(()) => tracing::info!("controller thread exiting cleanly"),
                    Err(e) => tracing::error!(error = %format!("{e:#}"), "controller thread exiting"),
                }
                res
            })?;

        Ok(Self {
            reports: rx,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    pub fn reports(&self) -> &xch::Receiver<VoltageReport> {
        &self.reports
    }

    /// Abort start-up, or stop the monitor at the next cycle boundary.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Wait for the thread and return the run's outcome.
    pub fn join(mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| eyre::eyre!("controller thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for ControllerThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(Ok(())) => tracing::trace!("controller thread joined"),
                Ok(Err(e)) => tracing::debug!(error = %e, "controller thread ended with error"),
                Err(e) => tracing::warn!(?e, "controller thread panicked during shutdown"),
            }
        }
    }
}
