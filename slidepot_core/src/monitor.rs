//! Supervisory loop as an explicit state machine.
//!
//! Cycle mode: `Idle → DrivingForward → HoldForward → DrivingBackward →
//! HoldBackward → DrivingForward …`. Hold mode: `Idle → Positioning →
//! Holding → Positioning …`. Any fatal error moves to `Faulted`, which is
//! terminal. Each `step()` performs exactly one transition.

use std::fmt;

use crossbeam_channel as xch;
use slidepot_traits::{MotorDriver, PositionSensor};

use crate::config::{MonitorCfg, MonitorMode};
use crate::controller::SlidePotController;
use crate::error::{ActuatorError, Report, Result, classify};
use crate::hysteresis::HysteresisFilter;
use crate::util::duration_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    Idle,
    DrivingForward,
    HoldForward,
    DrivingBackward,
    HoldBackward,
    Positioning,
    Holding,
    Faulted,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MonitorState::Idle => "idle",
            MonitorState::DrivingForward => "driving_forward",
            MonitorState::HoldForward => "hold_forward",
            MonitorState::DrivingBackward => "driving_backward",
            MonitorState::HoldBackward => "hold_backward",
            MonitorState::Positioning => "positioning",
            MonitorState::Holding => "holding",
            MonitorState::Faulted => "faulted",
        })
    }
}

/// A sample admitted by the hysteresis filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageReport {
    pub voltage: f32,
    /// State whose move produced the sample.
    pub state: MonitorState,
    /// Completed cycles when the sample was taken.
    pub cycle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Entered `state`; `report` is set when a sample was admitted.
    Advanced {
        state: MonitorState,
        report: Option<VoltageReport>,
    },
    /// Shutdown requested at a cycle boundary; the bridge is coasting.
    Stopped,
}

type ShutdownCheck = Box<dyn Fn() -> bool + Send>;

pub struct Monitor<M: MotorDriver, S: PositionSensor> {
    controller: SlidePotController<M, S>,
    cfg: MonitorCfg,
    filter: HysteresisFilter,
    state: MonitorState,
    cycles: u64,
    max_cycles: Option<u64>,
    fault: Option<ActuatorError>,
    reports: Option<xch::Sender<VoltageReport>>,
    shutdown: Option<ShutdownCheck>,
    unavailable_warned: bool,
}

impl<M: MotorDriver, S: PositionSensor> Monitor<M, S> {
    pub fn new(controller: SlidePotController<M, S>, cfg: MonitorCfg) -> Self {
        let filter = HysteresisFilter::new(cfg.hysteresis);
        Self {
            controller,
            cfg,
            filter,
            state: MonitorState::Idle,
            cycles: 0,
            max_cycles: None,
            fault: None,
            reports: None,
            shutdown: None,
            unavailable_warned: false,
        }
    }

    /// Also send every admitted report on `tx`.
    pub fn with_reports(mut self, tx: xch::Sender<VoltageReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Polled at cycle boundaries; `true` stops the loop.
    pub fn with_shutdown_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.shutdown = Some(Box::new(f));
        self
    }

    /// Stop at the first cycle boundary after `n` completed cycles.
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The fatal classification once `Faulted`.
    pub fn fault(&self) -> Option<&ActuatorError> {
        self.fault.as_ref()
    }

    pub fn controller(&self) -> &SlidePotController<M, S> {
        &self.controller
    }

    pub fn into_controller(self) -> SlidePotController<M, S> {
        self.controller
    }

    /// Step until a fatal error or a shutdown request.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(mode = ?self.cfg.mode, dwell_ms = duration_ms(self.cfg.dwell), "monitor start");
        loop {
            if self.step()? == StepOutcome::Stopped {
                tracing::info!(cycles = self.cycles, "monitor stopped");
                return Ok(());
            }
        }
    }

    /// Perform exactly one transition.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if let Some(fault) = &self.fault {
            return Err(Report::new(fault.clone()).wrap_err("monitor loop is faulted"));
        }

        let next = self.next_state();
        if matches!(
            next,
            MonitorState::DrivingForward | MonitorState::Positioning
        ) && self.stop_requested()
        {
            if let Err(e) = self.controller.coast() {
                tracing::warn!(error = %e, "coast failed on shutdown");
            }
            return Ok(StepOutcome::Stopped);
        }

        tracing::debug!(from = %self.state, to = %next, "transition");
        self.state = next;
        match self.enter(next) {
            Ok(report) => Ok(StepOutcome::Advanced {
                state: next,
                report,
            }),
            Err(e) => Err(self.trip(e)),
        }
    }

    fn next_state(&self) -> MonitorState {
        match (self.cfg.mode, self.state) {
            (_, MonitorState::Faulted) => MonitorState::Faulted,
            (MonitorMode::Cycle, MonitorState::DrivingForward) => MonitorState::HoldForward,
            (MonitorMode::Cycle, MonitorState::HoldForward) => MonitorState::DrivingBackward,
            (MonitorMode::Cycle, MonitorState::DrivingBackward) => MonitorState::HoldBackward,
            (MonitorMode::Cycle, _) => MonitorState::DrivingForward,
            (MonitorMode::Hold { .. }, MonitorState::Positioning) => MonitorState::Holding,
            (MonitorMode::Hold { .. }, _) => MonitorState::Positioning,
        }
    }

    fn stop_requested(&self) -> bool {
        if self.max_cycles.is_some_and(|n| self.cycles >= n) {
            return true;
        }
        self.shutdown.as_ref().is_some_and(|f| f())
    }

    /// Entry action of `state`.
    fn enter(&mut self, state: MonitorState) -> Result<Option<VoltageReport>> {
        match state {
            MonitorState::DrivingForward => {
                self.controller.slide_forward()?;
                self.sample_and_report(state)
            }
            MonitorState::DrivingBackward => {
                self.controller.slide_backward()?;
                self.sample_and_report(state)
            }
            MonitorState::Positioning => {
                let target = match self.cfg.mode {
                    MonitorMode::Hold { target } => target,
                    MonitorMode::Cycle => return Ok(None),
                };
                let tolerance = self.controller.position_cfg().tolerance;
                self.controller.slide_to_voltage(target, tolerance)?;
                self.sample_and_report(state)
            }
            MonitorState::HoldForward => {
                self.dwell();
                Ok(None)
            }
            MonitorState::HoldBackward | MonitorState::Holding => {
                self.dwell();
                self.cycles += 1;
                tracing::info!(cycle = self.cycles, "cycle complete");
                Ok(None)
            }
            MonitorState::Idle | MonitorState::Faulted => Ok(None),
        }
    }

    fn dwell(&self) {
        self.controller.clock().sleep(self.cfg.dwell);
    }

    fn sample_and_report(&mut self, state: MonitorState) -> Result<Option<VoltageReport>> {
        let v = match self.controller.sample_voltage() {
            Ok(v) => v,
            Err(e) => match classify(&e) {
                Some(err) if !err.is_fatal() => {
                    if self.unavailable_warned {
                        tracing::trace!(error = %err, "sample skipped");
                    } else {
                        tracing::warn!(error = %err, "voltage sensing unavailable; continuing without reports");
                        self.unavailable_warned = true;
                    }
                    return Ok(None);
                }
                _ => return Err(e),
            },
        };

        let Some(voltage) = self.filter.admit(v) else {
            tracing::trace!(voltage = v, "suppressed by hysteresis");
            return Ok(None);
        };
        self.controller.state_mut().previous_reported_voltage = voltage;
        let report = VoltageReport {
            voltage,
            state,
            cycle: self.cycles,
        };
        tracing::info!(voltage, %state, cycle = self.cycles, "voltage");
        if let Some(tx) = &self.reports
            && tx.send(report).is_err()
        {
            tracing::debug!("report receiver gone");
        }
        Ok(Some(report))
    }

    /// Latch the fault, coast, and hand the error back.
    fn trip(&mut self, e: Report) -> Report {
        let fault = classify(&e)
            .cloned()
            .unwrap_or_else(|| ActuatorError::SensorFault(format!("{e:#}")));
        tracing::error!(class = fault.class(), error = %format!("{e:#}"), state = %self.state, "monitor faulted");
        self.state = MonitorState::Faulted;
        self.fault = Some(fault);
        if let Err(ce) = self.controller.coast() {
            tracing::warn!(error = %ce, "coast failed after fault");
        }
        e
    }
}
