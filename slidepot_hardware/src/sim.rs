//! Simulated slide potentiometer.
//!
//! The wiper position is integrated from cumulative drive time on the shared
//! clock: full duty for `forward_travel` moves the wiper from the backward
//! extreme to the forward extreme. Position is clamped at both ends, so
//! driving into an extreme is harmless. The voltage is a linear function of
//! position.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use slidepot_traits::{Clock, MotorDriver, PortError, PositionSensor};

use crate::error::HwError;
use crate::util::duty_fraction;

#[derive(Debug, Clone)]
pub struct SimParams {
    /// Full-duty time from the backward extreme to the forward extreme.
    pub forward_travel: Duration,
    /// Full-duty time from the forward extreme to the backward extreme.
    pub backward_travel: Duration,
    /// Wiper voltage at the backward extreme.
    pub backward_voltage: f32,
    /// Wiper voltage at the forward extreme.
    pub forward_voltage: f32,
    /// Initial position, 0.0 = backward extreme, 1.0 = forward extreme.
    pub start_position: f32,
    /// Peak amplitude of the deterministic noise added to every conversion.
    pub noise_v: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            forward_travel: Duration::from_millis(1200),
            backward_travel: Duration::from_millis(1200),
            backward_voltage: 0.0,
            forward_voltage: 3.3,
            start_position: 0.5,
            noise_v: 0.0,
        }
    }
}

/// How the simulated ADC answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorBehavior {
    #[default]
    Normal,
    /// Every conversion reports `HwError::NotAvailable`.
    Unavailable,
    /// Conversions succeed `after` times, the next one times out, then
    /// the sensor recovers.
    FaultOnce { after: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drive {
    Coast,
    Forward(f64),
    Backward(f64),
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    position: f64,
    drive: Drive,
    last_update: Instant,
    sensor: SensorBehavior,
    samples_ok: u32,
    samples_taken: u64,
    drive_fault: bool,
    drive_commands: u32,
    coast_commands: u32,
}

impl SimState {
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        let delta = match self.drive {
            Drive::Coast => return,
            Drive::Forward(duty) => duty * dt / travel_secs(self.params.forward_travel),
            Drive::Backward(duty) => -duty * dt / travel_secs(self.params.backward_travel),
        };
        self.position = (self.position + delta).clamp(0.0, 1.0);
    }

    fn voltage(&self) -> f32 {
        let lo = f64::from(self.params.backward_voltage);
        let hi = f64::from(self.params.forward_voltage);
        (lo + self.position * (hi - lo)) as f32
    }
}

#[inline]
fn travel_secs(d: Duration) -> f64 {
    d.as_secs_f64().max(1e-9)
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> Result<std::sync::MutexGuard<'_, SimState>, HwError> {
    state
        .lock()
        .map_err(|_| HwError::Simulation("simulator state poisoned".into()))
}

/// Handle on the simulated actuator; hands out the two ports and lets
/// tests inspect and perturb the simulation while the ports are in use.
#[derive(Clone)]
pub struct SimulatedActuator {
    state: Shared,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedActuator {
    pub fn new(params: SimParams, clock: impl Clock + Send + Sync + 'static) -> Self {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(clock);
        let position = f64::from(params.start_position.clamp(0.0, 1.0));
        let state = SimState {
            params,
            position,
            drive: Drive::Coast,
            last_update: clock.now(),
            sensor: SensorBehavior::Normal,
            samples_ok: 0,
            samples_taken: 0,
            drive_fault: false,
            drive_commands: 0,
            coast_commands: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    pub fn motor(&self) -> SimulatedMotor {
        SimulatedMotor {
            state: self.state.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn sensor(&self) -> SimulatedSensor {
        SimulatedSensor {
            state: self.state.clone(),
            clock: self.clock.clone(),
        }
    }

    fn inspect<T: Default>(&self, f: impl FnOnce(&mut SimState) -> T) -> T {
        match lock(&self.state) {
            Ok(mut s) => {
                s.advance(self.clock.now());
                f(&mut s)
            }
            Err(_) => T::default(),
        }
    }

    /// Current position, 0.0 (backward extreme) to 1.0 (forward extreme).
    pub fn position(&self) -> f64 {
        self.inspect(|s| s.position)
    }

    /// Noise-free wiper voltage at the current instant.
    pub fn voltage(&self) -> f32 {
        self.inspect(|s| s.voltage())
    }

    /// True while a forward or backward command is in effect.
    pub fn is_energized(&self) -> bool {
        self.inspect(|s| s.drive != Drive::Coast)
    }

    pub fn drive_commands(&self) -> u32 {
        self.inspect(|s| s.drive_commands)
    }

    pub fn coast_commands(&self) -> u32 {
        self.inspect(|s| s.coast_commands)
    }

    pub fn set_sensor_behavior(&self, behavior: SensorBehavior) {
        self.inspect(|s| {
            s.sensor = behavior;
            s.samples_ok = 0;
        });
    }

    /// Make every subsequent forward/backward command fail.
    pub fn set_drive_fault(&self, fault: bool) {
        self.inspect(|s| s.drive_fault = fault);
    }
}

/// Motor port of the simulated actuator.
pub struct SimulatedMotor {
    state: Shared,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedMotor {
    fn command(&mut self, drive: Drive) -> Result<(), PortError> {
        let mut s = lock(&self.state)?;
        s.advance(self.clock.now());
        if drive != Drive::Coast && s.drive_fault {
            // A failed command leaves the bridge coasting.
            s.drive = Drive::Coast;
            return Err(Box::new(HwError::Pwm("simulated bridge fault".into())));
        }
        match drive {
            Drive::Coast => s.coast_commands += 1,
            _ => s.drive_commands += 1,
        }
        s.drive = drive;
        tracing::trace!(?drive, position = s.position, "sim drive");
        Ok(())
    }
}

impl MotorDriver for SimulatedMotor {
    fn drive_forward(&mut self, duty_percent: f32) -> Result<(), PortError> {
        self.command(Drive::Forward(duty_fraction(duty_percent)))
    }
    fn drive_backward(&mut self, duty_percent: f32) -> Result<(), PortError> {
        self.command(Drive::Backward(duty_fraction(duty_percent)))
    }
    fn coast(&mut self) -> Result<(), PortError> {
        self.command(Drive::Coast)
    }
}

/// ADC port of the simulated actuator.
pub struct SimulatedSensor {
    state: Shared,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl PositionSensor for SimulatedSensor {
    fn sample(&mut self) -> Result<f32, PortError> {
        let mut s = lock(&self.state)?;
        s.advance(self.clock.now());
        match s.sensor {
            SensorBehavior::Normal => {}
            SensorBehavior::Unavailable => {
                return Err(Box::new(HwError::NotAvailable(
                    "simulated adc disabled".into(),
                )));
            }
            SensorBehavior::FaultOnce { after } => {
                if s.samples_ok == after {
                    s.sensor = SensorBehavior::Normal;
                    return Err(Box::new(HwError::Timeout));
                }
            }
        }
        s.samples_ok = s.samples_ok.saturating_add(1);
        s.samples_taken += 1;
        // Bounded pseudo-random noise in [-noise_v, noise_v]
        let noise = s.params.noise_v * ((s.samples_taken as f32) * 37.0).sin();
        let v = s.voltage() + noise;
        tracing::trace!(voltage = v, "sim sample");
        Ok(v)
    }
}
