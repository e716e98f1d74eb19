use std::fmt;

/// Commanded motion of the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Coasting,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Coasting => "coasting",
        })
    }
}

/// Live view of the actuator, owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    pub current_voltage: f32,
    pub previous_reported_voltage: f32,
    pub direction: Direction,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self {
            current_voltage: 0.0,
            previous_reported_voltage: 0.0,
            direction: Direction::Coasting,
        }
    }
}
