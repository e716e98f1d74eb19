use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("adc conversion timeout")]
    Timeout,
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("not available: {0}")]
    NotAvailable(String),
    #[error("simulation error: {0}")]
    Simulation(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl HwError {
    /// True for the platform limitations a control loop may tolerate:
    /// the capability is missing rather than broken.
    pub fn is_platform_limitation(&self) -> bool {
        matches!(
            self,
            HwError::NotImplemented(_) | HwError::NotSupported(_) | HwError::NotAvailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
