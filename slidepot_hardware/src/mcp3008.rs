//! Wiper voltage through an MCP3008 (10-bit, 8-channel SPI ADC).

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use slidepot_traits::{PortError, PositionSensor};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::raw_to_volts;

pub struct Mcp3008Sensor {
    spi: Spi,
    channel: u8,
    vref: f32,
}

impl Mcp3008Sensor {
    pub fn new(channel: u8, clock_hz: u32, vref: f32) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::NotSupported(format!(
                "mcp3008 has no channel {channel}"
            )));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_hz, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(Self { spi, channel, vref })
    }

    /// Single-ended conversion on the configured channel.
    pub fn read_raw(&mut self) -> Result<u16> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        let n = self
            .spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        if n != rx.len() {
            return Err(HwError::Timeout);
        }
        let raw = (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]);
        trace!(raw, channel = self.channel, "mcp3008 raw read");
        Ok(raw)
    }
}

impl PositionSensor for Mcp3008Sensor {
    fn sample(&mut self) -> std::result::Result<f32, PortError> {
        let raw = self.read_raw()?;
        Ok(raw_to_volts(raw, self.vref))
    }
}
