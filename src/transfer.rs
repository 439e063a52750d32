//! Byte transfer on the SHT1x bus.
//!
//! Bytes travel MSB first, one bit per SCK pulse, and each byte is followed by a ninth pulse
//! on which the receiver acknowledges by pulling DATA low.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::lines::{Direction, LineControl};
use crate::transport::Bus;

/// The level on DATA during the ninth, acknowledge, clock pulse.
///
/// When reading, this is what we send to the sensor: every byte but the last one is read with
/// `Ack`, and the checksum is read with `NoAck` to end the transmission. When writing, it is
/// what the sensor answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Acknowledge {
    /// DATA pulled low, more bytes may follow.
    Ack,
    /// DATA left high.
    NoAck,
}

impl Acknowledge {
    fn level(self) -> PinState {
        match self {
            Acknowledge::Ack => PinState::Low,
            Acknowledge::NoAck => PinState::High,
        }
    }
}

impl From<PinState> for Acknowledge {
    fn from(level: PinState) -> Self {
        match level {
            PinState::Low => Acknowledge::Ack,
            PinState::High => Acknowledge::NoAck,
        }
    }
}

impl<L: LineControl> Bus<L> {
    /// Write one byte and return the sensor's acknowledge.
    ///
    /// A missing acknowledge is not an error here: the byte has still been clocked out, and
    /// the caller decides what a `NoAck` means.
    pub fn write_byte(&mut self, value: u8, delay: &mut impl DelayNs) -> Result<Acknowledge, L::Error> {
        self.lines.set_data_direction(Direction::Output)?;

        for bit in (0..8).rev() {
            self.data(PinState::from(value & (1 << bit) != 0), delay)?;
            self.pulse_clock(delay)?;
        }

        // Release DATA and sample the sensor's acknowledge while SCK is high on pulse 9.
        self.lines.set_data(PinState::High)?;
        self.lines.set_data_direction(Direction::Input)?;
        self.clock(PinState::High, delay)?;
        let ack = Acknowledge::from(self.lines.read_data()?);
        self.lines.set_data_direction(Direction::Output)?;
        self.clock(PinState::Low, delay)?;

        Ok(ack)
    }

    /// Read one byte, answering with `ack` on the ninth clock pulse.
    ///
    /// There is no way to tell a corrupted byte from a good one at this level, the checksum
    /// byte that ends each reply is there for that.
    pub fn read_byte(&mut self, ack: Acknowledge, delay: &mut impl DelayNs) -> Result<u8, L::Error> {
        let mut value = 0u8;

        self.lines.set_data_direction(Direction::Output)?;
        self.lines.set_data(PinState::High)?;
        self.lines.set_data_direction(Direction::Input)?;

        for bit in (0..8).rev() {
            self.clock(PinState::High, delay)?;
            if self.lines.read_data()? == PinState::High {
                value |= 1 << bit;
            }
            self.clock(PinState::Low, delay)?;
        }

        self.lines.set_data_direction(Direction::Output)?;
        self.data(ack.level(), delay)?;
        self.pulse_clock(delay)?;
        self.lines.set_data(PinState::High)?;
        self.lines.set_data_direction(Direction::Input)?;

        Ok(value)
    }
}
