//! Transmission framing: the Start and Reset sequences, and the clock and data edges they are
//! built from.
//!
//! ```text
//! Start:
//!        _____         ________
//! DATA:       |_______|
//!            ___     ___
//! SCK : ____|   |___|   |______
//!
//! Reset (at least 9 clocks with DATA high, then Start):
//!        _____________________________________________________         ________
//! DATA:                                                       |_______|
//!           _    _    _    _    _    _    _    _    _        ___     ___
//! SCK : ___| |__| |__| |__| |__| |__| |__| |__| |__| |______|   |___|   |______
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use crate::lines::{Direction, LineControl};

/// Clock pulses sent with DATA high during a connection reset.
pub const RESET_CLOCKS: usize = 9;

/// The SHT1x bus: the two lines plus the minimum time between edges.
///
/// Every edge produced through `Bus` is followed by `settle_us` of delay, so the sensor always
/// gets a stable level to sample.
pub struct Bus<L> {
    pub(crate) lines: L,
    settle_us: u32,
}

impl<L: LineControl> Bus<L> {
    /// Create a bus over `lines`, waiting `settle_us` after every edge.
    pub fn new(lines: L, settle_us: u32) -> Self {
        Bus { lines, settle_us }
    }

    /// Give the lines back.
    pub fn release(self) -> L {
        self.lines
    }

    /// Generate a transmission start.
    ///
    /// DATA is lowered while SCK is high, followed by a low pulse on SCK and DATA rising again
    /// while SCK is high. DATA is left as an input.
    pub fn start(&mut self, delay: &mut impl DelayNs) -> Result<(), L::Error> {
        self.lines.set_data_direction(Direction::Output)?;
        self.lines.set_data(PinState::High)?;
        self.clock(PinState::Low, delay)?;

        self.clock(PinState::High, delay)?;
        self.data(PinState::Low, delay)?;
        self.clock(PinState::Low, delay)?;
        // The SCK low period in the middle of the start is held three times as long.
        delay.delay_us(self.settle_us);
        delay.delay_us(self.settle_us);
        self.clock(PinState::High, delay)?;
        self.data(PinState::High, delay)?;
        self.clock(PinState::Low, delay)?;

        self.lines.set_data_direction(Direction::Input)
    }

    /// Generate a connection reset: [`RESET_CLOCKS`] clock pulses with DATA high, then a
    /// transmission start.
    ///
    /// Use this whenever the state of the sensor's interface is unknown, e.g. after a failed
    /// transaction. It does not clear the status register, see
    /// [`SHT1x::soft_reset`](crate::SHT1x::soft_reset) for that.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), L::Error> {
        self.lines.set_data_direction(Direction::Output)?;
        self.lines.set_data(PinState::High)?;
        self.clock(PinState::Low, delay)?;

        for _ in 0..RESET_CLOCKS {
            self.pulse_clock(delay)?;
        }

        self.start(delay)
    }

    /// Poll DATA until the sensor pulls it low, at most `max_polls` times.
    ///
    /// Returns `true` if the sensor signalled ready. DATA is left as an input.
    pub fn wait_ready(
        &mut self,
        max_polls: u32,
        poll_interval_us: u32,
        delay: &mut impl DelayNs,
    ) -> Result<bool, L::Error> {
        self.lines.set_data_direction(Direction::Input)?;

        for _ in 0..max_polls {
            if self.lines.read_data()? == PinState::Low {
                break;
            }
            delay.delay_us(poll_interval_us);
        }

        // The line is sampled once more, whether the loop ran out or not. A ready sensor keeps
        // DATA low until the first data bit is clocked out.
        Ok(self.lines.read_data()? == PinState::Low)
    }

    /// One full SCK pulse, high then low.
    pub(crate) fn pulse_clock(&mut self, delay: &mut impl DelayNs) -> Result<(), L::Error> {
        self.clock(PinState::High, delay)?;
        self.clock(PinState::Low, delay)
    }

    pub(crate) fn clock(&mut self, level: PinState, delay: &mut impl DelayNs) -> Result<(), L::Error> {
        self.lines.set_clock(level)?;
        delay.delay_us(self.settle_us);
        Ok(())
    }

    pub(crate) fn data(&mut self, level: PinState, delay: &mut impl DelayNs) -> Result<(), L::Error> {
        self.lines.set_data(level)?;
        delay.delay_us(self.settle_us);
        Ok(())
    }
}
