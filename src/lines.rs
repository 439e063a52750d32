//! The two physical lines of the SHT1x bus.
//!
//! Everything above this module talks to the sensor through [`LineControl`], so the protocol
//! code never touches a register or a HAL type directly. [`Lines`] is the implementation for
//! embedded-hal 1.0 pins, which is what most boards will want.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// Direction of the DATA line, as seen from the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Direction {
    /// We drive DATA.
    Output,
    /// DATA is released, the pull-up and the sensor decide its level.
    Input,
}

/// Access to the CLOCK (SCK) and DATA lines.
///
/// CLOCK is always an output. DATA is bidirectional and the protocol code switches its
/// direction itself, so implementations must not second-guess the order of calls: DATA is
/// switched to output before it is driven, and to input before it is sampled.
pub trait LineControl {
    /// Error raised by the underlying hardware.
    type Error;

    /// Drive CLOCK to `level`.
    fn set_clock(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Set the level DATA is driven to while it is an output.
    fn set_data(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Switch DATA between output and input.
    fn set_data_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Sample the current level of DATA.
    fn read_data(&mut self) -> Result<PinState, Self::Error>;
}

/// [`LineControl`] over a push-pull clock pin and an open-drain data pin.
///
/// The data pin must be configured open-drain with a pull-up (the datasheet suggests 10 kΩ),
/// so that "high" means released. `Lines` keeps an output latch for DATA the way a port
/// register does: while DATA is an input, `set_data` only updates the latch, and switching
/// back to output applies it.
pub struct Lines<SCK, DATA> {
    clock: SCK,
    data: DATA,
    direction: Direction,
    latch: PinState,
}

impl<SCK, DATA> Lines<SCK, DATA>
where
    DATA: InputPin + OutputPin,
    SCK: OutputPin<Error = <DATA as ErrorType>::Error>,
{
    /// Wrap the two pins. No pin is touched until the first bus operation.
    ///
    /// DATA starts out as an input with a high latch, matching the state the sensor expects
    /// after power on.
    pub fn new(clock: SCK, data: DATA) -> Self {
        Lines {
            clock,
            data,
            direction: Direction::Input,
            latch: PinState::High,
        }
    }

    /// Current direction of DATA.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Give the pins back.
    pub fn release(self) -> (SCK, DATA) {
        (self.clock, self.data)
    }
}

impl<SCK, DATA> LineControl for Lines<SCK, DATA>
where
    DATA: InputPin + OutputPin,
    SCK: OutputPin<Error = <DATA as ErrorType>::Error>,
{
    type Error = <DATA as ErrorType>::Error;

    fn set_clock(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.clock.set_state(level)
    }

    fn set_data(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.latch = level;
        match self.direction {
            Direction::Output => self.data.set_state(level),
            Direction::Input => Ok(()),
        }
    }

    fn set_data_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        if direction == self.direction {
            return Ok(());
        }
        self.direction = direction;
        match direction {
            Direction::Output => self.data.set_state(self.latch),
            Direction::Input => self.data.set_high(),
        }
    }

    fn read_data(&mut self) -> Result<PinState, Self::Error> {
        Ok(PinState::from(self.data.is_high()?))
    }
}
