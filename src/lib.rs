#![cfg_attr(not(test), no_std)]
//! SHT1x (SHT10, SHT11, SHT15) driver.
//!
//! The SHT1x talks a two-wire protocol that looks a bit like I2C but isn't: there is no
//! addressing and no arbitration, and the start condition is its own. No microcontroller has a
//! peripheral for it, so this driver bit-bangs it over two GPIO lines: SCK, always an output,
//! and DATA, an open-drain line that the driver switches between output and input.
//!
//! Example:
//!
//!     # use core::convert::Infallible;
//!     # use embedded_hal::digital::PinState;
//!     # use embedded_hal_mock::eh1::delay::NoopDelay;
//!     # use sht1x_driver::{Config, Direction, LineControl, SHT1x};
//!     # // A sensor that acknowledges everything, is ready at once and only ever sends zeros.
//!     # struct QuietLines;
//!     # impl LineControl for QuietLines {
//!     #     type Error = Infallible;
//!     #     fn set_clock(&mut self, _: PinState) -> Result<(), Infallible> { Ok(()) }
//!     #     fn set_data(&mut self, _: PinState) -> Result<(), Infallible> { Ok(()) }
//!     #     fn set_data_direction(&mut self, _: Direction) -> Result<(), Infallible> { Ok(()) }
//!     #     fn read_data(&mut self) -> Result<PinState, Infallible> { Ok(PinState::Low) }
//!     # }
//!     # let lines = QuietLines;
//!     # let mut delay = NoopDelay::new();
//!     // With real hardware: `let lines = Lines::new(sck_pin, data_pin);`
//!     let mut sht1x = SHT1x::new(lines, Config::default());
//!     sht1x.connection_reset(&mut delay).unwrap();
//!     let reading = sht1x.sample(&mut delay).unwrap();
//!
//!     println!("temperature (sht1x): {:.2}C", reading.temperature);
//!     println!("humidity (sht1x): {:.2}%", reading.humidity);
//!
//! [SHT1x Datasheet](https://sensirion.com/media/documents/BD45ECB5/61642783/Sensirion_Humidity_Sensors_SHT1x_Datasheet.pdf)
//!
//! One sampling cycle, as done by [`SHT1x::sample`]:
//!
//! ```text
//!       connection_reset (once, at start up)
//!                  │
//!                  ▼
//!     Start, Command::MeasureHumidity (0x05)  ◄──────────┐
//!                  │                                     │
//!                  ▼                                     │
//!   Poll DATA until low (ready) or timeout               │
//!                  │                                     │
//!                  ▼                                     │
//!     Read MSB (ack), LSB (ack), CRC (no ack)            │
//!                  │                                     │
//!                  ▼                                     │
//!   Same again with Command::MeasureTemperature (0x03)   │
//!                  │                                     │
//!                  ▼                                     │
//!      Any missing ack or timeout ─► Yes ─► connection_reset
//!                  │
//!                  ▼
//!                 No
//!                  │
//!                  ▼
//!   Repack codes, calc Humidity and Temp
//! ```

pub mod calibration;
pub mod lines;
pub mod transfer;
pub mod transport;

pub use calibration::{calculate, PhysicalReading};
pub use lines::{Direction, LineControl, Lines};
pub use transfer::Acknowledge;
pub use transport::Bus;

use crc_any::CRCu8;
use embedded_hal::delay::DelayNs;

/// Commands that can be sent to the SHT1x sensor.
///
/// Each command is the three address bits (always 000) followed by five command bits.
/// Datasheet section 3.2, Table 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Command {
    MeasureTemperature = 0b0000_0011,  // 0x03
    MeasureHumidity = 0b0000_0101,     // 0x05
    ReadStatusRegister = 0b0000_0111,  // 0x07
    WriteStatusRegister = 0b0000_0110, // 0x06
    // Resets the interface and clears the status register. Wait 11ms before the next command.
    SoftReset = 0b0001_1110, // 0x1E
}

/// Time the sensor needs to restart after [`Command::SoftReset`].
pub const SOFT_RESET_MS: u32 = 11;

/// What to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Mode {
    /// 14 bit temperature, [`Command::MeasureTemperature`].
    Temperature,
    /// 12 bit relative humidity, [`Command::MeasureHumidity`].
    Humidity,
}

impl Mode {
    /// The measurement command for this mode.
    pub fn command(self) -> Command {
        match self {
            Mode::Temperature => Command::MeasureTemperature,
            Mode::Humidity => Command::MeasureHumidity,
        }
    }
}

/// Bus timing and checksum handling.
///
/// The defaults suit any MCU clock: a 1µs settle time is far longer than the sensor needs,
/// and 65 535 polls 10µs apart outlast the sensor's 320ms worst case 14 bit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Config {
    /// Minimum time between two edges on SCK or DATA.
    pub settle_us: u32,
    /// Wait between two polls of DATA for the ready signal.
    pub ready_poll_interval_us: u32,
    /// Polls of DATA before a measurement counts as timed out.
    pub max_ready_polls: u32,
    /// Check the CRC of each measurement in [`SHT1x::sample`].
    ///
    /// Off by default, in which case the checksum byte is read but never looked at.
    pub verify_checksum: bool,
}

impl Config {
    /// The default configuration, usable in a `const`.
    pub const fn new() -> Self {
        Config {
            settle_us: 1,
            ready_poll_interval_us: 10,
            max_ready_polls: 65_535,
            verify_checksum: false,
        }
    }

    /// Same configuration, with CRC verification switched on or off.
    pub const fn verify_checksum(self, verify_checksum: bool) -> Self {
        Config {
            verify_checksum,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// The two ways a measurement can go wrong on the bus.
///
/// Neither aborts the measurement: the driver carries on and reads the reply anyway, leaving
/// it to the caller to throw the result away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Faults {
    /// The sensor did not acknowledge the command byte.
    pub no_acknowledge: bool,
    /// The sensor did not signal ready within `max_ready_polls`.
    pub ready_timeout: bool,
}

impl Faults {
    /// Number of faults, 0, 1 or 2.
    pub fn count(self) -> u8 {
        u8::from(self.no_acknowledge) + u8::from(self.ready_timeout)
    }

    /// No fault at all.
    pub fn is_empty(self) -> bool {
        self.count() == 0
    }
}

/// The three bytes the sensor sends back for a measurement, in the order they arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct RawReading {
    /// First byte on the wire, the high byte of the code.
    pub msb: u8,
    /// Second byte, the low byte of the code.
    pub lsb: u8,
    /// CRC over the command and both data bytes, as sent by the sensor.
    pub checksum: u8,
}

impl RawReading {
    /// The 16 bits of measurement data. The sensor sends the most significant byte first.
    pub fn raw(&self) -> u16 {
        u16::from_be_bytes([self.msb, self.lsb])
    }

    /// The 12 bit humidity code: the low four bits of the MSB and all of the LSB.
    pub fn humidity_code(&self) -> u16 {
        self.raw() & calibration::HUMIDITY_MASK
    }

    /// The 14 bit temperature code: the low six bits of the MSB and all of the LSB.
    pub fn temperature_code(&self) -> u16 {
        self.raw() & calibration::TEMPERATURE_MASK
    }
}

/// Result of [`SHT1x::measure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Measurement {
    /// What was measured.
    pub mode: Mode,
    /// The reply bytes, read even if a fault was seen.
    pub reading: RawReading,
    /// Missing acknowledge and ready timeout.
    pub faults: Faults,
}

impl Measurement {
    /// Number of faults seen while measuring, 0, 1 or 2.
    pub fn error_count(&self) -> u8 {
        self.faults.count()
    }

    /// The measured code with the bits that don't belong to it masked out.
    pub fn code(&self) -> u16 {
        match self.mode {
            Mode::Temperature => self.reading.temperature_code(),
            Mode::Humidity => self.reading.humidity_code(),
        }
    }

    /// Check the checksum byte against the command and the two data bytes.
    ///
    /// `status_register` is the sensor's status register at the time of the measurement, it
    /// seeds the CRC. It is 0 unless it has been written.
    pub fn checksum_matches(&self, status_register: u8) -> bool {
        let bytes = [self.mode.command() as u8, self.reading.msb, self.reading.lsb];
        compute_crc(status_register, &bytes) == self.reading.checksum
    }
}

/// Driver errors.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Error setting or reading one of the two lines
    Pin(E),
    /// The sensor did not acknowledge a command or status register write
    NoAcknowledge,
    /// A sampling cycle saw this many missing acknowledges and timeouts. The bus has been reset
    /// already, the next cycle can go ahead.
    Transaction(u8),
    /// CRC validation failed, only reported when `Config::verify_checksum` is set
    InvalidCrc,
}

/// An SHT1x sensor on the two lines `L`.
pub struct SHT1x<L> {
    bus: Bus<L>,
    config: Config,
    // Last known contents of the status register, seeds the CRC.
    status: u8,
}

impl<E, L> SHT1x<L>
where
    L: LineControl<Error = E>,
{
    /// Create a driver on `lines`.
    ///
    /// No line is touched. Call `connection_reset` before the first measurement, the state of
    /// the sensor's interface is unknown after power on.
    pub fn new(lines: L, config: Config) -> Self {
        SHT1x {
            bus: Bus::new(lines, config.settle_us),
            config,
            status: 0,
        }
    }

    /// The configuration this driver was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reset the sensor's serial interface.
    ///
    /// Nine clock pulses with DATA high, then a transmission start. The status register is
    /// kept.
    pub fn connection_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        #[cfg(feature = "use-defmt")]
        defmt::debug!("sht1x: connection reset");

        self.bus.reset(delay).map_err(Error::Pin)
    }

    /// Measure temperature or humidity once.
    ///
    /// A missing acknowledge for the command and a ready timeout are both recorded in the
    /// returned `Faults`; the three reply bytes are read regardless. This only returns `Err`
    /// if a line itself fails.
    ///
    /// ```text
    ///   Start, Command::MeasureTemperature (0x03) or MeasureHumidity (0x05)
    ///                  │
    ///                  ▼
    ///           Acknowledged ─► No ─► faults.no_acknowledge
    ///                  │
    ///                  ▼
    ///   Poll DATA, up to max_ready_polls ─► still high ─► faults.ready_timeout
    ///                  │
    ///                  ▼
    ///   Read MSB (Ack), LSB (Ack), checksum (NoAck)
    /// ```
    pub fn measure(&mut self, mode: Mode, delay: &mut impl DelayNs) -> Result<Measurement, Error<E>> {
        let mut faults = Faults::default();

        if self.send_command(mode.command(), delay)? == Acknowledge::NoAck {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("sht1x: no acknowledge for {}", mode);

            faults.no_acknowledge = true;
        }

        let ready = self
            .bus
            .wait_ready(self.config.max_ready_polls, self.config.ready_poll_interval_us, delay)
            .map_err(Error::Pin)?;
        if !ready {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("sht1x: {} measurement timed out", mode);

            faults.ready_timeout = true;
        }

        let msb = self.bus.read_byte(Acknowledge::Ack, delay).map_err(Error::Pin)?;
        let lsb = self.bus.read_byte(Acknowledge::Ack, delay).map_err(Error::Pin)?;
        let checksum = self.bus.read_byte(Acknowledge::NoAck, delay).map_err(Error::Pin)?;

        Ok(Measurement {
            mode,
            reading: RawReading { msb, lsb, checksum },
            faults,
        })
    }

    /// Measure humidity, then temperature, and calibrate the pair.
    ///
    /// If either measurement saw a fault, both are thrown away, the interface is reset with
    /// `connection_reset` and `Error::Transaction` is returned with the number of faults. The
    /// next call can go ahead straight away.
    pub fn sample(&mut self, delay: &mut impl DelayNs) -> Result<PhysicalReading, Error<E>> {
        let humidity = self.measure(Mode::Humidity, delay)?;
        let temperature = self.measure(Mode::Temperature, delay)?;

        let errors = humidity.error_count() + temperature.error_count();
        if errors != 0 {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("sht1x: {} errors, resetting", errors);

            self.connection_reset(delay)?;
            return Err(Error::Transaction(errors));
        }

        if self.config.verify_checksum
            && !(humidity.checksum_matches(self.status) && temperature.checksum_matches(self.status))
        {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("sht1x: checksum mismatch, resetting");

            self.connection_reset(delay)?;
            return Err(Error::InvalidCrc);
        }

        Ok(calculate(humidity.code(), temperature.code()))
    }

    /// Read the status register.
    ///
    /// With `Config::verify_checksum` set, the reply's CRC is checked. If the sensor does not
    /// acknowledge the command, the interface is reset before `Error::NoAcknowledge` is returned.
    pub fn read_status_register(&mut self, delay: &mut impl DelayNs) -> Result<u8, Error<E>> {
        if self.send_command(Command::ReadStatusRegister, delay)? == Acknowledge::NoAck {
            return self.not_acknowledged(delay);
        }

        let status = self.bus.read_byte(Acknowledge::Ack, delay).map_err(Error::Pin)?;
        let checksum = self.bus.read_byte(Acknowledge::NoAck, delay).map_err(Error::Pin)?;

        // The CRC is seeded with the register being read.
        if self.config.verify_checksum
            && compute_crc(status, &[Command::ReadStatusRegister as u8, status]) != checksum
        {
            return Err(Error::InvalidCrc);
        }

        self.status = status;
        Ok(status)
    }

    /// Write the status register.
    ///
    /// Bit 0 selects the low resolution mode (8 bit humidity, 12 bit temperature). The
    /// calibration in this crate is for the default 12/14 bit resolution only, so leave it
    /// cleared if you use `sample`. Bit 1 disables reloading calibration from OTP, bit 2 turns
    /// on the heater.
    ///
    /// If either byte is not acknowledged the interface is reset, and the cached status
    /// register is left as it was.
    pub fn write_status_register(&mut self, value: u8, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        let command_ack = self.send_command(Command::WriteStatusRegister, delay)?;
        let value_ack = self.bus.write_byte(value, delay).map_err(Error::Pin)?;

        if command_ack == Acknowledge::NoAck || value_ack == Acknowledge::NoAck {
            return self.not_acknowledged(delay);
        }

        self.status = value;
        Ok(())
    }

    /// Reset the interface and send the Soft Reset command.
    ///
    /// This clears the status register back to its defaults and takes 11ms. Without an
    /// acknowledge the interface is reset again and nothing is waited for.
    pub fn soft_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.bus.reset(delay).map_err(Error::Pin)?;
        let ack = self
            .bus
            .write_byte(Command::SoftReset as u8, delay)
            .map_err(Error::Pin)?;
        if ack == Acknowledge::NoAck {
            return self.not_acknowledged(delay);
        }

        delay.delay_ms(SOFT_RESET_MS);
        self.status = 0;
        Ok(())
    }

    /// Reset the interface after an unanswered command, then report it.
    fn not_acknowledged<T>(&mut self, delay: &mut impl DelayNs) -> Result<T, Error<E>> {
        #[cfg(feature = "use-defmt")]
        defmt::warn!("sht1x: command not acknowledged, resetting");

        self.connection_reset(delay)?;
        Err(Error::NoAcknowledge)
    }

    /// Generate a start and send `command`.
    fn send_command(&mut self, command: Command, delay: &mut impl DelayNs) -> Result<Acknowledge, Error<E>> {
        self.bus.start(delay).map_err(Error::Pin)?;
        self.bus.write_byte(command as u8, delay).map_err(Error::Pin)
    }

    /// Destroys this driver and releases the lines `L`
    pub fn destroy(self) -> L {
        self.bus.release()
    }
}

/// compute_crc uses the CRCu8 algorithm from crc-any, with the SHT1x's parameters.
///
/// From the Sensirion application note "CRC Checksum Calculation" for the SHTxx:
///
/// > polynomial x**8 + x**5 + x**4 + 1
///
/// Leaving out the x**8 term, the set bits are 5, 4 and 0, which is 0x31. The CRC covers the
/// command byte and every data byte, MSB first. Two quirks set it apart from the usual CRC-8:
///
/// * The initial value is the low nibble of the status register, bit-reversed. With the
///   default status register this is 0.
/// * The sensor sends the CRC bit-reversed, so we reverse ours to compare.
fn compute_crc(status_register: u8, bytes: &[u8]) -> u8 {
    let initial = (status_register & 0b0000_1111).reverse_bits();
    // Poly (0x31), bits (8), initial (see above), final_xor (0x00), reflect (false).
    let mut crc = CRCu8::create_crc(0x31, 8, initial, 0x00, false);
    crc.digest(bytes);
    crc.get_crc().reverse_bits()
}
