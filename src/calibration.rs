//! Conversion of raw SHT1x codes into physical units.
//!
//! The coefficients are those of the datasheet for the default resolution (12 bit humidity,
//! 14 bit temperature) at a 3 V supply. Temperature is linear in the raw code; humidity is a
//! second order polynomial in its raw code, corrected for temperatures away from 25°C.

/// Humidity linearization, constant term.
pub const C1: f32 = -2.0468;
/// Humidity linearization, linear term.
pub const C2: f32 = 0.0367;
/// Humidity linearization, quadratic term.
pub const C3: f32 = -0.000_001_595_5;
/// Temperature offset in °C, 14 bit code at 3 V.
pub const D1: f32 = -39.6;
/// Temperature step in °C per count, 14 bit code.
pub const D2: f32 = 0.01;
/// Humidity temperature compensation, constant term.
pub const T1: f32 = 0.01;
/// Humidity temperature compensation, term proportional to the humidity code.
pub const T2: f32 = 0.000_08;

/// Lowest relative humidity reported.
pub const HUMIDITY_MIN: f32 = 0.1;
/// Highest relative humidity reported.
pub const HUMIDITY_MAX: f32 = 100.0;

/// Mask for the meaningful bits of a 12 bit humidity code.
pub const HUMIDITY_MASK: u16 = 0x0fff;
/// Mask for the meaningful bits of a 14 bit temperature code.
pub const TEMPERATURE_MASK: u16 = 0x3fff;

/// A calibrated reading.
///
/// The humidity is always within [`HUMIDITY_MIN`]..=[`HUMIDITY_MAX`]. The temperature is not
/// clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct PhysicalReading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Temperature compensated relative humidity in %.
    pub humidity: f32,
}

impl PhysicalReading {
    /// Temperature truncated towards zero to whole degrees.
    pub fn whole_degrees(&self) -> i16 {
        self.temperature as i16
    }

    /// Relative humidity truncated to whole percent.
    pub fn whole_percent(&self) -> u8 {
        self.humidity as u8
    }
}

/// Temperature in °C for a 14 bit code.
pub fn temperature(raw_temperature: u16) -> f32 {
    f32::from(raw_temperature) * D2 + D1
}

/// Linearized relative humidity in % for a 12 bit code, before temperature compensation.
pub fn humidity_linear(raw_humidity: u16) -> f32 {
    let rh = f32::from(raw_humidity);
    C3 * rh * rh + C2 * rh + C1
}

/// Calibrate a 12 bit humidity code and a 14 bit temperature code.
///
/// Both codes must already be repacked into plain integers, see
/// [`RawReading::humidity_code`](crate::RawReading::humidity_code) and
/// [`RawReading::temperature_code`](crate::RawReading::temperature_code).
pub fn calculate(raw_humidity: u16, raw_temperature: u16) -> PhysicalReading {
    let temperature = temperature(raw_temperature);
    let rh = f32::from(raw_humidity);
    let humidity = (temperature - 25.0) * (T1 + T2 * rh) + humidity_linear(raw_humidity);

    PhysicalReading {
        temperature,
        humidity: humidity.clamp(HUMIDITY_MIN, HUMIDITY_MAX),
    }
}
