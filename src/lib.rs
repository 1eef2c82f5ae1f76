//!
//! Barometer embedded-hal I2C driver crate
//!
//! A platform agnostic driver giving one interface over several barometric
//! pressure sensors: MPL115, MPL3115, BME280/BMP280 and MS5611. Each chip's
//! factory calibration is read at construction and applied to every sample.
//! This driver uses I2C via [embedded-hal].
//!
//! ## Units
//! - **Pressure**: Pascal (Pa)
//! - **Temperature**: degrees Celsius
//! - **Humidity**: % relative humidity
//!
//! [embedded-hal]: https://docs.rs/embedded-hal

#![no_std]

#[macro_use]
mod fmt;

mod bus;
mod core;
mod device;
mod drivers;

pub use device::{destroy, Barometer};

/// Supported chip families. Discriminants match the firmware's sensor type ids.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorType {
    Mpl115 = 1,
    Mpl3115 = 2,
    /// Also covers the BMP280, told apart at runtime by its chip id
    Bme280 = 3,
    Ms5611 = 4,
}

/// Raw sensor type id that names no supported chip.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidSensorType(pub u8);

impl TryFrom<u8> for SensorType {
    type Error = InvalidSensorType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SensorType::Mpl115),
            2 => Ok(SensorType::Mpl3115),
            3 => Ok(SensorType::Bme280),
            4 => Ok(SensorType::Ms5611),
            _ => Err(InvalidSensorType(value)),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum Error<I2CError> {
    /// I2C Interface Error
    I2CError(I2CError),
    /// Identity register holds an unexpected value
    InvalidChipId(u8),
    /// MS5611 PROM failed its CRC-4 check
    CrcMismatch,
    /// Data-ready flag never came up within the polling budget
    DataNotReady,
    /// The chip does not provide the requested quantity
    NotSupported,
}

impl<I2CError> From<I2CError> for Error<I2CError> {
    fn from(err: I2CError) -> Self {
        Error::I2CError(err)
    }
}

/// Quantities a sensor instance can measure.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub pressure: bool,
    pub temperature: bool,
    pub humidity: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        pressure: false,
        temperature: false,
        humidity: false,
    };

    const PRESSURE_BIT: u8 = 0x01;
    const TEMPERATURE_BIT: u8 = 0x02;
    const HUMIDITY_BIT: u8 = 0x04;

    pub fn from_bits(bits: u8) -> Self {
        Self {
            pressure: (bits & Self::PRESSURE_BIT) != 0,
            temperature: (bits & Self::TEMPERATURE_BIT) != 0,
            humidity: (bits & Self::HUMIDITY_BIT) != 0,
        }
    }

    /// Firmware encoding: 0x01 pressure, 0x02 temperature, 0x04 humidity.
    pub fn bits(&self) -> u8 {
        ((self.pressure as u8) * Self::PRESSURE_BIT)
            | ((self.temperature as u8) * Self::TEMPERATURE_BIT)
            | ((self.humidity as u8) * Self::HUMIDITY_BIT)
    }

    pub fn contains(&self, quantity: Quantity) -> bool {
        match quantity {
            Quantity::Pressure => self.pressure,
            Quantity::Temperature => self.temperature,
            Quantity::Humidity => self.humidity,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Pressure,
    Temperature,
    Humidity,
}

/// One compensated sample.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    /// Pa
    pub pressure: f32,
    /// °C
    pub temperature: f32,
    /// %RH, only for chips that produce it
    pub humidity: Option<f32>,
}

/// Read counters of one [`Barometer`].
///
/// Errors are not counted; see [`Stats::read_errors`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Clock value at the start of the last successful uncached read
    pub last_read_time_us: Option<u64>,
    /// Calls to [`Barometer::read`]
    pub read: u32,
    /// Reads that went to the chip and succeeded
    pub read_success: u32,
    /// Reads answered from the cache
    pub read_success_cached: u32,
    /// Time spent in successful uncached reads
    pub read_success_us: u64,
}

impl Stats {
    pub fn read_errors(&self) -> u32 {
        self.read - self.read_success - self.read_success_cached
    }
}

/// Monotonic time source backing the read cache and statistics.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&mut self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now_us(&mut self) -> u64 {
        T::now_us(self)
    }
}
