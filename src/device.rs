use crate::bus::I2cBus;
use crate::drivers::Chip;
use crate::{Capabilities, Clock, Error, Measurement, Quantity, SensorType, Stats};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// One attached barometer chip.
///
/// Owns the bus handle, a delay provider for the datasheet wait times and a
/// clock for the read cache. Not meant for concurrent use; wrap it in a mutex
/// if several contexts need it.
pub struct Barometer<I2C, D, C> {
    bus: I2cBus<I2C>,
    delay: D,
    clock: C,
    kind: SensorType,
    chip: Chip,
    capabilities: Capabilities,
    values: Measurement,
    cache_ttl_ms: u16,
    stats: Stats,
}

impl<I2C, I2CError, D, C> Barometer<I2C, D, C>
where
    I2C: I2c<Error = I2CError>,
    D: DelayNs,
    C: Clock,
{
    /// Probe (for chips with an identity register) and initialize the chip at `address`.
    ///
    /// Nothing is kept if any step fails; the chip may be left partially configured.
    pub fn new(
        i2c: I2C,
        address: u8,
        kind: SensorType,
        mut delay: D,
        clock: C,
    ) -> Result<Self, Error<I2CError>> {
        let mut bus = I2cBus::new(i2c, address);

        let chip = match Chip::create(kind, &mut bus, &mut delay) {
            Ok(chip) => chip,
            Err(err) => {
                error!("Could not create sensor type {} at I2C {:#x}", kind as u8, address);
                return Err(err);
            }
        };
        debug!("Successfully created sensor type {} at I2C {:#x}", kind as u8, address);

        Ok(Self {
            bus,
            delay,
            clock,
            kind,
            capabilities: chip.capabilities(),
            chip,
            values: Measurement::default(),
            cache_ttl_ms: 0,
            stats: Stats::default(),
        })
    }

    /// Run the chip teardown and hand back the bus.
    ///
    /// A failing chip teardown is logged and otherwise ignored.
    pub fn release(self) -> I2C {
        let Self {
            mut bus, kind, chip, ..
        } = self;

        if chip.destroy(&mut bus).is_err() {
            error!(
                "Could not destroy sensor type {} at I2C {:#x}",
                kind as u8,
                bus.address()
            );
        }
        bus.release()
    }

    /// Refresh the stored values from the chip, unless the last successful
    /// read is younger than the cache TTL.
    ///
    /// On failure the previous values are kept.
    pub fn read(&mut self) -> Result<(), Error<I2CError>> {
        let start = self.clock.now_us();
        self.stats.read += 1;

        if let Some(last) = self.stats.last_read_time_us {
            if start.saturating_sub(last) < u64::from(self.cache_ttl_ms) * 1000 {
                self.stats.read_success_cached += 1;
                return Ok(());
            }
        }

        self.values = self.chip.read(&mut self.bus, &mut self.delay)?;

        self.stats.read_success += 1;
        self.stats.read_success_us += self.clock.now_us().saturating_sub(start);
        // Cache age counts from the start of the read
        self.stats.last_read_time_us = Some(start);
        Ok(())
    }

    /// Pressure in Pa, reading through the cache.
    pub fn get_pressure(&mut self) -> Result<f32, Error<I2CError>> {
        self.get(Quantity::Pressure)
    }

    /// Temperature in °C, reading through the cache.
    pub fn get_temperature(&mut self) -> Result<f32, Error<I2CError>> {
        self.get(Quantity::Temperature)
    }

    /// Relative humidity in %, reading through the cache.
    ///
    /// BME280 chips report the capability but the driver does not compensate
    /// humidity yet, so this returns [`Error::NotSupported`] after the read.
    pub fn get_humidity(&mut self) -> Result<f32, Error<I2CError>> {
        self.get(Quantity::Humidity)
    }

    fn get(&mut self, quantity: Quantity) -> Result<f32, Error<I2CError>> {
        if !self.capabilities.contains(quantity) {
            return Err(Error::NotSupported);
        }
        self.read()?;
        self.last_value(quantity).ok_or(Error::NotSupported)
    }
}

impl<I2C, D, C> Barometer<I2C, D, C> {
    pub fn has_pressure(&self) -> bool {
        self.capabilities.pressure
    }

    pub fn has_temperature(&self) -> bool {
        self.capabilities.temperature
    }

    pub fn has_humidity(&self) -> bool {
        self.capabilities.humidity
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Stored value of `quantity` without touching the bus.
    pub fn last_value(&self, quantity: Quantity) -> Option<f32> {
        if !self.capabilities.contains(quantity) {
            return None;
        }
        match quantity {
            Quantity::Pressure => Some(self.values.pressure),
            Quantity::Temperature => Some(self.values.temperature),
            Quantity::Humidity => self.values.humidity,
        }
    }

    pub fn measurement(&self) -> Measurement {
        self.values
    }

    /// Zero disables caching.
    pub fn set_cache_ttl(&mut self, msecs: u16) {
        self.cache_ttl_ms = msecs;
    }

    pub fn cache_ttl(&self) -> u16 {
        self.cache_ttl_ms
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn sensor_type(&self) -> SensorType {
        self.kind
    }

    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Short chip name, at most 10 characters.
    pub fn name(&self) -> &'static str {
        match self.kind {
            SensorType::Mpl115 => "MPL115",
            SensorType::Mpl3115 => "MPL3115",
            SensorType::Bme280 if self.has_humidity() => "BME280",
            SensorType::Bme280 => "BMP280",
            SensorType::Ms5611 => "MS5611",
        }
    }
}

/// Tear down the sensor in `sensor`, if any, and leave `None` behind.
pub fn destroy<I2C, I2CError, D, C>(sensor: &mut Option<Barometer<I2C, D, C>>)
where
    I2C: I2c<Error = I2CError>,
    D: DelayNs,
    C: Clock,
{
    if let Some(sensor) = sensor.take() {
        sensor.release();
    }
}
