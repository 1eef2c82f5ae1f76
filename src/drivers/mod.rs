//! Chip drivers and the dispatch over them.
//!
//! Each chip implements [`Driver`]; [`Chip`] is the closed set of drivers a
//! [`crate::Barometer`] can be bound to. The binding is chosen once, at
//! construction, from the requested [`SensorType`].

mod bme280;
mod mpl115;
mod mpl3115;
mod ms5611;

use crate::bus::Bus;
use crate::{Capabilities, Error, Measurement, SensorType};
use embedded_hal::delay::DelayNs;

use bme280::Bme280;
use mpl115::Mpl115;
use mpl3115::Mpl3115;
use ms5611::Ms5611;

pub(crate) const PRESSURE_AND_TEMPERATURE: Capabilities = Capabilities {
    pressure: true,
    temperature: true,
    humidity: false,
};

pub(crate) trait Driver: Sized {
    /// Confirm the chip identity before `create`.
    ///
    /// Chips without an identity register keep this no-op. The returned
    /// capabilities are what the identity revealed beyond the chip family
    /// defaults and are handed to `create`.
    fn detect<B: Bus>(_bus: &mut B) -> Result<Capabilities, Error<B::Error>> {
        Ok(Capabilities::NONE)
    }

    /// Reset and configure the chip, reading its factory calibration.
    fn create<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
        detected: Capabilities,
    ) -> Result<Self, Error<B::Error>>;

    fn capabilities(&self) -> Capabilities;

    /// Acquire one compensated sample.
    fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>>;

    /// Chip level teardown. The calibration state is dropped with `self` either way.
    fn destroy<B: Bus>(self, _bus: &mut B) -> Result<(), Error<B::Error>> {
        Ok(())
    }
}

pub(crate) enum Chip {
    Mpl115(Mpl115),
    Mpl3115(Mpl3115),
    Bme280(Bme280),
    Ms5611(Ms5611),
}

impl Chip {
    pub(crate) fn create<B: Bus, D: DelayNs>(
        kind: SensorType,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Self, Error<B::Error>> {
        let chip = match kind {
            SensorType::Mpl115 => Chip::Mpl115(bind(bus, delay)?),
            SensorType::Mpl3115 => Chip::Mpl3115(bind(bus, delay)?),
            SensorType::Bme280 => Chip::Bme280(bind(bus, delay)?),
            SensorType::Ms5611 => Chip::Ms5611(bind(bus, delay)?),
        };
        Ok(chip)
    }

    pub(crate) fn capabilities(&self) -> Capabilities {
        match self {
            Chip::Mpl115(chip) => chip.capabilities(),
            Chip::Mpl3115(chip) => chip.capabilities(),
            Chip::Bme280(chip) => chip.capabilities(),
            Chip::Ms5611(chip) => chip.capabilities(),
        }
    }

    pub(crate) fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>> {
        match self {
            Chip::Mpl115(chip) => chip.read(bus, delay),
            Chip::Mpl3115(chip) => chip.read(bus, delay),
            Chip::Bme280(chip) => chip.read(bus, delay),
            Chip::Ms5611(chip) => chip.read(bus, delay),
        }
    }

    pub(crate) fn destroy<B: Bus>(self, bus: &mut B) -> Result<(), Error<B::Error>> {
        match self {
            Chip::Mpl115(chip) => chip.destroy(bus),
            Chip::Mpl3115(chip) => chip.destroy(bus),
            Chip::Bme280(chip) => chip.destroy(bus),
            Chip::Ms5611(chip) => chip.destroy(bus),
        }
    }
}

fn bind<T: Driver, B: Bus, D: DelayNs>(bus: &mut B, delay: &mut D) -> Result<T, Error<B::Error>> {
    let detected = T::detect(bus).inspect_err(|_| debug!("detect failed"))?;
    T::create(bus, delay, detected).inspect_err(|_| debug!("create failed"))
}
