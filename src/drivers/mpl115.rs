//! Freescale MPL115A2.
//!
//! Datasheet: <https://cdn-shop.adafruit.com/datasheets/MPL115A2.pdf>

use super::{Driver, PRESSURE_AND_TEMPERATURE};
use crate::bus::Bus;
use crate::core::{compensate_mpl115, process_mpl115_coefficients, Mpl115Coeffs};
use crate::{Capabilities, Error, Measurement};
use embedded_hal::delay::DelayNs;

mod reg {
    pub const PADC_MSB: u8 = 0x00;
    pub const A0_MSB: u8 = 0x04;
    pub const CONVERT: u8 = 0x12;
}

/// Max conversion time is 3 ms (table 2), with margin.
const CONVERSION_TIME_US: u32 = 4000;

pub(crate) struct Mpl115 {
    coeffs: Mpl115Coeffs,
}

impl Driver for Mpl115 {
    fn create<B: Bus, D: DelayNs>(
        bus: &mut B,
        _delay: &mut D,
        _detected: Capabilities,
    ) -> Result<Self, Error<B::Error>> {
        let mut bytes = [0u8; 8];
        bus.read_many(reg::A0_MSB, &mut bytes)?;

        Ok(Self {
            coeffs: process_mpl115_coefficients(&bytes),
        })
    }

    fn capabilities(&self) -> Capabilities {
        PRESSURE_AND_TEMPERATURE
    }

    fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>> {
        bus.write_reg(reg::CONVERT, 0x00)?;
        delay.delay_us(CONVERSION_TIME_US);

        let mut adc = [0u8; 4];
        bus.read_many(reg::PADC_MSB, &mut adc)?;

        let (pressure, temperature) = compensate_mpl115(&self.coeffs, &adc);
        Ok(Measurement {
            pressure,
            temperature,
            humidity: None,
        })
    }
}
