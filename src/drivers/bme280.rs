//! Bosch BME280 and its humidity-less sibling BMP280. Both share the register
//! map used here; the chip id tells them apart.
//!
//! Datasheet: <https://cdn-shop.adafruit.com/datasheets/BST-BME280_DS001-10.pdf>

use super::{Driver, PRESSURE_AND_TEMPERATURE};
use crate::bus::Bus;
use crate::core::{compensate_bme280, process_bme280_calibration, unpack_bme280_adc, Bme280Calib};
use crate::{Capabilities, Error, Measurement};
use embedded_hal::delay::DelayNs;

mod reg {
    pub const CALIB_T1_LSB: u8 = 0x88;
    pub const CHIP_ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const PRESS_MSB: u8 = 0xF7;
}

const BMP280_SAMPLE_ID_1: u8 = 0x56;
const BMP280_SAMPLE_ID_2: u8 = 0x57;
const BMP280_ID: u8 = 0x58;
const BME280_ID: u8 = 0x60;

const SOFT_RESET: u8 = 0xB6;
const SETTLE_TIME_MS: u32 = 10;

const MODE_SLEEP: u8 = 0x00;
const MODE_NORMAL: u8 = 0x03;
const OVERSAMPLING_2X: u8 = 0x02;
const OVERSAMPLING_16X: u8 = 0x05;
const STANDBY_0_5_MS: u8 = 0x00;
const FILTER_16X: u8 = 0x04;

/// Pressure x16, temperature x2.
const fn ctrl_meas(mode: u8) -> u8 {
    mode | (OVERSAMPLING_16X << 2) | (OVERSAMPLING_2X << 5)
}

/// t_sb[7:5], filter[4:2], spi3w_en[0] left off.
const fn config(standby: u8, filter: u8) -> u8 {
    (standby << 5) | (filter << 2)
}

pub(crate) struct Bme280 {
    calib: Bme280Calib,
    humidity: bool,
}

impl Driver for Bme280 {
    fn detect<B: Bus>(bus: &mut B) -> Result<Capabilities, Error<B::Error>> {
        let id = bus.read_reg(reg::CHIP_ID)?;
        match id {
            BMP280_SAMPLE_ID_1 | BMP280_SAMPLE_ID_2 => {
                info!("Preproduction version of BMP280 detected ({:#x})", id);
                Ok(Capabilities::NONE)
            }
            BMP280_ID => Ok(Capabilities::NONE),
            BME280_ID => Ok(Capabilities {
                humidity: true,
                ..Capabilities::NONE
            }),
            _ => Err(Error::InvalidChipId(id)),
        }
    }

    fn create<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
        detected: Capabilities,
    ) -> Result<Self, Error<B::Error>> {
        bus.write_reg(reg::RESET, SOFT_RESET)?;
        delay.delay_ms(SETTLE_TIME_MS);

        let mut bytes = [0u8; 24];
        bus.read_many(reg::CALIB_T1_LSB, &mut bytes)?;
        let calib = process_bme280_calibration(&bytes);

        bus.write_reg(reg::CONFIG, config(STANDBY_0_5_MS, FILTER_16X))?;
        delay.delay_ms(SETTLE_TIME_MS);
        bus.write_reg(reg::CTRL_MEAS, ctrl_meas(MODE_NORMAL))?;

        Ok(Self {
            calib,
            humidity: detected.humidity,
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            humidity: self.humidity,
            ..PRESSURE_AND_TEMPERATURE
        }
    }

    // TODO: read hum_msb/hum_lsb and the dig_H1..H6 trimming block (0xA1, 0xE1..0xE7)
    // so BME280 instances produce humidity.
    fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>> {
        let mut data = [0u8; 6];
        bus.read_many(reg::PRESS_MSB, &mut data)?;

        let (adc_p, adc_t) = unpack_bme280_adc(&data);
        trace!("Padc={} Tadc={}", adc_p, adc_t);

        let (pressure, temperature) = compensate_bme280(&self.calib, adc_p, adc_t);
        Ok(Measurement {
            pressure,
            temperature,
            humidity: None,
        })
    }

    /// `create` left the chip sampling continuously in normal mode.
    fn destroy<B: Bus>(self, bus: &mut B) -> Result<(), Error<B::Error>> {
        bus.write_reg(reg::CTRL_MEAS, ctrl_meas(MODE_SLEEP))?;
        Ok(())
    }
}
