//! Freescale MPL3115A2.
//!
//! Datasheet: <https://cdn-shop.adafruit.com/datasheets/1893_datasheet.pdf>

use super::{Driver, PRESSURE_AND_TEMPERATURE};
use crate::bus::Bus;
use crate::core::convert_mpl3115;
use crate::{Capabilities, Error, Measurement};
use embedded_hal::delay::DelayNs;

mod reg {
    pub const STATUS: u8 = 0x00;
    pub const OUT_P_MSB: u8 = 0x01;
    pub const WHO_AM_I: u8 = 0x0C;
    pub const PT_DATA_CFG: u8 = 0x13;
    pub const CTRL_REG1: u8 = 0x26;
    pub const CTRL_REG2: u8 = 0x27;
}

const DEVICE_ID: u8 = 0xC4;

/// STATUS.PTDR, new pressure or temperature data available
const STATUS_PTDR: u8 = 0x08;
const CTRL1_RST: u8 = 0x04;
/// Barometer mode, OS = 128, active
const CTRL1_BARO_OS128_ACTIVE: u8 = 0x39;
/// Auto acquisition step 2^0 = 1 s
const CTRL2_ST_1S: u8 = 0x00;
/// DREM | PDEFE | TDEFE
const PT_DATA_CFG_ALL: u8 = 0x07;

const RESET_TIME_MS: u32 = 20;
const DATA_READY_POLL_MS: u32 = 10;
const DATA_READY_RETRIES: u8 = 100;

pub(crate) struct Mpl3115;

impl Mpl3115 {
    fn wait_data_ready<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
    ) -> Result<(), Error<B::Error>> {
        let mut status = bus.read_reg(reg::STATUS)?;
        let mut retries = DATA_READY_RETRIES;

        while status & STATUS_PTDR == 0 {
            if retries == 0 {
                error!("Timed out waiting for data ready");
                return Err(Error::DataNotReady);
            }
            delay.delay_ms(DATA_READY_POLL_MS);
            status = bus.read_reg(reg::STATUS)?;
            retries -= 1;
        }

        Ok(())
    }
}

impl Driver for Mpl3115 {
    fn detect<B: Bus>(bus: &mut B) -> Result<Capabilities, Error<B::Error>> {
        let id = bus.read_reg(reg::WHO_AM_I)?;
        if id != DEVICE_ID {
            return Err(Error::InvalidChipId(id));
        }
        Ok(Capabilities::NONE)
    }

    fn create<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
        _detected: Capabilities,
    ) -> Result<Self, Error<B::Error>> {
        bus.write_reg(reg::CTRL_REG1, CTRL1_RST)?;
        delay.delay_ms(RESET_TIME_MS);

        bus.write_reg(reg::CTRL_REG2, CTRL2_ST_1S)?;
        bus.write_reg(reg::CTRL_REG1, CTRL1_BARO_OS128_ACTIVE)?;
        bus.write_reg(reg::PT_DATA_CFG, PT_DATA_CFG_ALL)?;

        Ok(Self)
    }

    fn capabilities(&self) -> Capabilities {
        PRESSURE_AND_TEMPERATURE
    }

    fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>> {
        Self::wait_data_ready(bus, delay)?;

        let mut data = [0u8; 5];
        bus.read_many(reg::OUT_P_MSB, &mut data)?;

        let (pressure, temperature) = convert_mpl3115(&data);
        Ok(Measurement {
            pressure,
            temperature,
            humidity: None,
        })
    }
}
