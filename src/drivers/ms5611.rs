//! MEAS MS5611-01BA03.
//!
//! Datasheet: <http://www.amsys.info/sheets/amsys.en.ms5611_01ba03.pdf>

use super::{Driver, PRESSURE_AND_TEMPERATURE};
use crate::bus::Bus;
use crate::core::{compensate_ms5611, Ms5611Prom};
use crate::{Capabilities, Error, Measurement};
use embedded_hal::delay::DelayNs;

mod cmd {
    pub const RESET: u8 = 0x1E;
    pub const ADC_READ: u8 = 0x00;
    pub const ADC_CONV: u8 = 0x40;
    pub const ADC_D1: u8 = 0x00;
    pub const ADC_D2: u8 = 0x10;
    pub const ADC_256: u8 = 0x00;
    pub const ADC_512: u8 = 0x02;
    pub const ADC_1024: u8 = 0x04;
    pub const ADC_2048: u8 = 0x06;
    pub const ADC_4096: u8 = 0x08;
    pub const PROM_RD: u8 = 0xA0;
}

const RESET_TIME_MS: u32 = 3;

/// Max conversion time per OSR, rounded up.
fn conversion_time_us(command: u8) -> u32 {
    match command & 0x0F {
        cmd::ADC_256 => 900,
        cmd::ADC_512 => 3000,
        cmd::ADC_1024 => 4000,
        cmd::ADC_2048 => 6000,
        _ => 10000,
    }
}

pub(crate) struct Ms5611 {
    prom: Ms5611Prom,
}

impl Ms5611 {
    fn conversion<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
        command: u8,
    ) -> Result<u32, Error<B::Error>> {
        bus.write_cmd(command)?;
        delay.delay_us(conversion_time_us(command));

        let mut data = [0u8; 3];
        bus.read_many(cmd::ADC_READ, &mut data)?;
        Ok(((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32))
    }
}

impl Driver for Ms5611 {
    fn create<B: Bus, D: DelayNs>(
        bus: &mut B,
        delay: &mut D,
        _detected: Capabilities,
    ) -> Result<Self, Error<B::Error>> {
        bus.write_cmd(cmd::RESET)?;
        delay.delay_ms(RESET_TIME_MS);

        let mut prom = Ms5611Prom::default();
        for (i, word) in prom.words.iter_mut().enumerate() {
            *word = bus.read_word(cmd::PROM_RD + (i as u8) * 2)?;
        }

        if !prom.crc_valid() {
            error!("CRC4 failure on PROM data");
            return Err(Error::CrcMismatch);
        }

        Ok(Self { prom })
    }

    fn capabilities(&self) -> Capabilities {
        PRESSURE_AND_TEMPERATURE
    }

    fn read<B: Bus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Measurement, Error<B::Error>> {
        let d2 = Self::conversion(bus, delay, cmd::ADC_CONV | cmd::ADC_D2 | cmd::ADC_4096)
            .inspect_err(|_| error!("Could not read temperature ADC"))?;
        let d1 = Self::conversion(bus, delay, cmd::ADC_CONV | cmd::ADC_D1 | cmd::ADC_4096)
            .inspect_err(|_| error!("Could not read pressure ADC"))?;
        trace!("Padc={} Tadc={}", d1, d2);

        let (pressure, temperature) = compensate_ms5611(&self.prom, d1, d2);
        Ok(Measurement {
            pressure,
            temperature,
            humidity: None,
        })
    }
}
