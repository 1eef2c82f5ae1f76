//! Calibration decoding and compensation math, kept free of any bus access.

/// MPL115 coefficients, already scaled to their fixed-point weights.
///
/// See datasheet section 3.1 (coefficient bit-width specification).
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct Mpl115Coeffs {
    pub a0: f32,
    pub b1: f32,
    pub b2: f32,
    pub c12: f32,
}

pub(crate) fn process_mpl115_coefficients(bytes: &[u8; 8]) -> Mpl115Coeffs {
    let a0 = i16::from_be_bytes([bytes[0], bytes[1]]);
    let b1 = i16::from_be_bytes([bytes[2], bytes[3]]);
    let b2 = i16::from_be_bytes([bytes[4], bytes[5]]);
    // c12 only carries 14 significant bits, left aligned
    let c12 = u16::from_be_bytes([bytes[6], bytes[7]]) >> 2;

    Mpl115Coeffs {
        a0: a0 as f32 / (1u32 << 3) as f32,
        b1: b1 as f32 / (1u32 << 13) as f32,
        b2: b2 as f32 / (1u32 << 14) as f32,
        c12: c12 as f32 / (1u32 << 22) as f32,
    }
}

/// Returns `(pressure Pa, temperature °C)` from the 4 ADC bytes starting at `Padc_MSB`.
pub(crate) fn compensate_mpl115(coeffs: &Mpl115Coeffs, adc: &[u8; 4]) -> (f32, f32) {
    let padc = (u16::from_be_bytes([adc[0], adc[1]]) >> 6) as f32;
    let tadc = (u16::from_be_bytes([adc[2], adc[3]]) >> 6) as f32;

    let pcomp = coeffs.a0 + (coeffs.b1 + coeffs.c12 * tadc) * padc + coeffs.b2 * tadc;

    // Pcomp spans 50..115 kPa over 0..1023 counts
    let pressure = ((pcomp as f64) * (65.0 / 1023.0) + 50.0) * 1000.0;
    let temperature = (tadc - 498.0) / -5.35 + 25.0;

    (pressure as f32, temperature)
}

/// Returns `(pressure Pa, temperature °C)` from the 5 data bytes starting at `OUT_P_MSB`.
///
/// Pressure is unsigned Q18.2, temperature signed Q8.4, both left aligned.
pub(crate) fn convert_mpl3115(data: &[u8; 5]) -> (f32, f32) {
    let pressure =
        (((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32)) >> 4;
    let temperature = get_twos_complement(
        (((data[3] as u32) << 8) | (data[4] as u32)) >> 4,
        12,
    );

    (pressure as f32 / 4.0, temperature as f32 / 16.0)
}

/// BME280/BMP280 trimming parameters, register 0x88..0x9F.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct Bme280Calib {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

pub(crate) fn process_bme280_calibration(bytes: &[u8; 24]) -> Bme280Calib {
    let word = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
    let signed = |i: usize| i16::from_le_bytes([bytes[i], bytes[i + 1]]);

    Bme280Calib {
        dig_t1: word(0),
        dig_t2: signed(2),
        dig_t3: signed(4),
        dig_p1: word(6),
        dig_p2: signed(8),
        dig_p3: signed(10),
        dig_p4: signed(12),
        dig_p5: signed(14),
        dig_p6: signed(16),
        dig_p7: signed(18),
        dig_p8: signed(20),
        dig_p9: signed(22),
    }
}

/// Splits the 6 burst-read bytes from `press_msb` into 20 bit `(adc_P, adc_T)`.
pub(crate) fn unpack_bme280_adc(data: &[u8; 6]) -> (i32, i32) {
    let unpack = |b: &[u8]| {
        (((b[0] as u32) << 12) | ((b[1] as u32) << 4) | ((b[2] as u32) >> 4)) as i32
    };
    (unpack(&data[0..3]), unpack(&data[3..6]))
}

/// Double precision compensation, datasheet section 8.1.
///
/// Returns `(pressure Pa, temperature °C)`. Pressure is 0 when the pressure
/// divisor collapses to zero.
pub(crate) fn compensate_bme280(calib: &Bme280Calib, adc_p: i32, adc_t: i32) -> (f32, f32) {
    let adc_t = adc_t as f64;
    let t1 = calib.dig_t1 as f64;

    let var1 = (adc_t / 16384.0 - t1 / 1024.0) * calib.dig_t2 as f64;
    let var2 = (adc_t / 131072.0 - t1 / 8192.0)
        * (adc_t / 131072.0 - t1 / 8192.0)
        * calib.dig_t3 as f64;
    let t_fine = (var1 + var2) as i32;
    let temperature = (var1 + var2) / 5120.0;

    let mut var1 = (t_fine as f64 / 2.0) - 64000.0;
    let mut var2 = var1 * var1 * calib.dig_p6 as f64 / 32768.0;
    var2 += var1 * calib.dig_p5 as f64 * 2.0;
    var2 = (var2 / 4.0) + (calib.dig_p4 as f64 * 65536.0);
    var1 = (calib.dig_p3 as f64 * var1 * var1 / 524288.0 + calib.dig_p2 as f64 * var1) / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * calib.dig_p1 as f64;

    let pressure = if var1 == 0.0 {
        0.0
    } else {
        let mut p = 1048576.0 - adc_p as f64;
        p = (p - (var2 / 4096.0)) * 6250.0 / var1;
        let var1 = calib.dig_p9 as f64 * p * p / 2147483648.0;
        let var2 = p * calib.dig_p8 as f64 / 32768.0;
        p + (var1 + var2 + calib.dig_p7 as f64) / 16.0
    };

    (pressure as f32, temperature as f32)
}

/// MS5611 PROM contents: factory word, C1..C6, serial/CRC word.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct Ms5611Prom {
    pub words: [u16; 8],
}

impl Ms5611Prom {
    /// CRC-4 over all eight words with the stored nibble masked out, per AN520.
    ///
    /// An all-zero PROM is rejected even though its CRC happens to match.
    pub(crate) fn crc_valid(&self) -> bool {
        let stored = (self.words[7] & 0x000F) as u32;
        let mut words = self.words;
        words[7] &= 0xFF00;

        if words.iter().all(|&w| w == 0) {
            return false;
        }

        let mut rem: u32 = 0;
        for i in 0..16 {
            let word = words[i >> 1] as u32;
            if i & 1 == 1 {
                rem ^= word & 0x00FF;
            } else {
                rem ^= word >> 8;
            }
            for _ in 0..8 {
                if rem & 0x8000 != 0 {
                    rem ^= 0x1800;
                }
                rem <<= 1;
            }
        }

        stored == ((rem >> 12) & 0x000F)
    }

    fn c(&self, n: usize) -> i64 {
        self.words[n] as i64
    }
}

/// Second order compensation, datasheet p.8-9.
///
/// Takes the raw 24 bit pressure (`d1`) and temperature (`d2`) conversions,
/// returns `(pressure Pa, temperature °C)`.
pub(crate) fn compensate_ms5611(prom: &Ms5611Prom, d1: u32, d2: u32) -> (f32, f32) {
    let dt = d2 as i64 - prom.c(5) * 256;
    let mut off = (prom.c(2) << 16) + ((prom.c(4) * dt) >> 7);
    let mut sens = (prom.c(1) << 15) + ((prom.c(3) * dt) >> 8);
    let mut temp = 2000 + ((dt * prom.c(6)) >> 23);

    if temp < 2000 {
        let low = temp - 2000;
        let low = 5 * low * low;
        off -= low >> 1;
        sens -= low >> 2;
        if temp < -1500 {
            let very_low = temp + 1500;
            let very_low = very_low * very_low;
            off -= 7 * very_low;
            sens -= (11 * very_low) >> 1;
        }
        temp -= (dt * dt) >> 31;
    }

    let pressure = (((d1 as i64 * sens) >> 21) - off) >> 15;

    (pressure as f32, temp as f32 / 100.0)
}

pub(crate) fn get_twos_complement(val: u32, length: u8) -> i32 {
    let mut ret = val as i32;
    if (val & ((1) << (length - 1))) > 0 {
        ret -= 1 << length;
    }
    ret
}
