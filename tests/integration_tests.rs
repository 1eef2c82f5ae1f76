use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use uf_barometer::{destroy, Barometer, Capabilities, Clock, Error, Quantity, SensorType};

const MPL115_ADDR: u8 = 0x60;
const MPL3115_ADDR: u8 = 0x60;
const BME280_ADDR: u8 = 0x76;
const MS5611_ADDR: u8 = 0x77;

const MPL115_COEFFS: [u8; 8] = [0x3e, 0xce, 0xb3, 0xf9, 0xc5, 0x17, 0x33, 0xc8];
const MPL115_ADC: [u8; 4] = [0x66, 0x80, 0x7e, 0xc0];

const BME280_CALIB: [u8; 24] = [
    112, 107, 67, 103, 24, 252, 125, 142, 67, 214, 208, 11, 39, 11, 140, 0, 249, 255, 140, 60,
    248, 198, 112, 23,
];

/// Datasheet coefficients C1..C6 with a factory word chosen so the CRC nibble is 4.
const MS5611_PROM: [[u8; 2]; 8] = [
    [0x40, 0x00],
    [0x9c, 0xbf],
    [0x90, 0x3c],
    [0x5b, 0x15],
    [0x5a, 0xf2],
    [0x82, 0xb8],
    [0x6e, 0x98],
    [0x00, 0x04],
];

struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Shared clock; every `now_us` call advances it by `tick_us`.
#[derive(Clone, Default)]
struct FakeClock {
    now_us: Rc<Cell<u64>>,
    tick_us: u64,
}

impl FakeClock {
    fn ticking(tick_us: u64) -> Self {
        Self {
            tick_us,
            ..Self::default()
        }
    }

    fn advance_ms(&self, ms: u64) {
        self.now_us.set(self.now_us.get() + ms * 1000);
    }
}

impl Clock for FakeClock {
    fn now_us(&mut self) -> u64 {
        let now = self.now_us.get();
        self.now_us.set(now + self.tick_us);
        now
    }
}

fn mpl115_create() -> Vec<I2cTransaction> {
    vec![I2cTransaction::write_read(
        MPL115_ADDR,
        vec![0x04],
        MPL115_COEFFS.to_vec(),
    )]
}

fn mpl115_read() -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(MPL115_ADDR, vec![0x12, 0x00]),
        I2cTransaction::write_read(MPL115_ADDR, vec![0x00], MPL115_ADC.to_vec()),
    ]
}

fn mpl3115_create() -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write_read(MPL3115_ADDR, vec![0x0C], vec![0xC4]),
        I2cTransaction::write(MPL3115_ADDR, vec![0x26, 0x04]),
        I2cTransaction::write(MPL3115_ADDR, vec![0x27, 0x00]),
        I2cTransaction::write(MPL3115_ADDR, vec![0x26, 0x39]),
        I2cTransaction::write(MPL3115_ADDR, vec![0x13, 0x07]),
    ]
}

fn mpl3115_data() -> I2cTransaction {
    I2cTransaction::write_read(
        MPL3115_ADDR,
        vec![0x01],
        vec![0x62, 0xD2, 0x30, 0x17, 0x80],
    )
}

fn bme280_create(chip_id: u8) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write_read(BME280_ADDR, vec![0xD0], vec![chip_id]),
        I2cTransaction::write(BME280_ADDR, vec![0xE0, 0xB6]),
        I2cTransaction::write_read(BME280_ADDR, vec![0x88], BME280_CALIB.to_vec()),
        I2cTransaction::write(BME280_ADDR, vec![0xF5, 0x10]),
        I2cTransaction::write(BME280_ADDR, vec![0xF4, 0x57]),
    ]
}

fn bme280_read() -> Vec<I2cTransaction> {
    vec![I2cTransaction::write_read(
        BME280_ADDR,
        vec![0xF7],
        vec![0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00],
    )]
}

fn bme280_sleep() -> I2cTransaction {
    I2cTransaction::write(BME280_ADDR, vec![0xF4, 0x54])
}

fn ms5611_create(prom: [[u8; 2]; 8]) -> Vec<I2cTransaction> {
    let mut expectations = vec![I2cTransaction::write(MS5611_ADDR, vec![0x1E])];
    for (i, word) in prom.iter().enumerate() {
        expectations.push(I2cTransaction::write_read(
            MS5611_ADDR,
            vec![0xA0 + (i as u8) * 2],
            word.to_vec(),
        ));
    }
    expectations
}

fn ms5611_read(d1: [u8; 3], d2: [u8; 3]) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(MS5611_ADDR, vec![0x58]),
        I2cTransaction::write_read(MS5611_ADDR, vec![0x00], d2.to_vec()),
        I2cTransaction::write(MS5611_ADDR, vec![0x48]),
        I2cTransaction::write_read(MS5611_ADDR, vec![0x00], d1.to_vec()),
    ]
}

fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{actual} != {expected} (±{tolerance})"
    );
}

fn create_ok(
    expectations: &[I2cTransaction],
    address: u8,
    kind: SensorType,
) -> Capabilities {
    let mut i2c = I2cMock::new(expectations);
    let baro = Barometer::new(&mut i2c, address, kind, NoopDelay, FakeClock::default()).unwrap();
    let capabilities = baro.capabilities();
    baro.release();
    i2c.done();
    capabilities
}

#[test]
fn test_create_sets_capabilities_per_chip() {
    let pt = Capabilities {
        pressure: true,
        temperature: true,
        humidity: false,
    };
    let pth = Capabilities {
        humidity: true,
        ..pt
    };

    assert_eq!(create_ok(&mpl115_create(), MPL115_ADDR, SensorType::Mpl115), pt);
    assert_eq!(create_ok(&mpl3115_create(), MPL3115_ADDR, SensorType::Mpl3115), pt);

    let mut bme = bme280_create(0x60);
    bme.push(bme280_sleep());
    assert_eq!(create_ok(&bme, BME280_ADDR, SensorType::Bme280), pth);

    for bmp_id in [0x56, 0x57, 0x58] {
        let mut bmp = bme280_create(bmp_id);
        bmp.push(bme280_sleep());
        assert_eq!(create_ok(&bmp, BME280_ADDR, SensorType::Bme280), pt);
    }

    assert_eq!(create_ok(&ms5611_create(MS5611_PROM), MS5611_ADDR, SensorType::Ms5611), pt);
}

#[test]
fn test_capability_bits() {
    let mut i2c = I2cMock::new(&bme280_create(0x60));
    let baro = Barometer::new(
        &mut i2c,
        BME280_ADDR,
        SensorType::Bme280,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();
    assert!(baro.has_pressure());
    assert!(baro.has_temperature());
    assert!(baro.has_humidity());
    assert_eq!(baro.capabilities().bits(), 0x07);
    assert_eq!(Capabilities::from_bits(0x03).bits(), 0x03);
    drop(baro);
    i2c.done();
}

#[test]
fn test_create_fails_on_any_transport_error() {
    let cases: [(fn() -> Vec<I2cTransaction>, u8, SensorType); 4] = [
        (mpl115_create, MPL115_ADDR, SensorType::Mpl115),
        (mpl3115_create, MPL3115_ADDR, SensorType::Mpl3115),
        (|| bme280_create(0x60), BME280_ADDR, SensorType::Bme280),
        (|| ms5611_create(MS5611_PROM), MS5611_ADDR, SensorType::Ms5611),
    ];

    for (script, address, kind) in cases {
        for failing_step in 0..script().len() {
            let mut expectations = script();
            expectations.truncate(failing_step + 1);
            let failing = expectations.pop().unwrap().with_error(ErrorKind::Other);
            expectations.push(failing);

            let mut i2c = I2cMock::new(&expectations);
            let result = Barometer::new(&mut i2c, address, kind, NoopDelay, FakeClock::default());
            assert!(
                matches!(result, Err(Error::I2CError(ErrorKind::Other))),
                "{kind:?} step {failing_step} did not fail"
            );
            drop(result);
            i2c.done();
        }
    }
}

#[test]
fn test_detect_rejects_unknown_chip_id() {
    let expectations = [I2cTransaction::write_read(MPL3115_ADDR, vec![0x0C], vec![0xC5])];
    let mut i2c = I2cMock::new(&expectations);
    let result = Barometer::new(
        &mut i2c,
        MPL3115_ADDR,
        SensorType::Mpl3115,
        NoopDelay,
        FakeClock::default(),
    );
    assert!(matches!(result, Err(Error::InvalidChipId(0xC5))));
    drop(result);
    i2c.done();

    let expectations = [I2cTransaction::write_read(BME280_ADDR, vec![0xD0], vec![0x61])];
    let mut i2c = I2cMock::new(&expectations);
    let result = Barometer::new(
        &mut i2c,
        BME280_ADDR,
        SensorType::Bme280,
        NoopDelay,
        FakeClock::default(),
    );
    assert!(matches!(result, Err(Error::InvalidChipId(0x61))));
    drop(result);
    i2c.done();
}

#[test]
fn test_ms5611_prom_crc() {
    let mut corrupted = MS5611_PROM;
    corrupted[7] = [0x00, 0x05];

    let mut i2c = I2cMock::new(&ms5611_create(corrupted));
    let result = Barometer::new(
        &mut i2c,
        MS5611_ADDR,
        SensorType::Ms5611,
        NoopDelay,
        FakeClock::default(),
    );
    assert!(matches!(result, Err(Error::CrcMismatch)));
    drop(result);
    i2c.done();

    let mut i2c = I2cMock::new(&ms5611_create([[0x00, 0x00]; 8]));
    let result = Barometer::new(
        &mut i2c,
        MS5611_ADDR,
        SensorType::Ms5611,
        NoopDelay,
        FakeClock::default(),
    );
    assert!(matches!(result, Err(Error::CrcMismatch)));
    drop(result);
    i2c.done();
}

#[test]
fn test_ms5611_read() {
    let mut expectations = ms5611_create(MS5611_PROM);
    expectations.extend(ms5611_read([0x8a, 0xa2, 0x1a], [0x82, 0xc1, 0x3e]));

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MS5611_ADDR,
        SensorType::Ms5611,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();

    baro.read().unwrap();
    let measurement = baro.measurement();
    assert_eq!(measurement.pressure, 100009.0);
    assert_close(measurement.temperature, 20.07, 0.001);
    assert_eq!(measurement.humidity, None);
    assert_eq!(baro.name(), "MS5611");
    baro.release();
    i2c.done();
}

#[test]
fn test_mpl115_compensation() {
    let mut expectations = mpl115_create();
    expectations.extend(mpl115_read());
    expectations.extend(mpl115_read());

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();

    assert_close(baro.get_pressure().unwrap(), 96587.33, 0.01);
    assert_close(baro.get_temperature().unwrap(), 23.32, 0.01);
    assert_eq!(baro.name(), "MPL115");
    baro.release();
    i2c.done();
}

#[test]
fn test_mpl3115_polls_until_data_ready() {
    let mut expectations = mpl3115_create();
    expectations.extend([
        I2cTransaction::write_read(MPL3115_ADDR, vec![0x00], vec![0x00]),
        I2cTransaction::write_read(MPL3115_ADDR, vec![0x00], vec![0x04]),
        I2cTransaction::write_read(MPL3115_ADDR, vec![0x00], vec![0x0E]),
        mpl3115_data(),
    ]);

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL3115_ADDR,
        SensorType::Mpl3115,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();

    baro.read().unwrap();
    assert_eq!(baro.last_value(Quantity::Pressure), Some(101192.75));
    assert_eq!(baro.last_value(Quantity::Temperature), Some(23.5));
    assert_eq!(baro.last_value(Quantity::Humidity), None);
    assert_eq!(baro.name(), "MPL3115");
    baro.release();
    i2c.done();
}

#[test]
fn test_mpl3115_data_ready_timeout() {
    let mut expectations = mpl3115_create();
    for _ in 0..101 {
        expectations.push(I2cTransaction::write_read(
            MPL3115_ADDR,
            vec![0x00],
            vec![0x00],
        ));
    }

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL3115_ADDR,
        SensorType::Mpl3115,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();

    assert!(matches!(baro.read(), Err(Error::DataNotReady)));
    let stats = baro.stats();
    assert_eq!(stats.read, 1);
    assert_eq!(stats.read_success, 0);
    assert_eq!(stats.read_errors(), 1);
    baro.release();
    i2c.done();
}

#[test]
fn test_read_cache() {
    let mut expectations = mpl115_create();
    expectations.extend(mpl115_read());
    expectations.extend(mpl115_read());

    let clock = FakeClock::default();
    clock.advance_ms(5000);

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        clock.clone(),
    )
    .unwrap();
    baro.set_cache_ttl(1000);

    baro.read().unwrap();
    assert_eq!(baro.stats().read_success, 1);
    assert_eq!(baro.stats().last_read_time_us, Some(5_000_000));

    // Served from the cache, no bus traffic
    clock.advance_ms(999);
    baro.read().unwrap();
    let stats = baro.stats();
    assert_eq!(stats.read_success, 1);
    assert_eq!(stats.read_success_cached, 1);

    clock.advance_ms(1);
    baro.read().unwrap();
    let stats = baro.stats();
    assert_eq!(stats.read, 3);
    assert_eq!(stats.read_success, 2);
    assert_eq!(stats.read_success_cached, 1);
    assert_eq!(stats.read_errors(), 0);
    assert_eq!(stats.last_read_time_us, Some(6_000_000));

    baro.release();
    i2c.done();
}

#[test]
fn test_zero_ttl_disables_cache() {
    let mut expectations = mpl115_create();
    expectations.extend(mpl115_read());
    expectations.extend(mpl115_read());

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();
    assert_eq!(baro.cache_ttl(), 0);

    baro.read().unwrap();
    baro.read().unwrap();
    assert_eq!(baro.stats().read_success, 2);
    assert_eq!(baro.stats().read_success_cached, 0);
    baro.release();
    i2c.done();
}

#[test]
fn test_read_time_accounting_uses_start_time() {
    let mut expectations = mpl115_create();
    expectations.extend(mpl115_read());

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        FakeClock::ticking(250),
    )
    .unwrap();

    baro.read().unwrap();
    let stats = baro.stats();
    assert_eq!(stats.last_read_time_us, Some(0));
    assert_eq!(stats.read_success_us, 250);
    baro.release();
    i2c.done();
}

#[test]
fn test_stats_invariant_across_mixed_reads() {
    let mut expectations = mpl115_create();
    expectations.extend(mpl115_read());
    expectations.push(
        I2cTransaction::write(MPL115_ADDR, vec![0x12, 0x00]).with_error(ErrorKind::Other),
    );
    expectations.push(I2cTransaction::write(MPL115_ADDR, vec![0x12, 0x00]));
    expectations.push(
        I2cTransaction::write_read(MPL115_ADDR, vec![0x00], MPL115_ADC.to_vec())
            .with_error(ErrorKind::Other),
    );
    expectations.extend(mpl115_read());

    let clock = FakeClock::default();
    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        clock.clone(),
    )
    .unwrap();
    baro.set_cache_ttl(100);

    baro.read().unwrap();
    let good = baro.measurement();
    baro.read().unwrap();

    clock.advance_ms(100);
    assert!(baro.read().is_err());
    assert!(baro.read().is_err());
    // A failed read leaves the previous values in place
    assert_eq!(baro.measurement(), good);

    baro.read().unwrap();
    baro.read().unwrap();

    let stats = baro.stats();
    assert_eq!(stats.read, 6);
    assert_eq!(stats.read_success, 2);
    assert_eq!(stats.read_success_cached, 2);
    assert_eq!(stats.read_errors(), 2);
    assert_eq!(
        stats.read_success_cached + stats.read_success + stats.read_errors(),
        stats.read
    );
    baro.release();
    i2c.done();
}

#[test]
fn test_bme280_humidity_capability_without_data() {
    let mut expectations = bme280_create(0x60);
    expectations.extend(bme280_read());
    expectations.push(bme280_sleep());

    let mut i2c = I2cMock::new(&expectations);
    let mut baro = Barometer::new(
        &mut i2c,
        BME280_ADDR,
        SensorType::Bme280,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();
    baro.set_cache_ttl(1000);

    assert!(baro.has_humidity());
    assert!(matches!(baro.get_humidity(), Err(Error::NotSupported)));
    // The read behind the failed humidity request is still cached
    assert_close(baro.get_pressure().unwrap(), 100653.26, 0.1);
    assert_close(baro.get_temperature().unwrap(), 25.08, 0.01);
    assert_eq!(baro.stats().read_success_cached, 2);
    baro.release();
    i2c.done();
}

#[test]
fn test_missing_capability_does_not_touch_bus() {
    let mut i2c = I2cMock::new(&mpl115_create());
    let mut baro = Barometer::new(
        &mut i2c,
        MPL115_ADDR,
        SensorType::Mpl115,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();

    assert!(!baro.has_humidity());
    assert!(matches!(baro.get_humidity(), Err(Error::NotSupported)));
    assert_eq!(baro.stats().read, 0);
    baro.release();
    i2c.done();
}

#[test]
fn test_name_tells_bme280_from_bmp280() {
    let mut i2c = I2cMock::new(&bme280_create(0x60));
    let bme = Barometer::new(
        &mut i2c,
        BME280_ADDR,
        SensorType::Bme280,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();
    assert_eq!(bme.name(), "BME280");
    assert_eq!(bme.sensor_type(), SensorType::Bme280);
    drop(bme);
    i2c.done();

    let mut i2c = I2cMock::new(&bme280_create(0x58));
    let bmp = Barometer::new(
        &mut i2c,
        BME280_ADDR,
        SensorType::Bme280,
        NoopDelay,
        FakeClock::default(),
    )
    .unwrap();
    assert_eq!(bmp.name(), "BMP280");
    assert_eq!(bmp.sensor_type(), SensorType::Bme280);
    drop(bmp);
    i2c.done();
}

#[test]
fn test_destroy_without_chip_teardown() {
    let mut i2c = I2cMock::new(&mpl3115_create());
    let mut handle = Some(
        Barometer::new(
            &mut i2c,
            MPL3115_ADDR,
            SensorType::Mpl3115,
            NoopDelay,
            FakeClock::default(),
        )
        .unwrap(),
    );

    destroy(&mut handle);
    assert!(handle.is_none());
    destroy(&mut handle);
    assert!(handle.is_none());
    drop(handle);
    i2c.done();
}

#[test]
fn test_destroy_ignores_chip_teardown_failure() {
    let mut expectations = bme280_create(0x58);
    expectations.push(bme280_sleep().with_error(ErrorKind::Other));

    let mut i2c = I2cMock::new(&expectations);
    let mut handle = Some(
        Barometer::new(
            &mut i2c,
            BME280_ADDR,
            SensorType::Bme280,
            NoopDelay,
            FakeClock::default(),
        )
        .unwrap(),
    );

    destroy(&mut handle);
    assert!(handle.is_none());
    drop(handle);
    i2c.done();
}

#[test]
fn test_sensor_type_ids() {
    assert_eq!(SensorType::try_from(1), Ok(SensorType::Mpl115));
    assert_eq!(SensorType::try_from(2), Ok(SensorType::Mpl3115));
    assert_eq!(SensorType::try_from(3), Ok(SensorType::Bme280));
    assert_eq!(SensorType::try_from(4), Ok(SensorType::Ms5611));
    assert!(SensorType::try_from(0).is_err());
    assert!(SensorType::try_from(5).is_err());
}
