use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use uf_barometer::{Barometer, Clock, SensorType};

const ADDR: u8 = 0x60;

struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Advances one millisecond per query.
struct StepClock(u64);

impl Clock for StepClock {
    fn now_us(&mut self) -> u64 {
        self.0 += 1000;
        self.0
    }
}

fn main() {
    let expectations = [
        // MPL115 coefficients a0, b1, b2, c12
        I2cTransaction::write_read(
            ADDR,
            vec![0x04],
            vec![0x3e, 0xce, 0xb3, 0xf9, 0xc5, 0x17, 0x33, 0xc8],
        ),
        // start conversion, then Padc/Tadc
        I2cTransaction::write(ADDR, vec![0x12, 0x00]),
        I2cTransaction::write_read(ADDR, vec![0x00], vec![0x66, 0x80, 0x7e, 0xc0]),
    ];

    let mut i2c = I2cMock::new(&expectations);
    let mut baro =
        Barometer::new(&mut i2c, ADDR, SensorType::Mpl115, NoopDelay, StepClock(0)).unwrap();
    baro.set_cache_ttl(500);

    let pressure = baro.get_pressure().unwrap();
    let temperature = baro.get_temperature().unwrap();
    let stats = baro.stats();
    let name = baro.name();
    baro.release();
    i2c.done();

    println!("{name}: {pressure:.2} Pa, {temperature:.2} °C");
    println!(
        "reads={} uncached={} cached={} errors={}",
        stats.read,
        stats.read_success,
        stats.read_success_cached,
        stats.read_errors()
    );
}
