use embedded_hal::i2c::I2c;

/// Register-level transport the chip drivers talk through.
///
/// Register and command values are raw bytes since every supported chip has its own map.
pub(crate) trait Bus {
    type Error;

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;
    /// Write a bare command byte without register framing.
    fn write_cmd(&mut self, cmd: u8) -> Result<(), Self::Error>;
    fn read_reg(&mut self, reg: u8) -> Result<u8, Self::Error>;
    /// Read a big-endian 16 bit word.
    fn read_word(&mut self, reg: u8) -> Result<u16, Self::Error>;
    fn read_many(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

pub(crate) struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cBus<I2C> {
    pub(crate) fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub(crate) fn address(&self) -> u8 {
        self.address
    }

    pub(crate) fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, I2CError> Bus for I2cBus<I2C>
where
    I2C: I2c<Error = I2CError>,
{
    type Error = I2CError;

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[reg, value])
    }

    fn write_cmd(&mut self, cmd: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[cmd])
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut buffer: [u8; 1] = [0];
        self.i2c.write_read(self.address, &[reg], &mut buffer)?;
        Ok(buffer[0])
    }

    fn read_word(&mut self, reg: u8) -> Result<u16, Self::Error> {
        let mut buffer: [u8; 2] = [0; 2];
        self.i2c.write_read(self.address, &[reg], &mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }

    fn read_many(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[start], buf)
    }
}
