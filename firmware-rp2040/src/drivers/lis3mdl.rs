use embedded_hal::i2c::I2c;
use grib_flight::SensorError;

pub struct Lis3mdl<I> {
    i2c: I,
}

impl<I: I2c> Lis3mdl<I> {
    const ADDR: u8 = 0x1C;
    const WHO_AM_I: u8 = 0x3D;

    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(Self::ADDR, &[reg, value])
            .map_err(|_| SensorError::Bus)
    }

    /// Check the id and start continuous conversion at +/-4 gauss.
    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(Self::ADDR, &[0x0F], &mut id)
            .map_err(|_| SensorError::Bus)?;
        if id[0] != Self::WHO_AM_I {
            defmt::warn!("LIS3MDL: wrong id 0x{:x}", id[0]);
            return Err(SensorError::Bus);
        }

        // CTRL_REG1: ultra-high performance XY, 10 Hz
        self.write_reg(0x20, 0x70)?;
        // CTRL_REG2: +/-4 gauss
        self.write_reg(0x21, 0x00)?;
        // CTRL_REG3: continuous conversion
        self.write_reg(0x22, 0x00)?;
        // CTRL_REG4: ultra-high performance Z
        self.write_reg(0x23, 0x0C)?;
        // CTRL_REG5: block data update
        self.write_reg(0x24, 0x40)?;

        defmt::info!("LIS3MDL: online");
        Ok(())
    }

    /// Raw X/Y/Z counts.
    pub fn read_raw(&mut self) -> Result<[i16; 3], SensorError> {
        let mut data = [0u8; 6];
        // 0x80 sets register auto-increment.
        self.i2c
            .write_read(Self::ADDR, &[0x28 | 0x80], &mut data)
            .map_err(|_| SensorError::Bus)?;

        Ok([
            i16::from_le_bytes([data[0], data[1]]),
            i16::from_le_bytes([data[2], data[3]]),
            i16::from_le_bytes([data[4], data[5]]),
        ])
    }
}
