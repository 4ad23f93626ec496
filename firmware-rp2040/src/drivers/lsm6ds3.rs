use embedded_hal::i2c::I2c;
use grib_flight::sensors::InertialSample;
use grib_flight::SensorError;

pub struct Lsm6ds3<I> {
    i2c: I,
}

impl<I: I2c> Lsm6ds3<I> {
    const ADDR: u8 = 0x6A;
    const WHO_AM_I: u8 = 0x69;

    const CTRL1_XL: u8 = 0x10;
    const CTRL2_G: u8 = 0x11;
    const CTRL3_C: u8 = 0x12;
    const OUTX_L_G: u8 = 0x22;

    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Check the id, then run both sensors at 104 Hz (+/-2 g, 250 dps).
    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(Self::ADDR, &[0x0F], &mut id)
            .map_err(|_| SensorError::Bus)?;
        if id[0] != Self::WHO_AM_I {
            defmt::warn!("LSM6DS3: wrong id 0x{:x}", id[0]);
            return Err(SensorError::Bus);
        }

        for (reg, value) in [
            // BDU + register auto-increment
            (Self::CTRL3_C, 0x44),
            (Self::CTRL1_XL, 0x40),
            (Self::CTRL2_G, 0x40),
        ] {
            self.i2c
                .write(Self::ADDR, &[reg, value])
                .map_err(|_| SensorError::Bus)?;
        }

        defmt::info!("LSM6DS3: online");
        Ok(())
    }

    /// Gyro and accelerometer in one burst (gyro registers come first).
    pub fn read(&mut self) -> Result<InertialSample, SensorError> {
        let mut data = [0u8; 12];
        self.i2c
            .write_read(Self::ADDR, &[Self::OUTX_L_G], &mut data)
            .map_err(|_| SensorError::Bus)?;

        let word = |i: usize| i16::from_le_bytes([data[i], data[i + 1]]);
        Ok(InertialSample {
            angular_rate: [word(0), word(2), word(4)],
            acceleration: [word(6), word(8), word(10)],
        })
    }
}
