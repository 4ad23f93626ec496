//! BMP280 barometer with the datasheet's integer compensation.

use embedded_hal::i2c::I2c;
use grib_flight::sensors::BarometerSample;
use grib_flight::SensorError;

const REG_CALIB: u8 = 0x88;
const REG_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_PRESS_MSB: u8 = 0xF7;

const CHIP_ID: u8 = 0x58;

/// Factory trim values read once at init.
#[derive(Clone, Copy, Debug, Default)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
}

impl Calibration {
    fn from_bytes(b: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([b[i], b[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    /// Returns (t_fine, temperature in 0.01 degC).
    fn temperature(&self, adc_t: i32) -> (i32, i32) {
        let t1 = i32::from(self.t1);
        let var1 = (((adc_t >> 3) - (t1 << 1)) * i32::from(self.t2)) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * i32::from(self.t3)) >> 14;
        let t_fine = var1 + var2;
        (t_fine, (t_fine * 5 + 128) >> 8)
    }

    /// Pressure in Pa, `None` if the trim values would divide by zero.
    fn pressure(&self, adc_p: i32, t_fine: i32) -> Option<u32> {
        let mut var1 = i64::from(t_fine) - 128_000;
        let mut var2 = var1 * var1 * i64::from(self.p6);
        var2 += (var1 * i64::from(self.p5)) << 17;
        var2 += i64::from(self.p4) << 35;
        var1 = ((var1 * var1 * i64::from(self.p3)) >> 8) + ((var1 * i64::from(self.p2)) << 12);
        var1 = (((1i64 << 47) + var1) * i64::from(self.p1)) >> 33;
        if var1 == 0 {
            return None;
        }
        let mut p = 1_048_576 - i64::from(adc_p);
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (i64::from(self.p9) * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (i64::from(self.p8) * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (i64::from(self.p7) << 4);
        // Q24.8
        u32::try_from(p >> 8).ok()
    }
}

pub struct Bmp280<I> {
    i2c: I,
    calibration: Calibration,
}

impl<I: I2c> Bmp280<I> {
    const ADDR: u8 = 0x76;

    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            calibration: Calibration::default(),
        }
    }

    /// Check the id, load trim values and start normal mode
    /// (x16 oversampling, IIR filter 2, 500 ms standby).
    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(Self::ADDR, &[REG_ID], &mut id)
            .map_err(|_| SensorError::Bus)?;
        if id[0] != CHIP_ID {
            defmt::warn!("BMP280: wrong id 0x{:x}", id[0]);
            return Err(SensorError::Bus);
        }

        let mut calib = [0u8; 24];
        self.i2c
            .write_read(Self::ADDR, &[REG_CALIB], &mut calib)
            .map_err(|_| SensorError::Bus)?;
        self.calibration = Calibration::from_bytes(&calib);

        self.i2c
            .write(Self::ADDR, &[REG_CONFIG, (0b100 << 5) | (0b001 << 2)])
            .map_err(|_| SensorError::Bus)?;
        self.i2c
            .write(Self::ADDR, &[REG_CTRL_MEAS, (0b101 << 5) | (0b101 << 2) | 0b11])
            .map_err(|_| SensorError::Bus)?;

        defmt::info!("BMP280: online");
        Ok(())
    }

    pub fn read(&mut self) -> Result<BarometerSample, SensorError> {
        let mut data = [0u8; 6];
        self.i2c
            .write_read(Self::ADDR, &[REG_PRESS_MSB], &mut data)
            .map_err(|_| SensorError::Bus)?;

        let adc_p = (i32::from(data[0]) << 12) | (i32::from(data[1]) << 4) | (i32::from(data[2]) >> 4);
        let adc_t = (i32::from(data[3]) << 12) | (i32::from(data[4]) << 4) | (i32::from(data[5]) >> 4);

        let (t_fine, centi) = self.calibration.temperature(adc_t);
        let pressure_pa = self
            .calibration
            .pressure(adc_p, t_fine)
            .ok_or(SensorError::NotReady)?;

        Ok(BarometerSample {
            temperature_centi: centi.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
            pressure_pa,
        })
    }
}
