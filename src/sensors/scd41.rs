//! Sensirion SCD41 photoacoustic CO2 sensor over I2C.

use crc::{Crc, CRC_8_NRSC_5};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::SensorError;

/// 7-bit bus address.
pub const SCD41_ADDRESS: u8 = 0x62;

/// Sensirion word CRC: poly 0x31, init 0xFF, no reflection.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

const CMD_START_PERIODIC: u16 = 0x21B1;
const CMD_READ_MEASUREMENT: u16 = 0xEC05;
const CMD_STOP_PERIODIC: u16 = 0x3F86;
const CMD_SET_AMBIENT_PRESSURE: u16 = 0xE000;

/// Command execution time before a read.
const READ_DELAY_MS: u32 = 1;

/// CRC of one 16-bit data word.
#[must_use]
pub fn word_crc(word: [u8; 2]) -> u8 {
    CRC8.checksum(&word)
}

/// One periodic measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Co2Measurement {
    pub co2_ppm: u16,
    pub temperature_c: f32,
    pub humidity_percent: f32,
}

pub struct Scd41<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Scd41<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay }
    }

    fn command(&mut self, cmd: u16) -> Result<(), SensorError> {
        self.i2c
            .write(SCD41_ADDRESS, &cmd.to_be_bytes())
            .map_err(|_| SensorError::Bus)
    }

    fn command_with_word(&mut self, cmd: u16, word: u16) -> Result<(), SensorError> {
        let [c0, c1] = cmd.to_be_bytes();
        let [w0, w1] = word.to_be_bytes();
        let frame = [c0, c1, w0, w1, word_crc([w0, w1])];
        self.i2c
            .write(SCD41_ADDRESS, &frame)
            .map_err(|_| SensorError::Bus)
    }

    pub fn start_periodic_measurement(&mut self) -> Result<(), SensorError> {
        self.command(CMD_START_PERIODIC)
    }

    /// The sensor ignores further commands for 500 ms after this.
    pub fn stop_periodic_measurement(&mut self) -> Result<(), SensorError> {
        self.command(CMD_STOP_PERIODIC)
    }

    /// Ambient pressure in units of 100 Pa.
    pub fn set_ambient_pressure(&mut self, hpa: u16) -> Result<(), SensorError> {
        self.command_with_word(CMD_SET_AMBIENT_PRESSURE, hpa)
    }

    /// Read CO2, temperature and humidity, checking every word's CRC.
    pub fn read_measurement(&mut self) -> Result<Co2Measurement, SensorError> {
        self.command(CMD_READ_MEASUREMENT)?;
        self.delay.delay_ms(READ_DELAY_MS);

        let mut buf = [0u8; 9];
        self.i2c
            .read(SCD41_ADDRESS, &mut buf)
            .map_err(|_| SensorError::Bus)?;

        let mut words = [0u16; 3];
        for (word, chunk) in words.iter_mut().zip(buf.chunks_exact(3)) {
            let data = [chunk[0], chunk[1]];
            if word_crc(data) != chunk[2] {
                return Err(SensorError::Crc);
            }
            *word = u16::from_be_bytes(data);
        }

        Ok(Co2Measurement {
            co2_ppm: words[0],
            temperature_c: -45.0 + 175.0 * f32::from(words[1]) / 65535.0,
            humidity_percent: 100.0 * f32::from(words[2]) / 65535.0,
        })
    }

    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use std::vec::Vec;

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Default)]
    struct MockI2c {
        writes: Vec<(u8, Vec<u8>)>,
        response: Vec<u8>,
        fail: bool,
    }

    impl ErrorType for MockI2c {
        type Error = ErrorKind;
    }

    impl I2c for MockI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => buf.copy_from_slice(&self.response[..buf.len()]),
                }
            }
            Ok(())
        }
    }

    fn word(w: u16) -> [u8; 3] {
        let [a, b] = w.to_be_bytes();
        [a, b, word_crc([a, b])]
    }

    #[test]
    fn test_sensirion_crc() {
        // Datasheet example.
        assert_eq!(word_crc([0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_read_measurement() {
        let mut i2c = MockI2c::default();
        for w in [850u16, 0x6667, 0x5EB9] {
            i2c.response.extend_from_slice(&word(w));
        }
        let mut scd = Scd41::new(i2c, NoDelay);

        let m = scd.read_measurement().unwrap();
        assert_eq!(m.co2_ppm, 850);
        assert!((m.temperature_c - 25.0).abs() < 0.01, "{}", m.temperature_c);
        assert!((m.humidity_percent - 37.0).abs() < 0.01, "{}", m.humidity_percent);

        let (i2c, _) = scd.release();
        assert_eq!(i2c.writes, [(SCD41_ADDRESS, std::vec![0xEC, 0x05])]);
    }

    #[test]
    fn test_crc_mismatch() {
        let mut i2c = MockI2c::default();
        i2c.response.extend_from_slice(&word(400));
        i2c.response.extend_from_slice(&[0x66, 0x67, 0x00]);
        i2c.response.extend_from_slice(&word(0));
        let mut scd = Scd41::new(i2c, NoDelay);
        assert_eq!(scd.read_measurement(), Err(SensorError::Crc));
    }

    #[test]
    fn test_bus_error() {
        let i2c = MockI2c {
            fail: true,
            ..MockI2c::default()
        };
        let mut scd = Scd41::new(i2c, NoDelay);
        assert_eq!(scd.start_periodic_measurement(), Err(SensorError::Bus));
    }

    #[test]
    fn test_word_command_carries_crc() {
        let mut scd = Scd41::new(MockI2c::default(), NoDelay);
        scd.set_ambient_pressure(1013).unwrap();
        let (i2c, _) = scd.release();
        let [hi, lo] = 1013u16.to_be_bytes();
        assert_eq!(
            i2c.writes[0].1,
            [0xE0, 0x00, hi, lo, word_crc([hi, lo])]
        );
    }
}
