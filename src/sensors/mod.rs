//! Sensor collaborators sampled by the superloop.

pub mod analog;
pub mod scd41;

pub use analog::AnalogChannel;
pub use scd41::{Co2Measurement, Scd41};

/// Error type for sensor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// I2C/ADC transaction failed.
    Bus,
    /// Transaction did not complete in time.
    Timeout,
    /// Data word failed its checksum.
    Crc,
    /// Sensor has no new data yet.
    NotReady,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => write!(f, "bus error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Crc => write!(f, "crc mismatch"),
            Self::NotReady => write!(f, "not ready"),
        }
    }
}

/// Barometer output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BarometerSample {
    /// Hundredths of a degree Celsius.
    pub temperature_centi: i16,
    pub pressure_pa: u32,
}

/// Raw accelerometer and gyroscope counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InertialSample {
    pub acceleration: [i16; 3],
    pub angular_rate: [i16; 3],
}

/// Every per-cycle input except the temperature probe and the GPS.
///
/// Each read returns the newest sample or an error; the superloop keeps the
/// last good value and raises the matching fault bit.
pub trait SensorSuite {
    /// One-time start-up (e.g. starting periodic measurement).
    fn begin(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read_barometer(&mut self) -> Result<BarometerSample, SensorError>;

    fn read_inertial(&mut self) -> Result<InertialSample, SensorError>;

    /// Raw magnetometer counts.
    fn read_magnetometer(&mut self) -> Result<[i16; 3], SensorError>;

    /// CO2 in ppm.
    fn read_co2(&mut self) -> Result<u16, SensorError>;

    /// Raw 12-bit conversion of one multiplexed channel.
    fn read_analog(&mut self, channel: AnalogChannel) -> Result<u16, SensorError>;

    /// Ground switch reads open (pulled-up input low).
    fn switch_open(&mut self) -> bool;
}

/// Last good value of a sensor plus whether the latest read failed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LastKnown<T> {
    value: T,
    faulted: bool,
    errors: u32,
}

impl<T: Copy> LastKnown<T> {
    pub const fn new(initial: T) -> Self {
        Self {
            value: initial,
            faulted: false,
            errors: 0,
        }
    }

    /// Take a read result; on error the previous value is kept.
    pub fn update(&mut self, result: Result<T, SensorError>) -> T {
        match result {
            Ok(value) => {
                self.value = value;
                self.faulted = false;
            }
            Err(_) => {
                self.faulted = true;
                self.errors = self.errors.wrapping_add(1);
            }
        }
        self.value
    }

    #[inline]
    pub fn value(&self) -> T {
        self.value
    }

    /// Latest read failed.
    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }
}
