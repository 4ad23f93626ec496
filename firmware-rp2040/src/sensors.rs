//! Every sensor on the payload board behind [`SensorSuite`].

use core::cell::RefCell;

use embassy_rp::adc::{self, Adc};
use embassy_rp::gpio::{Input, Level, Output};
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{block_for, Delay, Duration};
use embedded_hal_bus::i2c::RefCellDevice;
use grib_flight::sensors::{BarometerSample, InertialSample, Scd41};
use grib_flight::{AnalogChannel, SensorError, SensorSuite};

use crate::drivers::{Bmp280, Lis3mdl, Lsm6ds3};

/// One device's handle on the shared I2C0 bus.
pub type SharedI2c = RefCellDevice<'static, I2c<'static, I2C0, Blocking>>;

/// SCD41 ignores commands this long after a stop.
const SCD41_STOP_SETTLE: Duration = Duration::from_millis(500);

/// CD4051 output settling after a select change.
const MUX_SETTLE: Duration = Duration::from_micros(10);

pub struct BoardSensors {
    barometer: Bmp280<SharedI2c>,
    imu: Lsm6ds3<SharedI2c>,
    magnetometer: Lis3mdl<SharedI2c>,
    co2: Scd41<SharedI2c, Delay>,
    /// Last barometer pressure in hPa, and the value the SCD41 holds.
    pressure_hpa: Option<u16>,
    co2_pressure_hpa: Option<u16>,
    adc: Adc<'static, adc::Blocking>,
    mux_out: adc::Channel<'static>,
    /// Select lines A, B, C (bit 0..2).
    mux_select: [Output<'static>; 3],
    switch: Input<'static>,
}

impl BoardSensors {
    pub fn new(
        bus: &'static RefCell<I2c<'static, I2C0, Blocking>>,
        adc: Adc<'static, adc::Blocking>,
        mux_out: adc::Channel<'static>,
        mux_select: [Output<'static>; 3],
        switch: Input<'static>,
    ) -> Self {
        Self {
            barometer: Bmp280::new(RefCellDevice::new(bus)),
            imu: Lsm6ds3::new(RefCellDevice::new(bus)),
            magnetometer: Lis3mdl::new(RefCellDevice::new(bus)),
            co2: Scd41::new(RefCellDevice::new(bus), Delay),
            pressure_hpa: None,
            co2_pressure_hpa: None,
            adc,
            mux_out,
            mux_select,
            switch,
        }
    }

    fn select(&mut self, channel: AnalogChannel) {
        let bits = channel.mux_select();
        for (n, pin) in self.mux_select.iter_mut().enumerate() {
            pin.set_level(Level::from(bits & (1 << n) != 0));
        }
        block_for(MUX_SETTLE);
    }
}

impl SensorSuite for BoardSensors {
    /// Bring every device up; one failing does not stop the others.
    fn begin(&mut self) -> Result<(), SensorError> {
        let barometer = self.barometer.init();
        let imu = self.imu.init();
        let magnetometer = self.magnetometer.init();

        // A warm reset can leave the SCD41 measuring.
        let co2 = self.co2.stop_periodic_measurement().and_then(|()| {
            block_for(SCD41_STOP_SETTLE);
            self.co2.start_periodic_measurement()
        });
        if let Err(e) = co2 {
            defmt::warn!("SCD41: start failed: {}", e);
        }

        barometer.and(imu).and(magnetometer).and(co2)
    }

    fn read_barometer(&mut self) -> Result<BarometerSample, SensorError> {
        let sample = self.barometer.read()?;
        self.pressure_hpa = u16::try_from(sample.pressure_pa / 100).ok();
        Ok(sample)
    }

    fn read_inertial(&mut self) -> Result<InertialSample, SensorError> {
        self.imu.read()
    }

    fn read_magnetometer(&mut self) -> Result<[i16; 3], SensorError> {
        self.magnetometer.read_raw()
    }

    /// Compensates the SCD41 with the barometer whenever the pressure moves.
    fn read_co2(&mut self) -> Result<u16, SensorError> {
        if self.pressure_hpa != self.co2_pressure_hpa {
            if let Some(hpa) = self.pressure_hpa {
                match self.co2.set_ambient_pressure(hpa) {
                    Ok(()) => self.co2_pressure_hpa = Some(hpa),
                    Err(e) => defmt::warn!("SCD41: pressure compensation failed: {}", e),
                }
            }
        }
        self.co2.read_measurement().map(|m| m.co2_ppm)
    }

    fn read_analog(&mut self, channel: AnalogChannel) -> Result<u16, SensorError> {
        self.select(channel);
        self.adc
            .blocking_read(&mut self.mux_out)
            .map_err(|_| SensorError::Bus)
    }

    fn switch_open(&mut self) -> bool {
        self.switch.is_low()
    }
}
