#![no_std]
#![no_main]

use core::cell::RefCell;

use cortex_m_rt::entry;
use defmt::{debug, info};
use defmt_rtt as _;
use embassy_executor::InterruptExecutor;
use embassy_rp::adc::{self, Adc};
use embassy_rp::gpio::{Input, Level, Output, OutputOpenDrain, Pull};
use embassy_rp::i2c::{self, Blocking, I2c};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::{I2C0, UART1};
use embassy_rp::spi::{self, Spi};
use embassy_rp::uart::{Async, Config as UartConfig, UartRx, UartTx};
use embassy_rp::bind_interrupts;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;
use grib_flight::config::LOG_FILE_NAME;
use grib_flight::{
    Ds18b20, LoopParts, NmeaAssembler, NmeaSlot, OneWireBus, PinActuators, RadioLink,
    TelemetryLoop, TelemetryStore,
};
use grib_flight_rp2040::{
    BoardSensors, EmbassyClock, FixedTimeSource, GgaDecoder, SdFilesystem, UartTransport,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

/// E220 and NEO-6M both ship at 9600 8N1.
const RADIO_BAUD: u32 = 9_600;
const GPS_BAUD: u32 = 9_600;

/// SD cards must be initialised at or below 400 kHz.
const SD_SPI_FREQUENCY: u32 = 400_000;

/// Latest complete NMEA line from the GPS task, drained by the superloop.
static NMEA: NmeaSlot = NmeaSlot::new();

static I2C_BUS: StaticCell<RefCell<I2c<'static, I2C0, Blocking>>> = StaticCell::new();

/// The superloop blocks thread mode, so the GPS receiver runs on a
/// software interrupt that preempts it.
static EXECUTOR_GPS: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_GPS.on_interrupt()
}

#[entry]
fn main() -> ! {
    info!("GRIB flight computer starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- GPS receive task ---
    let mut gps_config = UartConfig::default();
    gps_config.baudrate = GPS_BAUD;
    let gps_rx = UartRx::new(p.UART1, p.PIN_5, Irqs, p.DMA_CH0, gps_config);

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_GPS.start(interrupt::SWI_IRQ_1);
    spawner.spawn(gps_task(gps_rx, &NMEA).unwrap());

    // --- Radio ---
    let mut radio_config = UartConfig::default();
    radio_config.baudrate = RADIO_BAUD;
    let radio_tx = UartTx::new_blocking(p.UART0, p.PIN_0, radio_config);
    let radio = RadioLink::new(
        UartTransport::new(radio_tx),
        Output::new(p.PIN_2, Level::Low),
        Output::new(p.PIN_3, Level::Low),
        Delay,
    );

    // --- Sensors ---
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_9, p.PIN_8, i2c::Config::default());
    let bus = I2C_BUS.init(RefCell::new(i2c));
    let sensors = BoardSensors::new(
        bus,
        Adc::new_blocking(p.ADC, adc::Config::default()),
        adc::Channel::new_pin(p.PIN_26, Pull::None),
        [
            Output::new(p.PIN_10, Level::Low),
            Output::new(p.PIN_11, Level::Low),
            Output::new(p.PIN_12, Level::Low),
        ],
        Input::new(p.PIN_22, Pull::Up),
    );

    let probe = Ds18b20::new(OneWireBus::new(
        OutputOpenDrain::new(p.PIN_15, Level::High),
        Delay,
    ));

    let actuators = PinActuators::new(
        Output::new(p.PIN_20, Level::Low),
        Output::new(p.PIN_21, Level::Low),
    );

    // --- SD card ---
    let mut spi_config = spi::Config::default();
    spi_config.frequency = SD_SPI_FREQUENCY;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);
    let sd_device = match ExclusiveDevice::new_no_delay(spi, cs) {
        Ok(device) => device,
        Err(never) => match never {},
    };
    let store = TelemetryStore::new(
        SdFilesystem::new(SdCard::new(sd_device, Delay), FixedTimeSource),
        LOG_FILE_NAME,
    );

    let mut telemetry = TelemetryLoop::new(LoopParts {
        sensors,
        probe,
        gps: GgaDecoder::new(),
        nmea: &NMEA,
        actuators,
        radio,
        store,
        clock: EmbassyClock,
    });

    let report = telemetry.start();
    info!("start: {:?}", report);

    telemetry.run()
}

/// GPS task - assembles NMEA lines and publishes the latest one.
#[embassy_executor::task]
async fn gps_task(mut rx: UartRx<'static, Async>, slot: &'static NmeaSlot) {
    let mut assembler = NmeaAssembler::new();
    let mut byte = [0u8; 1];

    loop {
        match rx.read(&mut byte).await {
            Ok(()) => assembler.push_into(byte[0], slot),
            Err(e) => debug!("GPS UART error: {:?}", e),
        }
    }
}
