//! GRIB payload flight computer for RP2040.
//!
//! Board wiring for the chip-agnostic [`grib_flight`] core: the superloop
//! runs blocking in thread mode while the GPS receiver is drained by a task
//! on an interrupt executor, handing complete NMEA lines over through a
//! static [`NmeaSlot`](grib_flight::NmeaSlot).
//!
//! # Hardware Configuration
//!
//! | Function        | GPIO   | Description |
//! |-----------------|--------|-------------|
//! | UART0 TX        | 0      | E220 radio RXD (9600 8N1) |
//! | Radio M0 / M1   | 2 / 3  | E220 mode lines |
//! | UART1 RX        | 5      | GPS TX (9600 8N1) |
//! | I2C0 SDA / SCL  | 8 / 9  | BMP280, LSM6DS3, LIS3MDL, SCD41 |
//! | Mux A / B / C   | 10-12  | CD4051 select lines |
//! | 1-Wire          | 15     | DS18B20 (external 4.7k pull-up) |
//! | SPI0 MISO / CS  | 16 / 17| SD card |
//! | SPI0 SCK / MOSI | 18 / 19| SD card |
//! | Burner          | 20     | Nichrome burner MOSFET |
//! | Beacon          | 21     | Audible beacon |
//! | Ground switch   | 22     | Pulled up, low when open |
//! | ADC0            | 26     | Mux common output |
//!
//! # Modules
//!
//! - [`clock`]: millisecond clock over `embassy-time`
//! - [`drivers`]: BMP280, LSM6DS3 and LIS3MDL register access
//! - [`nmea`]: GGA/RMC sentence decoder
//! - [`radio_uart`]: blocking UART transport for the radio
//! - [`sd_store`]: `embedded-sdmmc` filesystem behind the telemetry store
//! - [`sensors`]: the board's sensor suite
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

pub mod clock;
pub mod drivers;
pub mod nmea;
pub mod radio_uart;
pub mod sd_store;
pub mod sensors;

pub use clock::EmbassyClock;
pub use nmea::GgaDecoder;
pub use radio_uart::UartTransport;
pub use sd_store::{FixedTimeSource, SdFilesystem};
pub use sensors::BoardSensors;
