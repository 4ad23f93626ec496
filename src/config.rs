//! Compile-time mission tunables.

use crate::onewire::Resolution;

/// Team identifier carried in every packet.
pub const TEAM_ID: u16 = 0xD9;

/// How long the burner stays on once the descent altitude is reached.
pub const BURN_DURATION_MS: u32 = 3000;

/// Barometric altitude (above the ground reference) that ignites the burner.
pub const BURN_ALTITUDE_M: f32 = 100.0;

/// Consecutive over-baseline light readings that mark ejection from the rocket.
pub const LIGHT_CONFIRM_CYCLES: u8 = 3;

/// DS18B20 resolution set at boot.
pub const PROBE_RESOLUTION: Resolution = Resolution::Bits12;

/// Probe poll period: one full conversion at [`PROBE_RESOLUTION`].
pub const PROBE_POLL_INTERVAL_MS: u32 = PROBE_RESOLUTION.conversion_time_ms();

/// Settling time the radio needs after each register write.
pub const RADIO_SETTLE_MS: u32 = 100;

/// Bound on a single UART transaction to the radio.
pub const RADIO_TX_TIMEOUT_MS: u32 = 100;

/// Radio module address (broadcast).
pub const RADIO_ADDRESS: u16 = 0xFFFF;

/// Radio channel (410.125 MHz + channel MHz).
pub const RADIO_CHANNEL: u8 = 1;

/// Append-only telemetry log on the SD card (8.3 name).
pub const LOG_FILE_NAME: &str = "GRIB.BIN";
