//! Flight core for the GRIB atmospheric payload.
//!
//! Chip-agnostic: every peripheral arrives through `embedded-hal` traits or
//! one of the collaborator traits below, so the whole superloop runs on the
//! host under test.
//!
//! - [`onewire`] - bit-banged 1-Wire master and the DS18B20 probe
//! - [`radio`] - E220-400T22S mode lines, registers and packet send
//! - [`storage`] - append-only SD log with mount/open recovery
//! - [`mission`] - flight-phase state machine and actuator commands
//! - [`altitude`] - ground reference and barometric altitude
//! - [`gps`] - NMEA line hand-off from the receive interrupt
//! - [`sensors`] - sensor collaborator traits, analog scaling, SCD41
//! - [`telemetry_loop`] - the superloop tying it together
//!
//! # Features
//!
//! - **`std`**: host builds
//! - **`defmt`**: log through defmt instead of the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod altitude;
pub mod config;
pub mod gps;
pub mod mission;
pub mod onewire;
pub mod radio;
pub mod sensors;
pub mod storage;
pub mod telemetry_loop;
pub mod time;

pub use altitude::{barometric_altitude, GroundReference};
pub use gps::{GpsFix, NmeaAssembler, NmeaDecoder, NmeaSlot};
pub use mission::{
    ActuatorCommands, Actuators, MissionInputs, MissionStateMachine, MissionStep, PinActuators,
};
pub use onewire::{Ds18b20, OneWireBus, ProbePoller, Resolution, TemperatureProbe};
pub use radio::{RadioConfig, RadioError, RadioLink, RadioMode, SerialTransport, Transmitter};
pub use sensors::{AnalogChannel, LastKnown, SensorError, SensorSuite};
pub use storage::{Filesystem, StoreError, StoreOutcome, TelemetryStore};
pub use telemetry_loop::{CycleReport, LoopParts, StartReport, TelemetryLoop};
pub use time::Clock;

pub use telemetry_proto::{MissionPhase, Packet, StatusFlags, PACKET_LEN};
