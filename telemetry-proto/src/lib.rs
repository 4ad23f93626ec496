//! Wire protocol for the GRIB payload telemetry.
//!
//! This crate provides everything needed to produce or consume telemetry
//! records:
//!
//! - **Packet**: fixed 60-byte little-endian record
//!   - [`Packet`] - one telemetry sample
//!   - [`Packet::finalize`] - recompute both checksums, return the wire image
//!   - [`Packet::decode`] - validate marker and checksums, decode
//!
//! - **Checksums**: running XOR of a byte prefix
//!   - [`checksum()`] - batch form
//!   - [`XorDigest`] - incremental form
//!
//! - **Status byte**: phase ordinal plus fault flags
//!   - [`StatusFlags`], [`MissionPhase`]
//!
//! - **Scanning**: [`PacketScanner`] recovers records from a raw stream
//!
//! # Record Format
//!
//! ```text
//! AA AA <team> <time> ... <checksum-26> <sequence> <status> ... <checksum>
//! ```
//!
//! The first checksum covers bytes `[0, 26)` and sits at offset 26. The final
//! checksum covers bytes `[0, 59)` and sits at offset 59. Consumers must check
//! both before trusting a record.
//!
//! # Example
//!
//! ```
//! use telemetry_proto::{checksum, MissionPhase, Packet, StatusFlags, PACKET_LEN};
//!
//! let mut packet = Packet::new(0xD9);
//! packet.sequence = 1;
//! packet.status = StatusFlags::with_phase(MissionPhase::Preparation);
//!
//! let bytes = packet.finalize();
//! assert_eq!(checksum(&bytes[..26]), bytes[26]);
//! assert_eq!(checksum(&bytes[..PACKET_LEN - 1]), bytes[PACKET_LEN - 1]);
//! assert_eq!(Packet::decode(&bytes).unwrap().sequence, 1);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host tooling)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`cli`**: Build the `grib-decode` log converter
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod checksum;
pub mod packet;
pub mod scanner;
pub mod status;

pub use checksum::{checksum, XorDigest};
pub use packet::{
    DecodeError, Packet, SerializeError, HEADER_CHECKSUM_LEN, PACKET_LEN, START_MARKER,
};
pub use scanner::PacketScanner;
pub use status::{MissionPhase, PhaseFault, SettledStage, StatusFlags};
