use telemetry_proto::PACKET_LEN;

use super::registers::RadioConfig;

/// Error type for the serial link to the radio module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Transfer did not complete within the timeout.
    Timeout,
    /// UART framing/overrun or other bus fault.
    Bus,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "serial timeout"),
            Self::Bus => write!(f, "serial bus error"),
        }
    }
}

/// Error type for radio operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// A mode-select line could not be driven.
    ModePin,
    /// The UART write failed.
    Transport(TransportError),
}

impl From<TransportError> for RadioError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ModePin => write!(f, "mode pin error"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

/// Blocking, bounded write to the radio's UART.
pub trait SerialTransport {
    /// Write all of `bytes`, giving up after `timeout_ms`.
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), TransportError>;
}

impl<T: SerialTransport + ?Sized> SerialTransport for &mut T {
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), TransportError> {
        (**self).transmit(bytes, timeout_ms)
    }
}

/// Sink for finished telemetry packets.
///
/// Fire-and-forget: `Ok` means the bytes left the MCU, nothing more.
pub trait Transmitter {
    /// Write the register set; called once before the first packet.
    fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError>;

    fn transmit_packet(&mut self, packet: &[u8; PACKET_LEN]) -> Result<(), RadioError>;
}
