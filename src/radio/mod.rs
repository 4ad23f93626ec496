//! E220-400T22S LoRa UART transceiver.

pub mod e220;
pub mod registers;
mod traits;

pub use e220::{RadioLink, RadioMode};
pub use registers::{
    AirRate, BaudRate, PacketLength, Parity, RadioConfig, Reg0, Reg1, Reg3, TransmissionMode,
    TxPower, WorCycle,
};
pub use traits::{RadioError, SerialTransport, Transmitter, TransportError};
