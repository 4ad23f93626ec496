//! E220-400T22S mode control and register writes.
//!
//! Mode lines (M1, M0):
//!
//! | Mode          | M1 | M0 |
//! |---------------|----|----|
//! | Transmit      | 0  | 0  |
//! | WakeTransmit  | 0  | 1  |
//! | WakeReceive   | 1  | 0  |
//! | DeepSleep     | 1  | 1  |
//!
//! Registers only accept writes in `DeepSleep`; packets only go out in
//! `Transmit`. Every operation drives the lines it needs first.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use telemetry_proto::PACKET_LEN;

use super::registers::{
    RadioConfig, Reg0, Reg1, Reg3, TransmissionMode, ADDR_ADDRESS_HI, ADDR_ADDRESS_LO, ADDR_REG0,
    ADDR_REG1, ADDR_REG2, ADDR_REG3,
};
use super::traits::{RadioError, SerialTransport, Transmitter};
use crate::config::{RADIO_ADDRESS, RADIO_SETTLE_MS, RADIO_TX_TIMEOUT_MS};

const CMD_WRITE_REGISTER: u8 = 0xC0;
const REGISTER_COUNT: usize = 6;

/// Operating mode selected by the M0/M1 lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    /// Normal transmit/receive.
    Transmit,
    /// Wake-on-radio transmitter (preamble-extended sends).
    WakeTransmit,
    /// Wake-on-radio receiver, transmit disabled.
    WakeReceive,
    /// Deep sleep; the only mode that accepts register writes.
    DeepSleep,
}

impl RadioMode {
    /// `(m1, m0)` levels, `true` = high.
    #[must_use]
    pub const fn lines(self) -> (bool, bool) {
        match self {
            Self::Transmit => (false, false),
            Self::WakeTransmit => (false, true),
            Self::WakeReceive => (true, false),
            Self::DeepSleep => (true, true),
        }
    }
}

/// Driver for one E220 module on a UART plus two mode lines.
pub struct RadioLink<T, M0, M1, D> {
    transport: T,
    m0: M0,
    m1: M1,
    delay: D,
    mode: Option<RadioMode>,
    /// Last value written to each register, power-on defaults until then.
    shadow: [u8; REGISTER_COUNT],
}

impl<T, M0, M1, D> RadioLink<T, M0, M1, D>
where
    T: SerialTransport,
    M0: OutputPin,
    M1: OutputPin,
    D: DelayNs,
{
    /// Mode is unknown until the first operation drives the lines.
    pub fn new(transport: T, m0: M0, m1: M1, delay: D) -> Self {
        Self {
            transport,
            m0,
            m1,
            delay,
            mode: None,
            // Datasheet defaults: 0x0000, 9600 8N1 2.4k, 200B 22dBm, ch 23, transparent
            shadow: [0x00, 0x00, 0x62, 0x00, 0x17, 0x00],
        }
    }

    /// Last mode driven onto M0/M1.
    #[must_use]
    pub fn mode(&self) -> Option<RadioMode> {
        self.mode
    }

    /// Shadow copy of registers `0x00..=0x05`.
    #[must_use]
    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        self.shadow
    }

    #[must_use]
    pub fn channel(&self) -> u8 {
        self.shadow[usize::from(ADDR_REG2)]
    }

    #[must_use]
    pub fn transmission_mode(&self) -> TransmissionMode {
        Reg3::from_byte(self.shadow[usize::from(ADDR_REG3)]).mode
    }

    /// Drive both mode lines, M1 first.
    pub fn set_mode(&mut self, mode: RadioMode) -> Result<(), RadioError> {
        let (m1, m0) = mode.lines();
        self.m1.set_state(m1.into()).map_err(|_| RadioError::ModePin)?;
        self.m0.set_state(m0.into()).map_err(|_| RadioError::ModePin)?;
        self.mode = Some(mode);
        Ok(())
    }

    /// `C0 <addr> 01 <value>`, sent in deep sleep, then the settle delay.
    ///
    /// Every setter goes through here, so no two register writes reach the
    /// module back to back.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), RadioError> {
        if self.mode != Some(RadioMode::DeepSleep) {
            self.set_mode(RadioMode::DeepSleep)?;
        }
        let frame = [CMD_WRITE_REGISTER, address, 0x01, value];
        self.transport.transmit(&frame, RADIO_TX_TIMEOUT_MS)?;
        if let Some(slot) = self.shadow.get_mut(usize::from(address)) {
            *slot = value;
        }
        self.delay.delay_ms(RADIO_SETTLE_MS);
        trace!("e220: reg {} = {}", address, value);
        Ok(())
    }

    /// Module address; low byte goes to register 0x00.
    pub fn set_address(&mut self, address: u16) -> Result<(), RadioError> {
        let [lo, hi] = address.to_le_bytes();
        self.write_register(ADDR_ADDRESS_LO, lo)?;
        self.write_register(ADDR_ADDRESS_HI, hi)
    }

    pub fn set_register0(&mut self, reg: Reg0) -> Result<(), RadioError> {
        self.write_register(ADDR_REG0, reg.to_byte())
    }

    pub fn set_register1(&mut self, reg: Reg1) -> Result<(), RadioError> {
        self.write_register(ADDR_REG1, reg.to_byte())
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<(), RadioError> {
        self.write_register(ADDR_REG2, channel)
    }

    pub fn set_register3(&mut self, reg: Reg3) -> Result<(), RadioError> {
        self.write_register(ADDR_REG3, reg.to_byte())
    }

    /// Write the whole register set and leave the module in `Transmit`.
    pub fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        self.set_mode(RadioMode::DeepSleep)?;
        for (address, value) in config.register_writes() {
            self.write_register(address, value)?;
        }
        self.set_mode(RadioMode::Transmit)?;
        debug!("e220: configured, channel {}", config.channel);
        Ok(())
    }

    /// Send `payload` in `Transmit` mode. No acknowledgment exists.
    ///
    /// In fixed mode the module expects `[addr_hi, addr_lo, channel]` ahead
    /// of the payload; in transparent mode `destination` and `channel` are
    /// not used.
    pub fn send_packet(
        &mut self,
        destination: u16,
        payload: &[u8],
        channel: u8,
    ) -> Result<(), RadioError> {
        if self.mode != Some(RadioMode::Transmit) {
            self.set_mode(RadioMode::Transmit)?;
        }
        if self.transmission_mode() == TransmissionMode::Fixed {
            let [hi, lo] = destination.to_be_bytes();
            self.transport.transmit(&[hi, lo, channel], RADIO_TX_TIMEOUT_MS)?;
        }
        self.transport.transmit(payload, RADIO_TX_TIMEOUT_MS)?;
        Ok(())
    }

    pub fn release(self) -> (T, M0, M1, D) {
        (self.transport, self.m0, self.m1, self.delay)
    }
}

impl<T, M0, M1, D> Transmitter for RadioLink<T, M0, M1, D>
where
    T: SerialTransport,
    M0: OutputPin,
    M1: OutputPin,
    D: DelayNs,
{
    fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        RadioLink::configure(self, config)
    }

    fn transmit_packet(&mut self, packet: &[u8; PACKET_LEN]) -> Result<(), RadioError> {
        let channel = self.channel();
        self.send_packet(RADIO_ADDRESS, packet, channel)
    }
}
