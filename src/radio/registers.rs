//! E220 configuration register model.
//!
//! ```text
//! addr  reg    7   6   5   4   3   2   1   0
//! 0x00  ADDR0  module address, low byte
//! 0x01  ADDR1  module address, high byte
//! 0x02  REG0   [ UART baud ] [parity ] [ air rate  ]
//! 0x03  REG1   [pkt len] RSSI  -   -   -  [tx power]
//! 0x04  REG2   channel (410.125 MHz + n MHz)
//! 0x05  REG3   RSSIB FIXED  -  LBT  -  [ WOR cycle ]
//! ```

pub const ADDR_ADDRESS_LO: u8 = 0x00;
pub const ADDR_ADDRESS_HI: u8 = 0x01;
pub const ADDR_REG0: u8 = 0x02;
pub const ADDR_REG1: u8 = 0x03;
pub const ADDR_REG2: u8 = 0x04;
pub const ADDR_REG3: u8 = 0x05;

macro_rules! register_field {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Field value, unshifted.
            #[must_use]
            pub const fn bits(self) -> u8 {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            /// Decode an unshifted field value.
            #[must_use]
            pub const fn from_bits(bits: u8) -> Option<Self> {
                $(if bits == $value { return Some(Self::$variant); })+
                None
            }
        }
    };
}

register_field! {
    /// Over-the-air data rate, REG0 bits 0-2.
    AirRate {
        Bps2400 = 0b010,
        Bps4800 = 0b011,
        Bps9600 = 0b100,
        Bps19200 = 0b101,
        Bps38400 = 0b110,
        Bps62500 = 0b111,
    }
}

register_field! {
    /// UART parity, REG0 bits 3-4.
    Parity {
        None8N1 = 0b00,
        Odd8O1 = 0b01,
        Even8E1 = 0b10,
    }
}

register_field! {
    /// UART baud rate, REG0 bits 5-7.
    BaudRate {
        Baud1200 = 0,
        Baud2400 = 1,
        Baud4800 = 2,
        Baud9600 = 3,
        Baud19200 = 4,
        Baud38400 = 5,
        Baud57600 = 6,
        Baud115200 = 7,
    }
}

register_field! {
    /// Sub-packet length, REG1 bits 6-7.
    PacketLength {
        Bytes200 = 0,
        Bytes128 = 1,
        Bytes64 = 2,
        Bytes32 = 3,
    }
}

register_field! {
    /// Transmit power, REG1 bits 0-1.
    TxPower {
        Dbm22 = 0,
        Dbm17 = 1,
        Dbm13 = 2,
        Dbm10 = 3,
    }
}

register_field! {
    /// Wake-on-radio cycle, REG3 bits 0-2.
    WorCycle {
        Ms500 = 0,
        Ms1000 = 1,
        Ms1500 = 2,
        Ms2000 = 3,
        Ms2500 = 4,
        Ms3000 = 5,
        Ms3500 = 6,
        Ms4000 = 7,
    }
}

register_field! {
    /// Addressing mode, REG3 bit 6.
    TransmissionMode {
        Transparent = 0,
        Fixed = 1,
    }
}

/// REG0: UART baud, parity, air rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reg0 {
    pub air_rate: AirRate,
    pub parity: Parity,
    pub baud: BaudRate,
}

impl Reg0 {
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.air_rate.bits() | (self.parity.bits() << 3) | (self.baud.bits() << 5)
    }

    /// Air-rate values 0-1 alias 2400 bps, parity 0b11 aliases 8N1.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        let air_rate = match AirRate::from_bits(byte & 0x07) {
            Some(rate) => rate,
            None => AirRate::Bps2400,
        };
        let parity = match Parity::from_bits((byte >> 3) & 0x03) {
            Some(parity) => parity,
            None => Parity::None8N1,
        };
        let baud = match BaudRate::from_bits(byte >> 5) {
            Some(baud) => baud,
            None => BaudRate::Baud9600,
        };
        Self { air_rate, parity, baud }
    }
}

/// REG1: sub-packet length, ambient RSSI, transmit power.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reg1 {
    pub packet_length: PacketLength,
    pub ambient_rssi: bool,
    pub tx_power: TxPower,
}

impl Reg1 {
    const RSSI: u8 = 1 << 5;

    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let rssi = if self.ambient_rssi { Self::RSSI } else { 0 };
        (self.packet_length.bits() << 6) | rssi | self.tx_power.bits()
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        let packet_length = match PacketLength::from_bits(byte >> 6) {
            Some(len) => len,
            None => PacketLength::Bytes200,
        };
        let tx_power = match TxPower::from_bits(byte & 0x03) {
            Some(p) => p,
            None => TxPower::Dbm22,
        };
        Self {
            packet_length,
            ambient_rssi: byte & Self::RSSI != 0,
            tx_power,
        }
    }
}

/// REG3: RSSI byte, transmission mode, LBT, WOR cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reg3 {
    pub rssi_byte: bool,
    pub mode: TransmissionMode,
    pub listen_before_talk: bool,
    pub wor_cycle: WorCycle,
}

impl Reg3 {
    const RSSI_BYTE: u8 = 1 << 7;
    const LBT: u8 = 1 << 4;

    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let rssi = if self.rssi_byte { Self::RSSI_BYTE } else { 0 };
        let lbt = if self.listen_before_talk { Self::LBT } else { 0 };
        rssi | (self.mode.bits() << 6) | lbt | self.wor_cycle.bits()
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        let mode = if byte & (1 << 6) != 0 {
            TransmissionMode::Fixed
        } else {
            TransmissionMode::Transparent
        };
        let wor_cycle = match WorCycle::from_bits(byte & 0x07) {
            Some(w) => w,
            None => WorCycle::Ms500,
        };
        Self {
            rssi_byte: byte & Self::RSSI_BYTE != 0,
            mode,
            listen_before_talk: byte & Self::LBT != 0,
            wor_cycle,
        }
    }
}

/// Complete register set written at start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub address: u16,
    pub reg0: Reg0,
    pub reg1: Reg1,
    pub channel: u8,
    pub reg3: Reg3,
}

impl RadioConfig {
    /// Flight settings: broadcast address, 9600 air/UART 8N1, 200-byte
    /// sub-packets, 22 dBm, channel 1, transparent, no LBT, WOR 500 ms.
    pub const FLIGHT: Self = Self {
        address: crate::config::RADIO_ADDRESS,
        reg0: Reg0 {
            air_rate: AirRate::Bps9600,
            parity: Parity::None8N1,
            baud: BaudRate::Baud9600,
        },
        reg1: Reg1 {
            packet_length: PacketLength::Bytes200,
            ambient_rssi: false,
            tx_power: TxPower::Dbm22,
        },
        channel: crate::config::RADIO_CHANNEL,
        reg3: Reg3 {
            rssi_byte: false,
            mode: TransmissionMode::Transparent,
            listen_before_talk: false,
            wor_cycle: WorCycle::Ms500,
        },
    };

    /// `(address, value)` pairs in the order they are written.
    #[must_use]
    pub const fn register_writes(&self) -> [(u8, u8); 6] {
        let [lo, hi] = self.address.to_le_bytes();
        [
            (ADDR_ADDRESS_LO, lo),
            (ADDR_ADDRESS_HI, hi),
            (ADDR_REG0, self.reg0.to_byte()),
            (ADDR_REG1, self.reg1.to_byte()),
            (ADDR_REG2, self.channel),
            (ADDR_REG3, self.reg3.to_byte()),
        ]
    }
}
