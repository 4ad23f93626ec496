//! Mission phase ordinals and the packet status byte.
//!
//! ```text
//! bit  7     6     5     4     3     2..0
//!      BARO  IMU   MAG   CO2   FIX   phase ordinal
//! ```

use core::ops::{BitOr, BitOrAssign};

/// Stage of the settled descent: burner still on, or burn complete and
/// beacon sounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettledStage {
    Burning,
    Final,
}

/// Why the mission ended up in the terminal phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseFault {
    /// The "rout" phase itself (ordinal 6).
    Rout,
    /// A phase ordinal that names no known phase.
    UnknownOrdinal(u8),
}

/// Flight phase of the payload.
///
/// Transitions only move forward; `Terminal` is absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MissionPhase {
    Preparation,
    BeforeLaying,
    Ascent,
    DescentBurning,
    DescentSettled(SettledStage),
    Terminal(PhaseFault),
}

impl MissionPhase {
    /// Ordinal written into bits 0-2 of the status byte.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Preparation => 0,
            Self::BeforeLaying => 1,
            Self::Ascent => 2,
            Self::DescentBurning => 3,
            Self::DescentSettled(SettledStage::Burning) => 4,
            Self::DescentSettled(SettledStage::Final) => 5,
            Self::Terminal(_) => 6,
        }
    }

    /// Map an ordinal back to a phase. Anything unrecognised is terminal.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Self::Preparation,
            1 => Self::BeforeLaying,
            2 => Self::Ascent,
            3 => Self::DescentBurning,
            4 => Self::DescentSettled(SettledStage::Burning),
            5 => Self::DescentSettled(SettledStage::Final),
            6 => Self::Terminal(PhaseFault::Rout),
            other => Self::Terminal(PhaseFault::UnknownOrdinal(other)),
        }
    }

    /// `true` once no further transition can happen.
    #[inline]
    #[must_use]
    pub const fn is_absorbing(self) -> bool {
        matches!(
            self,
            Self::DescentSettled(SettledStage::Final) | Self::Terminal(_)
        )
    }
}

/// Packet status byte: phase ordinal plus fault/validity flags.
///
/// # Example
///
/// ```
/// use telemetry_proto::{MissionPhase, StatusFlags};
///
/// let mut status = StatusFlags::with_phase(MissionPhase::Ascent);
/// status |= StatusFlags::GPS_FIX | StatusFlags::CO2_FAULT;
/// assert_eq!(status.bits(), 0b0001_1010);
/// assert_eq!(status.phase(), MissionPhase::Ascent);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(pub u8);

impl StatusFlags {
    const PHASE_MASK: u8 = 0x07;

    pub const GPS_FIX: Self = Self(1 << 3);
    pub const CO2_FAULT: Self = Self(1 << 4);
    pub const MAGNETOMETER_FAULT: Self = Self(1 << 5);
    pub const INERTIAL_FAULT: Self = Self(1 << 6);
    pub const BAROMETER_FAULT: Self = Self(1 << 7);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Status with only the phase ordinal set.
    #[inline]
    #[must_use]
    pub const fn with_phase(phase: MissionPhase) -> Self {
        Self(phase.ordinal() & Self::PHASE_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn phase_ordinal(self) -> u8 {
        self.0 & Self::PHASE_MASK
    }

    #[inline]
    #[must_use]
    pub const fn phase(self) -> MissionPhase {
        MissionPhase::from_ordinal(self.phase_ordinal())
    }

    #[inline]
    pub fn set_phase(&mut self, phase: MissionPhase) {
        self.0 = (self.0 & !Self::PHASE_MASK) | (phase.ordinal() & Self::PHASE_MASK);
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, flag: StatusFlags) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Set or clear flag(s).
    #[inline]
    pub fn set(&mut self, flag: StatusFlags, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn gps_fix_valid(self) -> bool {
        self.contains(Self::GPS_FIX)
    }

    #[inline]
    #[must_use]
    pub const fn co2_fault(self) -> bool {
        self.contains(Self::CO2_FAULT)
    }

    #[inline]
    #[must_use]
    pub const fn magnetometer_fault(self) -> bool {
        self.contains(Self::MAGNETOMETER_FAULT)
    }

    #[inline]
    #[must_use]
    pub const fn inertial_fault(self) -> bool {
        self.contains(Self::INERTIAL_FAULT)
    }

    #[inline]
    #[must_use]
    pub const fn barometer_fault(self) -> bool {
        self.contains(Self::BAROMETER_FAULT)
    }
}

impl BitOr for StatusFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StatusFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_round_trip_known_phases() {
        for ordinal in 0..=6 {
            assert_eq!(MissionPhase::from_ordinal(ordinal).ordinal(), ordinal);
        }
    }

    #[test]
    fn test_unknown_ordinal_is_terminal() {
        assert_eq!(
            MissionPhase::from_ordinal(7),
            MissionPhase::Terminal(PhaseFault::UnknownOrdinal(7))
        );
        assert_eq!(MissionPhase::from_ordinal(200).ordinal(), 6);
        assert!(MissionPhase::from_ordinal(9).is_absorbing());
    }

    #[test]
    fn test_flag_bit_positions() {
        assert_eq!(StatusFlags::GPS_FIX.bits(), 0x08);
        assert_eq!(StatusFlags::CO2_FAULT.bits(), 0x10);
        assert_eq!(StatusFlags::MAGNETOMETER_FAULT.bits(), 0x20);
        assert_eq!(StatusFlags::INERTIAL_FAULT.bits(), 0x40);
        assert_eq!(StatusFlags::BAROMETER_FAULT.bits(), 0x80);
    }

    #[test]
    fn test_set_phase_keeps_flags() {
        let mut status = StatusFlags::BAROMETER_FAULT | StatusFlags::GPS_FIX;
        status.set_phase(MissionPhase::DescentBurning);
        assert_eq!(status.phase_ordinal(), 3);
        assert!(status.barometer_fault());
        assert!(status.gps_fix_valid());

        status.set_phase(MissionPhase::Preparation);
        assert_eq!(status.bits(), 0x88);
    }

    #[test]
    fn test_set_clear_flag() {
        let mut status = StatusFlags::with_phase(MissionPhase::Ascent);
        status.set(StatusFlags::INERTIAL_FAULT, true);
        assert!(status.inertial_fault());
        status.set(StatusFlags::INERTIAL_FAULT, false);
        assert!(!status.inertial_fault());
        assert_eq!(status.phase(), MissionPhase::Ascent);
    }
}
