//! DS18B20 digital thermometer on a single-drop bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::OneWireBus;
use crate::time::elapsed_ms;

const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;
const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;

/// Bytes returned by a scratchpad read (CRC byte not read).
pub const SCRATCHPAD_LEN: usize = 8;

/// Conversion resolution, bits 5-6 of the configuration register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    #[default]
    Bits12,
}

impl Resolution {
    /// Configuration register value: resolution in bits 5-6, low 5 bits set.
    #[must_use]
    pub const fn config_byte(self) -> u8 {
        let r = match self {
            Self::Bits9 => 0,
            Self::Bits10 => 1,
            Self::Bits11 => 2,
            Self::Bits12 => 3,
        };
        (r << 5) | 0x1F
    }

    /// Worst-case conversion time from the datasheet.
    #[must_use]
    pub const fn conversion_time_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }
}

/// Raw scratchpad contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scratchpad {
    pub bytes: [u8; SCRATCHPAD_LEN],
    /// Whether the reset before the read saw a presence pulse.
    pub presence: bool,
}

impl Scratchpad {
    /// Signed temperature code, 1/16 degC per LSB.
    #[must_use]
    pub const fn temperature_code(&self) -> i16 {
        i16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    #[must_use]
    pub fn celsius(&self) -> f32 {
        f32::from(self.temperature_code()) / 16.0
    }
}

/// Something that produces a DS18B20-style temperature code.
///
/// Split out so the poller and the superloop can be tested without a bus.
pub trait TemperatureProbe {
    /// Set the conversion resolution. Returns `false` if nothing answered.
    fn set_resolution(&mut self, resolution: Resolution) -> bool;

    /// Kick off a conversion. Returns `false` if nothing answered the reset.
    fn start_conversion(&mut self) -> bool;

    /// Read the last finished conversion. `None` if nothing answered.
    fn read_temperature(&mut self) -> Option<i16>;
}

/// DS18B20 addressed with Skip ROM.
pub struct Ds18b20<P, D> {
    bus: OneWireBus<P, D>,
}

impl<P, D> Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(bus: OneWireBus<P, D>) -> Self {
        Self { bus }
    }

    fn select(&mut self) -> bool {
        let presence = self.bus.reset();
        self.bus.skip_rom();
        presence
    }

    pub fn read_scratchpad(&mut self) -> Scratchpad {
        let presence = self.select();
        self.bus.write_byte(CMD_READ_SCRATCHPAD);
        let mut bytes = [0u8; SCRATCHPAD_LEN];
        self.bus.read_bytes(&mut bytes);
        Scratchpad { bytes, presence }
    }

    /// Write TH/TL (zeroed) and the configuration register.
    pub fn write_config(&mut self, resolution: Resolution) -> bool {
        let presence = self.select();
        self.bus.write_byte(CMD_WRITE_SCRATCHPAD);
        self.bus.write_bytes(&[0x00, 0x00, resolution.config_byte()]);
        presence
    }

    pub fn into_bus(self) -> OneWireBus<P, D> {
        self.bus
    }
}

impl<P, D> TemperatureProbe for Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn set_resolution(&mut self, resolution: Resolution) -> bool {
        self.write_config(resolution)
    }

    fn start_conversion(&mut self) -> bool {
        let presence = self.select();
        self.bus.write_byte(CMD_CONVERT_T);
        presence
    }

    fn read_temperature(&mut self) -> Option<i16> {
        let pad = self.read_scratchpad();
        pad.presence.then(|| pad.temperature_code())
    }
}

/// Reads the probe at a fixed interval and restarts the conversion.
///
/// Between polls, and whenever the probe does not answer, the last known
/// code is reported.
pub struct ProbePoller<T> {
    probe: T,
    interval_ms: u32,
    last_poll_ms: u32,
    last_code: i16,
    misses: u32,
}

impl<T: TemperatureProbe> ProbePoller<T> {
    pub fn new(probe: T, interval_ms: u32) -> Self {
        Self {
            probe,
            interval_ms,
            last_poll_ms: 0,
            last_code: 0,
            misses: 0,
        }
    }

    /// Configure the probe and start the first conversion; the first read
    /// happens one interval later.
    pub fn begin(&mut self, now_ms: u32, resolution: Resolution) -> bool {
        self.last_poll_ms = now_ms;
        self.probe.set_resolution(resolution);
        let present = self.probe.start_conversion();
        if !present {
            warn!("ds18b20: no presence pulse at start");
        }
        present
    }

    /// Current probe code, refreshed if the interval has elapsed.
    pub fn poll(&mut self, now_ms: u32) -> i16 {
        if elapsed_ms(self.last_poll_ms, now_ms) >= self.interval_ms {
            self.last_poll_ms = now_ms;
            match self.probe.read_temperature() {
                Some(code) => self.last_code = code,
                None => {
                    self.misses = self.misses.wrapping_add(1);
                    debug!("ds18b20: missing presence, keeping {}", self.last_code);
                }
            }
            self.probe.start_conversion();
        }
        self.last_code
    }

    #[must_use]
    pub fn last_code(&self) -> i16 {
        self.last_code
    }

    /// Polls where the probe did not answer.
    #[must_use]
    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn probe_mut(&mut self) -> &mut T {
        &mut self.probe
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::super::sim::{line, Edge, SimDelay, SimPin};
    use super::*;
    use std::vec::Vec;

    /// Bytes the master wrote, decoded from low-pulse widths.
    fn written_bytes(trace: &[(u64, Edge)]) -> Vec<u8> {
        let mut bits = Vec::new();
        let mut i = 0;
        while i + 1 < trace.len() {
            match (trace[i], trace[i + 1]) {
                ((t0, Edge::Drive), (t1, Edge::Release)) => {
                    let low = t1 - t0;
                    // Read slots are followed by a sample; skip them.
                    let is_read = matches!(trace.get(i + 2), Some((_, Edge::Sample)));
                    if low < 100 && !is_read {
                        bits.push(low < 15);
                    }
                    i += 2;
                }
                _ => i += 1,
            }
        }
        bits.chunks(8)
            .filter(|c| c.len() == 8)
            .map(|c| c.iter().enumerate().fold(0u8, |b, (n, &v)| b | (u8::from(v) << n)))
            .collect()
    }

    fn device() -> (Ds18b20<SimPin, SimDelay>, super::super::sim::Shared) {
        let l = line();
        let bus = OneWireBus::new(SimPin(l.clone()), SimDelay(l.clone()));
        (Ds18b20::new(bus), l)
    }

    #[test]
    fn test_config_byte() {
        assert_eq!(Resolution::Bits9.config_byte(), 0x1F);
        assert_eq!(Resolution::Bits12.config_byte(), 0x7F);
        assert_eq!(Resolution::Bits11.config_byte(), 0x5F);
        assert_eq!(Resolution::Bits9.conversion_time_ms(), 94);
        assert_eq!(crate::config::PROBE_POLL_INTERVAL_MS, 750);
    }

    #[test]
    fn test_start_conversion_commands() {
        let (mut dev, l) = device();
        l.borrow_mut().slave_low.push_back(true);

        assert!(dev.start_conversion());
        assert_eq!(written_bytes(&l.borrow().trace()), [0xCC, 0x44]);
    }

    #[test]
    fn test_write_config_commands() {
        let (mut dev, l) = device();
        l.borrow_mut().slave_low.push_back(true);

        assert!(dev.write_config(Resolution::Bits12));
        assert_eq!(
            written_bytes(&l.borrow().trace()),
            [0xCC, 0x4E, 0x00, 0x00, 0x7F]
        );
    }

    #[test]
    fn test_read_temperature() {
        let (mut dev, l) = device();
        {
            let mut l = l.borrow_mut();
            l.slave_low.push_back(true);
            // 25.0625 degC = 0x0191
            for b in [0x91, 0x01, 0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10] {
                l.answer_byte(b);
            }
        }
        assert_eq!(dev.read_temperature(), Some(0x0191));
    }

    #[test]
    fn test_negative_temperature() {
        let pad = Scratchpad {
            bytes: [0x5E, 0xFF, 0, 0, 0, 0, 0, 0],
            presence: true,
        };
        assert_eq!(pad.temperature_code(), -162);
        assert!((pad.celsius() + 10.125).abs() < 1e-6);
    }

    #[test]
    fn test_missing_probe_is_none() {
        let (mut dev, _l) = device();
        assert_eq!(dev.read_temperature(), None);
    }

    struct FakeProbe {
        codes: Vec<Option<i16>>,
        resolution: Option<Resolution>,
        conversions: u32,
        reads: u32,
    }

    impl TemperatureProbe for FakeProbe {
        fn set_resolution(&mut self, resolution: Resolution) -> bool {
            self.resolution = Some(resolution);
            true
        }

        fn start_conversion(&mut self) -> bool {
            self.conversions += 1;
            true
        }

        fn read_temperature(&mut self) -> Option<i16> {
            self.reads += 1;
            if self.codes.is_empty() {
                None
            } else {
                self.codes.remove(0)
            }
        }
    }

    #[test]
    fn test_poller_interval_and_last_known() {
        let probe = FakeProbe {
            codes: std::vec![Some(400), None, Some(420)],
            resolution: None,
            conversions: 0,
            reads: 0,
        };
        let mut poller = ProbePoller::new(probe, 750);
        poller.begin(0, Resolution::Bits12);
        assert_eq!(poller.probe_mut().resolution, Some(Resolution::Bits12));
        assert_eq!(poller.probe_mut().conversions, 1);

        assert_eq!(poller.poll(500), 0);
        assert_eq!(poller.probe_mut().reads, 0);

        assert_eq!(poller.poll(750), 400);
        assert_eq!(poller.probe_mut().conversions, 2);

        // Missing presence keeps the previous code.
        assert_eq!(poller.poll(1500), 400);
        assert_eq!(poller.misses(), 1);

        assert_eq!(poller.poll(2000), 400);
        assert_eq!(poller.poll(2250), 420);
        assert_eq!(poller.probe_mut().reads, 3);
    }
}
