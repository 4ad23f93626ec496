//! Bit-banged 1-Wire bus master.
//!
//! The line is open-drain with an external pull-up: "drive" pulls it low,
//! "release" lets the pull-up (or a slave) decide the level. All timing is
//! busy-wait through [`DelayNs`], so every call blocks for its full slot.
//!
//! | Slot      | Low    | Sample | Total  |
//! |-----------|--------|--------|--------|
//! | reset     | 500 us | 570 us | 980 us |
//! | write 1   | 2 us   | -      | 60 us  |
//! | write 0   | 50 us  | -      | 60 us  |
//! | read      | 2 us   | 10 us  | 60 us  |
//!
//! There is no CRC or retry layer: a missing slave reads as all ones.

pub mod ds18b20;

pub use ds18b20::{Ds18b20, ProbePoller, Resolution, Scratchpad, TemperatureProbe};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// ROM command addressing every device on the bus.
pub const CMD_SKIP_ROM: u8 = 0xCC;

const SLOT_US: u32 = 60;
const RESET_LOW_US: u32 = 500;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const WRITE_ONE_LOW_US: u32 = 2;
const WRITE_ZERO_LOW_US: u32 = 50;
const READ_LOW_US: u32 = 2;
const READ_SAMPLE_US: u32 = 10;

/// 1-Wire master on a single open-drain GPIO.
pub struct OneWireBus<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWireBus<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Take the pin and leave the line released.
    pub fn new(mut pin: P, delay: D) -> Self {
        let _ = pin.set_high();
        Self { pin, delay }
    }

    #[inline]
    fn drive_low(&mut self) {
        let _ = self.pin.set_low();
    }

    #[inline]
    fn release(&mut self) {
        let _ = self.pin.set_high();
    }

    /// Level seen on the line; a pin error reads as idle (high).
    #[inline]
    fn sample(&mut self) -> bool {
        self.pin.is_high().unwrap_or(true)
    }

    /// Reset pulse. Returns `true` if a slave answered with a presence pulse.
    pub fn reset(&mut self) -> bool {
        self.drive_low();
        self.delay.delay_us(RESET_LOW_US);
        self.release();
        self.delay.delay_us(PRESENCE_SAMPLE_US);
        let presence = !self.sample();
        self.delay.delay_us(RESET_RECOVERY_US);
        presence
    }

    /// One write slot.
    pub fn write_bit(&mut self, bit: bool) {
        let low_us = if bit { WRITE_ONE_LOW_US } else { WRITE_ZERO_LOW_US };
        self.drive_low();
        self.delay.delay_us(low_us);
        self.release();
        self.delay.delay_us(SLOT_US - low_us);
    }

    /// One read slot, sampled 10 us after the falling edge.
    pub fn read_bit(&mut self) -> bool {
        self.drive_low();
        self.delay.delay_us(READ_LOW_US);
        self.release();
        self.delay.delay_us(READ_SAMPLE_US - READ_LOW_US);
        let bit = self.sample();
        self.delay.delay_us(SLOT_US - READ_SAMPLE_US);
        bit
    }

    /// Write a byte, LSB first.
    pub fn write_byte(&mut self, byte: u8) {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0);
        }
    }

    /// Read a byte, LSB first.
    pub fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit() {
                byte |= 1 << i;
            }
        }
        byte
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.read_byte();
        }
    }

    /// Address all devices; only valid with a single slave on the bus.
    pub fn skip_rom(&mut self) {
        self.write_byte(CMD_SKIP_ROM);
    }

    /// Give the pin and delay back.
    pub fn release_parts(self) -> (P, D) {
        (self.pin, self.delay)
    }
}


#[cfg(test)]
mod tests {
    extern crate std;

    use super::sim::{line, Edge, SimDelay, SimPin};
    use super::*;
    use std::vec;

    fn bus() -> (OneWireBus<SimPin, SimDelay>, super::sim::Shared) {
        let l = line();
        let bus = OneWireBus::new(SimPin(l.clone()), SimDelay(l.clone()));
        (bus, l)
    }

    #[test]
    fn test_reset_timing_and_presence() {
        let (mut bus, l) = bus();
        l.borrow_mut().slave_low.push_back(true);

        assert!(bus.reset());
        let l = l.borrow();
        assert_eq!(
            l.trace(),
            vec![(0, Edge::Drive), (500, Edge::Release), (570, Edge::Sample)]
        );
        assert_eq!(l.now_us(), 980);
    }

    #[test]
    fn test_reset_without_slave() {
        let (mut bus, _l) = bus();
        assert!(!bus.reset());
    }

    #[test]
    fn test_write_slots_are_60us() {
        let (mut bus, l) = bus();

        bus.write_bit(true);
        assert_eq!(l.borrow().trace(), vec![(0, Edge::Drive), (2, Edge::Release)]);
        assert_eq!(l.borrow().now_us(), 60);

        l.borrow_mut().events.clear();
        bus.write_bit(false);
        assert_eq!(l.borrow().trace(), vec![(0, Edge::Drive), (50, Edge::Release)]);
        assert_eq!(l.borrow().now_us(), 120);
    }

    #[test]
    fn test_read_samples_inside_window() {
        let (mut bus, l) = bus();
        l.borrow_mut().slave_low.push_back(true);

        assert!(!bus.read_bit());
        let trace = l.borrow().trace();
        assert_eq!(trace[0], (0, Edge::Drive));
        assert_eq!(trace[1], (2, Edge::Release));
        let (sample_at, edge) = trace[2];
        assert_eq!(edge, Edge::Sample);
        assert!((2..=12).contains(&sample_at));
        assert_eq!(l.borrow().now_us(), 60);

        assert!(bus.read_bit());
    }

    #[test]
    fn test_byte_is_lsb_first() {
        let (mut bus, l) = bus();
        bus.write_byte(0x01);

        // Bit 0 is a short (write-1) pulse, the other seven are long.
        let trace = l.borrow().trace();
        let lows: std::vec::Vec<u64> = trace
            .chunks(2)
            .map(|pair| pair[1].0 - pair[0].0)
            .collect();
        assert_eq!(lows, vec![2, 50, 50, 50, 50, 50, 50, 50]);
        assert_eq!(l.borrow().now_us(), 8 * 60);
    }

    #[test]
    fn test_read_byte_assembles_lsb_first() {
        let (mut bus, l) = bus();
        l.borrow_mut().answer_byte(0xA5);
        assert_eq!(bus.read_byte(), 0xA5);
    }
}
