//! Resynchronising packet scanner for recorded or received byte streams.
//!
//! Radio captures and recovered log files can start mid-record or contain
//! damaged records. The scanner walks the stream, yields each record that
//! passes [`Packet::decode`], and slides one byte forward on any mismatch.

use crate::packet::{Packet, PACKET_LEN};

/// Iterator over the valid packets in a byte slice.
///
/// # Example
///
/// ```
/// use telemetry_proto::{Packet, PacketScanner};
///
/// let mut packet = Packet::new(0xD9);
/// let record = packet.finalize();
///
/// let mut stream = vec![0x00, 0x13];
/// stream.extend_from_slice(&record);
///
/// let mut scanner = PacketScanner::new(&stream);
/// assert_eq!(scanner.next(), Some(packet));
/// assert_eq!(scanner.next(), None);
/// assert_eq!(scanner.skipped(), 2);
/// ```
pub struct PacketScanner<'a> {
    data: &'a [u8],
    pos: usize,
    skipped: usize,
}

impl<'a> PacketScanner<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            skipped: 0,
        }
    }

    /// Bytes discarded while searching for valid records.
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Trailing bytes too short to hold a record.
    #[inline]
    #[must_use]
    pub fn remainder(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl Iterator for PacketScanner<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        while self.data.len() - self.pos >= PACKET_LEN {
            match Packet::decode(&self.data[self.pos..]) {
                Ok(packet) => {
                    self.pos += PACKET_LEN;
                    return Some(packet);
                }
                Err(_) => {
                    self.pos += 1;
                    self.skipped += 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    fn record(sequence: u16) -> (Packet, [u8; PACKET_LEN]) {
        let mut packet = Packet::new(0xD9);
        packet.sequence = sequence;
        packet.time_ms = u32::from(sequence) * 250;
        let bytes = packet.finalize();
        (packet, bytes)
    }

    #[test]
    fn test_back_to_back_records() {
        let (a, ra) = record(1);
        let (b, rb) = record(2);
        let mut stream = Vec::new();
        stream.extend_from_slice(&ra);
        stream.extend_from_slice(&rb);

        let packets: Vec<Packet> = PacketScanner::new(&stream).collect();
        assert_eq!(packets, [a, b]);
    }

    #[test]
    fn test_skips_damaged_record() {
        let (_, mut bad) = record(1);
        bad[30] ^= 0xFF;
        let (good, rg) = record(2);

        let mut stream = Vec::new();
        stream.extend_from_slice(&bad);
        stream.extend_from_slice(&rg);
        stream.extend_from_slice(&[0xAA, 0xAA, 0x01]);

        let mut scanner = PacketScanner::new(&stream);
        assert_eq!(scanner.next(), Some(good));
        assert_eq!(scanner.next(), None);
        assert_eq!(scanner.skipped(), PACKET_LEN);
        assert_eq!(scanner.remainder(), &[0xAA, 0xAA, 0x01]);
    }

    #[test]
    fn test_empty_stream() {
        let mut scanner = PacketScanner::new(&[]);
        assert_eq!(scanner.next(), None);
        assert_eq!(scanner.skipped(), 0);
    }
}
