//! Fixed-layout telemetry packet.
//!
//! 60 bytes, little-endian, no padding. Offsets:
//!
//! ```text
//!  0 start u16      2 team u16       4 time u32       8 temp i16
//! 10 pressure u32  14 accel 3xi16   20 gyro 3xi16    26 checksum-26 u8
//! 27 sequence u16  29 status u8     30 light u16     32 mag 3xi16
//! 38 probe i16     40 lat f32       44 lon f32       48 gps alt f32
//! 52 fix u8        53 co2 u16       55 methane u16   57 oxygen u16
//! 59 checksum u8
//! ```

use crate::checksum::checksum;
use crate::status::StatusFlags;

/// Total encoded length.
pub const PACKET_LEN: usize = 60;

/// Sentinel at offset 0 (`AA AA` on the wire).
pub const START_MARKER: u16 = 0xAAAA;

/// Number of leading bytes covered by the first checksum.
pub const HEADER_CHECKSUM_LEN: usize = 26;

const HEADER_CHECKSUM_OFFSET: usize = 26;
const CHECKSUM_OFFSET: usize = PACKET_LEN - 1;

/// Error type for serialization into a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is shorter than [`PACKET_LEN`].
    BufferTooSmall,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Reasons a received record is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Fewer than [`PACKET_LEN`] bytes.
    Length,
    /// First two bytes are not [`START_MARKER`].
    StartMarker,
    /// Checksum over the first 26 bytes does not match.
    HeaderChecksum,
    /// Checksum over bytes `[0, 59)` does not match.
    Checksum,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Length => write!(f, "record too short"),
            Self::StartMarker => write!(f, "missing start marker"),
            Self::HeaderChecksum => write!(f, "header checksum mismatch"),
            Self::Checksum => write!(f, "packet checksum mismatch"),
        }
    }
}

/// One telemetry sample.
///
/// The two checksum fields are owned by [`Packet::finalize`]; whatever a
/// caller stores there is overwritten before the packet leaves the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub start: u16,
    pub team_id: u16,
    /// Milliseconds since boot.
    pub time_ms: u32,
    /// Barometer temperature in hundredths of a degree.
    pub temperature_centi: i16,
    /// Raw barometer pressure (Pa).
    pub pressure: u32,
    pub acceleration: [i16; 3],
    pub angular_rate: [i16; 3],
    pub header_checksum: u8,
    pub sequence: u16,
    pub status: StatusFlags,
    /// Ambient light, lux x1000.
    pub light: u16,
    pub magnetic: [i16; 3],
    /// DS18B20 temperature code, 1/16 degree per LSB.
    pub probe_temperature: i16,
    pub latitude: f32,
    pub longitude: f32,
    pub gps_altitude: f32,
    pub gps_fix: u8,
    /// CO2 concentration, ppm.
    pub co2: u16,
    /// Methane, ppm x1000.
    pub methane: u16,
    /// Oxygen cell voltage, V x1000.
    pub oxygen: u16,
    pub checksum: u8,
}

/// Cursor writing little-endian fields into a fixed buffer.
struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    #[inline]
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    #[inline]
    fn put_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    #[inline]
    fn put_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    fn put_i16(&mut self, value: i16) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    fn put_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    fn put_f32(&mut self, value: f32) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    fn put_axes(&mut self, axes: &[i16; 3]) {
        for &a in axes {
            self.put_i16(a);
        }
    }
}

/// Cursor reading little-endian fields from a full record.
struct PacketReader<'a> {
    buf: &'a [u8; PACKET_LEN],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    #[inline]
    fn new(buf: &'a [u8; PACKET_LEN]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    #[inline]
    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    #[inline]
    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    #[inline]
    fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    #[inline]
    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    #[inline]
    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    #[inline]
    fn axes(&mut self) -> [i16; 3] {
        [self.i16(), self.i16(), self.i16()]
    }
}

impl Packet {
    /// Empty packet carrying the start marker and team identifier.
    #[must_use]
    pub fn new(team_id: u16) -> Self {
        Self {
            start: START_MARKER,
            team_id,
            ..Self::default()
        }
    }

    /// Serialize into `buf`, returning the number of bytes written.
    ///
    /// Checksum fields are written as they currently are; call
    /// [`Packet::finalize`] first for a wire-ready record.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `buf` is shorter than
    /// [`PACKET_LEN`].
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        if buf.len() < PACKET_LEN {
            return Err(SerializeError::BufferTooSmall);
        }

        let mut w = PacketWriter::new(buf);
        w.put_u16(self.start);
        w.put_u16(self.team_id);
        w.put_u32(self.time_ms);
        w.put_i16(self.temperature_centi);
        w.put_u32(self.pressure);
        w.put_axes(&self.acceleration);
        w.put_axes(&self.angular_rate);
        w.put_u8(self.header_checksum);
        w.put_u16(self.sequence);
        w.put_u8(self.status.bits());
        w.put_u16(self.light);
        w.put_axes(&self.magnetic);
        w.put_i16(self.probe_temperature);
        w.put_f32(self.latitude);
        w.put_f32(self.longitude);
        w.put_f32(self.gps_altitude);
        w.put_u8(self.gps_fix);
        w.put_u16(self.co2);
        w.put_u16(self.methane);
        w.put_u16(self.oxygen);
        w.put_u8(self.checksum);

        debug_assert_eq!(w.pos, PACKET_LEN);
        Ok(w.pos)
    }

    /// Wire image of the packet as it currently stands.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        // Cannot fail: the buffer is exactly PACKET_LEN.
        let _ = self.serialize(&mut buf);
        buf
    }

    /// Recompute both checksum fields and return the finished wire image.
    ///
    /// The header checksum covers bytes `[0, 26)`; the packet checksum covers
    /// bytes `[0, 59)`, which includes the freshly written header checksum but
    /// never itself.
    pub fn finalize(&mut self) -> [u8; PACKET_LEN] {
        let mut bytes = self.to_bytes();

        self.header_checksum = checksum(&bytes[..HEADER_CHECKSUM_LEN]);
        bytes[HEADER_CHECKSUM_OFFSET] = self.header_checksum;

        self.checksum = checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET] = self.checksum;

        bytes
    }

    /// Read fields back from a record without any validation.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; PACKET_LEN]) -> Self {
        let mut r = PacketReader::new(bytes);
        Self {
            start: r.u16(),
            team_id: r.u16(),
            time_ms: r.u32(),
            temperature_centi: r.i16(),
            pressure: r.u32(),
            acceleration: r.axes(),
            angular_rate: r.axes(),
            header_checksum: r.u8(),
            sequence: r.u16(),
            status: StatusFlags::from_bits(r.u8()),
            light: r.u16(),
            magnetic: r.axes(),
            probe_temperature: r.i16(),
            latitude: r.f32(),
            longitude: r.f32(),
            gps_altitude: r.f32(),
            gps_fix: r.u8(),
            co2: r.u16(),
            methane: r.u16(),
            oxygen: r.u16(),
            checksum: r.u8(),
        }
    }

    /// Validate and decode the first [`PACKET_LEN`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Any failed check of the start marker or either checksum.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let record: &[u8; PACKET_LEN] = bytes
            .get(..PACKET_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(DecodeError::Length)?;

        if u16::from_le_bytes([record[0], record[1]]) != START_MARKER {
            return Err(DecodeError::StartMarker);
        }
        if checksum(&record[..HEADER_CHECKSUM_LEN]) != record[HEADER_CHECKSUM_OFFSET] {
            return Err(DecodeError::HeaderChecksum);
        }
        if checksum(&record[..CHECKSUM_OFFSET]) != record[CHECKSUM_OFFSET] {
            return Err(DecodeError::Checksum);
        }

        Ok(Self::from_bytes(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::MissionPhase;

    fn sample() -> Packet {
        Packet {
            time_ms: 123_456,
            temperature_centi: 2150,
            pressure: 101_325,
            acceleration: [12, -340, 16_384],
            angular_rate: [-7, 0, 3],
            sequence: 42,
            status: StatusFlags::with_phase(MissionPhase::Ascent) | StatusFlags::GPS_FIX,
            light: 1234,
            magnetic: [100, -200, 300],
            probe_temperature: 0x0191,
            latitude: 55.7558,
            longitude: 37.6173,
            gps_altitude: 152.5,
            gps_fix: 1,
            co2: 415,
            methane: 2200,
            oxygen: 1650,
            ..Packet::new(0xD9)
        }
    }

    #[test]
    fn test_layout_offsets() {
        let mut packet = sample();
        let bytes = packet.finalize();

        assert_eq!(&bytes[0..2], &[0xAA, 0xAA]);
        assert_eq!(&bytes[2..4], &[0xD9, 0x00]);
        assert_eq!(&bytes[4..8], &123_456u32.to_le_bytes());
        assert_eq!(&bytes[10..14], &101_325u32.to_le_bytes());
        assert_eq!(bytes[26], packet.header_checksum);
        assert_eq!(&bytes[27..29], &42u16.to_le_bytes());
        assert_eq!(bytes[29], 0b0000_1010);
        assert_eq!(&bytes[38..40], &[0x91, 0x01]);
        assert_eq!(&bytes[40..44], &55.7558f32.to_le_bytes());
        assert_eq!(bytes[52], 1);
        assert_eq!(&bytes[57..59], &1650u16.to_le_bytes());
        assert_eq!(bytes[59], packet.checksum);
    }

    #[test]
    fn test_finalize_checksums_cover_expected_ranges() {
        let mut packet = sample();
        let bytes = packet.finalize();

        assert_eq!(checksum(&bytes[..26]), packet.header_checksum);
        assert_eq!(checksum(&bytes[..PACKET_LEN - 1]), packet.checksum);
        // XOR of the whole record including its own checksum cancels out.
        assert_eq!(checksum(&bytes), 0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut packet = sample();
        let first = packet.finalize();
        let second = packet.finalize();
        assert_eq!(first, second);

        // Stale values in the checksum fields do not leak into the result.
        packet.header_checksum = 0x55;
        packet.checksum = 0x66;
        assert_eq!(packet.finalize(), first);
    }

    #[test]
    fn test_decode_accepts_finalized_record() {
        let mut packet = sample();
        let bytes = packet.finalize();
        assert_eq!(Packet::decode(&bytes), Ok(packet));
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut packet = sample();
        let bytes = packet.finalize();

        let mut header = bytes;
        header[5] ^= 0x01;
        assert_eq!(Packet::decode(&header), Err(DecodeError::HeaderChecksum));

        let mut tail = bytes;
        tail[40] ^= 0x80;
        assert_eq!(Packet::decode(&tail), Err(DecodeError::Checksum));

        let mut marker = bytes;
        marker[0] = 0x55;
        assert_eq!(Packet::decode(&marker), Err(DecodeError::StartMarker));

        assert_eq!(Packet::decode(&bytes[..59]), Err(DecodeError::Length));
    }

    #[test]
    fn test_serialize_buffer_too_small() {
        let packet = sample();
        let mut buf = [0u8; 32];
        assert_eq!(
            packet.serialize(&mut buf),
            Err(SerializeError::BufferTooSmall)
        );
    }
}
