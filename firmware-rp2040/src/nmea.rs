//! NMEA decoding for the NEO-6M receiver.
//!
//! Only `GGA` (position, altitude, fix quality) and `RMC` (validity,
//! position) are used; any talker id is accepted.

use grib_flight::{GpsFix, NmeaDecoder};
use heapless::Vec;

/// Fields we ever index into; longer sentences are truncated.
const MAX_FIELDS: usize = 20;

/// Validates the `*hh` checksum of a sentence.
///
/// Sentences without a checksum are accepted, as the receiver can be
/// configured to omit it.
pub fn validate_checksum(line: &[u8]) -> bool {
    let body = line.strip_prefix(b"$").unwrap_or(line);
    let mut parts = body.splitn(2, |&b| b == b'*');
    let payload = parts.next().unwrap_or(&[]);
    let Some(hex) = parts.next() else {
        return true;
    };
    if hex.len() < 2 {
        return false;
    }

    let calc = payload.iter().fold(0u8, |acc, &b| acc ^ b);
    core::str::from_utf8(&hex[..2])
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .is_some_and(|given| given == calc)
}

/// `DDMM.MMMM` / `DDDMM.MMMM` plus hemisphere to signed decimal degrees.
///
/// Line noise can put any UTF-8 in a field; only ASCII is split.
fn parse_coordinate(raw: &str, hemisphere: &str) -> Option<f32> {
    if !raw.is_ascii() {
        return None;
    }
    let dot = raw.find('.').unwrap_or(raw.len());
    let split = dot.checked_sub(2).filter(|&n| n > 0)?;
    let degrees: f32 = raw.get(..split)?.parse().ok()?;
    let minutes: f32 = raw.get(split..)?.parse().ok()?;
    let value = degrees + minutes / 60.0;

    match hemisphere {
        "S" | "W" => Some(-value),
        "N" | "E" => Some(value),
        _ => None,
    }
}

/// Keeps the last decoded position; fields survive sentences without a fix.
#[derive(Clone, Copy, Debug, Default)]
pub struct GgaDecoder {
    fix: GpsFix,
    rejected: u32,
}

impl GgaDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fix: GpsFix {
                latitude: 0.0,
                longitude: 0.0,
                altitude: 0.0,
                quality: 0,
                valid: false,
            },
            rejected: 0,
        }
    }

    /// Sentences dropped for a bad checksum or encoding.
    #[must_use]
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    fn position(&mut self, fields: &[&str]) {
        if let (Some(lat), Some(lon)) = (
            parse_coordinate(fields[0], fields[1]),
            parse_coordinate(fields[2], fields[3]),
        ) {
            self.fix.latitude = lat;
            self.fix.longitude = lon;
        }
    }

    fn gga(&mut self, fields: &[&str]) {
        if fields.len() < 10 {
            return;
        }
        // Field 6: fix quality
        self.fix.quality = fields[6].parse().unwrap_or(0);
        self.fix.valid = self.fix.quality != 0;
        if !self.fix.valid {
            return;
        }
        self.position(&fields[2..6]);
        // Field 9: altitude above mean sea level
        if let Ok(altitude) = fields[9].parse() {
            self.fix.altitude = altitude;
        }
    }

    fn rmc(&mut self, fields: &[&str]) {
        if fields.len() < 7 {
            return;
        }
        // Field 2: A = active, V = void
        if fields[2] != "A" {
            return;
        }
        self.position(&fields[3..7]);
    }
}

impl NmeaDecoder for GgaDecoder {
    fn feed(&mut self, line: &[u8]) {
        if !validate_checksum(line) {
            self.rejected = self.rejected.wrapping_add(1);
            defmt::debug!("nmea: checksum mismatch");
            return;
        }
        let Ok(sentence) = core::str::from_utf8(line) else {
            self.rejected = self.rejected.wrapping_add(1);
            return;
        };
        let sentence = sentence.split('*').next().unwrap_or(sentence);

        let fields: Vec<&str, MAX_FIELDS> = sentence.split(',').take(MAX_FIELDS).collect();
        let Some(kind) = fields.first().and_then(|f| f.get(3..)) else {
            return;
        };
        match kind {
            "GGA" => self.gga(&fields),
            "RMC" => self.rmc(&fields),
            _ => {}
        }
    }

    fn fix(&self) -> GpsFix {
        self.fix
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_coordinate_degrees_and_minutes() {
        let lat = parse_coordinate("5545.0000", "N").unwrap();
        assert!((lat - 55.75).abs() < 1e-4);
        let lon = parse_coordinate("03737.2000", "W").unwrap();
        assert!((lon + 37.62).abs() < 1e-4);
        assert_eq!(parse_coordinate("12.5", "N"), None);
        assert_eq!(parse_coordinate("5545.0000", "X"), None);
    }

    #[test]
    fn test_non_ascii_coordinate_is_rejected() {
        assert_eq!(parse_coordinate("1\u{20ac}.5", "N"), None);
        assert_eq!(parse_coordinate("55\u{e9}5.00", "N"), None);
    }

    #[test]
    fn test_garbled_sentence_keeps_last_fix() {
        let mut gps = GgaDecoder::new();
        gps.feed(b"$GPGGA,120000,5545.0000,N,03737.2000,E,1,08,0.9,150.0,M,,M,,");
        assert!(gps.fix().valid);

        // No checksum, so it reaches the field parser.
        gps.feed("$GPGGA,120001,5\u{20ac}.0,N,03\u{20ac}.2,E,1,08,0.9,151.0,M,,M,,".as_bytes());
        let fix = gps.fix();
        assert!((fix.latitude - 55.75).abs() < 1e-4);
        assert!((fix.longitude - 37.62).abs() < 1e-4);
        assert_eq!(fix.altitude, 151.0);
    }
}
