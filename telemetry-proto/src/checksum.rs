//! XOR block checksum used by both packet checksum fields.

/// XOR of every byte in `data`.
#[inline]
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0x00, |acc, &b| acc ^ b)
}

/// Running XOR digest for incremental calculation.
///
/// Use this when the bytes arrive one field at a time (e.g., during
/// serialization).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XorDigest {
    value: u8,
}

impl XorDigest {
    /// Create a new, empty digest.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Update the digest with a single byte.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.value ^= byte;
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update_slice(&mut self, data: &[u8]) {
        for &b in data {
            self.update(b);
        }
    }

    /// Current checksum value. The digest stays usable afterwards.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }
}
