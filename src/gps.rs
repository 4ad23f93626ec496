//! Positioning receiver line hand-off.
//!
//! The UART receive side runs outside the superloop (interrupt or task) and
//! assembles NMEA sentences byte by byte with [`NmeaAssembler`]. Completed
//! sentences go through a single-slot [`NmeaSlot`]: a newer line replaces an
//! undrained one, and the replacement is counted. The superloop takes at
//! most one line per cycle and hands it to an [`NmeaDecoder`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use portable_atomic::{AtomicU32, Ordering};

/// Receive buffer size, including room for the terminator.
pub const NMEA_LINE_CAPACITY: usize = 128;

/// Shortest line worth publishing.
const MIN_LINE_LEN: usize = 6;

pub type NmeaLine = Vec<u8, NMEA_LINE_CAPACITY>;

/// Latest decoded position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsFix {
    pub latitude: f32,
    pub longitude: f32,
    /// Metres above mean sea level.
    pub altitude: f32,
    /// GGA fix quality (0 = no fix).
    pub quality: u8,
    /// Last sentence carried a valid fix.
    pub valid: bool,
}

/// NMEA sentence parser, kept outside the flight core.
pub trait NmeaDecoder {
    /// Consume one complete sentence (no line terminator).
    fn feed(&mut self, line: &[u8]);

    /// Most recent position; fields keep their last values between fixes.
    fn fix(&self) -> GpsFix;
}

/// Single-slot, latest-wins hand-off from the receive side.
pub struct NmeaSlot {
    signal: Signal<CriticalSectionRawMutex, NmeaLine>,
    published: AtomicU32,
    overwritten: AtomicU32,
}

impl Default for NmeaSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaSlot {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
            published: AtomicU32::new(0),
            overwritten: AtomicU32::new(0),
        }
    }

    /// Store `line`, replacing any line not yet taken.
    pub fn publish(&self, line: NmeaLine) {
        if self.signal.signaled() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.signal.signal(line);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the pending line, if any. Never blocks.
    pub fn take(&self) -> Option<NmeaLine> {
        self.signal.try_take()
    }

    /// Lines accepted since boot.
    pub fn published(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Lines replaced before the superloop drained them.
    pub fn overwritten(&self) -> u32 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

/// Byte-at-a-time sentence assembler for the receive side.
#[derive(Default)]
pub struct NmeaAssembler {
    buf: NmeaLine,
}

impl NmeaAssembler {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one received byte. Returns the completed line on `\n` if it
    /// looks like a sentence (`$` first, at least 6 bytes).
    ///
    /// `\r` is ignored. A line that fills the buffer is thrown away and
    /// assembly restarts with the next byte.
    pub fn push(&mut self, byte: u8) -> Option<NmeaLine> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.buf);
                (line.len() >= MIN_LINE_LEN && line.first() == Some(&b'$')).then_some(line)
            }
            b'\r' => None,
            _ => {
                if self.buf.push(byte).is_err() || self.buf.len() >= NMEA_LINE_CAPACITY - 1 {
                    self.buf.clear();
                }
                None
            }
        }
    }

    /// Feed one byte and publish any completed line into `slot`.
    pub fn push_into(&mut self, byte: u8, slot: &NmeaSlot) {
        if let Some(line) = self.push(byte) {
            slot.publish(line);
        }
    }

    /// Bytes of the line in progress.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Drain at most one line from `slot` into `decoder`. Returns whether a line
/// was consumed.
pub fn drain_one<D: NmeaDecoder>(slot: &NmeaSlot, decoder: &mut D) -> bool {
    match slot.take() {
        Some(line) => {
            decoder.feed(&line);
            true
        }
        None => false,
    }
}
