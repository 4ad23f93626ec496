use embassy_time::Instant;
use grib_flight::Clock;

/// Milliseconds since boot, truncated to 32 bits like the flight time field.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
