//! Millisecond tick source.

/// Free-running millisecond counter, wrapping at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds from `since` to `now`, correct across counter wrap.
#[inline]
#[must_use]
pub const fn elapsed_ms(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}
