//! UART link to the E220 module.

use embassy_rp::uart::{Blocking, Error as UartError, UartTx};
use embassy_time::{Duration, Instant};
use grib_flight::radio::{SerialTransport, TransportError};

/// Blocking transmit half of the radio UART.
///
/// The FIFO drains at line rate, so the timeout is checked once the frame
/// has left the shift register.
pub struct UartTransport<'d> {
    tx: UartTx<'d, Blocking>,
}

/// Convert UART errors to [`TransportError`].
///
/// A helper function instead of a `From` impl to avoid orphan rule issues.
#[inline]
fn uart_error_to_transport_error(_e: UartError) -> TransportError {
    TransportError::Bus
}

impl<'d> UartTransport<'d> {
    #[must_use]
    pub fn new(tx: UartTx<'d, Blocking>) -> Self {
        Self { tx }
    }
}

impl SerialTransport for UartTransport<'_> {
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), TransportError> {
        let started = Instant::now();
        self.tx
            .blocking_write(bytes)
            .map_err(uart_error_to_transport_error)?;
        self.tx
            .blocking_flush()
            .map_err(uart_error_to_transport_error)?;

        if started.elapsed() > Duration::from_millis(u64::from(timeout_ms)) {
            return Err(TransportError::Timeout);
        }
        Ok(())
    }
}
