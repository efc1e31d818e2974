//! Our error types for the motor controller console.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for motor controller console communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Transport is closed")]
    NotConnected,
    #[error("Line exceeded the receive buffer and was discarded")]
    LineOverflow,
    #[error("Outbound message did not fit the transmit buffer")]
    BufferError,
}
