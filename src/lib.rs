//! This crate configures the runtime parameters of a brushless motor
//! controller through the text console its firmware exposes on a serial
//! port.
//!
//! It supports `no_std` environments unless the `std` or `serial` feature is enabled.
//!
//! The console is menu driven and meant for humans: single character
//! commands switch modes, and the firmware prints free text lines back with
//! no framing or acknowledgements. The client here keeps track of which mode
//! the firmware is in, reads its lines into typed events, and sequences
//! multi-step operations so that nothing is sent before the firmware is
//! ready for it:
//! * Load - list every setting and record the device's values.
//! * Write - send only the settings that changed, one per acknowledgement, then reload.
//! * Zero - capture the current position as zero.
//! * Calibrate - measure pole pairs and encoder offset.
//!
//! The serial port used for the console should be configured like so:
//! * Baud rate: 921600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod parameter;
pub mod preset;
pub mod response;
pub mod scheduler;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
mod mock_serial;
