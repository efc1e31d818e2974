//! Line oriented transport over any [`embedded_io`] byte interface.
//!
//! Reads never wait for a full line. Whatever the interface has ready is
//! appended to a fixed size buffer, and a line is handed out once its newline
//! has arrived.

use embedded_io::{Error as _, ErrorKind};
use heapless::{String, Vec};

use crate::error::{Error, Result};

/// Largest chunk pulled from the interface per read.
const READ_CHUNK: usize = 64;

/// Owns the serial interface while connected. `L` bounds the longest line.
pub struct Transport<S: embedded_io::Read + embedded_io::Write, const L: usize = 256> {
    interface: Option<S>,
    line: Vec<u8, L>,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Transport<S, L> {
    pub fn new(interface: S) -> Self {
        Self {
            interface: Some(interface),
            line: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.interface.is_some()
    }

    pub fn interface(&self) -> Option<&S> {
        self.interface.as_ref()
    }

    pub fn interface_mut(&mut self) -> Option<&mut S> {
        self.interface.as_mut()
    }

    /// Release the interface. Calling this again is harmless.
    pub fn close(&mut self) -> Option<S> {
        self.line.clear();
        self.interface.take()
    }

    /// Write every byte, then flush.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), S::Error> {
        let interface = self.interface.as_mut().ok_or(Error::NotConnected)?;
        interface.write_all(bytes).map_err(Error::SerialError)?;
        interface.flush().map_err(Error::SerialError)
    }

    /// Return the next complete line, trimmed, if one has arrived.
    ///
    /// Each byte is decoded as one character (Latin-1), so binary noise can
    /// never fail decoding. Performs at most one read from the interface.
    pub fn read_line(&mut self) -> Result<Option<String<L>>, S::Error> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let interface = self.interface.as_mut().ok_or(Error::NotConnected)?;
        let free = L - self.line.len();
        if free == 0 {
            // No newline anywhere in a full buffer.
            self.line.clear();
            return Err(Error::LineOverflow);
        }

        let mut chunk = [0u8; READ_CHUNK];
        let wanted = core::cmp::min(free, READ_CHUNK);
        match interface.read(&mut chunk[..wanted]) {
            Ok(bytes_read) => {
                // Cannot fail, we only asked for as much as was free.
                let _ = self.line.extend_from_slice(&chunk[..bytes_read]);
            }
            Err(e) if is_no_data(e.kind()) => return Ok(None),
            Err(e) => return Err(Error::SerialError(e)),
        }

        Ok(self.take_line())
    }

    /// Drop everything already received, buffered here or by the interface.
    pub fn clear_input(&mut self) -> Result<(), S::Error> {
        self.line.clear();
        let interface = self.interface.as_mut().ok_or(Error::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match interface.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) if is_no_data(e.kind()) => return Ok(()),
                Err(e) => return Err(Error::SerialError(e)),
            }
        }
    }

    fn take_line(&mut self) -> Option<String<L>> {
        let end = self.line.iter().position(|&byte| byte == b'\n')?;
        let mut line = String::new();
        for &byte in self.line[..end].trim_ascii() {
            // Latin-1 above 0x7F takes two bytes once decoded, so a line of
            // mostly high bytes may be cut short here.
            if line.push(char::from(byte)).is_err() {
                break;
            }
        }
        let consumed = end + 1;
        let remaining = self.line.len() - consumed;
        self.line.rotate_left(consumed);
        self.line.truncate(remaining);
        Some(line)
    }
}

/// Serial ports report "nothing arrived within the timeout" as an error.
fn is_no_data(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::Interrupted)
}
