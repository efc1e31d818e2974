//! Outbound console commands and their byte encoding.

use core::fmt::Write as _;

use crate::parameter::ParameterCode;

/// Escape. Leaves the current sub-mode and returns the firmware to its menu.
pub const ESC: u8 = 0x1B;
/// Carriage return. Terminates a parameter write message.
pub const CR: u8 = 0x0D;

/// Longest encoded command: code, value and terminator.
pub const MAX_COMMAND_LEN: usize = 40;

/// Encoded form of a [`Command`].
pub type CommandBytes = heapless::Vec<u8, MAX_COMMAND_LEN>;

/// A single parameter update queued during a write sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteRequest {
    pub code: ParameterCode,
    pub value: f64,
}

impl WriteRequest {
    pub const fn new(code: ParameterCode, value: f64) -> Self {
        Self { code, value }
    }

    /// Whether the value fits a single write message.
    ///
    /// Values are sent in plain decimal, so very large or very small
    /// magnitudes (`1e50`, `1e-40`) are too long.
    pub fn is_encodable(&self) -> bool {
        Command::SetParameter(*self).encode().is_some()
    }
}

/// Everything the client ever sends to the firmware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `e` - Forces the firmware back to its top level menu from wherever it is.
    ForceMenu,
    /// `s` - Enters the settings sub-mode, which lists every parameter.
    Settings,
    /// `z` - Captures the current encoder position as zero.
    Zero,
    /// `c` - Starts pole pair and encoder calibration.
    Calibrate,
    /// ESC - Leaves the current sub-mode.
    Escape,
    /// `<code><value>\r` - Updates one parameter while in the settings sub-mode.
    SetParameter(WriteRequest),
}

impl Command {
    /// Encode this command for the wire.
    ///
    /// Values are written in plain decimal, e.g. `g6.4\r` or `t1000\r`.
    /// Returns `None` if the formatted value would not fit, see
    /// [`WriteRequest::is_encodable`].
    pub fn encode(&self) -> Option<CommandBytes> {
        let mut bytes = CommandBytes::new();
        match self {
            Command::ForceMenu => bytes.push(b'e').ok()?,
            Command::Settings => bytes.push(b's').ok()?,
            Command::Zero => bytes.push(b'z').ok()?,
            Command::Calibrate => bytes.push(b'c').ok()?,
            Command::Escape => bytes.push(ESC).ok()?,
            Command::SetParameter(request) => {
                let mut text: heapless::String<MAX_COMMAND_LEN> = heapless::String::new();
                write!(text, "{}{}", request.code.code(), request.value).ok()?;
                bytes.extend_from_slice(text.as_bytes()).ok()?;
                bytes.push(CR).ok()?;
            }
        }
        Some(bytes)
    }
}
