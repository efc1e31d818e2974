//! Binding to an OS serial port through [`serialport`]. Requires the `serial` feature.

use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;

use crate::{config::PortSettings, transport::Transport};

/// Opening the port failed.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },
    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),
}

/// An open OS serial port, usable as an [`embedded_io`] interface.
pub struct SerialInterface(Box<dyn SerialPort>);

impl SerialInterface {
    pub fn name(&self) -> Option<String> {
        self.0.name()
    }
}

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            // Some platforms report an empty non-blocking read this way.
            std::io::ErrorKind::WouldBlock => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for SerialInterface {
    type Error = IoError;
}

impl embedded_io::Read for SerialInterface {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for SerialInterface {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Open `port_name` as configured by `settings`, 8N1 without flow control.
pub fn open<const L: usize>(
    port_name: &str,
    settings: &PortSettings,
) -> Result<Transport<SerialInterface, L>, ConnectionError> {
    let port = serialport::new(port_name, settings.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(u64::from(settings.read_timeout.to_millis())))
        .open()
        .map_err(|source| ConnectionError::Open {
            port: port_name.into(),
            source,
        })?;
    Ok(Transport::new(SerialInterface(port)))
}

/// Names of the serial ports currently present, for a port picker.
pub fn available_ports() -> Result<Vec<String>, ConnectionError> {
    let ports = serialport::available_ports().map_err(ConnectionError::Enumerate)?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}
