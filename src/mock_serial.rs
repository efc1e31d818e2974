//! We use this mocking module in unit tests to emulate the firmware's serial console.

const CAPACITY: usize = 2048;

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Bytes written to the mock serial port
    write_buffer: heapless::Vec<u8, CAPACITY>,
    /// Bytes the firmware "sent", waiting to be read
    read_buffer: heapless::Vec<u8, CAPACITY>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
    /// Nothing arrived within the read timeout
    WouldBlock,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MockSerialError::BufferOverflow => write!(f, "Mock buffer overflow"),
            MockSerialError::SimulatedError => write!(f, "Simulated serial error"),
            MockSerialError::WouldBlock => write!(f, "No data within the read timeout"),
        }
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            // A real port with a short timeout reports an empty read this way.
            MockSerialError::WouldBlock => embedded_io::ErrorKind::TimedOut,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::WouldBlock);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);

        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Append data to what will be returned by read(), after anything not yet read
    pub fn queue_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        // Compact away what has already been read.
        let unread = self.read_buffer.len() - self.read_position;
        self.read_buffer.rotate_left(self.read_position);
        self.read_buffer.truncate(unread);
        self.read_position = 0;

        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Queue one console line, newline terminated the way the firmware prints it
    pub fn queue_line(&mut self, line: &str) -> Result<(), MockSerialError> {
        self.queue_read_data(line.as_bytes())?;
        self.queue_read_data(b"\r\n")
    }

    /// Number of queued bytes not yet read
    pub fn unread_len(&self) -> usize {
        self.read_buffer.len() - self.read_position
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_multiple_times() {
        let mut mock = MockSerial::new();
        mock.write(b"e").unwrap();
        mock.write(&[0x1B]).unwrap();
        assert_eq!(mock.written_data(), &[b'e', 0x1B]);

        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = vec![0u8; CAPACITY + 1];

        let result = mock.write(&large_data);
        assert!(matches!(result, Err(MockSerialError::BufferOverflow)));
    }

    #[test]
    fn test_queue_appends_after_unread() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(b"Hello").unwrap();

        let mut buffer = [0u8; 3];
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        mock.queue_line(" World").unwrap();
        assert_eq!(mock.unread_len(), 2 + 6 + 2);

        let mut buffer = [0u8; 16];
        let bytes_read = mock.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..bytes_read], b"lo World\r\n");
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 10];

        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::WouldBlock)));
        assert_eq!(
            MockSerialError::WouldBlock.kind(),
            embedded_io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn test_error_is_displayable() {
        fn assert_error<E: core::error::Error>(error: &E) -> String {
            error.to_string()
        }
        assert_eq!(
            assert_error(&MockSerialError::SimulatedError),
            "Simulated serial error"
        );
        assert_eq!(
            crate::error::Error::SerialError(MockSerialError::WouldBlock).to_string(),
            "Serial communication error"
        );
    }

    #[test]
    fn test_error_flags_toggle() {
        let mut mock = MockSerial::new();

        mock.set_write_error(true);
        assert!(mock.write(b"test").is_err());
        assert!(mock.flush().is_err());

        mock.set_write_error(false);
        assert!(mock.write(b"test").is_ok());

        mock.queue_read_data(b"data").unwrap();
        mock.set_read_error(true);

        let mut buffer = [0u8; 10];
        assert!(mock.read(&mut buffer).is_err());

        mock.set_read_error(false);
        assert!(mock.read(&mut buffer).is_ok());
    }
}
