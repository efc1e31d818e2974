//! Serial link settings.

use fugit::MillisDurationU32;

/// The firmware console runs at a fixed baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 921_600;
/// Short enough that a read never stalls a tick.
pub const DEFAULT_READ_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(1);
pub const DEFAULT_TICK_INTERVAL: MillisDurationU32 = MillisDurationU32::millis(1);

/// How to open and poll the serial link.
///
/// Data bits 8, stop bits 1, no parity and no flow control are fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSettings {
    pub baud_rate: u32,
    /// How long one read may wait for data.
    pub read_timeout: MillisDurationU32,
    /// How often [`CommandDispatcher::tick`](crate::dispatcher::CommandDispatcher::tick) should run.
    pub tick_interval: MillisDurationU32,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl PortSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: MillisDurationU32) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: MillisDurationU32) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}
