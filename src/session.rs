//! Protocol state of one connection to the firmware console.
//!
//! The console only accepts a top level command while it sits at its menu
//! prompt, and it never acknowledges anything explicitly. [`DeviceSession`]
//! keeps track of which mode the firmware is in and decides what, if
//! anything, may be sent next. It performs no I/O itself: every transition
//! hands back the [`Command`]s to transmit, and the caller writes them.
//!
//! Nothing outside this module assigns [`ProtocolState`].

use core::fmt;

use heapless::{String, Vec};
use log::{debug, trace, warn};
use strum::EnumCount;

use crate::{
    command::{Command, WriteRequest},
    parameter::ParameterCode,
    response::{CalibrationFailure, Event, ParameterLine},
    store::ParameterStore,
};

/// Longest firmware release string we keep. Longer ones are truncated.
pub const FIRMWARE_VERSION_LEN: usize = 32;

/// Commands produced by a single transition.
pub type Commands = Vec<Command, 2>;

/// Which mode the firmware console is in, as far as we can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Freshly connected. The firmware could be in any mode.
    Unknown,
    /// At the top level prompt, ready for any command.
    Menu,
    ZeroCapture,
    /// Listing settings.
    Loading,
    /// Submitting changed settings, one per acknowledgement.
    Writing,
    Calibrating,
}

/// Progress of the most recent calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStatus {
    /// Requested, the firmware is measuring pole pairs.
    Pending,
    Success,
    Failure(CalibrationFailure),
    /// Latest electrical angle sample, radians.
    ElectricAngle(f64),
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationStatus::Pending => write!(f, "Measure PP"),
            CalibrationStatus::Success => write!(f, "Success"),
            CalibrationStatus::Failure(CalibrationFailure::WrongPolePairs) => {
                write!(f, "Failed. Wrong pole pairs")
            }
            CalibrationStatus::ElectricAngle(angle) => write!(f, "{:.2}", angle),
        }
    }
}

/// Everything known about the firmware on the other end of one connection.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    state: ProtocolState,
    firmware_version: Option<String<FIRMWARE_VERSION_LEN>>,
    zero_position: Option<f64>,
    calibration: Option<CalibrationStatus>,
    /// Drained from the back, so values go out in reverse index order.
    pending_writes: Vec<WriteRequest, { ParameterCode::COUNT }>,
    reload_requested: bool,
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSession {
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Unknown,
            firmware_version: None,
            zero_position: None,
            calibration: None,
            pending_writes: Vec::new(),
            reload_requested: false,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Whether the firmware is ready for a top level command.
    pub fn is_ready(&self) -> bool {
        self.state == ProtocolState::Menu
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    pub fn zero_position(&self) -> Option<f64> {
        self.zero_position
    }

    pub fn calibration(&self) -> Option<CalibrationStatus> {
        self.calibration
    }

    /// Parameter updates not yet sent, in the order they were queued.
    pub fn pending_writes(&self) -> &[WriteRequest] {
        &self.pending_writes
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    fn enter(&mut self, state: ProtocolState) {
        if self.state != state {
            debug!("Protocol state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
    }

    /// Force the firmware to its menu. Only does anything on a fresh session.
    pub fn synchronize(&mut self) -> Commands {
        let mut commands = Commands::new();
        if self.state == ProtocolState::Unknown {
            let _ = commands.push(Command::ForceMenu);
            let _ = commands.push(Command::Escape);
            self.enter(ProtocolState::Menu);
        }
        commands
    }

    /// Start listing settings. Only valid at the menu.
    pub fn begin_load(&mut self) -> Option<Command> {
        if !self.is_ready() {
            debug!("Load ignored in {:?}", self.state);
            return None;
        }
        self.enter(ProtocolState::Loading);
        Some(Command::Settings)
    }

    /// Start writing every dirty parameter with a parseable value. Only valid at the menu.
    ///
    /// The settings sub-mode is entered even if there is nothing to send; the
    /// first acknowledgement then leaves it again.
    pub fn begin_write(&mut self, store: &ParameterStore) -> Option<Command> {
        if !self.is_ready() {
            debug!("Write ignored in {:?}", self.state);
            return None;
        }
        self.pending_writes = store.dirty_writes();
        debug!("Queued {} parameter writes", self.pending_writes.len());
        self.enter(ProtocolState::Writing);
        Some(Command::Settings)
    }

    /// Capture the zero position. Accepted in any state.
    pub fn begin_zero(&mut self) -> Command {
        self.enter(ProtocolState::ZeroCapture);
        Command::Zero
    }

    /// Start calibration. Only valid at the menu.
    pub fn begin_calibrate(&mut self) -> Option<Command> {
        if !self.is_ready() {
            debug!("Calibrate ignored in {:?}", self.state);
            return None;
        }
        self.calibration = Some(CalibrationStatus::Pending);
        self.enter(ProtocolState::Calibrating);
        Some(Command::Calibrate)
    }

    /// Apply one classified line and return whatever must be sent in response.
    pub fn handle(&mut self, event: Event<'_>, store: &mut ParameterStore) -> Commands {
        let mut commands = Commands::new();
        match (self.state, event) {
            (_, Event::MenuEntered) => {
                self.enter(ProtocolState::Menu);
                if self.reload_requested {
                    self.reload_requested = false;
                    if let Some(command) = self.begin_load() {
                        let _ = commands.push(command);
                    }
                }
            }
            (_, Event::FirmwareVersion(version)) => {
                let mut stored = String::new();
                for c in version.chars() {
                    if stored.push(c).is_err() {
                        break;
                    }
                }
                debug!("Firmware version {}", stored);
                self.firmware_version = Some(stored);
            }
            (ProtocolState::ZeroCapture, Event::ZeroPositionCaptured(position)) => {
                debug!("Zero position {}", position);
                self.zero_position = Some(position);
            }
            (ProtocolState::Loading, Event::ParameterValue(row)) => {
                self.load_row(row, store, &mut commands);
            }
            (ProtocolState::Writing, Event::ParameterValue(ParameterLine { code, .. }))
                if code.is_final() =>
            {
                self.acknowledge_write(&mut commands);
            }
            (ProtocolState::Writing, Event::FinalCodeEcho) => {
                self.acknowledge_write(&mut commands);
            }
            (ProtocolState::Calibrating, Event::CalibrationFailed(reason)) => {
                debug!("Calibration failed: {:?}", reason);
                self.calibration = Some(CalibrationStatus::Failure(reason));
            }
            (ProtocolState::Calibrating, Event::CalibrationSucceeded) => {
                debug!("Calibration succeeded");
                self.calibration = Some(CalibrationStatus::Success);
            }
            (ProtocolState::Calibrating, Event::ElectricAngleSample(angle))
            | (
                ProtocolState::Calibrating,
                Event::ParameterValue(ParameterLine {
                    angle_sample: Some(angle),
                    ..
                }),
            ) => {
                self.calibration = Some(CalibrationStatus::ElectricAngle(angle));
            }
            (state, event) => {
                trace!("Ignoring {:?} in {:?}", event, state);
            }
        }
        commands
    }

    fn load_row(&mut self, row: ParameterLine, store: &mut ParameterStore, commands: &mut Commands) {
        store.record_loaded(row.code, row.value);
        if row.is_final() {
            // Listing complete, back out to the menu.
            let _ = commands.push(Command::Escape);
        }
    }

    /// The firmware reprints the final row once it has taken the previous
    /// value, which is the only sign it is ready for the next one.
    fn acknowledge_write(&mut self, commands: &mut Commands) {
        while let Some(request) = self.pending_writes.pop() {
            if request.is_encodable() {
                debug!("Writing {}={}", request.code.code(), request.value);
                let _ = commands.push(Command::SetParameter(request));
                return;
            }
            warn!("Dropping {}={}, too long to send", request.code.code(), request.value);
        }
        let _ = commands.push(Command::Escape);
        self.reload_requested = true;
    }
}
