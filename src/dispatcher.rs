use log::{debug, warn};

use crate::{
    command::Command,
    error::{Error, Result},
    parameter::ParameterCode,
    preset::Preset,
    response,
    session::{Commands, DeviceSession, ProtocolState},
    store::ParameterStore,
    transport::Transport,
};

/// A user action, as submitted by a UI thread to the thread running the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    Load,
    Write,
    Zero,
    Calibrate,
    SetPending(ParameterCode, f64),
    ApplyPreset(&'static Preset),
}

/// An open transport and the protocol state that goes with it.
struct Link<S: embedded_io::Read + embedded_io::Write, const L: usize> {
    transport: Transport<S, L>,
    session: DeviceSession,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Link<S, L> {
    /// Apply a session transition and send what it produced. If sending
    /// fails the session is rolled back, since the firmware never saw it.
    fn transact(
        &mut self,
        transition: impl FnOnce(&mut DeviceSession) -> Commands,
    ) -> Result<(), S::Error> {
        let previous = self.session.clone();
        let commands = transition(&mut self.session);
        let result = send_all(&mut self.transport, &commands);
        if result.is_err() {
            debug!("Send failed, staying in {:?}", previous.state());
            self.session = previous;
        }
        result
    }
}

/// Drives the firmware console. Create one, [`connect`](Self::connect) it to
/// any interface implementing [embedded_io::Read] & [embedded_io::Write], then
/// call [`tick`](Self::tick) at a fixed interval.
///
/// Operations never wait for the firmware. They send the opening command and
/// return; progress shows up in [`session`](Self::session) and
/// [`store`](Self::store) as later ticks process the replies. An operation the
/// firmware is not ready for is dropped silently.
pub struct CommandDispatcher<S: embedded_io::Read + embedded_io::Write, const L: usize = 256> {
    link: Option<Link<S, L>>,
    /// Survives reconnects, so edits are not lost with the link.
    store: ParameterStore,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Default for CommandDispatcher<S, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> CommandDispatcher<S, L> {
    pub fn new() -> Self {
        Self {
            link: None,
            store: ParameterStore::new(),
        }
    }

    /// Start a fresh session on `interface`, closing any previous one.
    pub fn connect(&mut self, interface: S) {
        self.connect_transport(Transport::new(interface));
    }

    /// As [`connect`](Self::connect), for an already wrapped transport.
    pub fn connect_transport(&mut self, transport: Transport<S, L>) {
        self.disconnect();
        debug!("Connected");
        self.link = Some(Link {
            transport,
            session: DeviceSession::new(),
        });
    }

    /// Close the transport and forget the session, including any unfinished sequence.
    pub fn disconnect(&mut self) -> Option<S> {
        let mut link = self.link.take()?;
        debug!("Disconnected in {:?}", link.session.state());
        link.transport.close()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn session(&self) -> Option<&DeviceSession> {
        self.link.as_ref().map(|link| &link.session)
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn interface(&self) -> Option<&S> {
        self.link.as_ref()?.transport.interface()
    }

    pub fn interface_mut(&mut self) -> Option<&mut S> {
        self.link.as_mut()?.transport.interface_mut()
    }

    pub fn set_pending(&mut self, code: ParameterCode, value: f64) {
        self.store.set_pending(code, value);
    }

    /// See [`ParameterStore::set_pending_text`].
    pub fn set_pending_text(&mut self, code: ParameterCode, text: &str) -> Option<f64> {
        self.store.set_pending_text(code, text)
    }

    pub fn apply_preset(&mut self, preset: &Preset) {
        debug!("Applying preset {}", preset.name());
        self.store.apply_preset(preset);
    }

    /// Read every setting back from the device.
    pub fn load(&mut self) -> Result<(), S::Error> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };
        link.transact(|session| session.begin_load().into_iter().collect())
    }

    /// Write every changed setting, then reload.
    pub fn write(&mut self) -> Result<(), S::Error> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };
        if !link.session.is_ready() {
            debug!("Write ignored in {:?}", link.session.state());
            return Ok(());
        }
        // Unread listing rows would otherwise be taken for acknowledgements.
        link.transport.clear_input()?;
        let store = &self.store;
        link.transact(|session| session.begin_write(store).into_iter().collect())
    }

    /// Save the current position as zero.
    ///
    /// Allowed in any state. On a session that has not ticked yet the menu
    /// handshake goes out first.
    pub fn zero(&mut self) -> Result<(), S::Error> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };
        link.transact(DeviceSession::synchronize)?;
        link.transact(|session| core::iter::once(session.begin_zero()).collect())
    }

    /// Run pole pair and encoder calibration.
    pub fn calibrate(&mut self) -> Result<(), S::Error> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };
        link.transact(|session| session.begin_calibrate().into_iter().collect())
    }

    pub fn handle(&mut self, request: Request) -> Result<(), S::Error> {
        match request {
            Request::Load => self.load(),
            Request::Write => self.write(),
            Request::Zero => self.zero(),
            Request::Calibrate => self.calibrate(),
            Request::SetPending(code, value) => {
                self.set_pending(code, value);
                Ok(())
            }
            Request::ApplyPreset(preset) => {
                self.apply_preset(preset);
                Ok(())
            }
        }
    }

    /// Process at most one line from the firmware.
    ///
    /// The first tick of a session sends the menu handshake instead of
    /// reading. Read failures count as "nothing this tick"; only failures to
    /// send are returned.
    pub fn tick(&mut self) -> Result<(), S::Error> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };

        if link.session.state() == ProtocolState::Unknown {
            return link.transact(DeviceSession::synchronize);
        }

        let line = match link.transport.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Serial read failed, retrying next tick: {}", e);
                return Ok(());
            }
        };

        let event = response::classify(&line);
        let commands = link.session.handle(event, &mut self.store);
        send_all(&mut link.transport, &commands)
    }
}

fn send<S: embedded_io::Read + embedded_io::Write, const L: usize>(
    transport: &mut Transport<S, L>,
    command: Command,
) -> Result<(), S::Error> {
    let bytes = command.encode().ok_or(Error::BufferError)?;
    debug!("Sending {:?}", command);
    transport.write_bytes(&bytes)
}

fn send_all<S: embedded_io::Read + embedded_io::Write, const L: usize>(
    transport: &mut Transport<S, L>,
    commands: &[Command],
) -> Result<(), S::Error> {
    for &command in commands {
        send(transport, command)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::ESC, mock_serial::MockSerial, preset, session::ProtocolState};

    const LISTING: [&str; 14] = [
        "g 0 0 6.0",
        "k 0 0 0.023",
        "b 0 0 200",
        "l 0 0 4",
        "p 0 0 500",
        "v 0 0 200",
        "x 0 0 500",
        "d 0 0 5",
        "a 0 0 1",
        "o 0 0 10",
        "q 0 0 7",
        "i 0 0 6",
        "m 0 0 0",
        "t 0 0 1000",
    ];

    fn connected() -> CommandDispatcher<MockSerial, 256> {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.connect(MockSerial::new());
        dispatcher.tick().unwrap();
        assert_eq!(dispatcher.interface().unwrap().written_data(), &[b'e', ESC]);
        dispatcher.interface_mut().unwrap().clear_written_data();
        dispatcher
    }

    fn feed(dispatcher: &mut CommandDispatcher<MockSerial, 256>, line: &str) {
        dispatcher.interface_mut().unwrap().queue_line(line).unwrap();
        dispatcher.tick().unwrap();
    }

    fn written(dispatcher: &CommandDispatcher<MockSerial, 256>) -> &[u8] {
        dispatcher.interface().unwrap().written_data()
    }

    fn state(dispatcher: &CommandDispatcher<MockSerial, 256>) -> ProtocolState {
        dispatcher.session().unwrap().state()
    }

    #[test]
    fn handshake_on_first_tick() {
        let mut dispatcher: CommandDispatcher<MockSerial, 256> = CommandDispatcher::new();
        dispatcher.connect(MockSerial::new());
        assert_eq!(state(&dispatcher), ProtocolState::Unknown);

        dispatcher.tick().unwrap();
        assert_eq!(written(&dispatcher), &[b'e', ESC]);
        assert_eq!(state(&dispatcher), ProtocolState::Menu);

        // Idle ticks send nothing more.
        dispatcher.tick().unwrap();
        assert_eq!(written(&dispatcher), &[b'e', ESC]);
    }

    #[test]
    fn operations_without_connection_are_ignored() {
        let mut dispatcher: CommandDispatcher<MockSerial, 256> = CommandDispatcher::new();
        assert!(dispatcher.load().is_ok());
        assert!(dispatcher.write().is_ok());
        assert!(dispatcher.zero().is_ok());
        assert!(dispatcher.calibrate().is_ok());
        assert!(dispatcher.tick().is_ok());
        assert!(dispatcher.session().is_none());
    }

    #[test]
    fn load_outside_menu_has_no_effect() {
        let mut dispatcher: CommandDispatcher<MockSerial, 256> = CommandDispatcher::new();
        dispatcher.connect(MockSerial::new());
        // Still Unknown, the handshake has not run yet.
        dispatcher.load().unwrap();
        assert!(written(&dispatcher).is_empty());
        assert_eq!(state(&dispatcher), ProtocolState::Unknown);

        let mut dispatcher = connected();
        dispatcher.calibrate().unwrap();
        dispatcher.interface_mut().unwrap().clear_written_data();
        dispatcher.load().unwrap();
        assert!(written(&dispatcher).is_empty());
        assert_eq!(state(&dispatcher), ProtocolState::Calibrating);
    }

    #[test]
    fn full_load_sequence() {
        let mut dispatcher = connected();
        dispatcher.load().unwrap();
        assert_eq!(written(&dispatcher), b"s");
        assert_eq!(state(&dispatcher), ProtocolState::Loading);

        for (index, line) in LISTING.iter().enumerate() {
            feed(&mut dispatcher, line);
            if index < LISTING.len() - 1 {
                // No escape until the final row.
                assert_eq!(written(&dispatcher), b"s");
            }
        }
        assert_eq!(written(&dispatcher), &[b's', ESC]);

        let expected = [6.0, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 6.0, 0.0, 1000.0];
        for (parameter, value) in dispatcher.store().iter().zip(expected) {
            assert_eq!(parameter.current(), value);
            assert!(!parameter.is_dirty());
        }

        feed(&mut dispatcher, "MENU_STATE");
        assert_eq!(state(&dispatcher), ProtocolState::Menu);
        assert_eq!(written(&dispatcher), &[b's', ESC]);
    }

    #[test]
    fn write_sequence_then_reload() {
        let mut dispatcher = connected();
        dispatcher.set_pending(ParameterCode::GearRatio, 6.4);
        dispatcher.set_pending(ParameterCode::CurrentLimit, 4.0);

        // Stale rows left over from an earlier listing must not be taken as acknowledgements.
        dispatcher.interface_mut().unwrap().queue_line("t 0 0 1000").unwrap();
        dispatcher.write().unwrap();
        assert_eq!(written(&dispatcher), b"s");
        assert_eq!(state(&dispatcher), ProtocolState::Writing);
        assert_eq!(dispatcher.interface().unwrap().unread_len(), 0);
        assert_eq!(dispatcher.session().unwrap().pending_writes().len(), 2);

        // The firmware lists everything once on entry; only the final row acknowledges.
        for line in LISTING.iter().take(13) {
            feed(&mut dispatcher, line);
        }
        assert_eq!(written(&dispatcher), b"s");

        feed(&mut dispatcher, "t 0 0 1000");
        assert_eq!(written(&dispatcher), b"sl4\r");

        // Nothing further until the next acknowledgement.
        dispatcher.tick().unwrap();
        feed(&mut dispatcher, "l 0 0 4");
        assert_eq!(written(&dispatcher), b"sl4\r");

        feed(&mut dispatcher, "t 0 0 1000");
        assert_eq!(written(&dispatcher), b"sl4\rg6.4\r");
        assert!(!dispatcher.session().unwrap().reload_requested());

        feed(&mut dispatcher, "t 0 0 1000");
        assert_eq!(written(&dispatcher), b"sl4\rg6.4\r\x1b");
        assert!(dispatcher.session().unwrap().reload_requested());

        // Back at the menu, the settings are read back automatically.
        feed(&mut dispatcher, "MENU_STATE");
        assert_eq!(written(&dispatcher), b"sl4\rg6.4\r\x1bs");
        assert_eq!(state(&dispatcher), ProtocolState::Loading);
        assert!(!dispatcher.session().unwrap().reload_requested());

        feed(&mut dispatcher, "g 0 0 6.4");
        feed(&mut dispatcher, "l 0 0 4");
        assert!(!dispatcher.store().any_dirty());
    }

    #[test]
    fn write_outside_menu_keeps_input() {
        let mut dispatcher = connected();
        dispatcher.load().unwrap();
        dispatcher.interface_mut().unwrap().queue_line("g 0 0 6.0").unwrap();

        dispatcher.write().unwrap();
        assert_eq!(written(&dispatcher), b"s");
        assert_eq!(state(&dispatcher), ProtocolState::Loading);
        assert!(dispatcher.interface().unwrap().unread_len() > 0);
    }

    #[test]
    fn reconnect_discards_write_sequence() {
        let mut dispatcher = connected();
        dispatcher.set_pending(ParameterCode::GearRatio, 6.4);
        dispatcher.set_pending(ParameterCode::CurrentLimit, 4.0);
        dispatcher.write().unwrap();
        assert_eq!(state(&dispatcher), ProtocolState::Writing);

        assert!(dispatcher.disconnect().is_some());
        assert!(!dispatcher.is_connected());
        assert!(dispatcher.disconnect().is_none());

        dispatcher.connect(MockSerial::new());
        assert_eq!(state(&dispatcher), ProtocolState::Unknown);
        assert!(dispatcher.session().unwrap().pending_writes().is_empty());

        dispatcher.tick().unwrap();
        assert_eq!(state(&dispatcher), ProtocolState::Menu);
        assert_eq!(written(&dispatcher), &[b'e', ESC]);
        // The edits themselves survive.
        assert!(dispatcher.store().is_dirty(ParameterCode::GearRatio));
    }

    #[test]
    fn zero_from_any_state() {
        let mut dispatcher = connected();
        dispatcher.load().unwrap();
        dispatcher.zero().unwrap();
        assert_eq!(written(&dispatcher), b"sz");
        assert_eq!(state(&dispatcher), ProtocolState::ZeroCapture);

        feed(&mut dispatcher, "Saved new zero position: abc");
        assert_eq!(dispatcher.session().unwrap().zero_position(), None);
        assert_eq!(state(&dispatcher), ProtocolState::ZeroCapture);

        feed(&mut dispatcher, "Saved new zero position: 1.2345");
        assert_eq!(dispatcher.session().unwrap().zero_position(), Some(1.2345));
    }

    #[test]
    fn calibrate_reports_outcome() {
        let mut dispatcher = connected();
        dispatcher.calibrate().unwrap();
        assert_eq!(written(&dispatcher), b"c");

        feed(&mut dispatcher, "Wrong pole pairs");
        let status = dispatcher.session().unwrap().calibration().unwrap();
        assert_eq!(std::format!("{}", status), "Failed. Wrong pole pairs");
    }

    #[test]
    fn read_errors_are_retried() {
        let mut dispatcher = connected();
        dispatcher.load().unwrap();
        dispatcher.interface_mut().unwrap().queue_line("g 0 0 6.0").unwrap();
        dispatcher.interface_mut().unwrap().set_read_error(true);

        assert!(dispatcher.tick().is_ok());
        assert_eq!(state(&dispatcher), ProtocolState::Loading);
        assert_eq!(dispatcher.store().get(ParameterCode::GearRatio).current(), 0.0);

        dispatcher.interface_mut().unwrap().set_read_error(false);
        dispatcher.tick().unwrap();
        assert_eq!(dispatcher.store().get(ParameterCode::GearRatio).current(), 6.0);
    }

    #[test]
    fn write_errors_are_returned() {
        let mut dispatcher = connected();
        dispatcher.interface_mut().unwrap().set_write_error(true);
        assert!(matches!(dispatcher.calibrate(), Err(Error::SerialError(_))));
        assert!(matches!(dispatcher.load(), Err(Error::SerialError(_))));
        // Nothing reached the firmware, so the session is still at the menu.
        assert_eq!(state(&dispatcher), ProtocolState::Menu);
        assert_eq!(dispatcher.session().unwrap().calibration(), None);

        dispatcher.interface_mut().unwrap().set_write_error(false);
        dispatcher.calibrate().unwrap();
        assert_eq!(written(&dispatcher), b"c");
        assert_eq!(state(&dispatcher), ProtocolState::Calibrating);
    }

    #[test]
    fn failed_handshake_is_retried() {
        let mut dispatcher: CommandDispatcher<MockSerial, 256> = CommandDispatcher::new();
        dispatcher.connect(MockSerial::new());
        dispatcher.interface_mut().unwrap().set_write_error(true);
        assert!(dispatcher.tick().is_err());
        assert_eq!(state(&dispatcher), ProtocolState::Unknown);

        dispatcher.interface_mut().unwrap().set_write_error(false);
        dispatcher.tick().unwrap();
        assert_eq!(written(&dispatcher), &[b'e', ESC]);
        assert_eq!(state(&dispatcher), ProtocolState::Menu);
    }

    #[test]
    fn zero_before_first_tick_sends_handshake() {
        let mut dispatcher: CommandDispatcher<MockSerial, 256> = CommandDispatcher::new();
        dispatcher.connect(MockSerial::new());
        dispatcher.zero().unwrap();
        assert_eq!(written(&dispatcher), &[b'e', ESC, b'z']);
        assert_eq!(state(&dispatcher), ProtocolState::ZeroCapture);

        dispatcher.tick().unwrap();
        dispatcher.tick().unwrap();
        assert_eq!(written(&dispatcher), &[b'e', ESC, b'z']);

        feed(&mut dispatcher, "MENU_STATE");
        assert_eq!(state(&dispatcher), ProtocolState::Menu);
    }

    #[test]
    fn unsendable_value_does_not_stall_write() {
        let mut dispatcher = connected();
        feed(&mut dispatcher, "MENU_STATE");
        assert_eq!(dispatcher.set_pending_text(ParameterCode::Kt, "1e-40"), None);
        assert!(dispatcher.store().is_dirty(ParameterCode::Kt));

        dispatcher.write().unwrap();
        assert!(dispatcher.session().unwrap().pending_writes().is_empty());
        assert_eq!(written(&dispatcher), b"s");

        feed(&mut dispatcher, "t 0 0 1000");
        assert_eq!(written(&dispatcher), &[b's', ESC]);
        assert!(dispatcher.session().unwrap().reload_requested());
    }

    #[test]
    fn requests() {
        let mut dispatcher = connected();
        dispatcher.handle(Request::ApplyPreset(&preset::RC_PWM_VEL)).unwrap();
        assert_eq!(dispatcher.store().get(ParameterCode::VelocityLimit).pending(), Some(20.0));

        dispatcher.handle(Request::SetPending(ParameterCode::CanId, 9.0)).unwrap();
        assert_eq!(dispatcher.store().get(ParameterCode::CanId).pending(), Some(9.0));

        dispatcher.handle(Request::Load).unwrap();
        assert_eq!(written(&dispatcher), b"s");
    }
}
