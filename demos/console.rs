use std::{
    env,
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::{Duration, Instant as StdInstant},
};

use inquire::{Select, Text};
use motor_configurator::{
    config::PortSettings,
    dispatcher::{CommandDispatcher, Request},
    parameter::ParameterCode,
    preset::{self, PRESETS},
    scheduler::{Instant, TickScheduler},
    serial::{self, SerialInterface},
    session::ProtocolState,
};

const LINE_LEN: usize = 256;

/// What the prompt thread asks the tick loop to do.
enum Action {
    Request(Request),
    SetText(ParameterCode, String),
    Show,
    Quit,
}

const ACTIONS: [&str; 8] = [
    "Load settings",
    "Write settings",
    "Zero",
    "Calibrate",
    "Edit parameter",
    "Apply preset",
    "Show",
    "Quit",
];

fn prompt_loop(actions: Sender<Action>) {
    loop {
        let choice = match Select::new("Action:", ACTIONS.to_vec()).prompt() {
            Ok(choice) => choice,
            Err(_) => "Quit",
        };
        let action = match choice {
            "Load settings" => Action::Request(Request::Load),
            "Write settings" => Action::Request(Request::Write),
            "Zero" => Action::Request(Request::Zero),
            "Calibrate" => Action::Request(Request::Calibrate),
            "Edit parameter" => {
                let labels: Vec<&str> = ParameterCode::ALL.iter().map(|p| p.label()).collect();
                let Ok(label) = Select::new("Parameter:", labels).prompt() else {
                    continue;
                };
                let Some(code) = ParameterCode::ALL.into_iter().find(|p| p.label() == label) else {
                    continue;
                };
                let Ok(text) = Text::new("New value:").prompt() else {
                    continue;
                };
                Action::SetText(code, text)
            }
            "Apply preset" => {
                let names: Vec<&str> = PRESETS.iter().map(|p| p.name()).collect();
                let Ok(name) = Select::new("Preset:", names).prompt() else {
                    continue;
                };
                match preset::find(name) {
                    Some(preset) => Action::Request(Request::ApplyPreset(preset)),
                    None => continue,
                }
            }
            "Show" => Action::Show,
            _ => Action::Quit,
        };
        let quit = matches!(action, Action::Quit);
        if actions.send(action).is_err() || quit {
            return;
        }
    }
}

fn show(dispatcher: &CommandDispatcher<SerialInterface, LINE_LEN>) {
    if let Some(session) = dispatcher.session() {
        println!(
            "State: {:?} | Firmware: {} | Zero: {} | Calibration: {}",
            session.state(),
            session.firmware_version().unwrap_or("N/A"),
            session
                .zero_position()
                .map_or("N/A".to_string(), |zero| zero.to_string()),
            session
                .calibration()
                .map_or("N/A".to_string(), |status| status.to_string()),
        );
    }
    for parameter in dispatcher.store().iter() {
        let pending = parameter
            .pending()
            .map_or("<invalid>".to_string(), |value| value.to_string());
        let marker = if parameter.is_dirty() { "*" } else { " " };
        println!(
            "{} {:<34} {:>12} -> {}",
            marker,
            parameter.label(),
            parameter.current(),
            pending
        );
    }
}

fn handle_action(
    dispatcher: &mut CommandDispatcher<SerialInterface, LINE_LEN>,
    action: Action,
) -> bool {
    let result = match action {
        Action::Request(request) => dispatcher.handle(request),
        Action::SetText(code, text) => {
            match dispatcher.set_pending_text(code, &text) {
                None => println!("'{}' is not a number", text),
                Some(value) if !code.accepts(value) => {
                    println!("Warning: {} is outside the documented range", value)
                }
                Some(_) => {}
            }
            Ok(())
        }
        Action::Show => {
            show(dispatcher);
            Ok(())
        }
        Action::Quit => return false,
    };
    if let Err(e) = result {
        eprintln!("Serial write failed: {}", e);
    }
    true
}

fn run(
    dispatcher: &mut CommandDispatcher<SerialInterface, LINE_LEN>,
    settings: &PortSettings,
    actions: Receiver<Action>,
) {
    let started = StdInstant::now();
    let mut scheduler = TickScheduler::new(settings.tick_interval);
    let mut last_state = None;

    loop {
        while let Ok(action) = actions.try_recv() {
            if !handle_action(dispatcher, action) {
                return;
            }
        }

        let now = Instant::from_ticks(started.elapsed().as_millis() as u64);
        if !scheduler.due(now) {
            thread::sleep(Duration::from_millis(scheduler.remaining(now).ticks()));
            continue;
        }

        if let Err(e) = dispatcher.tick() {
            eprintln!("Serial write failed: {}", e);
        }

        let state = dispatcher.session().map(|session| session.state());
        if state != last_state {
            if state == Some(ProtocolState::Menu) {
                println!("IS READY");
            }
            last_state = state;
        }
    }
}

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serial::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        Select::new("Select a serial port:", ports)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let settings = PortSettings::default();
    let transport = match serial::open::<LINE_LEN>(&port_name, &settings) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut dispatcher: CommandDispatcher<SerialInterface, LINE_LEN> = CommandDispatcher::new();
    dispatcher.connect_transport(transport);

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || prompt_loop(sender));

    run(&mut dispatcher, &settings, receiver);

    dispatcher.disconnect();
    println!("Serial connection closed.");
}
