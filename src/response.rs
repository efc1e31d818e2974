//! Classification of the text lines the firmware console prints.
//!
//! The console is meant for humans, so nothing is framed. We recognise the
//! handful of lines the client cares about by their content and treat the
//! rest as noise.

use core::f64::consts::TAU;

use crate::parameter::ParameterCode;

const MENU_MARKER: &str = "MENU_STATE";
const FIRMWARE_MARKER: &str = "Firmware Version Number: Release ";
const ZERO_MARKER: &str = "Saved new zero position:";
const POLE_PAIRS_MARKER: &str = "Wrong pole pairs";
const CALIBRATED_MARKER: &str = "E_ZERO:";

/// Full scale of the raw electrical angle samples printed while calibrating.
pub const ANGLE_COUNTS_PER_TURN: f64 = 16384.0;

/// Why the firmware rejected a calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationFailure {
    /// The measured pole pair count does not match the configured one.
    WrongPolePairs,
}

/// One settings row, e.g. `g 0 0 6.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterLine {
    pub code: ParameterCode,
    pub value: f64,
    /// The same line read as an electric angle sample, if it has that shape.
    /// Calibration output can start with a parameter letter.
    pub angle_sample: Option<f64>,
}

impl ParameterLine {
    /// Whether this row is the last one the firmware prints.
    pub fn is_final(&self) -> bool {
        self.code.is_final()
    }
}

/// What a line means to the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    /// The firmware is back at its top level prompt.
    MenuEntered,
    /// The banner's release string.
    FirmwareVersion(&'a str),
    /// A zero capture finished, reporting the saved position.
    ZeroPositionCaptured(f64),
    CalibrationFailed(CalibrationFailure),
    CalibrationSucceeded,
    /// A calibration progress sample, in radians.
    ElectricAngleSample(f64),
    ParameterValue(ParameterLine),
    /// A line starting with the final parameter code that is not a complete
    /// settings row. Still good enough to acknowledge a write.
    FinalCodeEcho,
    Unrecognized,
}

/// Parse one numeric field. Only finite numbers are accepted.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Classify one trimmed line.
///
/// Marker lines are checked first. A settings row takes precedence over an
/// angle sample: rows such as `g 0 0 6.0` also have four fields with a
/// numeric second one.
pub fn classify(line: &str) -> Event<'_> {
    if line.contains(MENU_MARKER) {
        return Event::MenuEntered;
    }
    if let Some((_, version)) = line.rsplit_once(FIRMWARE_MARKER) {
        return Event::FirmwareVersion(version.trim());
    }
    if line.contains(ZERO_MARKER) {
        return match zero_position(line) {
            Some(position) => Event::ZeroPositionCaptured(position),
            None => Event::Unrecognized,
        };
    }
    if line.contains(POLE_PAIRS_MARKER) {
        return Event::CalibrationFailed(CalibrationFailure::WrongPolePairs);
    }
    if line.contains(CALIBRATED_MARKER) {
        return Event::CalibrationSucceeded;
    }
    if let Some(row) = parameter_line(line) {
        return Event::ParameterValue(row);
    }
    if let Some(angle) = electric_angle(line) {
        return Event::ElectricAngleSample(angle);
    }
    if line.chars().next() == Some(ParameterCode::FINAL.code()) {
        return Event::FinalCodeEcho;
    }
    Event::Unrecognized
}

/// The number after the last colon.
fn zero_position(line: &str) -> Option<f64> {
    let (_, value) = line.rsplit_once(':')?;
    parse_number(value)
}

/// A settings row: known code first, at least four fields, numeric last field.
pub fn parameter_line(line: &str) -> Option<ParameterLine> {
    let code = ParameterCode::from_code(line.chars().next()?)?;
    let mut fields = line.split_whitespace();
    let count = fields.clone().count();
    if count < 4 {
        return None;
    }
    let value = parse_number(fields.nth(count - 1)?)?;
    Some(ParameterLine {
        code,
        value,
        angle_sample: electric_angle(line),
    })
}

/// An angle sample: exactly four fields, the second a raw count.
pub fn electric_angle(line: &str) -> Option<f64> {
    let mut fields = line.split_whitespace();
    let raw = fields.nth(1)?;
    if fields.count() != 2 {
        return None;
    }
    let counts = parse_number(raw)?;
    Some(counts / ANGLE_COUNTS_PER_TURN * TAU)
}
