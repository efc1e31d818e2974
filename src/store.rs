//! Per-session parameter values with dirty tracking.
//!
//! Every parameter holds the value last confirmed on the device (`current`)
//! and the value the user would like it to have (`pending`). A parameter is
//! dirty when those disagree, or when the user's text could not be read as a
//! number at all.

use heapless::Vec;
use strum::EnumCount;

use crate::{command::WriteRequest, parameter::ParameterCode, preset::Preset, response};

/// One entry of the [`ParameterStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    code: ParameterCode,
    current: f64,
    /// `None` when the user's input was not a number.
    pending: Option<f64>,
}

impl Parameter {
    const fn new(code: ParameterCode) -> Self {
        Self {
            code,
            current: 0.0,
            pending: Some(0.0),
        }
    }

    pub fn code(&self) -> ParameterCode {
        self.code
    }

    pub fn label(&self) -> &'static str {
        self.code.label()
    }

    /// Value last reported by the device.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Value the user wants written, or `None` if their input was not a number.
    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    /// Exact float comparison against the device value. Unparsable input is always dirty.
    #[allow(clippy::float_cmp)]
    pub fn is_dirty(&self) -> bool {
        match self.pending {
            Some(pending) => pending != self.current,
            None => true,
        }
    }
}

/// Fixed set of all 14 parameters, indexed by [`ParameterCode::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    parameters: [Parameter; ParameterCode::COUNT],
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            parameters: ParameterCode::ALL.map(Parameter::new),
        }
    }

    pub fn get(&self, code: ParameterCode) -> &Parameter {
        &self.parameters[code.index()]
    }

    /// All parameters in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn is_dirty(&self, code: ParameterCode) -> bool {
        self.get(code).is_dirty()
    }

    pub fn any_dirty(&self) -> bool {
        self.parameters.iter().any(Parameter::is_dirty)
    }

    /// Set the value the user wants written. Non-finite values, and values too
    /// long to send, count as unparsable.
    pub fn set_pending(&mut self, code: ParameterCode, value: f64) {
        self.parameters[code.index()].pending = writable(code, value);
    }

    /// Set the pending value from free text as typed by the user.
    ///
    /// Returns the parsed value, or `None` if the text is not a number, in which
    /// case the parameter is left dirty until valid input arrives.
    pub fn set_pending_text(&mut self, code: ParameterCode, text: &str) -> Option<f64> {
        let value = response::parse_number(text).and_then(|value| writable(code, value));
        self.parameters[code.index()].pending = value;
        value
    }

    /// Fill every pending value from a preset.
    pub fn apply_preset(&mut self, preset: &Preset) {
        for (code, value) in preset.iter() {
            self.set_pending(code, value);
        }
    }

    /// Record a value read back from the device.
    ///
    /// The pending value follows, so a freshly loaded parameter is clean.
    pub(crate) fn record_loaded(&mut self, code: ParameterCode, value: f64) {
        let parameter = &mut self.parameters[code.index()];
        parameter.current = value;
        parameter.pending = Some(value);
    }

    /// The write messages needed to bring the device in line with the pending
    /// values, in index order. Unparsable entries are dirty but have nothing to send.
    pub fn dirty_writes(&self) -> Vec<WriteRequest, { ParameterCode::COUNT }> {
        let mut writes = Vec::new();
        for parameter in self.parameters.iter().filter(|p| p.is_dirty()) {
            let Some(value) = parameter.pending else {
                continue;
            };
            let request = WriteRequest::new(parameter.code, value);
            if request.is_encodable() {
                // Capacity equals the number of parameters.
                let _ = writes.push(request);
            }
        }
        writes
    }
}

fn writable(code: ParameterCode, value: f64) -> Option<f64> {
    (value.is_finite() && WriteRequest::new(code, value).is_encodable()).then_some(value)
}
