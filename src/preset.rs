//! Named parameter sets for the motors of a four wheel steered rover, plus
//! two RC PWM setups.
//!
//! Applying a preset only fills in pending values. Nothing reaches the
//! device until a write.

use crate::parameter::ParameterCode;

/// A full set of values, one per parameter in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    name: &'static str,
    values: [f64; 14],
}

impl Preset {
    pub const fn new(name: &'static str, values: [f64; 14]) -> Self {
        Self { name, values }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self, code: ParameterCode) -> f64 {
        self.values[code.index()]
    }

    /// Every `(parameter, value)` pair in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterCode, f64)> + '_ {
        ParameterCode::ALL.into_iter().zip(self.values.iter().copied())
    }
}

// Pivots and wheels differ only in gear ratio and CAN ID.
pub const FRONT_LEFT_PIVOT: Preset = Preset::new(
    "Front Left Pivot",
    [6.0, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 6.0, 0.0, 1000.0],
);
pub const FRONT_LEFT_WHEEL: Preset = Preset::new(
    "Front Left Wheel",
    [6.4, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 5.0, 0.0, 1000.0],
);
pub const FRONT_RIGHT_PIVOT: Preset = Preset::new(
    "Front Right Pivot",
    [6.0, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 4.0, 0.0, 1000.0],
);
pub const FRONT_RIGHT_WHEEL: Preset = Preset::new(
    "Front Right Wheel",
    [6.4, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 3.0, 0.0, 1000.0],
);
pub const BACK_LEFT_PIVOT: Preset = Preset::new(
    "Back Left Pivot",
    [6.0, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 8.0, 0.0, 1000.0],
);
pub const BACK_LEFT_WHEEL: Preset = Preset::new(
    "Back Left Wheel",
    [6.4, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 7.0, 0.0, 1000.0],
);
pub const BACK_RIGHT_PIVOT: Preset = Preset::new(
    "Back Right Pivot",
    [6.0, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 2.0, 0.0, 1000.0],
);
pub const BACK_RIGHT_WHEEL: Preset = Preset::new(
    "Back Right Wheel",
    [6.4, 0.023, 200.0, 4.0, 500.0, 200.0, 500.0, 5.0, 1.0, 10.0, 7.0, 1.0, 0.0, 1000.0],
);
/// Kp = 1.0, Kd = 0.01. A 1ms-2ms pulse commands -pi to pi radians.
#[allow(clippy::approx_constant)]
pub const RC_PWM: Preset = Preset::new(
    "RC PWM POS",
    [1.0, 0.023, 200.0, 4.0, 3.14, 0.0, 1.0, 0.01, 1.0, 10.0, 7.0, 1.0, 0.0, -1.0],
);
/// Kp = 0.0, Kd = 0.01. A 1ms-2ms pulse commands -20 to 20 rad/s.
pub const RC_PWM_VEL: Preset = Preset::new(
    "RC PWM VEL",
    [1.0, 0.023, 200.0, 4.0, 0.0, 20.0, 0.0, 0.01, 1.0, 10.0, 7.0, 1.0, 0.0, -1.0],
);

/// Every built in preset.
pub static PRESETS: [&Preset; 10] = [
    &FRONT_LEFT_PIVOT,
    &FRONT_LEFT_WHEEL,
    &FRONT_RIGHT_PIVOT,
    &FRONT_RIGHT_WHEEL,
    &BACK_LEFT_PIVOT,
    &BACK_LEFT_WHEEL,
    &BACK_RIGHT_PIVOT,
    &BACK_RIGHT_WHEEL,
    &RC_PWM,
    &RC_PWM_VEL,
];

/// Look up a built in preset by name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .copied()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}
