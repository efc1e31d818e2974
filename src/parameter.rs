//! This module defines the tunable parameters exposed by the firmware console.
//!
//! Each parameter is identified on the wire by a single lowercase letter and
//! in storage by its index. The firmware always lists the parameters in index
//! order, so the highest index ([`ParameterCode::FINAL`]) doubles as the
//! end-of-listing marker.

use strum_macros::{EnumCount, EnumIter};

/// All parameters, with their storage index as discriminant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, EnumCount)]
#[repr(u8)]
pub enum ParameterCode {
    /// `g` - Output gear ratio.
    GearRatio = 0,
    /// `k` - Torque constant, N*m/A.
    Kt = 1,
    /// `b` - Current loop bandwidth, Hz.
    CurrentBandwidth = 2,
    /// `l` - Current limit, A.
    CurrentLimit = 3,
    /// `p` - Position limit, rad.
    PositionLimit = 4,
    /// `v` - Velocity limit, rad/s.
    VelocityLimit = 5,
    /// `x` - Kp limit, N*m/rad.
    KpLimit = 6,
    /// `d` - Kd limit, N*m/rad/s.
    KdLimit = 7,
    /// `a` - Calibration current, A.
    CalibrationCurrent = 8,
    /// `o` - Torque communication limit, N*m.
    TorqueLimit = 9,
    /// `q` - Motor pole pairs.
    PolePairs = 10,
    /// `i` - CAN ID.
    CanId = 11,
    /// `m` - CAN master ID.
    CanMasterId = 12,
    /// `t` - CAN timeout, cycles.
    CanTimeout = 13,
}

impl ParameterCode {
    /// The parameter the firmware lists last. Its row terminates a settings
    /// listing and acknowledges each submitted value while writing.
    pub const FINAL: Self = Self::CanTimeout;

    /// Every parameter in index order.
    pub const ALL: [Self; 14] = [
        Self::GearRatio,
        Self::Kt,
        Self::CurrentBandwidth,
        Self::CurrentLimit,
        Self::PositionLimit,
        Self::VelocityLimit,
        Self::KpLimit,
        Self::KdLimit,
        Self::CalibrationCurrent,
        Self::TorqueLimit,
        Self::PolePairs,
        Self::CanId,
        Self::CanMasterId,
        Self::CanTimeout,
    ];

    /// Storage index, `0..=13`.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The one-letter code used on the wire.
    pub const fn code(self) -> char {
        match self {
            Self::GearRatio => 'g',
            Self::Kt => 'k',
            Self::CurrentBandwidth => 'b',
            Self::CurrentLimit => 'l',
            Self::PositionLimit => 'p',
            Self::VelocityLimit => 'v',
            Self::KpLimit => 'x',
            Self::KdLimit => 'd',
            Self::CalibrationCurrent => 'a',
            Self::TorqueLimit => 'o',
            Self::PolePairs => 'q',
            Self::CanId => 'i',
            Self::CanMasterId => 'm',
            Self::CanTimeout => 't',
        }
    }

    /// Look up a parameter by its wire code. Codes are case sensitive.
    pub const fn from_code(code: char) -> Option<Self> {
        let parameter = match code {
            'g' => Self::GearRatio,
            'k' => Self::Kt,
            'b' => Self::CurrentBandwidth,
            'l' => Self::CurrentLimit,
            'p' => Self::PositionLimit,
            'v' => Self::VelocityLimit,
            'x' => Self::KpLimit,
            'd' => Self::KdLimit,
            'a' => Self::CalibrationCurrent,
            'o' => Self::TorqueLimit,
            'q' => Self::PolePairs,
            'i' => Self::CanId,
            'm' => Self::CanMasterId,
            't' => Self::CanTimeout,
            _ => return None,
        };
        Some(parameter)
    }

    /// Human readable label including the unit.
    pub const fn label(self) -> &'static str {
        match self {
            Self::GearRatio => "Gear Ratio",
            Self::Kt => "Kt (N*m/A)",
            Self::CurrentBandwidth => "Current Bandwidth (Hz)",
            Self::CurrentLimit => "Current Limit (A)",
            Self::PositionLimit => "Position Limit (rad)",
            Self::VelocityLimit => "Velocity Limit (rad/s)",
            Self::KpLimit => "Kp Limit (N*m/rad)",
            Self::KdLimit => "Kd Limit (N*m/rad/s)",
            Self::CalibrationCurrent => "Calibration Current (A)",
            Self::TorqueLimit => "Torque Communication Limit (N*m)",
            Self::PolePairs => "Pole Pairs",
            Self::CanId => "CAN ID",
            Self::CanMasterId => "CAN Master ID",
            Self::CanTimeout => "CAN Timeout (cycles)",
        }
    }

    /// Inclusive range the firmware documents as valid, where it documents one.
    ///
    /// __Note:__ This is advisory only. Nothing in this crate refuses to send
    /// a value outside of it.
    pub const fn nominal_range(self) -> Option<(f64, f64)> {
        match self {
            Self::CurrentBandwidth => Some((100.0, 2000.0)),
            Self::CurrentLimit => Some((0.0, 8.0)),
            Self::KpLimit => Some((0.0, 1000.0)),
            Self::KdLimit => Some((0.0, 5.0)),
            Self::CalibrationCurrent => Some((0.0, 4.0)),
            Self::CanId | Self::CanMasterId => Some((0.0, 127.0)),
            Self::CanTimeout => Some((0.0, 100_000.0)),
            _ => None,
        }
    }

    /// Whether `value` lies within [`Self::nominal_range`]. Parameters without
    /// a documented range accept any finite value.
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.nominal_range() {
            Some((min, max)) => (min..=max).contains(&value),
            None => true,
        }
    }

    /// Whether this is the end-of-listing parameter.
    pub fn is_final(self) -> bool {
        self == Self::FINAL
    }
}

impl From<ParameterCode> for char {
    fn from(value: ParameterCode) -> Self {
        value.code()
    }
}

impl TryFrom<char> for ParameterCode {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Self::from_code(value).ok_or(value)
    }
}
