//! Drum-buffered peripheral I/O.
//!
//! Peripherals never touch core memory.  They exchange words with the
//! CPU through named drum fields and raise status channels that a
//! program polls with SNS and acknowledges with CLS.

pub mod drum;
pub mod light_gun;

pub use drum::{Channel, Drum, DrumError, Field, FIELD_SIZE};
pub use light_gun::{LightGun, LightGunState, DETECTION_RADIUS, SCOPE_SIZE};

use serde::{Deserialize, Serialize};

/// The unit an I/O instruction addresses, from the low 3 bits of `aux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Long-range radar input
    Lri,
    /// Gap-filler radar input
    Gfi,
    /// Crosstell (inter-site) link
    Xtl,
    /// Situation display
    Sd,
    /// Output log
    Log,
    /// Scratch storage
    Temp,
    /// Light gun (status channel only)
    LightGun,
    /// Real-time clock (read only)
    Clock,
}

impl Unit {
    /// All units, in code order.
    pub const ALL: [Unit; 8] = [
        Unit::Lri,
        Unit::Gfi,
        Unit::Xtl,
        Unit::Sd,
        Unit::Log,
        Unit::Temp,
        Unit::LightGun,
        Unit::Clock,
    ];

    /// Create from an aux field; only the low 3 bits are used.
    pub const fn from_code(aux: u8) -> Self {
        Self::ALL[(aux & 0b111) as usize]
    }

    /// The 3-bit unit code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Assembler name of the unit.
    pub const fn name(self) -> &'static str {
        match self {
            Unit::Lri => "LRI",
            Unit::Gfi => "GFI",
            Unit::Xtl => "XTL",
            Unit::Sd => "SD",
            Unit::Log => "LOG",
            Unit::Temp => "TEMP",
            Unit::LightGun => "LG",
            Unit::Clock => "RTC",
        }
    }

    /// Look up a unit by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(name))
    }

    /// The drum field behind this unit, if it has one.
    pub const fn field(self) -> Option<Field> {
        match self {
            Unit::Lri => Some(Field::Lri),
            Unit::Gfi => Some(Field::Gfi),
            Unit::Xtl => Some(Field::Xtl),
            Unit::Sd => Some(Field::Sd),
            Unit::Log => Some(Field::Log),
            Unit::Temp => Some(Field::Temp),
            Unit::LightGun | Unit::Clock => None,
        }
    }

    /// The status channel behind this unit, if it has one.
    pub const fn channel(self) -> Option<Channel> {
        match self.field() {
            Some(field) => Some(Channel::Field(field)),
            None => match self {
                Unit::LightGun => Some(Channel::LightGun),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
