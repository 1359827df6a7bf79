//! The magnetic drum.
//!
//! Six named fields of [`FIELD_SIZE`] words each, plus one status
//! channel per field and one for the light gun.  Writing a field raises
//! its channel.  Reading never does anything but read, and a channel
//! stays raised until someone clears it:
//!
//! ```text
//! if drum.check_status(c) { drum.read_field(..); ...; drum.clear_status(c) }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{event, Level};

use crate::onescomplement::Word;

/// Number of words in each drum field.
pub const FIELD_SIZE: usize = 2048;

const FIELD_COUNT: usize = 6;
const CHANNEL_COUNT: usize = FIELD_COUNT + 1;

/// A named drum field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Long-range radar input
    Lri,
    /// Gap-filler radar input
    Gfi,
    /// Crosstell
    Xtl,
    /// Situation display
    Sd,
    /// Output log
    Log,
    /// Scratch
    Temp,
}

impl Field {
    /// All fields.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Lri,
        Field::Gfi,
        Field::Xtl,
        Field::Sd,
        Field::Log,
        Field::Temp,
    ];

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Lri => "LRI",
            Field::Gfi => "GFI",
            Field::Xtl => "XTL",
            Field::Sd => "SD",
            Field::Log => "LOG",
            Field::Temp => "TEMP",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = DrumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DrumError::UnknownField(s.to_string()))
    }
}

/// A status channel: one per field, plus the light gun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Raised by writes to a field.
    Field(Field),
    /// Raised when the light gun detects a drawn point.
    LightGun,
}

impl Channel {
    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Field(field) => field.name(),
            Channel::LightGun => "LG",
        }
    }

    const fn index(self) -> usize {
        match self {
            Channel::Field(field) => field.index(),
            Channel::LightGun => FIELD_COUNT,
        }
    }
}

impl From<Field> for Channel {
    fn from(field: Field) -> Self {
        Channel::Field(field)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = DrumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("LG") {
            Ok(Channel::LightGun)
        } else {
            s.parse().map(Channel::Field)
        }
    }
}

/// Errors from the named-field drum interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrumError {
    #[error("unknown drum field or channel: {0:?}")]
    UnknownField(String),
}

/// The drum: field contents and status channels.
#[derive(Clone, PartialEq, Eq)]
pub struct Drum {
    fields: Vec<Vec<Word>>,
    channels: [bool; CHANNEL_COUNT],
}

impl Drum {
    /// Create a drum with every word +0 and every channel clear.
    pub fn new() -> Self {
        Self {
            fields: vec![vec![Word::ZERO; FIELD_SIZE]; FIELD_COUNT],
            channels: [false; CHANNEL_COUNT],
        }
    }

    /// Read a word; the address wraps to the field size.
    pub fn read(&self, field: Field, address: usize) -> Word {
        self.fields[field.index()][address % FIELD_SIZE]
    }

    /// Write a word and raise the field's channel.
    pub fn write(&mut self, field: Field, address: usize, value: Word) {
        let address = address % FIELD_SIZE;
        event!(
            Level::TRACE,
            field = field.name(),
            address,
            value = %value,
            "drum write"
        );
        self.fields[field.index()][address] = value;
        self.set_status(Channel::Field(field));
    }

    /// Write a word to a field named by string.
    pub fn write_field(&mut self, name: &str, address: usize, value: Word) -> Result<(), DrumError> {
        let field: Field = name.parse()?;
        self.write(field, address, value);
        Ok(())
    }

    /// Read a word from a field named by string.
    pub fn read_field(&self, name: &str, address: usize) -> Result<Word, DrumError> {
        let field: Field = name.parse()?;
        Ok(self.read(field, address))
    }

    /// Whether a channel is raised.  Never clears it.
    pub fn check_status(&self, channel: Channel) -> bool {
        self.channels[channel.index()]
    }

    /// Lower a channel.
    pub fn clear_status(&mut self, channel: Channel) {
        self.channels[channel.index()] = false;
    }

    /// Raise a channel.
    pub fn set_status(&mut self, channel: Channel) {
        self.channels[channel.index()] = true;
    }
}

impl Default for Drum {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Drum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raised: Vec<&str> = Field::ALL
            .into_iter()
            .map(Channel::Field)
            .chain([Channel::LightGun])
            .filter(|&c| self.check_status(c))
            .map(Channel::name)
            .collect();

        f.debug_struct("Drum").field("raised", &raised).finish()
    }
}
