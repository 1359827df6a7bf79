//! Program image files.
//!
//! An image is the assembler's output and the runner's input: a block of
//! words and where they go.  It is stored as JSON:
//!
//! ```json
//! { "origin": 0, "bank": "One", "words": [4096, 0] }
//! ```

use crate::cpu::{Bank, Cpu};
use crate::onescomplement::Word;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A loadable program image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Address of the first word, and the entry point.
    pub origin: u16,
    /// Bank the program is loaded into.
    #[serde(default)]
    pub bank: Bank,
    /// The words, in address order.
    pub words: Vec<Word>,
}

impl Program {
    /// Create an image.
    pub fn new(origin: u16, bank: Bank, words: Vec<Word>) -> Self {
        Self { origin, bank, words }
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Copy the image into a CPU's memory and point its PC at the origin.
    pub fn load_into(&self, cpu: &mut Cpu) {
        cpu.load_program(&self.words, self.origin, self.bank);
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ProgramError> {
        serde_json::to_string_pretty(self).map_err(|e| ProgramError::JsonError(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        serde_json::from_str(text).map_err(|e| ProgramError::JsonError(e.to_string()))
    }
}

/// Load an image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ProgramError::IoError(e.to_string()))?;
    Program::from_json(&text)
}

/// Save an image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ProgramError> {
    let json = program.to_json()?;
    std::fs::write(path.as_ref(), json + "\n").map_err(|e| ProgramError::IoError(e.to_string()))
}

/// Errors that can occur reading or writing images.
#[derive(Debug, Clone, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid program image: {0}")]
    JsonError(String),
}
