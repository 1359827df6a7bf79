//! Assembler and disassembler.
//!
//! This module provides:
//! - A two-pass assembler (text → program image)
//! - A disassembler (program image → readable text)
//! - The JSON program image format

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use program::{load_image, save_image, Program, ProgramError};
