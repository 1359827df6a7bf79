//! # FSQ-7 Emulator
//!
//! An emulator of the central processor of the AN/FSQ-7, the vacuum-tube
//! computer at the heart of the SAGE air-defence network.
//!
//! The machine computes on 32-bit words holding two independent 16-bit
//! one's-complement fractions, addresses two banks of core memory, and
//! talks to its radars, displays and operators only through a magnetic
//! drum whose status channels the program polls.

pub mod onescomplement;
pub mod cpu;
pub mod io;
pub mod asm;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use onescomplement::{Halves, Word};
pub use cpu::execute::CLOCK_HZ;
pub use cpu::{Bank, Cpu, CpuState, HaltReason, Instruction, MemoryBanks, Operation, Registers};
pub use io::{Channel, Drum, DrumError, Field, LightGun, Unit};
pub use asm::{assemble, disassemble, disassemble_word, load_image, save_image, AssemblerError, Program, ProgramError};
