//! CPU emulation.
//!
//! This module implements the machine's central processor:
//! - two banks of core memory (65536 and 4096 words)
//! - registers: 32-bit accumulator, four index registers, PC, real-time clock
//! - single-address instruction set with a halving parallel adder

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Bank, MemoryBanks};
pub use registers::Registers;
pub use decode::{decode, effective_address, encode, Class, Instruction, Operation};
pub use execute::{Cpu, CpuState, HaltReason};
