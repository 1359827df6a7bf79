//! CPU registers.
//!
//! The register file holds:
//! - A: the 32-bit accumulator (two independent halves)
//! - X0-X3: four signed 16-bit index registers
//! - PC: the 15-bit program counter, plus the bank it fetches from
//! - RTC: the 16-bit real-time clock, ticking at 32 Hz

use crate::cpu::decode::ADDRESS_MASK;
use crate::cpu::memory::Bank;
use crate::onescomplement::Word;
use serde::{Deserialize, Serialize};

/// Number of index registers.
pub const INDEX_REGISTER_COUNT: usize = 4;

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: accumulator
    pub acc: Word,

    /// X0-X3: index registers
    pub ix: [i16; INDEX_REGISTER_COUNT],

    /// PC: address of the next instruction
    pub pc: u16,

    /// Bank the next instruction is fetched from
    pub pc_bank: Bank,

    /// RTC: real-time clock, in 1/32 s ticks
    pub rtc: u16,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero, including the clock.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Increment the program counter, wrapping at 15 bits.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1) & ADDRESS_MASK;
        old
    }

    /// Transfer control to `address` in `bank`.
    pub fn jump(&mut self, bank: Bank, address: usize) {
        self.pc_bank = bank;
        self.pc = (address as u16) & ADDRESS_MASK;
    }

    /// Advance the clock by `ticks`, wrapping at 16 bits.
    pub fn tick(&mut self, ticks: u16) {
        self.rtc = self.rtc.wrapping_add(ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc();
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 11);
    }

    #[test]
    fn test_pc_wraps_at_15_bits() {
        let mut regs = Registers::new();
        regs.pc = 0x7FFF;
        regs.advance_pc();
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_jump_sets_bank() {
        let mut regs = Registers::new();
        regs.jump(Bank::Two, 0x1_0005);
        assert_eq!(regs.pc_bank, Bank::Two);
        assert_eq!(regs.pc, 5);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut regs = Registers::new();
        regs.acc = Word::MINUS_ZERO;
        regs.ix = [1, -2, 3, -4];
        regs.pc = 99;
        regs.pc_bank = Bank::Two;
        regs.rtc = 1234;

        regs.reset();
        assert_eq!(regs, Registers::new());
    }

    #[test]
    fn test_clock_wraps() {
        let mut regs = Registers::new();
        regs.rtc = 65530;
        regs.tick(10);
        assert_eq!(regs.rtc, 4);
    }
}
