//! Core memory subsystem.
//!
//! The machine has two independently sized banks of core memory.  An
//! address is always resolved against exactly one bank, chosen by the
//! instruction's bank bit rather than by the magnitude of the address.
//! Addresses wrap modulo the bank size instead of faulting.

use crate::onescomplement::Word;
use serde::{Deserialize, Serialize};

/// Number of words in bank 1.
pub const BANK1_SIZE: usize = 65536;

/// Number of words in bank 2.
pub const BANK2_SIZE: usize = 4096;

/// Selects one of the two memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Bank {
    /// The large bank (bank bit clear).
    #[default]
    One,
    /// The small bank (bank bit set).
    Two,
}

impl Bank {
    /// Create from the instruction's bank bit.
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Bank::Two
        } else {
            Bank::One
        }
    }

    /// The instruction bank bit for this bank.
    pub const fn bit(self) -> bool {
        matches!(self, Bank::Two)
    }

    /// Number of words in this bank.
    pub const fn size(self) -> usize {
        match self {
            Bank::One => BANK1_SIZE,
            Bank::Two => BANK2_SIZE,
        }
    }

    /// Bank number as written in listings (1 or 2).
    pub const fn number(self) -> u8 {
        match self {
            Bank::One => 1,
            Bank::Two => 2,
        }
    }

    /// Parse a bank number (1 or 2).
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Bank::One),
            2 => Some(Bank::Two),
            _ => None,
        }
    }
}

impl std::fmt::Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "B{}", self.number())
    }
}

/// The two banks of core memory.
#[derive(Clone)]
pub struct MemoryBanks {
    bank1: Vec<Word>,
    bank2: Vec<Word>,
}

impl MemoryBanks {
    /// Create memory with every word zeroed.
    pub fn new() -> Self {
        Self {
            bank1: vec![Word::ZERO; BANK1_SIZE],
            bank2: vec![Word::ZERO; BANK2_SIZE],
        }
    }

    fn cells(&self, bank: Bank) -> &[Word] {
        match bank {
            Bank::One => &self.bank1,
            Bank::Two => &self.bank2,
        }
    }

    fn cells_mut(&mut self, bank: Bank) -> &mut [Word] {
        match bank {
            Bank::One => &mut self.bank1,
            Bank::Two => &mut self.bank2,
        }
    }

    /// Read a word; the address wraps to the bank size.
    #[inline]
    pub fn read(&self, bank: Bank, address: usize) -> Word {
        self.cells(bank)[address % bank.size()]
    }

    /// Write a word; the address wraps to the bank size.
    #[inline]
    pub fn write(&mut self, bank: Bank, address: usize, value: Word) {
        self.cells_mut(bank)[address % bank.size()] = value;
    }

    /// Write `words` sequentially starting at `start`, wrapping at the
    /// end of the bank.
    pub fn load(&mut self, bank: Bank, start: usize, words: &[Word]) {
        let start = start % bank.size();
        for (i, &word) in words.iter().enumerate() {
            self.write(bank, start + i, word);
        }
    }

    /// Clear both banks to +0.
    pub fn clear(&mut self) {
        self.bank1.fill(Word::ZERO);
        self.bank2.fill(Word::ZERO);
    }

    /// Dump memory contents (for display).
    pub fn dump(&self, bank: Bank, start: usize, count: usize) -> Vec<(usize, Word)> {
        let end = start.saturating_add(count).min(bank.size());
        (start..end).map(|i| (i, self.cells(bank)[i])).collect()
    }
}

impl Default for MemoryBanks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryBanks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = |cells: &[Word]| cells.iter().filter(|w| **w != Word::ZERO).count();

        f.debug_struct("MemoryBanks")
            .field("bank1_non_zero", &used(&self.bank1))
            .field("bank2_non_zero", &used(&self.bank2))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = MemoryBanks::new();
        let value = Word::from_raw(42);

        mem.write(Bank::One, 10, value);
        assert_eq!(mem.read(Bank::One, 10), value);
        // The same address in the other bank is a different cell.
        assert_eq!(mem.read(Bank::Two, 10), Word::ZERO);
    }

    #[test]
    fn test_addresses_wrap_per_bank() {
        let mut mem = MemoryBanks::new();
        mem.write(Bank::Two, BANK2_SIZE + 5, Word::from_raw(7));
        assert_eq!(mem.read(Bank::Two, 5), Word::from_raw(7));

        mem.write(Bank::One, BANK1_SIZE + 5, Word::from_raw(9));
        assert_eq!(mem.read(Bank::One, 5), Word::from_raw(9));
    }

    #[test]
    fn test_load_wraps_at_end_of_bank() {
        let mut mem = MemoryBanks::new();
        let words = [Word::from_raw(1), Word::from_raw(2), Word::from_raw(3)];

        mem.load(Bank::Two, BANK2_SIZE - 1, &words);

        assert_eq!(mem.read(Bank::Two, BANK2_SIZE - 1), Word::from_raw(1));
        assert_eq!(mem.read(Bank::Two, 0), Word::from_raw(2));
        assert_eq!(mem.read(Bank::Two, 1), Word::from_raw(3));
    }

    #[test]
    fn test_bank_bit_round_trip() {
        for bank in [Bank::One, Bank::Two] {
            assert_eq!(Bank::from_bit(bank.bit()), bank);
            assert_eq!(Bank::from_number(bank.number()), Some(bank));
        }
        assert_eq!(Bank::from_number(3), None);
    }

    #[test]
    fn test_dump_stops_at_bank_end() {
        let mem = MemoryBanks::new();
        assert_eq!(mem.dump(Bank::Two, BANK2_SIZE - 2, 10).len(), 2);
    }

    #[test]
    fn test_dump_with_huge_count() {
        let mut mem = MemoryBanks::new();
        mem.write(Bank::Two, 4094, Word::from_raw(5));

        let dump = mem.dump(Bank::Two, 4094, usize::MAX);
        assert_eq!(dump, vec![(4094, Word::from_raw(5)), (4095, Word::ZERO)]);
        assert!(mem.dump(Bank::One, usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn test_clear_zeroes_both_banks() {
        let mut mem = MemoryBanks::new();
        mem.write(Bank::One, 100, Word::from_raw(0x1234_5678));
        mem.write(Bank::Two, 100, Word::MINUS_ZERO);

        mem.clear();

        assert_eq!(mem.read(Bank::One, 100), Word::ZERO);
        assert_eq!(mem.read(Bank::Two, 100), Word::ZERO);
        assert!(mem.dump(Bank::Two, 0, BANK2_SIZE).iter().all(|&(_, w)| w == Word::ZERO));
    }
}
