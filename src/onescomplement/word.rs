//! The 32-bit machine word.
//!
//! A word is two independent one's-complement halves packed together:
//! - the left half occupies bits 31..16
//! - the right half occupies bits 15..0
//!
//! Arithmetic never carries between the halves.  Instructions use the
//! same container, with the operation in the left half and the
//! address in the right half.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::onescomplement::half;

/// A 32-bit word holding two one's-complement fractions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(u32);

impl Word {
    /// All bits clear: +0 in both halves.
    pub const ZERO: Word = Word(0);

    /// All bits set: -0 in both halves.
    pub const MINUS_ZERO: Word = Word(u32::MAX);

    /// Create a word from a raw bit pattern.
    #[inline]
    pub const fn from_raw(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bit pattern.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Join two halves into a word.
    #[inline]
    pub const fn from_halves(left: u16, right: u16) -> Self {
        Self(((left as u32) << 16) | right as u32)
    }

    /// Split a word into its (left, right) halves.
    #[inline]
    pub const fn halves(self) -> (u16, u16) {
        (self.left(), self.right())
    }

    /// The left half (bits 31..16).
    #[inline]
    pub const fn left(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The right half (bits 15..0).
    #[inline]
    pub const fn right(self) -> u16 {
        self.0 as u16
    }

    /// A copy of this word with the left half replaced.
    #[inline]
    pub const fn with_left(self, left: u16) -> Self {
        Self::from_halves(left, self.right())
    }

    /// A copy of this word with the right half replaced.
    #[inline]
    pub const fn with_right(self, right: u16) -> Self {
        Self::from_halves(self.left(), right)
    }

    /// Build a word from a pair of fractions, saturating each half.
    pub fn from_fractions(left: f64, right: f64) -> Self {
        Self::from_halves(half::from_fraction(left), half::from_fraction(right))
    }

    /// The pair of fractions held in this word.
    pub fn to_fractions(self) -> (f64, f64) {
        (half::to_fraction(self.left()), half::to_fraction(self.right()))
    }

    /// True when both halves are numerically zero (either +0 or -0).
    pub const fn is_zero(self) -> bool {
        half::is_zero(self.left()) && half::is_zero(self.right())
    }

    /// Apply a function to each half independently.
    #[inline]
    pub fn map_halves(self, mut f: impl FnMut(u16) -> u16) -> Self {
        Self::from_halves(f(self.left()), f(self.right()))
    }

    /// Combine corresponding halves of two words.
    #[inline]
    pub fn zip_halves(self, other: Word, mut f: impl FnMut(u16, u16) -> u16) -> Self {
        Self::from_halves(f(self.left(), other.left()), f(self.right(), other.right()))
    }
}

/// Split a word into its (left, right) halves.
#[inline]
pub const fn split(word: Word) -> (u16, u16) {
    word.halves()
}

/// Join two halves into a word.
#[inline]
pub const fn join(left: u16, right: u16) -> Word {
    Word::from_halves(left, right)
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (l, r) = self.to_fractions();
        write!(
            f,
            "Word({:04x} {:04x} = {:+.5}, {:+.5})",
            self.left(),
            self.right(),
            l,
            r
        )
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x} {:04x}", self.left(), self.right())
    }
}

impl From<u32> for Word {
    fn from(bits: u32) -> Self {
        Word::from_raw(bits)
    }
}

impl From<Word> for u32 {
    fn from(word: Word) -> Self {
        word.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_halves_layout() {
        let w = Word::from_raw(0x1234_ABCD);
        assert_eq!(w.left(), 0x1234);
        assert_eq!(w.right(), 0xABCD);
        assert_eq!(split(w), (0x1234, 0xABCD));
        assert_eq!(join(0x1234, 0xABCD), w);
    }

    #[test]
    fn test_replace_one_half() {
        let w = join(0x1111, 0x2222);
        assert_eq!(w.with_left(0x3333), join(0x3333, 0x2222));
        assert_eq!(w.with_right(0x3333), join(0x1111, 0x3333));
    }

    #[test]
    fn test_zero_words() {
        assert!(Word::ZERO.is_zero());
        assert!(Word::MINUS_ZERO.is_zero());
        assert!(join(0, 0xFFFF).is_zero());
        assert!(!join(0, 1).is_zero());
        assert_ne!(Word::ZERO, Word::MINUS_ZERO);
    }

    #[test]
    fn test_fraction_pair() {
        let w = Word::from_fractions(0.5, -0.25);
        assert_eq!(w.to_fractions(), (0.5, -0.25));
        assert_eq!(format!("{}", w), "4000 dfff");
    }

    proptest! {
        #[test]
        fn split_join_round_trip(bits in any::<u32>()) {
            let w = Word::from_raw(bits);
            let (l, r) = split(w);
            prop_assert_eq!(join(l, r), w);
            prop_assert_eq!(join(l, r).raw(), bits);
        }
    }

    #[test]
    fn test_round_trip_keeps_both_zeros() {
        for (l, r) in [(0x0000, 0xFFFF), (0xFFFF, 0x0000), (0xFFFF, 0xFFFF), (0, 0)] {
            let w = join(l, r);
            assert_eq!(split(w), (l, r));
        }
    }
}
