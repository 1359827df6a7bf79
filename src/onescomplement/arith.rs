//! Word-level arithmetic.
//!
//! Every operation here works on both halves at once and never lets a
//! carry cross from one half into the other.

use crate::onescomplement::half;
use crate::onescomplement::Word;

/// Add two words half-by-half, then halve each sum.
///
/// The adder always shifts its result right by one place (sign bit
/// replicated).  A caller that wants the plain sum must pre-scale its
/// operands by two.
pub fn parallel_add_with_shift(a: Word, b: Word) -> Word {
    a.zip_halves(b, |x, y| half::halve(half::add_ones_complement(x, y)))
}

/// Negate both halves.
pub fn parallel_negate(a: Word) -> Word {
    a.map_halves(half::negate)
}

/// Fractional multiply of corresponding halves, with no implicit shift.
pub fn parallel_multiply(a: Word, b: Word) -> Word {
    a.zip_halves(b, half::multiply_fraction)
}

/// |a| - |b| per half, through the same shifting adder.
pub fn difference_of_magnitudes(a: Word, b: Word) -> Word {
    a.zip_halves(b, |x, y| {
        let ax = half::magnitude(x);
        let by = half::negate(half::magnitude(y));
        half::halve(half::add_ones_complement(ax, by))
    })
}

/// Which halves a shift applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Halves {
    /// Left half only.
    Left,
    /// Right half only.
    Right,
    /// Both halves.
    Both,
}

impl Halves {
    fn covers_left(self) -> bool {
        matches!(self, Halves::Left | Halves::Both)
    }

    fn covers_right(self) -> bool {
        matches!(self, Halves::Right | Halves::Both)
    }
}

/// Logical shift left of the selected halves.
pub fn shift_left(a: Word, halves: Halves, count: u32) -> Word {
    shift_with(a, halves, |h| half::shift_left(h, count))
}

/// Logical shift right of the selected halves.
pub fn shift_right(a: Word, halves: Halves, count: u32) -> Word {
    shift_with(a, halves, |h| half::shift_right(h, count))
}

fn shift_with(a: Word, halves: Halves, f: impl Fn(u16) -> u16) -> Word {
    let (mut left, mut right) = a.halves();
    if halves.covers_left() {
        left = f(left);
    }
    if halves.covers_right() {
        right = f(right);
    }
    Word::from_halves(left, right)
}
