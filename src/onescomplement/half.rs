//! Operations on a single 16-bit one's-complement half-word.
//!
//! A half is a signed fraction in the open interval (-1.0, +1.0):
//! - bit 15 is the sign
//! - bits 14..0 are the magnitude, in units of 2^-15
//!
//! Negative values are the bitwise complement of their magnitude, so
//! there are two zeros: `0x0000` (+0) and `0xFFFF` (-0).  They compare
//! equal numerically but are never normalized into each other here.

/// The sign bit of a half.
pub const SIGN_BIT: u16 = 0x8000;

/// The fraction (magnitude) bits of a half.
pub const MAGNITUDE_BITS: u16 = 0x7FFF;

/// Positive zero.
pub const PLUS_ZERO: u16 = 0x0000;

/// Negative zero.
pub const MINUS_ZERO: u16 = 0xFFFF;

/// Largest representable positive fraction, 32767/32768.
pub const MAX_POSITIVE: u16 = MAGNITUDE_BITS;

/// Most negative representable fraction, -32767/32768.
pub const MAX_NEGATIVE: u16 = SIGN_BIT;

/// Scale between the magnitude field and a fraction.
const FRACTION_SCALE: f64 = 32768.0;

/// True when the sign bit is set (this includes -0).
#[inline]
pub const fn is_negative(half: u16) -> bool {
    half & SIGN_BIT != 0
}

/// True for either representation of zero.
#[inline]
pub const fn is_zero(half: u16) -> bool {
    half == PLUS_ZERO || half == MINUS_ZERO
}

/// True for negative values other than -0.
#[inline]
pub const fn is_strictly_negative(half: u16) -> bool {
    is_negative(half) && half != MINUS_ZERO
}

/// One's-complement negation: flip every bit.
///
/// This maps +0 to -0 and back.
#[inline]
pub const fn negate(half: u16) -> u16 {
    !half
}

/// The unsigned magnitude (0..=32767) of a half.
#[inline]
pub const fn magnitude(half: u16) -> u16 {
    if is_negative(half) {
        !half & MAGNITUDE_BITS
    } else {
        half
    }
}

/// Build a half from a sign and a magnitude (the magnitude is masked to 15 bits).
#[inline]
pub const fn from_sign_magnitude(negative: bool, magnitude: u16) -> u16 {
    let bits = magnitude & MAGNITUDE_BITS;
    if negative {
        !bits
    } else {
        bits
    }
}

/// One's-complement addition with end-around carry.
///
/// The sum is formed in 17 bits; a carry out of bit 15 is dropped and
/// added back into bit 0.
pub fn add_ones_complement(a: u16, b: u16) -> u16 {
    let sum = u32::from(a) + u32::from(b);
    if sum > 0xFFFF {
        ((sum & 0xFFFF) + 1) as u16
    } else {
        sum as u16
    }
}

/// Arithmetic shift right by one place, replicating the sign bit.
#[inline]
pub const fn halve(half: u16) -> u16 {
    ((half as i16) >> 1) as u16
}

/// Fractional multiply of two halves.
///
/// The magnitude is `(|a| * |b|) >> 15` and the sign is the XOR of the
/// operand signs.  A negative product whose magnitude underflows to
/// nothing comes out as -0.
pub fn multiply_fraction(a: u16, b: u16) -> u16 {
    let negative = is_negative(a) != is_negative(b);
    let product = (u32::from(magnitude(a)) * u32::from(magnitude(b))) >> 15;
    from_sign_magnitude(negative, product as u16)
}

/// Logical shift left within the half; vacated bits are zero.
pub fn shift_left(half: u16, count: u32) -> u16 {
    half.checked_shl(count).unwrap_or(PLUS_ZERO)
}

/// Logical shift right within the half; vacated bits are zero.
pub fn shift_right(half: u16, count: u32) -> u16 {
    half.checked_shr(count).unwrap_or(PLUS_ZERO)
}

/// Convert a half to a fraction in (-1.0, +1.0).
pub fn to_fraction(half: u16) -> f64 {
    let value = f64::from(magnitude(half)) / FRACTION_SCALE;
    if is_negative(half) {
        -value
    } else {
        value
    }
}

/// Convert a fraction to a half, rounding to nearest.
///
/// Out-of-range input saturates: anything at or above 1.0 becomes
/// [`MAX_POSITIVE`] and anything at or below -1.0 becomes
/// [`MAX_NEGATIVE`].  NaN converts to +0.
pub fn from_fraction(value: f64) -> u16 {
    if value.is_nan() {
        return PLUS_ZERO;
    }
    let scaled = (value.abs() * FRACTION_SCALE).round();
    let magnitude = if scaled >= f64::from(MAGNITUDE_BITS) {
        MAGNITUDE_BITS
    } else {
        scaled as u16
    };
    from_sign_magnitude(value < 0.0, magnitude)
}

/// Interpret a half as a one's-complement integer (-0 reads as 0).
pub fn to_integer(half: u16) -> i16 {
    let value = magnitude(half) as i16;
    if is_negative(half) {
        -value
    } else {
        value
    }
}

/// Encode an integer as a one's-complement half.
///
/// `i16::MIN` has no one's-complement representation and saturates to
/// [`MAX_NEGATIVE`].
pub fn from_integer(value: i16) -> u16 {
    let magnitude = value.unsigned_abs().min(MAGNITUDE_BITS);
    from_sign_magnitude(value < 0, magnitude)
}
