//! One's-complement number system primitives.
//!
//! This module provides the machine's value types:
//! - [`half`] - operations on one 16-bit one's-complement fraction
//! - [`Word`] - the 32-bit word, two halves side by side
//! - [`arith`] - the parallel (both-halves-at-once) arithmetic unit

pub mod arith;
pub mod half;
mod word;

pub use arith::{parallel_add_with_shift, parallel_multiply, parallel_negate, Halves};
pub use half::{add_ones_complement, from_fraction, negate, to_fraction};
pub use word::{join, split, Word};
