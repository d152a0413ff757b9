//! Append-only sinks for the boolean merge engine.
//!
//! The merge engine (`merge.rs`) is written once against [`BitmapStorage`]
//! and runs unchanged whether the result is materialized into a fresh
//! [`Ewah`](crate::Ewah) or reduced to a population count by [`BitCounter`].

use crate::marker::WORD_BITS;

/// An append-only receiver of merge output.
///
/// Words arrive in logical order, either one at a time ([`add`](Self::add)),
/// as homogeneous runs ([`add_stream_of_empty_words`](Self::add_stream_of_empty_words)),
/// or as verbatim literal blocks ([`add_stream_of_literal_words`](Self::add_stream_of_literal_words)).
/// After the stream ends the producer may trim the reported bit length into
/// the final word with [`set_size_in_bits`](Self::set_size_in_bits).
pub trait BitmapStorage {
    /// Appends one 64-bit word, compressing uniform words into runs.
    fn add(&mut self, word: u64);

    /// Appends `count` words uniformly filled with `bit`.
    fn add_stream_of_empty_words(&mut self, bit: bool, count: u64);

    /// Appends the given words verbatim.
    fn add_stream_of_literal_words(&mut self, words: &[u64]);

    /// Adjusts the reported size in bits without changing the word count.
    ///
    /// Fails with [`InvalidSize`] if `bits` does not round up to the current
    /// number of logical words; growing or shrinking by whole words must go
    /// through the append path instead.
    fn set_size_in_bits(&mut self, bits: u64) -> Result<(), InvalidSize>;
}

/// Error returned when [`BitmapStorage::set_size_in_bits`] would change the
/// number of physical words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSize {
    /// The rejected size in bits.
    pub requested: u64,
    /// The size in bits at the time of the call.
    pub current: u64,
}

impl core::fmt::Display for InvalidSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "cannot resize bitmap from {} to {} bits: the size may only move within \
             the last word; use set_size_in_bits_with_default to extend",
            self.current, self.requested
        )
    }
}

impl std::error::Error for InvalidSize {}

/// A sink that reduces the merge stream to its population count.
///
/// Backs the cardinality-only boolean operations, which avoid allocating an
/// intermediate bitmap just to count its bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitCounter {
    count: u64,
}

impl BitCounter {
    /// Creates a counter at zero.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of one-bits received so far.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl BitmapStorage for BitCounter {
    #[inline]
    fn add(&mut self, word: u64) {
        self.count += u64::from(word.count_ones());
    }

    #[inline]
    fn add_stream_of_empty_words(&mut self, bit: bool, count: u64) {
        if bit {
            self.count += WORD_BITS * count;
        }
    }

    #[inline]
    fn add_stream_of_literal_words(&mut self, words: &[u64]) {
        for &word in words {
            self.count += u64::from(word.count_ones());
        }
    }

    #[inline]
    fn set_size_in_bits(&mut self, _bits: u64) -> Result<(), InvalidSize> {
        Ok(())
    }
}
