//! Marker word (running-length word) layout and bit-field access.
//!
//! An EWAH buffer is a sequence of *segments*: one marker word followed by the
//! segment's literal words. The marker packs three fields into a single `u64`:
//!
//! ```text
//! ┌──────────┬──────────────────┬───────────────────────┐
//! │  bit 0   │   bits 1..=32    │      bits 33..=63     │
//! ├──────────┼──────────────────┼───────────────────────┤
//! │ running  │  running length  │  literal word count   │
//! │   bit    │    (32 bits)     │       (31 bits)       │
//! └──────────┴──────────────────┴───────────────────────┘
//! ```
//!
//! - **running bit**: the fill value (0 or 1) of the run of uniform words the
//!   marker implicitly represents;
//! - **running length**: how many uniform 64-bit words the run spans;
//! - **literal word count**: how many verbatim words physically follow the
//!   marker in the buffer.

/// Bits per buffer word.
pub const WORD_BITS: u64 = 64;

/// Maximum running length a single marker can encode (2^32 - 1).
pub const RUNNING_LENGTH_MAX: u64 = (1 << RUNNING_LENGTH_BITS) - 1;

/// Maximum literal word count a single marker can encode (2^31 - 1).
pub const LITERAL_COUNT_MAX: u64 = (1 << LITERAL_COUNT_BITS) - 1;

const RUNNING_LENGTH_BITS: u32 = 32;
const RUNNING_LENGTH_SHIFT: u32 = 1;
const LITERAL_COUNT_BITS: u32 = 31;
const LITERAL_COUNT_SHIFT: u32 = 1 + RUNNING_LENGTH_BITS;

const _: () = {
    assert!(1 + RUNNING_LENGTH_BITS + LITERAL_COUNT_BITS == WORD_BITS as u32);
    assert!(LITERAL_COUNT_SHIFT == 33);
};

/// Creates a mask with the lowest `bits` bits set.
///
/// `bits` must not exceed 64. Used to isolate the significant low bits of a
/// partially populated tail word.
#[inline]
pub const fn low_mask(bits: u32) -> u64 {
    assert!(bits <= WORD_BITS as u32);
    if bits == 0 { 0 } else { !0u64 >> (WORD_BITS as u32 - bits) }
}

/// A marker word, viewed by value.
///
/// `Marker` is a plain `u64` wrapper: reads decode a field, `with_*` writers
/// return the updated word for the caller to store back into the buffer. The
/// bitmap keeps the index of its current (tail) marker and writes updates
/// through this type, so the encoding in the diagram above is the only place
/// the field layout is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker(pub u64);

impl Marker {
    /// A marker with no run and no literals (running bit zero).
    pub const EMPTY: Marker = Marker(0);

    /// The fill value of the run: `false` for zeros, `true` for ones.
    #[inline]
    pub fn running_bit(self) -> bool {
        self.0 & 1 != 0
    }

    /// Returns this marker with the running bit set to `bit`.
    #[inline]
    pub fn with_running_bit(self, bit: bool) -> Marker {
        Marker((self.0 & !1) | bit as u64)
    }

    /// Number of uniform words the run spans.
    #[inline]
    pub fn running_length(self) -> u64 {
        (self.0 >> RUNNING_LENGTH_SHIFT) & RUNNING_LENGTH_MAX
    }

    /// Returns this marker with the running length set to `count`.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds [`RUNNING_LENGTH_MAX`].
    #[inline]
    pub fn with_running_length(self, count: u64) -> Marker {
        assert!(count <= RUNNING_LENGTH_MAX);
        Marker((self.0 & !(RUNNING_LENGTH_MAX << RUNNING_LENGTH_SHIFT)) | (count << RUNNING_LENGTH_SHIFT))
    }

    /// Number of literal words that follow this marker in the buffer.
    #[inline]
    pub fn literal_count(self) -> u64 {
        self.0 >> LITERAL_COUNT_SHIFT
    }

    /// Returns this marker with the literal word count set to `count`.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds [`LITERAL_COUNT_MAX`].
    #[inline]
    pub fn with_literal_count(self, count: u64) -> Marker {
        assert!(count <= LITERAL_COUNT_MAX);
        Marker((self.0 & low_mask(LITERAL_COUNT_SHIFT)) | (count << LITERAL_COUNT_SHIFT))
    }

    /// Total logical words this segment represents: running length plus
    /// literal word count.
    #[inline]
    pub fn size(self) -> u64 {
        self.running_length() + self.literal_count()
    }
}
