//! The EWAH compressed bitmap.
//!
//! An [`Ewah`] stores a logical sequence of bits as run-length-compressed
//! 64-bit words: segments of implicitly-represented uniform words (all zeros
//! or all ones) interleaved with verbatim literal words, each segment headed
//! by a [`Marker`]. Bits are appended in ascending index order; boolean
//! combinations of two bitmaps stream through the compressed form directly
//! (see `merge.rs`) without decompressing either operand.
//!
//! # Buffer anatomy
//!
//! ```text
//! buffer: [ marker | literal literal … | marker | literal … | marker … ]
//!            └─ run of uniform words       └─ run + literals    └─ tail (rlw_pos)
//! ```
//!
//! The tail marker is the only mutable point: every append either extends it
//! or pushes a fresh marker and re-points `rlw_pos`. Segments tile the buffer
//! exactly, and the logical word count always covers `size_in_bits` with
//! strictly less than one word of slack.

use crate::iterator::SegmentIterator;
use crate::marker::{LITERAL_COUNT_MAX, Marker, RUNNING_LENGTH_MAX, WORD_BITS, low_mask};
use crate::storage::{BitmapStorage, InvalidSize};

/// Highest bit index accepted by [`Ewah::set`].
///
/// Bitmaps are capped below `i32::MAX` bits; past that density a compressed
/// bitmap is the wrong structure anyway.
pub const BIT_INDEX_MAX: u64 = i32::MAX as u64 - WORD_BITS;

/// Words preallocated by [`Ewah::new`].
const DEFAULT_BUFFER_WORDS: usize = 4;

/// Below this buffer capacity, growth doubles; above it, grows by 3/2.
const GROWTH_DOUBLING_LIMIT_WORDS: usize = 32_768;

/// Hard ceiling on the physical buffer, in words.
const BUFFER_WORDS_MAX: usize = i32::MAX as usize;

/// A compressed bitmap over 64-bit words.
///
/// Construction is append-only: [`set`](Self::set) accepts bit indices in
/// ascending order and extends the bitmap; there is no random-access
/// mutation. Queries ([`get`](Self::get), [`cardinality`](Self::cardinality),
/// the size accessors) never mutate. [`negate`](Self::negate) flips every bit
/// in place. The boolean operations (`and`/`or`/`xor`/`and_not`, defined in
/// `merge.rs`) leave both operands untouched and allocate their result.
///
/// Equality is logical: two bitmaps compare equal when they report the same
/// size in bits and agree at every bit index, regardless of how their
/// segments happen to be laid out.
#[derive(Debug)]
pub struct Ewah {
    /// The compressed words; `len()` is the populated word count.
    pub(crate) buffer: Vec<u64>,
    /// Logical length in bits.
    pub(crate) size_in_bits: u64,
    /// Index of the current (tail) marker word in `buffer`.
    pub(crate) rlw_pos: usize,
    /// Whether aggregate results are padded out to the longer operand.
    pub(crate) adjust_container_size: bool,
}

impl Ewah {
    /// Creates an empty bitmap: zero bits, one empty marker.
    pub fn new() -> Self {
        Self::with_word_capacity(DEFAULT_BUFFER_WORDS)
    }

    pub(crate) fn with_word_capacity(words: usize) -> Self {
        let mut buffer = Vec::with_capacity(words.max(DEFAULT_BUFFER_WORDS));
        buffer.push(0);
        Self {
            buffer,
            size_in_bits: 0,
            rlw_pos: 0,
            adjust_container_size: true,
        }
    }

    /// Restores the freshly-constructed state, keeping the allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.buffer.push(0);
        self.size_in_bits = 0;
        self.rlw_pos = 0;
        self.adjust_container_size = true;
    }

    /// Alias for [`reset`](Self::reset).
    #[inline]
    pub fn clear(&mut self) {
        self.reset();
    }

    /// Exchanges the complete contents of two bitmaps.
    #[inline]
    pub fn swap(&mut self, other: &mut Ewah) {
        core::mem::swap(self, other);
    }

    /// Sets bit `bit` to one, extending the bitmap to `bit + 1` bits.
    ///
    /// Bits must be set in ascending order: `bit` must be at least
    /// [`size_in_bits`](Self::size_in_bits) (setting the current length is
    /// allowed — it is the next fresh bit) and at most [`BIT_INDEX_MAX`].
    /// Returns `false`, leaving the bitmap untouched, when the index is
    /// refused.
    pub fn set(&mut self, bit: u64) -> bool {
        if bit > BIT_INDEX_MAX || bit < self.size_in_bits {
            return false;
        }

        // Word distance from the active tail word to the word holding `bit`:
        // zero means the bit lands in the tail word, anything greater calls
        // for padding words first.
        let dist = (bit + WORD_BITS) / WORD_BITS - self.size_in_bits.div_ceil(WORD_BITS);
        self.size_in_bits = bit + 1;

        if dist > 0 {
            if dist > 1 {
                self.fast_add_stream_of_empty_words(false, dist - 1);
            }
            self.add_literal_word(1u64 << (bit % WORD_BITS));
            return true;
        }

        let rlw = self.rlw();
        if rlw.literal_count() == 0 {
            // The tail word is a running word. Carve it out as a literal
            // carrying the new bit. A run of ones never ends mid-word here:
            // one-runs are only ever created at word-aligned sizes.
            debug_assert!(rlw.running_length() >= 1);
            debug_assert!(!rlw.running_bit());
            self.set_rlw(rlw.with_running_length(rlw.running_length() - 1));
            self.add_literal_word(1u64 << (bit % WORD_BITS));
            return true;
        }

        let last = self.buffer.len() - 1;
        self.buffer[last] |= 1u64 << (bit % WORD_BITS);
        if self.buffer[last] == u64::MAX {
            // The tail literal filled up: drop it and fold into a run of ones.
            self.buffer.pop();
            self.set_rlw(rlw.with_literal_count(rlw.literal_count() - 1));
            self.add_empty_word(true);
        }
        true
    }

    /// Returns whether bit `bit` is set. Out-of-range indices are unset.
    pub fn get(&self, bit: u64) -> bool {
        if bit >= self.size_in_bits {
            return false;
        }

        let word_index = bit / WORD_BITS;
        let bit_mask = 1u64 << (bit % WORD_BITS);

        let mut words_checked = 0;
        for segment in self.segments() {
            words_checked += segment.marker.running_length();
            if word_index < words_checked {
                return segment.marker.running_bit();
            }

            let literal_count = segment.literals.len() as u64;
            if word_index < words_checked + literal_count {
                return segment.literals[(word_index - words_checked) as usize] & bit_mask != 0;
            }
            words_checked += literal_count;
        }

        false
    }

    /// Number of one-bits in the bitmap.
    pub fn cardinality(&self) -> u64 {
        let mut count = 0;
        for segment in self.segments() {
            if segment.marker.running_bit() {
                count += WORD_BITS * segment.marker.running_length();
            }
            for &word in segment.literals {
                count += u64::from(word.count_ones());
            }
        }
        count
    }

    /// Flips every bit in place.
    ///
    /// Runs swap their fill value, literals are complemented, and the
    /// partially-populated tail word (when `size_in_bits` is not a multiple
    /// of 64) is masked so the bits past the end stay zero. The logical
    /// length is unchanged.
    pub fn negate(&mut self) {
        let mut marker = 0;
        while marker < self.buffer.len() {
            let flipped = {
                let m = Marker(self.buffer[marker]);
                m.with_running_bit(!m.running_bit())
            };
            self.buffer[marker] = flipped.0;

            let literal_count = flipped.literal_count() as usize;
            for index in 1..=literal_count {
                self.buffer[marker + index] = !self.buffer[marker + index];
            }

            if marker + literal_count + 1 == self.buffer.len() {
                let last_bits = (self.size_in_bits % WORD_BITS) as u32;
                if last_bits == 0 {
                    break;
                }

                if literal_count == 0 {
                    if flipped.running_length() > 0 && flipped.running_bit() {
                        // The run of ones now spills past size_in_bits: break
                        // the partial word out into a masked literal.
                        debug_assert_eq!(marker, self.rlw_pos);
                        self.buffer[marker] =
                            flipped.with_running_length(flipped.running_length() - 1).0;
                        self.add_literal_word(low_mask(last_bits));
                    }
                    break;
                }

                self.buffer[marker + literal_count] &= low_mask(last_bits);
                break;
            }

            marker += literal_count + 1;
        }
    }

    /// Logical length in bits: one past the highest bit ever set.
    #[inline]
    pub fn size_in_bits(&self) -> u64 {
        self.size_in_bits
    }

    /// Compressed size in bytes.
    #[inline]
    pub fn size_in_bytes(&self) -> u64 {
        self.buffer.len() as u64 * (WORD_BITS / 8)
    }

    /// Compressed size in words (markers plus literals).
    #[inline]
    pub fn size_in_words(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// The populated compressed words.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.buffer
    }

    /// Iterates the compressed segments in order.
    #[inline]
    pub fn segments(&self) -> SegmentIterator<'_> {
        SegmentIterator::new(&self.buffer)
    }

    /// Extends the reported size to `bits`, filling the fresh bits with
    /// `default_value`.
    ///
    /// Returns `false`, leaving the bitmap untouched, if `bits` would shrink
    /// the bitmap or exceed the addressable range. Extending with `false`
    /// appends runs of zeros; extending with `true` routes every fresh bit
    /// through the ascending append path, so runs of ones and tail literals
    /// come out the same as if the caller had set each bit individually.
    pub fn set_size_in_bits_with_default(&mut self, bits: u64, default_value: bool) -> bool {
        if bits < self.size_in_bits || bits > BIT_INDEX_MAX + 1 {
            return false;
        }

        if default_value {
            while self.size_in_bits % WORD_BITS != 0 && self.size_in_bits < bits {
                let bit = self.size_in_bits;
                self.set(bit);
            }

            let whole_words = bits / WORD_BITS;
            let current_words = self.size_in_bits / WORD_BITS;
            if whole_words > current_words {
                self.add_stream_of_empty_words(true, whole_words - current_words);
            }

            while self.size_in_bits < bits {
                let bit = self.size_in_bits;
                self.set(bit);
            }
            debug_assert_eq!(self.size_in_bits, bits);
        } else {
            let target_words = bits.div_ceil(WORD_BITS);
            let current_words = self.size_in_bits.div_ceil(WORD_BITS);
            if target_words > current_words {
                self.fast_add_stream_of_empty_words(false, target_words - current_words);
            }
            self.size_in_bits = bits;
        }
        true
    }

    // ------------------------------------------------------------------
    // Append primitives. Every mutation of the compressed form funnels
    // through these; they maintain the segment-tiling invariant and the
    // tail marker position.
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn rlw(&self) -> Marker {
        Marker(self.buffer[self.rlw_pos])
    }

    #[inline]
    fn set_rlw(&mut self, marker: Marker) {
        self.buffer[self.rlw_pos] = marker.0;
    }

    /// Pushes a fresh empty marker and makes it current.
    fn new_marker(&mut self) {
        self.push_back(0);
        self.rlw_pos = self.buffer.len() - 1;
    }

    /// Appends one uniform word of `bit`s, merging into the tail run when the
    /// running bit matches and the run has room.
    pub(crate) fn add_empty_word(&mut self, bit: bool) {
        let rlw = self.rlw();
        let no_literals = rlw.literal_count() == 0;
        let run_length = rlw.running_length();

        if no_literals && run_length == 0 {
            self.set_rlw(rlw.with_running_bit(bit));
        }

        let rlw = self.rlw();
        if no_literals && rlw.running_bit() == bit && run_length < RUNNING_LENGTH_MAX {
            self.set_rlw(rlw.with_running_length(run_length + 1));
            return;
        }

        self.new_marker();
        self.set_rlw(Marker::EMPTY.with_running_bit(bit).with_running_length(1));
    }

    /// Appends one literal word, opening a new segment when the tail marker's
    /// literal count is saturated.
    pub(crate) fn add_literal_word(&mut self, word: u64) {
        let rlw = self.rlw();
        let literal_count = rlw.literal_count();

        if literal_count >= LITERAL_COUNT_MAX {
            debug_assert_eq!(literal_count, LITERAL_COUNT_MAX);
            self.new_marker();
            self.set_rlw(Marker::EMPTY.with_literal_count(1));
            self.push_back(word);
            return;
        }

        self.set_rlw(rlw.with_literal_count(literal_count + 1));
        self.push_back(word);
    }

    /// The run-extension engine behind the empty-word streams: extends the
    /// tail run when compatible, then opens as many full-length run segments
    /// as `count` requires. Does not touch `size_in_bits`.
    fn fast_add_stream_of_empty_words(&mut self, bit: bool, mut count: u64) {
        debug_assert!(count > 0);

        let rlw = self.rlw();
        if rlw.running_bit() != bit && rlw.size() == 0 {
            self.set_rlw(rlw.with_running_bit(bit));
        } else if rlw.literal_count() != 0 || rlw.running_bit() != bit {
            self.new_marker();
            if bit {
                self.set_rlw(Marker::EMPTY.with_running_bit(true));
            }
        }

        let rlw = self.rlw();
        let run_length = rlw.running_length();
        let absorbed = count.min(RUNNING_LENGTH_MAX - run_length);
        self.set_rlw(rlw.with_running_length(run_length + absorbed));
        count -= absorbed;

        while count >= RUNNING_LENGTH_MAX {
            self.new_marker();
            self.set_rlw(
                Marker::EMPTY
                    .with_running_bit(bit)
                    .with_running_length(RUNNING_LENGTH_MAX),
            );
            count -= RUNNING_LENGTH_MAX;
        }

        if count > 0 {
            self.new_marker();
            self.set_rlw(Marker::EMPTY.with_running_bit(bit).with_running_length(count));
        }
    }

    /// Appends one physical word, growing capacity geometrically: doubling
    /// while small, 3/2 beyond [`GROWTH_DOUBLING_LIMIT_WORDS`], saturating at
    /// [`BUFFER_WORDS_MAX`].
    fn push_back(&mut self, word: u64) {
        self.grow_for(1);
        self.buffer.push(word);
    }

    fn grow_for(&mut self, additional: usize) {
        let capacity = self.buffer.capacity();
        if self.buffer.len() + additional <= capacity {
            return;
        }

        let needed = capacity + additional;
        let capacity_new = if needed < GROWTH_DOUBLING_LIMIT_WORDS {
            needed * 2
        } else {
            (needed.saturating_mul(3) / 2).min(BUFFER_WORDS_MAX)
        };
        self.buffer.reserve_exact(capacity_new - self.buffer.len());
    }
}

impl Default for Ewah {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Ewah {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            size_in_bits: self.size_in_bits,
            rlw_pos: self.rlw_pos,
            adjust_container_size: self.adjust_container_size,
        }
    }

    /// Replaces `self` with a copy of `source`, reusing the allocation.
    fn clone_from(&mut self, source: &Self) {
        self.buffer.clear();
        self.buffer.extend_from_slice(&source.buffer);
        self.size_in_bits = source.size_in_bits;
        self.rlw_pos = source.rlw_pos;
        self.adjust_container_size = source.adjust_container_size;
    }
}

impl BitmapStorage for Ewah {
    /// Appends one word at the logical tail, run-compressing uniform words.
    fn add(&mut self, word: u64) {
        self.size_in_bits += WORD_BITS;
        match word {
            0 => self.add_empty_word(false),
            u64::MAX => self.add_empty_word(true),
            word => self.add_literal_word(word),
        }
    }

    fn add_stream_of_empty_words(&mut self, bit: bool, count: u64) {
        if count == 0 {
            return;
        }
        self.size_in_bits += count * WORD_BITS;
        self.fast_add_stream_of_empty_words(bit, count);
    }

    fn add_stream_of_literal_words(&mut self, mut words: &[u64]) {
        while !words.is_empty() {
            let rlw = self.rlw();
            let literal_count = rlw.literal_count();
            let can_add = (words.len() as u64).min(LITERAL_COUNT_MAX - literal_count) as usize;
            if can_add == 0 {
                self.new_marker();
                continue;
            }

            self.set_rlw(rlw.with_literal_count(literal_count + can_add as u64));
            let (chunk, rest) = words.split_at(can_add);
            self.grow_for(chunk.len());
            self.buffer.extend_from_slice(chunk);
            self.size_in_bits += WORD_BITS * chunk.len() as u64;

            words = rest;
            if !words.is_empty() {
                self.new_marker();
            }
        }
    }

    fn set_size_in_bits(&mut self, bits: u64) -> Result<(), InvalidSize> {
        if bits.div_ceil(WORD_BITS) != self.size_in_bits.div_ceil(WORD_BITS) {
            return Err(InvalidSize {
                requested: bits,
                current: self.size_in_bits,
            });
        }
        self.size_in_bits = bits;
        Ok(())
    }
}
