//! Boolean combination of two compressed bitmaps.
//!
//! All four binary operations run the same skeleton over a pair of
//! [`SegmentCursor`]s, streaming the combined words into a
//! [`BitmapStorage`] sink without decompressing either operand:
//!
//! 1. **Run phase.** While either cursor sits on a run, the longer run is the
//!    *predator* and the other cursor the *prey*. The predator's run is
//!    uniform, so the next `run` output words depend only on the predator's
//!    fill bit and the prey's words: they are emitted as a homogeneous
//!    stream, the prey's words verbatim, or the prey's words inverted,
//!    according to the operation. Both cursors then drop `run` words.
//! 2. **Literal phase.** With both runs drained, pending literals pair up
//!    word-for-word under the operation's combiner until one side's segment
//!    is exhausted, and the loop returns to the run phase.
//!
//! When one operand runs dry the survivor is either discharged verbatim,
//! discharged as zeros, or dropped, per operation; the sink's reported size
//! is then trimmed to the longer operand's bit length.
//!
//! The sink is either a fresh [`Ewah`] (materialized result) or a
//! [`BitCounter`] (cardinality-only variants, no intermediate allocation).

use crate::bitmap::Ewah;
use crate::iterator::SegmentCursor;
use crate::storage::{BitCounter, BitmapStorage};

impl Ewah {
    /// Bitwise AND with `other`, as a freshly allocated bitmap.
    pub fn and(&self, other: &Ewah) -> Ewah {
        let mut container = self.merge_container(other);
        self.and_to_sink(other, &mut container);
        container
    }

    /// Cardinality of `self AND other` without materializing the result.
    pub fn and_cardinality(&self, other: &Ewah) -> u64 {
        let mut counter = BitCounter::new();
        self.and_to_sink(other, &mut counter);
        counter.count()
    }

    /// Bitwise OR with `other`, as a freshly allocated bitmap.
    pub fn or(&self, other: &Ewah) -> Ewah {
        let mut container = self.merge_container(other);
        self.or_to_sink(other, &mut container);
        container
    }

    /// Cardinality of `self OR other` without materializing the result.
    pub fn or_cardinality(&self, other: &Ewah) -> u64 {
        let mut counter = BitCounter::new();
        self.or_to_sink(other, &mut counter);
        counter.count()
    }

    /// Bitwise XOR with `other`, as a freshly allocated bitmap.
    pub fn xor(&self, other: &Ewah) -> Ewah {
        let mut container = self.merge_container(other);
        self.xor_to_sink(other, &mut container);
        container
    }

    /// Cardinality of `self XOR other` without materializing the result.
    pub fn xor_cardinality(&self, other: &Ewah) -> u64 {
        let mut counter = BitCounter::new();
        self.xor_to_sink(other, &mut counter);
        counter.count()
    }

    /// Bitwise AND NOT (`self` minus `other`), as a freshly allocated bitmap.
    pub fn and_not(&self, other: &Ewah) -> Ewah {
        let mut container = self.merge_container(other);
        self.and_not_to_sink(other, &mut container);
        container
    }

    /// Cardinality of `self AND NOT other` without materializing the result.
    pub fn and_not_cardinality(&self, other: &Ewah) -> u64 {
        let mut counter = BitCounter::new();
        self.and_not_to_sink(other, &mut counter);
        counter.count()
    }

    /// A result container pre-sized for a merge of `self` and `other`.
    fn merge_container(&self, other: &Ewah) -> Ewah {
        Ewah::with_word_capacity(self.buffer.len().max(other.buffer.len()))
    }

    fn and_to_sink<S: BitmapStorage>(&self, other: &Ewah, sink: &mut S) {
        let mut i = SegmentCursor::new(other.segments());
        let mut j = SegmentCursor::new(self.segments());

        while i.size() > 0 && j.size() > 0 {
            while i.running_length() > 0 || j.running_length() > 0 {
                let i_is_prey = i.running_length() < j.running_length();
                let (prey, predator) = if i_is_prey { (&mut i, &mut j) } else { (&mut j, &mut i) };
                let run = predator.running_length();

                if !predator.running_bit() {
                    // A run of zeros annihilates the prey's words.
                    sink.add_stream_of_empty_words(false, run);
                    prey.discard_first_words(run);
                } else {
                    // A run of ones passes the prey's words through; pad with
                    // zeros where the prey ends early.
                    let discharged = prey.discharge(sink, run);
                    sink.add_stream_of_empty_words(false, run - discharged);
                }
                predator.discard_first_words(run);
            }

            let literal_count = i.literal_count().min(j.literal_count());
            if literal_count > 0 {
                for k in 0..literal_count as usize {
                    sink.add(i.literal_word(k) & j.literal_word(k));
                }
                i.discard_first_words(literal_count);
                j.discard_first_words(literal_count);
            }
        }

        if self.adjust_container_size {
            let remaining = if i.size() > 0 { &mut i } else { &mut j };
            remaining.discharge_as_empty(sink);
            sink.set_size_in_bits(self.size_in_bits.max(other.size_in_bits))
                .expect("aggregate size stays within the final emitted word");
        }
    }

    fn or_to_sink<S: BitmapStorage>(&self, other: &Ewah, sink: &mut S) {
        let mut i = SegmentCursor::new(other.segments());
        let mut j = SegmentCursor::new(self.segments());

        while i.size() > 0 && j.size() > 0 {
            while i.running_length() > 0 || j.running_length() > 0 {
                let i_is_prey = i.running_length() < j.running_length();
                let (prey, predator) = if i_is_prey { (&mut i, &mut j) } else { (&mut j, &mut i) };
                let run = predator.running_length();

                if predator.running_bit() {
                    // A run of ones saturates the output.
                    sink.add_stream_of_empty_words(true, run);
                    prey.discard_first_words(run);
                } else {
                    // A run of zeros passes the prey's words through.
                    let discharged = prey.discharge(sink, run);
                    sink.add_stream_of_empty_words(false, run - discharged);
                }
                predator.discard_first_words(run);
            }

            let literal_count = i.literal_count().min(j.literal_count());
            if literal_count > 0 {
                for k in 0..literal_count as usize {
                    sink.add(i.literal_word(k) | j.literal_word(k));
                }
                i.discard_first_words(literal_count);
                j.discard_first_words(literal_count);
            }
        }

        let remaining = if i.size() > 0 { &mut i } else { &mut j };
        remaining.discharge_remaining(sink);
        sink.set_size_in_bits(self.size_in_bits.max(other.size_in_bits))
            .expect("aggregate size stays within the final emitted word");
    }

    fn xor_to_sink<S: BitmapStorage>(&self, other: &Ewah, sink: &mut S) {
        let mut i = SegmentCursor::new(other.segments());
        let mut j = SegmentCursor::new(self.segments());

        while i.size() > 0 && j.size() > 0 {
            while i.running_length() > 0 || j.running_length() > 0 {
                let i_is_prey = i.running_length() < j.running_length();
                let (prey, predator) = if i_is_prey { (&mut i, &mut j) } else { (&mut j, &mut i) };
                let run = predator.running_length();

                if !predator.running_bit() {
                    // XOR with zeros is the identity.
                    let discharged = prey.discharge(sink, run);
                    sink.add_stream_of_empty_words(false, run - discharged);
                } else {
                    // XOR with ones is complement.
                    let discharged = prey.discharge_negated(sink, run);
                    sink.add_stream_of_empty_words(true, run - discharged);
                }
                predator.discard_first_words(run);
            }

            let literal_count = i.literal_count().min(j.literal_count());
            if literal_count > 0 {
                for k in 0..literal_count as usize {
                    sink.add(i.literal_word(k) ^ j.literal_word(k));
                }
                i.discard_first_words(literal_count);
                j.discard_first_words(literal_count);
            }
        }

        let remaining = if i.size() > 0 { &mut i } else { &mut j };
        remaining.discharge_remaining(sink);
        sink.set_size_in_bits(self.size_in_bits.max(other.size_in_bits))
            .expect("aggregate size stays within the final emitted word");
    }

    fn and_not_to_sink<S: BitmapStorage>(&self, other: &Ewah, sink: &mut S) {
        // Asymmetric: cursor `i` walks self (the minuend), `j` walks other.
        let mut i = SegmentCursor::new(self.segments());
        let mut j = SegmentCursor::new(other.segments());

        while i.size() > 0 && j.size() > 0 {
            while i.running_length() > 0 || j.running_length() > 0 {
                let i_is_prey = i.running_length() < j.running_length();
                let prey_is_minuend = i_is_prey;
                let (prey, predator) = if i_is_prey { (&mut i, &mut j) } else { (&mut j, &mut i) };
                let run = predator.running_length();

                if predator.running_bit() == prey_is_minuend {
                    // Either the subtrahend runs ones (everything below is
                    // cleared) or the minuend runs zeros: zeros out.
                    sink.add_stream_of_empty_words(false, run);
                    prey.discard_first_words(run);
                } else if prey_is_minuend {
                    // The subtrahend runs zeros: the minuend passes through.
                    let discharged = prey.discharge(sink, run);
                    sink.add_stream_of_empty_words(false, run - discharged);
                } else {
                    // The minuend runs ones: emit the subtrahend inverted.
                    let discharged = prey.discharge_negated(sink, run);
                    sink.add_stream_of_empty_words(true, run - discharged);
                }
                predator.discard_first_words(run);
            }

            let literal_count = i.literal_count().min(j.literal_count());
            if literal_count > 0 {
                for k in 0..literal_count as usize {
                    sink.add(i.literal_word(k) & !j.literal_word(k));
                }
                i.discard_first_words(literal_count);
                j.discard_first_words(literal_count);
            }
        }

        if i.size() > 0 {
            // Past the subtrahend's end nothing is subtracted.
            i.discharge_remaining(sink);
        } else if self.adjust_container_size {
            j.discharge_as_empty(sink);
        }
        if self.adjust_container_size {
            sink.set_size_in_bits(self.size_in_bits.max(other.size_in_bits))
                .expect("aggregate size stays within the final emitted word");
        }
    }
}

/// Logical equality: equal bit lengths and no differing bit.
///
/// Physical layout is deliberately ignored — the same bit sequence can be
/// segmented differently depending on how it was built (a broken-out zero
/// literal versus a longer run, say).
impl PartialEq for Ewah {
    fn eq(&self, other: &Ewah) -> bool {
        self.size_in_bits() == other.size_in_bits() && self.xor_cardinality(other) == 0
    }
}

impl Eq for Ewah {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn bitmap_of(bits: &[u64]) -> Ewah {
        let mut bitmap = Ewah::new();
        for &bit in bits {
            assert!(bitmap.set(bit), "set({bit}) refused");
        }
        bitmap
    }

    fn collect_bits(bitmap: &Ewah) -> Vec<u64> {
        (0..bitmap.size_in_bits()).filter(|&bit| bitmap.get(bit)).collect()
    }

    #[test]
    fn and_keeps_the_overlap() {
        let a = bitmap_of(&[10, 70, 100]);
        let b = bitmap_of(&[100, 15_000]);

        let c = a.and(&b);
        assert_eq!(c.cardinality(), 1);
        assert!(c.get(100));
        assert!(!c.get(10));
        assert!(!c.get(70));
        assert!(!c.get(15_000));
        assert_eq!(c.size_in_bits(), 15_001);

        // Commutes.
        assert_eq!(b.and(&a), c);
        assert_eq!(a.and_cardinality(&b), 1);
    }

    #[test]
    fn and_not_subtracts() {
        let a = bitmap_of(&[10, 70, 100, 150, 15_000]);
        let b = bitmap_of(&[11, 13, 100, 15_000]);

        let c = a.and_not(&b);
        assert_eq!(c.cardinality(), 3);
        for bit in [10, 70, 150] {
            assert!(c.get(bit));
        }
        for bit in [100, 15_000, 11, 13] {
            assert!(!c.get(bit));
        }
        assert_eq!(a.and_not_cardinality(&b), 3);

        // The reverse subtraction keeps the other side.
        let d = b.and_not(&a);
        assert_eq!(collect_bits(&d), vec![11, 13]);
    }

    #[test]
    fn or_unions() {
        let a = bitmap_of(&[10, 70, 100, 150, 15_000]);
        let b = bitmap_of(&[11, 13, 100, 15_000]);

        let c = a.or(&b);
        assert_eq!(c.cardinality(), 7);
        for bit in [10, 11, 13, 70, 100, 150, 15_000] {
            assert!(c.get(bit));
        }
        assert!(!c.get(12));
        assert_eq!(c.size_in_bits(), 15_001);
        assert_eq!(b.or(&a), c);
        assert_eq!(a.or_cardinality(&b), 7);
    }

    #[test]
    fn xor_symmetric_difference() {
        let a = bitmap_of(&[10, 70, 100, 150, 15_000]);
        let b = bitmap_of(&[11, 13, 100, 15_000]);

        let c = a.xor(&b);
        assert_eq!(c.cardinality(), 5);
        for bit in [10, 11, 13, 70, 150] {
            assert!(c.get(bit));
        }
        for bit in [100, 15_000] {
            assert!(!c.get(bit));
        }
        assert_eq!(b.xor(&a), c);
        assert_eq!(a.xor_cardinality(&b), 5);
    }

    #[test]
    fn empty_operands() {
        let a = bitmap_of(&[5, 500]);
        let empty = Ewah::new();

        let and = a.and(&empty);
        assert_eq!(and.cardinality(), 0);
        assert_eq!(and.size_in_bits(), a.size_in_bits());

        let or = a.or(&empty);
        assert_eq!(or.cardinality(), 2);
        assert!(or.get(5));
        assert!(or.get(500));

        let xor = a.xor(&empty);
        assert_eq!(xor, a);

        assert_eq!(a.and_not(&empty), a);
        assert_eq!(empty.and_not(&a).cardinality(), 0);
        assert_eq!(empty.and(&empty).cardinality(), 0);
    }

    #[test]
    fn unequal_lengths_pad_to_the_longer_operand() {
        let short = bitmap_of(&[1]);
        let long = bitmap_of(&[1, 100_000]);

        for result in [
            short.and(&long),
            short.or(&long),
            short.xor(&long),
            short.and_not(&long),
        ] {
            assert_eq!(result.size_in_bits(), long.size_in_bits());
        }

        assert_eq!(short.and_cardinality(&long), 1);
        assert_eq!(short.or_cardinality(&long), 2);
        assert_eq!(short.xor_cardinality(&long), 1);
        assert_eq!(short.and_not_cardinality(&long), 0);
        assert_eq!(long.and_not_cardinality(&short), 1);
    }

    #[test]
    fn runs_of_ones_meet_runs_of_zeros() {
        // One operand dominated by a run of ones, the other by a run of
        // zeros, exercising every predator/prey cell.
        let mut ones = Ewah::new();
        for bit in 0..256 {
            assert!(ones.set(bit));
        }
        let sparse = bitmap_of(&[3, 300, 5_000]);

        let and = ones.and(&sparse);
        assert_eq!(collect_bits(&and), vec![3]);

        let or = ones.or(&sparse);
        assert_eq!(or.cardinality(), 256 + 2);

        let xor = ones.xor(&sparse);
        assert_eq!(xor.cardinality(), 255 + 2);
        assert!(!xor.get(3));
        assert!(xor.get(0));
        assert!(xor.get(300));

        let diff = ones.and_not(&sparse);
        assert_eq!(diff.cardinality(), 255);
        assert!(!diff.get(3));
        assert!(diff.get(4));
    }

    #[test]
    fn logical_equality_ignores_layout() {
        // Same bits, different construction paths.
        let direct = bitmap_of(&[10]);

        let mut via_negate = bitmap_of(&[10]);
        via_negate.negate();
        via_negate.negate();

        assert_eq!(direct, via_negate);

        let mut different = bitmap_of(&[10]);
        assert!(different.set(11));
        assert_ne!(direct, different);

        // Same bits but different declared length differ.
        let mut longer = bitmap_of(&[10]);
        assert!(longer.set_size_in_bits_with_default(100, false));
        assert_ne!(direct, longer);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: crate::test_utils::proptest_cases(48),
            ..ProptestConfig::default()
        })]

        /// All four operations agree with the ordered-set model pointwise.
        #[test]
        fn operations_match_set_model(
            a_bits in proptest::collection::btree_set(0u64..20_000, 0..150),
            b_bits in proptest::collection::btree_set(0u64..20_000, 0..150),
        ) {
            let a = {
                let mut bitmap = Ewah::new();
                for &bit in &a_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };
            let b = {
                let mut bitmap = Ewah::new();
                for &bit in &b_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };

            let and: BTreeSet<u64> = a_bits.intersection(&b_bits).copied().collect();
            let or: BTreeSet<u64> = a_bits.union(&b_bits).copied().collect();
            let xor: BTreeSet<u64> = a_bits.symmetric_difference(&b_bits).copied().collect();
            let and_not: BTreeSet<u64> = a_bits.difference(&b_bits).copied().collect();

            let results = [
                (a.and(&b), and),
                (a.or(&b), or),
                (a.xor(&b), xor),
                (a.and_not(&b), and_not),
            ];
            for (actual, expected) in &results {
                prop_assert_eq!(actual.cardinality(), expected.len() as u64);
                for bit in 0..actual.size_in_bits() {
                    prop_assert_eq!(actual.get(bit), expected.contains(&bit));
                }
            }
        }

        /// Inclusion-exclusion and the XOR identity hold for every pair.
        #[test]
        fn cardinality_identities(
            a_bits in proptest::collection::btree_set(0u64..20_000, 0..150),
            b_bits in proptest::collection::btree_set(0u64..20_000, 0..150),
        ) {
            let a = {
                let mut bitmap = Ewah::new();
                for &bit in &a_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };
            let b = {
                let mut bitmap = Ewah::new();
                for &bit in &b_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };

            let and = a.and_cardinality(&b);
            let or = a.or_cardinality(&b);
            let xor = a.xor_cardinality(&b);
            let and_not = a.and_not_cardinality(&b);

            prop_assert_eq!(and + or, a.cardinality() + b.cardinality());
            prop_assert_eq!(xor, or - and);
            prop_assert_eq!(and_not, a.cardinality() - and);

            // Counter variants agree with materialized results.
            prop_assert_eq!(and, a.and(&b).cardinality());
            prop_assert_eq!(or, a.or(&b).cardinality());
            prop_assert_eq!(xor, a.xor(&b).cardinality());
            prop_assert_eq!(and_not, a.and_not(&b).cardinality());
        }

        /// `a AND NOT b` equals `a AND (NOT b)` once NOT spans the common
        /// universe.
        #[test]
        fn and_not_is_and_of_negation(
            a_bits in proptest::collection::btree_set(0u64..20_000, 1..150),
            b_bits in proptest::collection::btree_set(0u64..20_000, 1..150),
        ) {
            let a = {
                let mut bitmap = Ewah::new();
                for &bit in &a_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };
            let b = {
                let mut bitmap = Ewah::new();
                for &bit in &b_bits { prop_assert!(bitmap.set(bit)); }
                bitmap
            };

            let universe = a.size_in_bits().max(b.size_in_bits());
            let mut b_negated = b.clone();
            prop_assert!(b_negated.set_size_in_bits_with_default(universe, false));
            b_negated.negate();

            prop_assert_eq!(a.and_not(&b), a.and(&b_negated));
        }
    }
}
