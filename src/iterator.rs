//! Streaming access to the compressed segment sequence.
//!
//! [`SegmentIterator`] walks a word buffer marker-by-marker, yielding each
//! segment's marker together with the slice of literal words that follow it.
//!
//! [`SegmentCursor`] layers a consumable working copy on top: the merge
//! engine peels logical words off the front of the current segment
//! ([`discard_first_words`](SegmentCursor::discard_first_words)) or copies
//! them into a sink ([`discharge`](SegmentCursor::discharge)) without
//! advancing to the next marker until the current one is spent.

use crate::marker::Marker;
use crate::storage::BitmapStorage;

/// One segment of a compressed buffer: the marker plus its literal words.
#[derive(Clone, Copy, Debug)]
pub struct Segment<'a> {
    /// The marker word heading this segment.
    pub marker: Marker,
    /// The literal words following the marker, `marker.literal_count()` long.
    pub literals: &'a [u64],
}

/// Walks a compressed buffer from the front, one segment at a time.
#[derive(Clone, Debug)]
pub struct SegmentIterator<'a> {
    buffer: &'a [u64],
    pointer: usize,
}

impl<'a> SegmentIterator<'a> {
    /// Creates an iterator over `buffer`, which must hold only populated
    /// words (the marker at index 0 through the last literal).
    #[inline]
    pub fn new(buffer: &'a [u64]) -> Self {
        Self { buffer, pointer: 0 }
    }
}

impl<'a> Iterator for SegmentIterator<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.pointer >= self.buffer.len() {
            return None;
        }

        let marker = Marker(self.buffer[self.pointer]);
        let literal_start = self.pointer + 1;
        let literal_end = literal_start + marker.literal_count() as usize;
        // Segments tile the buffer exactly; a literal block that overruns the
        // populated words means the buffer is corrupt.
        assert!(literal_end <= self.buffer.len());

        self.pointer = literal_end;
        Some(Segment {
            marker,
            literals: &self.buffer[literal_start..literal_end],
        })
    }
}

/// A consumable view of a segment stream.
///
/// The cursor mirrors the current segment into a working copy: the run's bit
/// and remaining length, plus the slice of literal words not yet consumed.
/// When the working copy empties, the next segment is pulled from the
/// underlying iterator eagerly, so [`size`](Self::size) is zero exactly when
/// the whole stream is spent.
#[derive(Clone, Debug)]
pub struct SegmentCursor<'a> {
    segments: SegmentIterator<'a>,
    running_bit: bool,
    running_length: u64,
    literals: &'a [u64],
}

impl<'a> SegmentCursor<'a> {
    /// Creates a cursor positioned on the first segment of `segments`.
    pub fn new(segments: SegmentIterator<'a>) -> Self {
        let mut cursor = Self {
            segments,
            running_bit: false,
            running_length: 0,
            literals: &[],
        };
        cursor.load_next_segment();
        cursor
    }

    /// Logical words remaining in the working copy. Zero means the cursor is
    /// dry: the working copy reloads eagerly, so no further segments remain
    /// either.
    #[inline]
    pub fn size(&self) -> u64 {
        self.running_length + self.literals.len() as u64
    }

    /// The fill value of the current segment's remaining run.
    #[inline]
    pub fn running_bit(&self) -> bool {
        self.running_bit
    }

    /// Words remaining in the current segment's run.
    #[inline]
    pub fn running_length(&self) -> u64 {
        self.running_length
    }

    /// Literal words still pending in the current segment.
    #[inline]
    pub fn literal_count(&self) -> u64 {
        self.literals.len() as u64
    }

    /// The `index`-th pending literal word of the current segment.
    #[inline]
    pub fn literal_word(&self, index: usize) -> u64 {
        self.literals[index]
    }

    fn load_next_segment(&mut self) -> bool {
        match self.segments.next() {
            Some(segment) => {
                self.running_bit = segment.marker.running_bit();
                self.running_length = segment.marker.running_length();
                self.literals = segment.literals;
                true
            }
            None => {
                self.running_bit = false;
                self.running_length = 0;
                self.literals = &[];
                false
            }
        }
    }

    /// Consumes `count` logical words from the front of the working copy:
    /// first from the run, then from the pending literals, reloading from the
    /// segment stream as segments are spent. Consuming past the end of the
    /// stream leaves the cursor dry.
    pub fn discard_first_words(&mut self, mut count: u64) {
        while count > 0 {
            if self.running_length > count {
                self.running_length -= count;
                return;
            }
            count -= self.running_length;
            self.running_length = 0;

            let discard = count.min(self.literals.len() as u64) as usize;
            self.literals = &self.literals[discard..];
            count -= discard as u64;

            if (count > 0 || self.size() == 0) && !self.load_next_segment() {
                return;
            }
        }
    }

    /// Copies up to `max` logical words into `sink` — each segment's run as a
    /// homogeneous stream, its literals verbatim — and consumes them. Returns
    /// the number of words actually discharged, which falls short of `max`
    /// only when the cursor runs dry.
    pub fn discharge<S: BitmapStorage>(&mut self, sink: &mut S, max: u64) -> u64 {
        let mut discharged = 0;
        while discharged < max && self.size() > 0 {
            let run = self.running_length.min(max - discharged);
            sink.add_stream_of_empty_words(self.running_bit, run);
            discharged += run;

            let literal_count = (self.literals.len() as u64).min(max - discharged);
            sink.add_stream_of_literal_words(&self.literals[..literal_count as usize]);
            discharged += literal_count;

            self.discard_first_words(run + literal_count);
        }
        discharged
    }

    /// Like [`discharge`](Self::discharge), but emits every word inverted:
    /// runs with the opposite fill bit, literals complemented.
    pub fn discharge_negated<S: BitmapStorage>(&mut self, sink: &mut S, max: u64) -> u64 {
        let mut discharged = 0;
        while discharged < max && self.size() > 0 {
            let run = self.running_length.min(max - discharged);
            sink.add_stream_of_empty_words(!self.running_bit, run);
            discharged += run;

            let literal_count = (self.literals.len() as u64).min(max - discharged);
            for index in 0..literal_count as usize {
                sink.add(!self.literals[index]);
            }
            discharged += literal_count;

            self.discard_first_words(run + literal_count);
        }
        discharged
    }

    /// Discharges everything the cursor still holds, through the last
    /// segment of the stream.
    #[inline]
    pub fn discharge_remaining<S: BitmapStorage>(&mut self, sink: &mut S) {
        self.discharge(sink, u64::MAX);
    }

    /// Emits one zero word into `sink` for every logical word remaining, and
    /// consumes them all.
    pub fn discharge_as_empty<S: BitmapStorage>(&mut self, sink: &mut S) {
        while self.size() > 0 {
            let size = self.size();
            sink.add_stream_of_empty_words(false, size);
            self.discard_first_words(size);
        }
    }
}
