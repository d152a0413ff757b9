//! EWAH (Enhanced Word-Aligned Hybrid) compressed bitmap.
//!
//! EWAH stores a sequence of bits as run-length-compressed 64-bit words:
//! runs of uniform words (all zeros or all ones) are represented implicitly
//! by marker words, and everything else is stored verbatim. The layout keeps
//! sparse bitmaps small while remaining scannable, so boolean set operations
//! (AND, OR, XOR, AND NOT), membership queries, and cardinality all run
//! directly over the compressed form.
//!
//! # Usage
//!
//! Bits are appended in ascending index order; boolean operations produce
//! fresh bitmaps and leave their operands untouched:
//!
//! ```
//! use ewah::Ewah;
//!
//! let mut a = Ewah::new();
//! a.set(10);
//! a.set(15_000);
//!
//! let mut b = Ewah::new();
//! b.set(10);
//! b.set(70);
//!
//! let both = a.and(&b);
//! assert!(both.get(10));
//! assert!(!both.get(70));
//! assert_eq!(a.or_cardinality(&b), 3);
//! ```
//!
//! # Structure
//!
//! - [`marker`]: the marker-word bit layout shared by every module;
//! - [`iterator`]: streaming access to the compressed segments;
//! - [`bitmap`]: the [`Ewah`] container and its append machinery;
//! - `merge`: the streaming boolean merge engine;
//! - [`storage`]: the append-only sink contract the merge engine targets,
//!   with [`BitCounter`] for allocation-free cardinality queries.
//!
//! # References
//!
//! - Lemire et al., "Sorting improves word-aligned bitmap indexes"

pub mod bitmap;
pub mod iterator;
pub mod marker;
mod merge;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use bitmap::{BIT_INDEX_MAX, Ewah};
pub use storage::{BitCounter, BitmapStorage};
