// SPDX-License-Identifier: MIT
//! # pairstream
//!
//! A self-describing binary container for a string-keyed map of primitive
//! and blob values. The frame format carries its own type information, so a
//! reader needs no schema, and decoding tolerates truncated input: every
//! record that arrived whole is kept, and the cut point is reported so the
//! transfer can resume.
//!
//! ## Key Features
//!
//! - **Self-describing**: each record carries its key, a type tag and, for
//!   variable-width values, an explicit length
//! - **Truncation tolerant**: a cut-off frame is a resumable condition, not
//!   an error
//! - **Three merge policies**: `Add` (keep existing), `Cover` (incoming
//!   wins), `Replace` (update existing keys only)
//! - **Chunked encoding**: frames stream out lazily in bounded chunks, with
//!   chunk concatenation byte-identical to whole-frame encoding
//! - **Incremental merges**: batched sessions absorb large frames
//!   cooperatively
//!
//! ## Format Specification
//!
//! ```text
//! Frame:
//! - ContinuationByte: 0x00 = end of frame, 0x01 = a record follows
//! - Record*, each followed by its own ContinuationByte
//!
//! Record:
//! - KeyLen: i16, byte length of the UTF-8 key (0..=16383)
//! - Key: KeyLen bytes of UTF-8
//! - TypeTag: u8, 1..=10
//! - ValueLen: i32, present only for string (9) and bytestream (10)
//! - Value: ValueLen bytes, or the tag's fixed width
//!
//! Fixed-width scalars use the host's native byte order; frames are not
//! portable across hosts of different endianness.
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pairstream::{MergePolicy, PairContainer};
//!
//! let mut container = PairContainer::new();
//! container.add("title", "hello").unwrap();
//! container.add("count", 3_i32).unwrap();
//! let bytes = container.encode();
//!
//! let decoded = PairContainer::from_slice(&bytes).unwrap();
//! assert_eq!(decoded, container);
//!
//! let mut other = PairContainer::new();
//! other.merge_slice(&bytes, MergePolicy::Cover).unwrap();
//! assert_eq!(other.len(), 2);
//! ```

pub mod container;
pub mod format;
pub mod reader;
pub mod writer;

mod record;
mod scalar;

// Re-export main types
pub use container::{CaseInsensitiveKey, ContainerError, ExactKey, KeyComparer, PairContainer};
pub use format::{TypeTag, Value, FLAG_END, FLAG_MORE, KEY_MAX_LEN};
pub use reader::{
    DecodeError, MergeOutcome, MergePolicy, MergeStep, SliceMergeSession, StreamMergeSession,
};
pub use writer::EncodeChunks;
