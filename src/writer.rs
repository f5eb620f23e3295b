// SPDX-License-Identifier: MIT
//! Frame encoding.
//!
//! `encode` produces the whole frame in one buffer. `EncodeChunks` produces
//! the same bytes lazily in chunks of at least a requested size, so a large
//! container can be written out without materializing the full frame;
//! concatenating the chunks is byte-identical to `encode`.

use std::io::Write;

use indexmap::IndexMap;
use tracing::trace;

use crate::format::{Value, FLAG_END, FLAG_MORE};
use crate::record;

/// Encode all entries into a single frame.
pub(crate) fn encode(entries: &IndexMap<String, Value>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame_size(entries));
    if entries.is_empty() {
        buf.push(FLAG_END);
        return buf;
    }
    buf.push(FLAG_MORE);
    let mut iter = entries.iter().peekable();
    while let Some((key, value)) = iter.next() {
        record::encode_record(&mut buf, key, value);
        buf.push(if iter.peek().is_some() {
            FLAG_MORE
        } else {
            FLAG_END
        });
    }
    buf
}

/// Exact encoded size of the frame for all entries.
pub(crate) fn frame_size(entries: &IndexMap<String, Value>) -> usize {
    if entries.is_empty() {
        return 1;
    }
    let records: usize = entries
        .iter()
        .map(|(key, value)| {
            let length_prefix = if value.type_tag().fixed_size().is_none() {
                4
            } else {
                0
            };
            2 + key.len() + 1 + length_prefix + value.encoded_len() + 1
        })
        .sum();
    1 + records
}

/// Lazy chunked encoder over a container's entries.
///
/// Yields chunks of at least `min_chunk` bytes (the final chunk may be
/// smaller, and a single oversized record always travels whole). Borrows the
/// entries immutably, so the container cannot be mutated while a chunk walk
/// is in progress.
pub struct EncodeChunks<'a> {
    iter: std::iter::Peekable<indexmap::map::Iter<'a, String, Value>>,
    min_chunk: usize,
    started: bool,
    done: bool,
}

impl<'a> EncodeChunks<'a> {
    pub(crate) fn new(entries: &'a IndexMap<String, Value>, min_chunk: usize) -> Self {
        Self {
            iter: entries.iter().peekable(),
            min_chunk: min_chunk.max(1),
            started: false,
            done: false,
        }
    }
}

impl Iterator for EncodeChunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = Vec::with_capacity(self.min_chunk + 1);
        if !self.started {
            self.started = true;
            if self.iter.peek().is_none() {
                self.done = true;
                buf.push(FLAG_END);
                return Some(buf);
            }
            buf.push(FLAG_MORE);
        }
        while let Some((key, value)) = self.iter.next() {
            record::encode_record(&mut buf, key, value);
            if self.iter.peek().is_some() {
                buf.push(FLAG_MORE);
            } else {
                buf.push(FLAG_END);
                self.done = true;
                return Some(buf);
            }
            if buf.len() >= self.min_chunk {
                trace!(chunk_len = buf.len(), "yielding encode chunk");
                return Some(buf);
            }
        }
        // only reachable when the walk resumed with an exhausted iterator
        self.done = true;
        if buf.is_empty() {
            None
        } else {
            Some(buf)
        }
    }
}

const STREAM_CHUNK: usize = 1024;

/// Write the frame to a stream in bounded chunks.
pub(crate) fn encode_to_stream<W: Write>(
    entries: &IndexMap<String, Value>,
    stream: &mut W,
) -> std::io::Result<()> {
    for chunk in EncodeChunks::new(entries, STREAM_CHUNK) {
        stream.write_all(&chunk)?;
    }
    Ok(())
}
