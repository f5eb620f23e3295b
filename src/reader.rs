// SPDX-License-Identifier: MIT
//! Frame decoding and merge application.
//!
//! A frame is a continuation byte followed by zero or more records, each
//! trailed by its own continuation byte. `0x00` ends the frame, `0x01`
//! announces another record, and any other byte is a malformed header.
//!
//! Truncated input is an expected condition, not an error. The slice entry
//! points report the unconsumed tail so the caller can resume once more bytes
//! arrive; the stream entry points rewind to the start of the incomplete
//! record and report `Truncated`. Records decoded before the cut stay
//! applied.

use std::io::{Read, Seek, SeekFrom};
use std::string::FromUtf8Error;

use thiserror::Error;
use tracing::{debug, trace};

use crate::container::{ExactKey, KeyComparer, PairContainer};
use crate::format::{FLAG_END, FLAG_MORE};
use crate::record;

/// A fatal decode failure. Anything here means the input is not a valid
/// frame prefix and cannot become one by appending bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame header byte 0x{0:02x}")]
    MalformedHeader(u8),

    #[error("unknown type tag {0}")]
    UnknownTypeTag(u8),

    #[error("invalid length field {0}")]
    InvalidLength(i64),

    #[error("key is not valid UTF-8")]
    InvalidKey(#[source] FromUtf8Error),

    #[error("string value is not valid UTF-8")]
    InvalidString(#[source] FromUtf8Error),

    #[error("char value 0x{0:08x} is not a Unicode scalar")]
    InvalidChar(u32),

    #[error("read failed")]
    Io(#[from] std::io::Error),
}

/// How incoming records combine with records already in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep existing entries; only keys absent from the container are added.
    Add,
    /// Incoming entries win; absent keys are added, present keys overwritten.
    Cover,
    /// Only keys already present are updated; unknown keys are dropped.
    Replace,
}

/// Result of an all-at-once merge over a byte slice.
#[derive(Debug, PartialEq, Eq)]
pub enum MergeOutcome<'a> {
    /// The frame ended with a terminator; all records were applied.
    Complete,
    /// The input cut off mid-record. `remainder` starts at the first byte of
    /// the incomplete record (or at the missing header).
    Truncated { remainder: &'a [u8] },
}

/// Result of one `step()` of an incremental merge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// The batch was exhausted with more input left; call `step()` again.
    Pending,
    /// The frame terminator was reached.
    Complete,
    /// The input cut off mid-record.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Records,
    Done,
}

/// Merge every complete record of `bytes` into `target`.
pub fn merge_slice<'a, C: KeyComparer>(
    target: &mut PairContainer<C>,
    bytes: &'a [u8],
    policy: MergePolicy,
) -> Result<MergeOutcome<'a>, DecodeError> {
    let mut session = SliceMergeSession::new(target, bytes, policy, usize::MAX);
    match session.step()? {
        MergeStep::Complete => Ok(MergeOutcome::Complete),
        MergeStep::Truncated => Ok(MergeOutcome::Truncated {
            remainder: session.remainder(),
        }),
        // unbounded batch cannot leave work pending
        MergeStep::Pending => unreachable!(),
    }
}

/// Merge every complete record readable from `stream` into `target`.
///
/// Returns `true` when the frame terminator was seen. Returns `false` when
/// the stream ended mid-record; the position is then rewound to the start of
/// the incomplete record.
pub fn merge_stream<R: Read + Seek, C: KeyComparer>(
    target: &mut PairContainer<C>,
    stream: &mut R,
    policy: MergePolicy,
) -> Result<bool, DecodeError> {
    let mut session = StreamMergeSession::new(target, stream, policy, usize::MAX);
    match session.step()? {
        MergeStep::Complete => Ok(true),
        MergeStep::Truncated => Ok(false),
        MergeStep::Pending => unreachable!(),
    }
}

/// Incremental merge over a byte slice.
///
/// Each `step()` applies at most `batch` records, so a large frame can be
/// absorbed cooperatively. The session holds an exclusive borrow of the
/// target for its whole lifetime.
pub struct SliceMergeSession<'t, 'a, C: KeyComparer = ExactKey> {
    target: &'t mut PairContainer<C>,
    bytes: &'a [u8],
    policy: MergePolicy,
    batch: usize,
    offset: usize,
    applied: usize,
    phase: Phase,
    terminal: MergeStep,
}

impl<'t, 'a, C: KeyComparer> SliceMergeSession<'t, 'a, C> {
    pub fn new(
        target: &'t mut PairContainer<C>,
        bytes: &'a [u8],
        policy: MergePolicy,
        batch: usize,
    ) -> Self {
        Self {
            target,
            bytes,
            policy,
            batch: batch.max(1),
            offset: 0,
            applied: 0,
            phase: Phase::Header,
            terminal: MergeStep::Truncated,
        }
    }

    /// Apply up to one batch of records.
    ///
    /// After `Complete` or `Truncated` (or an error) the session is finished
    /// and further calls return the terminal state unchanged.
    pub fn step(&mut self) -> Result<MergeStep, DecodeError> {
        if self.phase == Phase::Header {
            if self.bytes.is_empty() {
                self.phase = Phase::Done;
                debug!(policy = ?self.policy, "merge input empty before header");
                return Ok(MergeStep::Truncated);
            }
            match self.bytes[0] {
                FLAG_END => {
                    self.offset = 1;
                    self.phase = Phase::Done;
                    self.terminal = MergeStep::Complete;
                    debug!(policy = ?self.policy, "merged empty frame");
                    return Ok(MergeStep::Complete);
                }
                FLAG_MORE => {
                    self.offset = 1;
                    self.phase = Phase::Records;
                }
                other => {
                    self.phase = Phase::Done;
                    return Err(DecodeError::MalformedHeader(other));
                }
            }
        }
        if self.phase == Phase::Done {
            return Ok(self.terminal);
        }

        for _ in 0..self.batch {
            let rec = match record::decode_record(self.bytes, self.offset) {
                Ok(Some(rec)) => rec,
                Ok(None) => {
                    self.phase = Phase::Done;
                    debug!(
                        policy = ?self.policy,
                        applied = self.applied,
                        remaining = self.bytes.len() - self.offset,
                        "merge truncated mid-record"
                    );
                    return Ok(MergeStep::Truncated);
                }
                Err(e) => {
                    self.phase = Phase::Done;
                    return Err(e);
                }
            };
            match rec.flag {
                FLAG_END | FLAG_MORE => {}
                other => {
                    self.phase = Phase::Done;
                    return Err(DecodeError::MalformedHeader(other));
                }
            }
            trace!(key = %rec.key, tag = ?rec.value.type_tag(), "merging record");
            self.target.apply_record(rec.key, rec.value, self.policy);
            self.applied += 1;
            let last = rec.flag == FLAG_END;
            self.offset = rec.next;
            if last {
                self.phase = Phase::Done;
                self.terminal = MergeStep::Complete;
                debug!(policy = ?self.policy, applied = self.applied, "merge complete");
                return Ok(MergeStep::Complete);
            }
        }
        Ok(MergeStep::Pending)
    }

    /// Bytes not consumed yet. After `Truncated` this starts at the first
    /// byte of the incomplete record.
    pub fn remainder(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    /// Number of records applied so far.
    pub fn records_applied(&self) -> usize {
        self.applied
    }
}

impl<C: KeyComparer> Iterator for SliceMergeSession<'_, '_, C> {
    type Item = Result<MergeStep, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase == Phase::Done {
            return None;
        }
        Some(self.step())
    }
}

/// Incremental merge over a seekable stream.
///
/// On truncation the stream is rewound to the start of the incomplete record
/// so the caller can retry once more bytes are available.
pub struct StreamMergeSession<'t, 's, R: Read + Seek, C: KeyComparer = ExactKey> {
    target: &'t mut PairContainer<C>,
    stream: &'s mut R,
    policy: MergePolicy,
    batch: usize,
    applied: usize,
    phase: Phase,
    terminal: MergeStep,
}

impl<'t, 's, R: Read + Seek, C: KeyComparer> StreamMergeSession<'t, 's, R, C> {
    pub fn new(
        target: &'t mut PairContainer<C>,
        stream: &'s mut R,
        policy: MergePolicy,
        batch: usize,
    ) -> Self {
        Self {
            target,
            stream,
            policy,
            batch: batch.max(1),
            applied: 0,
            phase: Phase::Header,
            terminal: MergeStep::Truncated,
        }
    }

    pub fn step(&mut self) -> Result<MergeStep, DecodeError> {
        if self.phase == Phase::Header {
            let mut header = [0u8; 1];
            if !record::read_exact_or_eof(self.stream, &mut header)? {
                self.phase = Phase::Done;
                debug!(policy = ?self.policy, "merge stream empty before header");
                return Ok(MergeStep::Truncated);
            }
            match header[0] {
                FLAG_END => {
                    self.phase = Phase::Done;
                    self.terminal = MergeStep::Complete;
                    debug!(policy = ?self.policy, "merged empty frame");
                    return Ok(MergeStep::Complete);
                }
                FLAG_MORE => self.phase = Phase::Records,
                other => {
                    self.phase = Phase::Done;
                    return Err(DecodeError::MalformedHeader(other));
                }
            }
        }
        if self.phase == Phase::Done {
            return Ok(self.terminal);
        }

        for _ in 0..self.batch {
            let start = self.stream.stream_position()?;
            let rec = match record::decode_record_stream(self.stream) {
                Ok(Some(rec)) => rec,
                Ok(None) => {
                    self.stream.seek(SeekFrom::Start(start))?;
                    self.phase = Phase::Done;
                    debug!(
                        policy = ?self.policy,
                        applied = self.applied,
                        "merge stream truncated mid-record, rewound"
                    );
                    return Ok(MergeStep::Truncated);
                }
                Err(e) => {
                    self.phase = Phase::Done;
                    return Err(e);
                }
            };
            let (key, value, flag) = rec;
            match flag {
                FLAG_END | FLAG_MORE => {}
                other => {
                    self.phase = Phase::Done;
                    return Err(DecodeError::MalformedHeader(other));
                }
            }
            trace!(key = %key, tag = ?value.type_tag(), "merging record");
            self.target.apply_record(key, value, self.policy);
            self.applied += 1;
            if flag == FLAG_END {
                self.phase = Phase::Done;
                self.terminal = MergeStep::Complete;
                debug!(policy = ?self.policy, applied = self.applied, "merge complete");
                return Ok(MergeStep::Complete);
            }
        }
        Ok(MergeStep::Pending)
    }

    pub fn records_applied(&self) -> usize {
        self.applied
    }
}

impl<R: Read + Seek, C: KeyComparer> Iterator for StreamMergeSession<'_, '_, R, C> {
    type Item = Result<MergeStep, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase == Phase::Done {
            return None;
        }
        Some(self.step())
    }
}
