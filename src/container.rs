// SPDX-License-Identifier: MIT
//! The key-value container and its mutation, merge and identity surface.

use std::borrow::Cow;
use std::io::{Read, Seek, Write};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::format::{Value, KEY_MAX_LEN};
use crate::reader::{
    self, DecodeError, MergeOutcome, MergePolicy, SliceMergeSession, StreamMergeSession,
};
use crate::record;
use crate::writer::{self, EncodeChunks};

/// A mutation-level failure. Distinct from [`DecodeError`]: nothing here
/// involves wire bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("key {0:?} is already present")]
    DuplicateKey(String),

    #[error("key {0:?} not found")]
    KeyNotFound(String),

    #[error("key length {0} exceeds the 16383 byte limit")]
    InvalidKeyLength(usize),
}

/// Key canonicalization strategy.
///
/// Keys are canonicalized once on the way in, so lookups and stored keys
/// always compare exactly. `canonical` must be idempotent and should return
/// `Cow::Borrowed` whenever the key is already canonical.
pub trait KeyComparer {
    fn canonical<'k>(&self, key: &'k str) -> Cow<'k, str>;
}

/// Byte-exact keys, the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactKey;

impl KeyComparer for ExactKey {
    #[inline]
    fn canonical<'k>(&self, key: &'k str) -> Cow<'k, str> {
        Cow::Borrowed(key)
    }
}

/// Case-insensitive keys, canonicalized to lowercase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseInsensitiveKey;

impl KeyComparer for CaseInsensitiveKey {
    fn canonical<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if key.chars().any(char::is_uppercase) {
            Cow::Owned(key.to_lowercase())
        } else {
            Cow::Borrowed(key)
        }
    }
}

/// An ordered map of string keys to typed values with a binary frame codec.
///
/// Entries keep insertion order, which is also the encode order. Two
/// containers are equal when they hold the same entries, regardless of order
/// or comparer.
#[derive(Debug, Clone)]
pub struct PairContainer<C: KeyComparer = ExactKey> {
    entries: IndexMap<String, Value>,
    comparer: C,
}

impl PairContainer<ExactKey> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            comparer: ExactKey,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            comparer: ExactKey,
        }
    }

    /// Build a container from an encoded frame, tolerating truncation.
    ///
    /// Records cut off at the end of the slice are silently dropped; a
    /// malformed frame is still an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut container = Self::new();
        container.read_slice(bytes)?;
        Ok(container)
    }

    /// Build a container by reading an encoded frame from a stream,
    /// tolerating truncation.
    pub fn from_stream<R: Read + Seek>(stream: &mut R) -> Result<Self, DecodeError> {
        let mut container = Self::new();
        container.read_stream(stream)?;
        Ok(container)
    }
}

impl Default for PairContainer<ExactKey> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: KeyComparer> PairContainer<C> {
    /// An empty container using `comparer` for key canonicalization.
    pub fn with_comparer(comparer: C) -> Self {
        Self {
            entries: IndexMap::new(),
            comparer,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(self.comparer.canonical(key).as_ref())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(self.comparer.canonical(key).as_ref())
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    pub fn try_get(&self, key: &str) -> Result<&Value, ContainerError> {
        self.get(key)
            .ok_or_else(|| ContainerError::KeyNotFound(key.to_owned()))
    }

    /// Insert a new entry. Fails if the key is already present.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ContainerError> {
        let key = self.checked_key(key)?;
        match self.entries.entry(key) {
            indexmap::map::Entry::Occupied(slot) => {
                Err(ContainerError::DuplicateKey(slot.key().clone()))
            }
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                Ok(())
            }
        }
    }

    /// Insert or overwrite an entry, returning the previous value if any.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, ContainerError> {
        let key = self.checked_key(key)?;
        Ok(self.entries.insert(key, value.into()))
    }

    /// Remove an entry, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries
            .shift_remove(self.comparer.canonical(key).as_ref())
    }

    /// Remove every listed key. Returns how many were actually present.
    pub fn remove_many<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.remove(key.as_ref()).is_some())
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.entries.values()
    }

    /// Encode all entries into a single frame.
    pub fn encode(&self) -> Vec<u8> {
        writer::encode(&self.entries)
    }

    /// Exact byte length of [`encode`](Self::encode)'s output.
    pub fn encoded_len(&self) -> usize {
        writer::frame_size(&self.entries)
    }

    /// Encode lazily in chunks of at least `min_chunk` bytes.
    ///
    /// Concatenating the chunks is byte-identical to [`encode`](Self::encode).
    /// The iterator borrows the container, so entries cannot change while a
    /// chunk walk is in progress.
    pub fn encode_chunks(&self, min_chunk: usize) -> EncodeChunks<'_> {
        EncodeChunks::new(&self.entries, min_chunk)
    }

    /// Write the encoded frame to a stream.
    pub fn encode_to_stream<W: Write>(&self, stream: &mut W) -> std::io::Result<()> {
        writer::encode_to_stream(&self.entries, stream)
    }

    /// Merge every complete record of `bytes` under `policy`.
    pub fn merge_slice<'a>(
        &mut self,
        bytes: &'a [u8],
        policy: MergePolicy,
    ) -> Result<MergeOutcome<'a>, DecodeError> {
        reader::merge_slice(self, bytes, policy)
    }

    /// Merge every complete record readable from `stream` under `policy`.
    ///
    /// Returns `false` and rewinds to the start of the incomplete record when
    /// the stream ends mid-record.
    pub fn merge_stream<R: Read + Seek>(
        &mut self,
        stream: &mut R,
        policy: MergePolicy,
    ) -> Result<bool, DecodeError> {
        reader::merge_stream(self, stream, policy)
    }

    /// Start an incremental slice merge applying at most `batch` records per
    /// step.
    pub fn merge_slice_batched<'t, 'a>(
        &'t mut self,
        bytes: &'a [u8],
        policy: MergePolicy,
        batch: usize,
    ) -> SliceMergeSession<'t, 'a, C> {
        SliceMergeSession::new(self, bytes, policy, batch)
    }

    /// Start an incremental stream merge applying at most `batch` records per
    /// step.
    pub fn merge_stream_batched<'t, 's, R: Read + Seek>(
        &'t mut self,
        stream: &'s mut R,
        policy: MergePolicy,
        batch: usize,
    ) -> StreamMergeSession<'t, 's, R, C> {
        StreamMergeSession::new(self, stream, policy, batch)
    }

    /// Discard all entries and load the frame in `bytes`, tolerating
    /// truncation.
    pub fn read_slice<'a>(&mut self, bytes: &'a [u8]) -> Result<MergeOutcome<'a>, DecodeError> {
        self.entries.clear();
        debug!(input_len = bytes.len(), "reloading container from slice");
        reader::merge_slice(self, bytes, MergePolicy::Cover)
    }

    /// Discard all entries and load the frame from `stream`, tolerating
    /// truncation.
    pub fn read_stream<R: Read + Seek>(&mut self, stream: &mut R) -> Result<bool, DecodeError> {
        self.entries.clear();
        debug!("reloading container from stream");
        reader::merge_stream(self, stream, MergePolicy::Cover)
    }

    /// Merge another container's entries under `policy`. Incoming keys pass
    /// through this container's comparer.
    pub fn merge_from<C2: KeyComparer>(&mut self, other: &PairContainer<C2>, policy: MergePolicy) {
        for (key, value) in other.iter() {
            self.apply_record(key.clone(), value.clone(), policy);
        }
    }

    /// True when both containers hold exactly the same key set, ignoring
    /// values and order.
    pub fn key_set_eq<C2: KeyComparer>(&self, other: &PairContainer<C2>) -> bool {
        self.len() == other.len() && self.keys().all(|key| other.entries.contains_key(key))
    }

    /// Content digest: SHA-256 over the key-sorted record encoding, as a hex
    /// string. Equal containers always hash equally, independent of insertion
    /// order.
    pub fn content_hash(&self) -> String {
        let mut pairs: Vec<(&String, &Value)> = self.entries.iter().collect();
        pairs.sort_by_key(|(key, _)| key.as_str());
        let mut buf = Vec::new();
        for (key, value) in pairs {
            record::encode_record(&mut buf, key, value);
        }
        hex::encode(Sha256::digest(&buf))
    }

    /// Canonicalize and length-check a key for insertion.
    fn checked_key(&self, key: &str) -> Result<String, ContainerError> {
        let canonical = self.comparer.canonical(key);
        if canonical.len() > KEY_MAX_LEN {
            return Err(ContainerError::InvalidKeyLength(canonical.len()));
        }
        Ok(canonical.into_owned())
    }

    /// Apply one decoded record under `policy`.
    ///
    /// Wire-decoded keys are already within the length ceiling, so only
    /// canonicalization happens here.
    pub(crate) fn apply_record(&mut self, key: String, value: Value, policy: MergePolicy) {
        let key = match self.comparer.canonical(&key) {
            Cow::Borrowed(_) => key,
            Cow::Owned(canonical) => canonical,
        };
        match policy {
            MergePolicy::Add => {
                self.entries.entry(key).or_insert(value);
            }
            MergePolicy::Cover => {
                self.entries.insert(key, value);
            }
            MergePolicy::Replace => {
                if let Some(slot) = self.entries.get_mut(&key) {
                    *slot = value;
                }
            }
        }
    }
}

impl<C1: KeyComparer, C2: KeyComparer> PartialEq<PairContainer<C2>> for PairContainer<C1> {
    fn eq(&self, other: &PairContainer<C2>) -> bool {
        self.entries == other.entries
    }
}

impl<C: KeyComparer> Eq for PairContainer<C> {}

impl<'a, C: KeyComparer> IntoIterator for &'a PairContainer<C> {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<C: KeyComparer> IntoIterator for PairContainer<C> {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
