//! Property-based tests using proptest
//!
//! These tests generate many random containers and byte inputs to check the
//! codec invariants: round-trips, merge policy laws, chunking equivalence
//! and truncation safety.

use std::io::{Seek, SeekFrom, Write};

use proptest::collection::vec;
use proptest::prelude::*;

use pairstream::{MergeOutcome, MergePolicy, PairContainer, Value};

/// Strategy for generating valid keys (short, so collisions happen)
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

/// Strategy for generating one value of any wire type
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u8>().prop_map(Value::Byte),
        any::<bool>().prop_map(Value::Bool),
        any::<i16>().prop_map(Value::Short),
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        any::<f32>().prop_map(Value::Float),
        any::<f64>().prop_map(Value::Double),
        any::<char>().prop_map(Value::Char),
        ".{0,32}".prop_map(Value::String),
        vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating a populated container
fn container_strategy() -> impl Strategy<Value = PairContainer> {
    vec((key_strategy(), value_strategy()), 0..16).prop_map(|pairs| {
        let mut container = PairContainer::new();
        for (key, value) in pairs {
            container.set(&key, value).unwrap();
        }
        container
    })
}

proptest! {
    /// Decoding an encoded container reproduces it exactly, including NaN
    /// floats and non-BMP chars
    #[test]
    fn encode_decode_round_trip(container in container_strategy()) {
        let bytes = container.encode();
        let decoded = PairContainer::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, container);
    }

    /// The reported frame size always matches the encoded length
    #[test]
    fn encoded_len_matches(container in container_strategy()) {
        prop_assert_eq!(container.encoded_len(), container.encode().len());
    }

    /// Concatenated chunks are byte-identical to the whole frame for any
    /// chunk size
    #[test]
    fn chunk_concat_equals_encode(
        container in container_strategy(),
        min_chunk in 1usize..256,
    ) {
        let whole = container.encode();
        let concat: Vec<u8> = container.encode_chunks(min_chunk).flatten().collect();
        prop_assert_eq!(concat, whole);
    }

    /// Covering a container with its own encoding changes nothing
    #[test]
    fn cover_is_idempotent(container in container_strategy()) {
        let bytes = container.encode();
        let mut merged = container.clone();
        let outcome = merged.merge_slice(&bytes, MergePolicy::Cover).unwrap();
        prop_assert_eq!(outcome, MergeOutcome::Complete);
        prop_assert_eq!(merged, container);
    }

    /// Add never changes a value that was already present
    #[test]
    fn add_preserves_existing(
        base in container_strategy(),
        incoming in container_strategy(),
    ) {
        let bytes = incoming.encode();
        let mut merged = base.clone();
        merged.merge_slice(&bytes, MergePolicy::Add).unwrap();
        for (key, value) in &base {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &incoming {
            if !base.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
    }

    /// Cover always ends with every incoming entry present
    #[test]
    fn cover_applies_all_incoming(
        base in container_strategy(),
        incoming in container_strategy(),
    ) {
        let bytes = incoming.encode();
        let mut merged = base.clone();
        merged.merge_slice(&bytes, MergePolicy::Cover).unwrap();
        for (key, value) in &incoming {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        prop_assert!(merged.len() >= base.len());
        prop_assert!(merged.len() >= incoming.len());
    }

    /// Replace never introduces a key
    #[test]
    fn replace_ignores_new_keys(
        base in container_strategy(),
        incoming in container_strategy(),
    ) {
        let bytes = incoming.encode();
        let mut merged = base.clone();
        merged.merge_slice(&bytes, MergePolicy::Replace).unwrap();
        prop_assert!(merged.key_set_eq(&base));
        for (key, _) in &merged {
            let expected = if incoming.contains_key(key) {
                incoming.get(key)
            } else {
                base.get(key)
            };
            prop_assert_eq!(merged.get(key), expected);
        }
    }

    /// Any prefix of a valid frame either merges cleanly up to the cut or
    /// reports truncation; it never errors and never applies a wrong value
    #[test]
    fn truncation_is_safe_at_any_prefix(
        container in container_strategy(),
        cut_fraction in 0.0f64..1.0,
    ) {
        let bytes = container.encode();
        let cut = ((bytes.len() as f64) * cut_fraction) as usize;
        let mut target = PairContainer::new();
        let outcome = target.merge_slice(&bytes[..cut], MergePolicy::Cover).unwrap();
        match outcome {
            MergeOutcome::Complete => prop_assert_eq!(&target, &container),
            MergeOutcome::Truncated { remainder } => {
                prop_assert!(remainder.len() <= cut);
            }
        }
        for (key, value) in &target {
            prop_assert_eq!(container.get(key), Some(value));
        }
    }

    /// Batched sessions reach the same end state as an all-at-once merge
    #[test]
    fn batched_merge_matches_whole_merge(
        base in container_strategy(),
        incoming in container_strategy(),
        batch in 1usize..5,
    ) {
        let bytes = incoming.encode();
        let mut whole = base.clone();
        whole.merge_slice(&bytes, MergePolicy::Cover).unwrap();

        let mut stepped = base.clone();
        {
            let mut session = stepped.merge_slice_batched(&bytes, MergePolicy::Cover, batch);
            while let Some(step) = session.next() {
                step.unwrap();
            }
        }
        prop_assert_eq!(stepped, whole);
    }

    /// Equal containers hash equally; the hash ignores insertion order
    #[test]
    fn content_hash_is_order_independent(container in container_strategy()) {
        let mut reversed = PairContainer::new();
        let pairs: Vec<_> = container.iter().collect();
        for (key, value) in pairs.into_iter().rev() {
            reversed.set(key, value.clone()).unwrap();
        }
        prop_assert_eq!(container.content_hash(), reversed.content_hash());
    }

    /// Stream and slice decoding agree
    #[test]
    fn stream_decode_matches_slice_decode(container in container_strategy()) {
        let bytes = container.encode();
        let mut cursor = std::io::Cursor::new(bytes.clone());
        let from_stream = PairContainer::from_stream(&mut cursor).unwrap();
        let from_slice = PairContainer::from_slice(&bytes).unwrap();
        prop_assert_eq!(from_stream, from_slice);
    }
}

#[test]
fn empty_container_encodes_to_single_zero_byte() {
    assert_eq!(PairContainer::new().encode(), vec![0x00]);
}

#[test]
fn file_round_trip() {
    let mut container = PairContainer::new();
    container.add("name", "fixture").unwrap();
    container.add("size", 4096_i64).unwrap();
    container.add("payload", vec![0xde_u8, 0xad, 0xbe, 0xef]).unwrap();

    let mut file = tempfile::tempfile().unwrap();
    container.encode_to_stream(&mut file).unwrap();
    file.flush().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let decoded = PairContainer::from_stream(&mut file).unwrap();
    assert_eq!(decoded, container);
}

#[test]
fn truncated_file_rewinds_to_record_start() {
    let mut container = PairContainer::new();
    container.add("a", 1_i32).unwrap();
    container.add("b", 2_i32).unwrap();
    let bytes = container.encode();

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&bytes[..bytes.len() - 3]).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut target = PairContainer::new();
    assert!(!target.merge_stream(&mut file, MergePolicy::Cover).unwrap());
    assert_eq!(target.len(), 1);

    // complete the cut-off record and resume from the rewound position
    let pos = file.stream_position().unwrap();
    file.seek(SeekFrom::End(0)).unwrap();
    file.write_all(&bytes[bytes.len() - 3..]).unwrap();
    file.seek(SeekFrom::Start(pos)).unwrap();

    // the header byte was consumed on the first pass, so the resumed bytes
    // are bare records; reframe them for the merge
    let mut rest = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut rest).unwrap();
    let mut framed = vec![0x01];
    framed.extend_from_slice(&rest);
    target.merge_slice(&framed, MergePolicy::Cover).unwrap();
    assert_eq!(target, container);
}
