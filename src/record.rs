// SPDX-License-Identifier: MIT
//! Encoding and decoding of a single key-value record.
//!
//! A record on the wire is `KeyLen:i16 KeyBytes TypeTag:u8 [ValueLen:i32]
//! Value`. Decoding additionally consumes the continuation byte that follows
//! the record, because a record is only complete once its framing byte is
//! known; encoding leaves the flag to the framer, which knows whether more
//! records follow.
//!
//! Truncation is not an error here: the buffer path reports it as `Ok(None)`
//! without consuming anything, and the stream path maps a short read to
//! `Ok(None)` so the framer can rewind.

use std::io::Read;

use crate::format::{TypeTag, Value, KEY_MAX_LEN};
use crate::reader::DecodeError;
use crate::scalar;

/// One decoded record plus the continuation byte that followed it.
#[derive(Debug)]
pub(crate) struct RawRecord {
    pub key: String,
    pub value: Value,
    /// The continuation byte read after the value. Validated by the framer.
    pub flag: u8,
    /// Offset of the first byte after the continuation byte.
    pub next: usize,
}

/// Append the wire encoding of one record (without a continuation byte).
pub(crate) fn encode_record(buf: &mut Vec<u8>, key: &str, value: &Value) {
    scalar::put_i16(buf, key.len() as i16);
    buf.extend_from_slice(key.as_bytes());
    buf.push(value.type_tag() as u8);
    match value {
        Value::Byte(v) => buf.push(*v),
        Value::Bool(v) => buf.push(u8::from(*v)),
        Value::Short(v) => scalar::put_i16(buf, *v),
        Value::Int(v) => scalar::put_i32(buf, *v),
        Value::Long(v) => scalar::put_i64(buf, *v),
        Value::Float(v) => scalar::put_f32(buf, *v),
        Value::Double(v) => scalar::put_f64(buf, *v),
        Value::Char(v) => scalar::put_u32(buf, *v as u32),
        Value::String(v) => {
            scalar::put_i32(buf, v.len() as i32);
            buf.extend_from_slice(v.as_bytes());
        }
        Value::Bytes(v) => {
            scalar::put_i32(buf, v.len() as i32);
            buf.extend_from_slice(v);
        }
    }
}

/// Decode one record starting at `offset`.
///
/// Returns `Ok(None)` when the buffer cannot complete the record; the caller
/// must not advance past `offset` in that case.
pub(crate) fn decode_record(buf: &[u8], offset: usize) -> Result<Option<RawRecord>, DecodeError> {
    let mut pos = offset;

    if buf.len().saturating_sub(pos) < 2 {
        return Ok(None);
    }
    let key_len = scalar::get_i16(&buf[pos..]);
    pos += 2;
    if key_len < 0 || key_len as usize > KEY_MAX_LEN {
        return Err(DecodeError::InvalidLength(i64::from(key_len)));
    }
    let key_len = key_len as usize;

    if buf.len().saturating_sub(pos) < key_len {
        return Ok(None);
    }
    let key =
        String::from_utf8(buf[pos..pos + key_len].to_vec()).map_err(DecodeError::InvalidKey)?;
    pos += key_len;

    if buf.len().saturating_sub(pos) < 1 {
        return Ok(None);
    }
    let tag_byte = buf[pos];
    pos += 1;
    let tag = TypeTag::from_byte(tag_byte).ok_or(DecodeError::UnknownTypeTag(tag_byte))?;

    let value_len = match tag.fixed_size() {
        Some(width) => width,
        None => {
            if buf.len().saturating_sub(pos) < 4 {
                return Ok(None);
            }
            let len = scalar::get_i32(&buf[pos..]);
            pos += 4;
            if len < 0 {
                return Err(DecodeError::InvalidLength(i64::from(len)));
            }
            len as usize
        }
    };

    if buf.len().saturating_sub(pos) < value_len {
        return Ok(None);
    }
    let value = decode_value(&buf[pos..pos + value_len], tag)?;
    pos += value_len;

    if buf.len().saturating_sub(pos) < 1 {
        return Ok(None);
    }
    let flag = buf[pos];

    Ok(Some(RawRecord {
        key,
        value,
        flag,
        next: pos + 1,
    }))
}

/// Decode one record from the current stream position.
///
/// Returns `Ok(None)` when the stream ends before the record completes; the
/// caller is responsible for rewinding to the record start.
pub(crate) fn decode_record_stream<R: Read>(
    stream: &mut R,
) -> Result<Option<(String, Value, u8)>, DecodeError> {
    let mut len_buf = [0u8; 2];
    if !read_exact_or_eof(stream, &mut len_buf)? {
        return Ok(None);
    }
    let key_len = i16::from_ne_bytes(len_buf);
    if key_len < 0 || key_len as usize > KEY_MAX_LEN {
        return Err(DecodeError::InvalidLength(i64::from(key_len)));
    }

    let mut key_buf = vec![0u8; key_len as usize];
    if !read_exact_or_eof(stream, &mut key_buf)? {
        return Ok(None);
    }
    let key = String::from_utf8(key_buf).map_err(DecodeError::InvalidKey)?;

    let mut tag_buf = [0u8; 1];
    if !read_exact_or_eof(stream, &mut tag_buf)? {
        return Ok(None);
    }
    let tag = TypeTag::from_byte(tag_buf[0]).ok_or(DecodeError::UnknownTypeTag(tag_buf[0]))?;

    let value_len = match tag.fixed_size() {
        Some(width) => width,
        None => {
            let mut size_buf = [0u8; 4];
            if !read_exact_or_eof(stream, &mut size_buf)? {
                return Ok(None);
            }
            let len = i32::from_ne_bytes(size_buf);
            if len < 0 {
                return Err(DecodeError::InvalidLength(i64::from(len)));
            }
            len as usize
        }
    };

    let mut value_buf = vec![0u8; value_len];
    if !read_exact_or_eof(stream, &mut value_buf)? {
        return Ok(None);
    }
    let value = decode_value(&value_buf, tag)?;

    let mut flag_buf = [0u8; 1];
    if !read_exact_or_eof(stream, &mut flag_buf)? {
        return Ok(None);
    }

    Ok(Some((key, value, flag_buf[0])))
}

/// Turn a value payload of exactly the right length into a `Value`.
fn decode_value(bytes: &[u8], tag: TypeTag) -> Result<Value, DecodeError> {
    let value = match tag {
        TypeTag::Byte => Value::Byte(bytes[0]),
        TypeTag::Bool => Value::Bool(bytes[0] != 0),
        TypeTag::Short => Value::Short(scalar::get_i16(bytes)),
        TypeTag::Int => Value::Int(scalar::get_i32(bytes)),
        TypeTag::Long => Value::Long(scalar::get_i64(bytes)),
        TypeTag::Float => Value::Float(scalar::get_f32(bytes)),
        TypeTag::Double => Value::Double(scalar::get_f64(bytes)),
        TypeTag::Char => {
            let scalar = scalar::get_u32(bytes);
            char::from_u32(scalar)
                .map(Value::Char)
                .ok_or(DecodeError::InvalidChar(scalar))?
        }
        TypeTag::String => {
            Value::String(String::from_utf8(bytes.to_vec()).map_err(DecodeError::InvalidString)?)
        }
        TypeTag::ByteStream => Value::Bytes(bytes.to_vec()),
    };
    Ok(value)
}

/// Fill `buf` from the stream, distinguishing a clean short read (`Ok(false)`)
/// from a real I/O failure.
pub(crate) fn read_exact_or_eof<R: Read>(
    stream: &mut R,
    buf: &mut [u8],
) -> Result<bool, DecodeError> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(DecodeError::Io(e)),
    }
}
