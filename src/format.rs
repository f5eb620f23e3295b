// SPDX-License-Identifier: MIT
//! Wire-level type tags and the value model.
//!
//! Defines the closed set of storable types, their stable numeric wire
//! encoding, and the `Value` union the container holds.

/// Continuation byte: another record follows.
pub const FLAG_MORE: u8 = 0x01;

/// Continuation byte: end of frame.
pub const FLAG_END: u8 = 0x00;

/// Maximum key length in code units (bytes of the UTF-8 encoding).
///
/// The key length travels in a 2-byte signed prefix; this ceiling keeps it
/// comfortably inside that field.
pub const KEY_MAX_LEN: usize = 16383;

/// Wire tag identifying which variant a value holds.
///
/// The numeric encoding is stable: values 1-10, with `0` reserved/invalid.
/// Decoding any other byte is a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Byte = 1,
    Bool = 2,
    Short = 3,
    Int = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    Char = 8,
    String = 9,
    ByteStream = 10,
}

impl TypeTag {
    /// Parse a wire tag byte. Returns `None` for anything outside 1-10.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(TypeTag::Byte),
            2 => Some(TypeTag::Bool),
            3 => Some(TypeTag::Short),
            4 => Some(TypeTag::Int),
            5 => Some(TypeTag::Long),
            6 => Some(TypeTag::Float),
            7 => Some(TypeTag::Double),
            8 => Some(TypeTag::Char),
            9 => Some(TypeTag::String),
            10 => Some(TypeTag::ByteStream),
            _ => None,
        }
    }

    /// Encoded byte width for fixed-width types; `None` for `String` and
    /// `ByteStream`, which carry an explicit 4-byte length prefix instead.
    #[inline]
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            TypeTag::Byte | TypeTag::Bool => Some(1),
            TypeTag::Short => Some(2),
            TypeTag::Int | TypeTag::Float | TypeTag::Char => Some(4),
            TypeTag::Long | TypeTag::Double => Some(8),
            TypeTag::String | TypeTag::ByteStream => None,
        }
    }

    /// Get the name of the tag
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Byte => "byte",
            TypeTag::Bool => "bool",
            TypeTag::Short => "short",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Char => "char",
            TypeTag::String => "string",
            TypeTag::ByteStream => "bytestream",
        }
    }

    /// Get all tags in wire order
    pub fn all() -> &'static [TypeTag] {
        &[
            TypeTag::Byte,
            TypeTag::Bool,
            TypeTag::Short,
            TypeTag::Int,
            TypeTag::Long,
            TypeTag::Float,
            TypeTag::Double,
            TypeTag::Char,
            TypeTag::String,
            TypeTag::ByteStream,
        ]
    }
}

/// A storable value: the closed union over the ten wire types.
///
/// There is no null variant and no escape hatch for arbitrary types, so a
/// container can only ever hold values the codec knows how to encode.
#[derive(Debug, Clone)]
pub enum Value {
    Byte(u8),
    Bool(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// The wire tag for this value.
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Byte(_) => TypeTag::Byte,
            Value::Bool(_) => TypeTag::Bool,
            Value::Short(_) => TypeTag::Short,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::Char(_) => TypeTag::Char,
            Value::String(_) => TypeTag::String,
            Value::Bytes(_) => TypeTag::ByteStream,
        }
    }

    /// Byte length of the encoded value payload (excluding key, tag and any
    /// length prefix).
    pub(crate) fn encoded_len(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            Value::Bytes(b) => b.len(),
            // fixed-width tags always report a size
            other => other.type_tag().fixed_size().unwrap_or(0),
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            // floats compare bit-wise so equality agrees with the encoded bytes
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_from_byte_round_trip() {
        for &tag in TypeTag::all() {
            assert_eq!(TypeTag::from_byte(tag as u8), Some(tag));
        }
    }

    #[test]
    fn test_tag_from_byte_invalid() {
        assert_eq!(TypeTag::from_byte(0), None);
        assert_eq!(TypeTag::from_byte(11), None);
        assert_eq!(TypeTag::from_byte(0xff), None);
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(TypeTag::Byte.fixed_size(), Some(1));
        assert_eq!(TypeTag::Bool.fixed_size(), Some(1));
        assert_eq!(TypeTag::Short.fixed_size(), Some(2));
        assert_eq!(TypeTag::Int.fixed_size(), Some(4));
        assert_eq!(TypeTag::Long.fixed_size(), Some(8));
        assert_eq!(TypeTag::Float.fixed_size(), Some(4));
        assert_eq!(TypeTag::Double.fixed_size(), Some(8));
        assert_eq!(TypeTag::Char.fixed_size(), Some(4));
        assert_eq!(TypeTag::String.fixed_size(), None);
        assert_eq!(TypeTag::ByteStream.fixed_size(), None);
    }

    #[test]
    fn test_value_tags() {
        assert_eq!(Value::from(7_u8).type_tag(), TypeTag::Byte);
        assert_eq!(Value::from(true).type_tag(), TypeTag::Bool);
        assert_eq!(Value::from(-1_i16).type_tag(), TypeTag::Short);
        assert_eq!(Value::from(42_i32).type_tag(), TypeTag::Int);
        assert_eq!(Value::from(42_i64).type_tag(), TypeTag::Long);
        assert_eq!(Value::from(1.0_f32).type_tag(), TypeTag::Float);
        assert_eq!(Value::from(1.0_f64).type_tag(), TypeTag::Double);
        assert_eq!(Value::from('x').type_tag(), TypeTag::Char);
        assert_eq!(Value::from("s").type_tag(), TypeTag::String);
        assert_eq!(Value::from(vec![1_u8]).type_tag(), TypeTag::ByteStream);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(5).as_i32(), Some(5));
        assert_eq!(Value::Int(5).as_i64(), None);
        assert_eq!(Value::String("hi".into()).as_str(), Some("hi"));
        assert_eq!(Value::Bytes(vec![1, 2]).as_bytes(), Some(&[1_u8, 2][..]));
        assert_eq!(Value::Char('q').as_char(), Some('q'));
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(Value::Byte(1).encoded_len(), 1);
        assert_eq!(Value::Long(1).encoded_len(), 8);
        assert_eq!(Value::String("abc".into()).encoded_len(), 3);
        assert_eq!(Value::Bytes(vec![0; 10]).encoded_len(), 10);
        assert_eq!(Value::String(String::new()).encoded_len(), 0);
    }
}
