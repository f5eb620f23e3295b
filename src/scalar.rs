// SPDX-License-Identifier: MIT
//! Host-native fixed-width scalar conversions.
//!
//! Every fixed-width field on the wire is stored in the host's native byte
//! order; this module is the single place that property lives. The `get_*`
//! functions expect the caller to have already checked that the slice holds
//! at least the scalar's width.

pub(crate) fn put_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub(crate) fn get_i16(bytes: &[u8]) -> i16 {
    i16::from_ne_bytes(bytes[..2].try_into().unwrap())
}

pub(crate) fn get_i32(bytes: &[u8]) -> i32 {
    i32::from_ne_bytes(bytes[..4].try_into().unwrap())
}

pub(crate) fn get_i64(bytes: &[u8]) -> i64 {
    i64::from_ne_bytes(bytes[..8].try_into().unwrap())
}

pub(crate) fn get_u32(bytes: &[u8]) -> u32 {
    u32::from_ne_bytes(bytes[..4].try_into().unwrap())
}

pub(crate) fn get_f32(bytes: &[u8]) -> f32 {
    f32::from_ne_bytes(bytes[..4].try_into().unwrap())
}

pub(crate) fn get_f64(bytes: &[u8]) -> f64 {
    f64::from_ne_bytes(bytes[..8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut buf = Vec::new();
        put_i16(&mut buf, -12345);
        put_i32(&mut buf, 0x7fff_0001);
        put_i64(&mut buf, i64::MIN);
        put_u32(&mut buf, 0xdead_beef);
        put_f32(&mut buf, 1.5);
        put_f64(&mut buf, -0.25);

        assert_eq!(get_i16(&buf[0..]), -12345);
        assert_eq!(get_i32(&buf[2..]), 0x7fff_0001);
        assert_eq!(get_i64(&buf[6..]), i64::MIN);
        assert_eq!(get_u32(&buf[14..]), 0xdead_beef);
        assert_eq!(get_f32(&buf[18..]), 1.5);
        assert_eq!(get_f64(&buf[22..]), -0.25);
        assert_eq!(buf.len(), 30);
    }

    #[test]
    fn test_native_byte_order() {
        let mut buf = Vec::new();
        put_i32(&mut buf, 0x0102_0304);
        assert_eq!(buf, 0x0102_0304_i32.to_ne_bytes());
    }
}
