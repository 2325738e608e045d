//! Element codec
//!
//! Payload elements are 32-bit words stored little-endian. They are sorted
//! as signed integers and reported to readers as unsigned.

use bytes::{Buf, BufMut, BytesMut};

/// Width of one element in bytes
pub const ELEMENT_BYTES: u64 = 4;

/// Encode signed elements into a fresh buffer
pub fn encode_i32(values: &[i32]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(values.len() * ELEMENT_BYTES as usize);
    for &value in values {
        buf.put_i32_le(value);
    }
    buf
}

/// Decode `bytes` as signed elements, appending to `out`
///
/// Trailing bytes that do not form a whole element are ignored.
pub fn decode_i32_into(mut bytes: &[u8], out: &mut Vec<i32>) {
    out.reserve(bytes.len() / ELEMENT_BYTES as usize);
    while bytes.remaining() >= ELEMENT_BYTES as usize {
        out.push(bytes.get_i32_le());
    }
}

/// Decode `bytes` as unsigned elements
pub fn decode_u32(mut bytes: &[u8]) -> Vec<u32> {
    let mut out = Vec::with_capacity(bytes.len() / ELEMENT_BYTES as usize);
    while bytes.remaining() >= ELEMENT_BYTES as usize {
        out.push(bytes.get_u32_le());
    }
    out
}
