//! Biased variable-length integers.
//!
//! Values are shifted up by one before encoding (`v.wrapping_add(1)`, so
//! `MAX` wraps to `MIN`) and then emitted as little-endian 7-bit groups.
//! Every byte but the last carries the `0x80` continuation bit. The shift
//! is logical, so negative values always take the full width.
//!
//! | value      | i32 bytes                    |
//! |------------|------------------------------|
//! | -1         | `00`                         |
//! | 0          | `01`                         |
//! | 126        | `7F`                         |
//! | 127        | `80 01`                      |
//! | 300        | `AD 02`                      |
//! | `i32::MAX` | `80 80 80 80 08`             |
//! | `i32::MIN` | `81 80 80 80 08`             |
//!
//! The bias is part of the wire contract and must not change.

use crate::error::{DirectError, Result};
use crate::protocol::wire_format::{MAX_VARINT32_LEN, MAX_VARINT64_LEN};
use crate::protocol::Frame;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u64 = 0x7F;

#[inline]
fn encode_u64(mut v: u64, dst: &mut [u8]) -> usize {
    let mut i = 0;
    while v & !PAYLOAD != 0 {
        dst[i] = (v & PAYLOAD) as u8 | CONTINUATION;
        v >>= 7;
        i += 1;
    }
    dst[i] = v as u8;
    i + 1
}

/// Decode raw 7-bit groups. Underflow positions are relative to `src`.
#[inline]
fn decode_u64(src: &[u8], max_len: usize) -> Result<(u64, usize)> {
    let mut acc = 0u64;
    for (i, &b) in src.iter().enumerate().take(max_len) {
        acc |= (b as u64 & PAYLOAD) << (7 * i);
        if b & CONTINUATION == 0 {
            return Ok((acc, i + 1));
        }
    }
    if src.len() >= max_len {
        return Err(DirectError::MalformedVarint);
    }
    Err(DirectError::BufferUnderflow {
        position: 0,
        needed: src.len() + 1,
        limit: src.len(),
    })
}

/// Encode an `i32` into `dst`, returning the number of bytes written.
///
/// # Panics
///
/// Panics if `dst` is shorter than [`encoded_len_i32`] of the value.
#[inline]
pub fn encode_i32(v: i32, dst: &mut [u8]) -> usize {
    encode_u64(v.wrapping_add(1) as u32 as u64, dst)
}

/// Encode an `i64` into `dst`, returning the number of bytes written.
///
/// # Panics
///
/// Panics if `dst` is shorter than [`encoded_len_i64`] of the value.
#[inline]
pub fn encode_i64(v: i64, dst: &mut [u8]) -> usize {
    encode_u64(v.wrapping_add(1) as u64, dst)
}

/// Decode an `i32`, returning the value and the number of bytes consumed.
pub fn decode_i32(src: &[u8]) -> Result<(i32, usize)> {
    let (raw, n) = decode_u64(src, MAX_VARINT32_LEN)?;
    Ok(((raw as u32 as i32).wrapping_sub(1), n))
}

/// Decode an `i64`, returning the value and the number of bytes consumed.
pub fn decode_i64(src: &[u8]) -> Result<(i64, usize)> {
    let (raw, n) = decode_u64(src, MAX_VARINT64_LEN)?;
    Ok(((raw as i64).wrapping_sub(1), n))
}

/// Encoded size of an `i32`, 1 to 5 bytes.
#[inline]
pub fn encoded_len_i32(v: i32) -> usize {
    let bits = 32 - (v.wrapping_add(1) as u32).leading_zeros() as usize;
    (bits.max(1) + 6) / 7
}

/// Encoded size of an `i64`, 1 to 10 bytes.
#[inline]
pub fn encoded_len_i64(v: i64) -> usize {
    let bits = 64 - (v.wrapping_add(1) as u64).leading_zeros() as usize;
    (bits.max(1) + 6) / 7
}

/// Shift a slice-relative underflow to the frame's coordinates.
fn in_frame(err: DirectError, frame: &Frame) -> DirectError {
    match err {
        DirectError::BufferUnderflow { needed, .. } => DirectError::BufferUnderflow {
            position: frame.position(),
            needed,
            limit: frame.limit(),
        },
        other => other,
    }
}

/// Read an `i32` at the frame position and advance past it.
pub fn read_i32(frame: &mut Frame) -> Result<i32> {
    let (v, n) = decode_i32(frame.readable()).map_err(|e| in_frame(e, frame))?;
    frame.set_position(frame.position() + n);
    Ok(v)
}

/// Read an `i64` at the frame position and advance past it.
pub fn read_i64(frame: &mut Frame) -> Result<i64> {
    let (v, n) = decode_i64(frame.readable()).map_err(|e| in_frame(e, frame))?;
    frame.set_position(frame.position() + n);
    Ok(v)
}

/// Read one raw byte at the frame position.
pub fn read_u8(frame: &mut Frame) -> Result<u8> {
    let b = *frame
        .readable()
        .first()
        .ok_or(DirectError::BufferUnderflow {
            position: frame.position(),
            needed: 1,
            limit: frame.limit(),
        })?;
    frame.set_position(frame.position() + 1);
    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enc32(v: i32) -> Vec<u8> {
        let mut buf = [0u8; MAX_VARINT32_LEN];
        let n = encode_i32(v, &mut buf);
        buf[..n].to_vec()
    }

    fn enc64(v: i64) -> Vec<u8> {
        let mut buf = [0u8; MAX_VARINT64_LEN];
        let n = encode_i64(v, &mut buf);
        buf[..n].to_vec()
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(enc32(-1), vec![0x00]);
        assert_eq!(enc32(0), vec![0x01]);
        assert_eq!(enc32(126), vec![0x7F]);
        assert_eq!(enc32(127), vec![0x80, 0x01]);
        assert_eq!(enc32(300), vec![0xAD, 0x02]);
        assert_eq!(enc32(i32::MAX), vec![0x80, 0x80, 0x80, 0x80, 0x08]);
        assert_eq!(enc32(i32::MIN), vec![0x81, 0x80, 0x80, 0x80, 0x08]);
        assert_eq!(enc64(300), vec![0xAD, 0x02]);
    }

    #[test]
    fn test_negative_long_takes_full_width() {
        assert_eq!(enc64(-2).len(), MAX_VARINT64_LEN);
        assert_eq!(enc64(i64::MAX).len(), MAX_VARINT64_LEN);
        assert_eq!(enc64(i64::MIN).len(), MAX_VARINT64_LEN);
    }

    #[test]
    fn test_boundaries_round_trip() {
        for v in [i32::MIN, i32::MIN + 1, -2, -1, 0, 1, 2, i32::MAX - 1, i32::MAX] {
            let bytes = enc32(v);
            assert_eq!(bytes.len(), encoded_len_i32(v), "len for {v}");
            assert_eq!(decode_i32(&bytes).unwrap(), (v, bytes.len()));
        }
        for v in [i64::MIN, i64::MIN + 1, -2, -1, 0, 1, 2, i64::MAX - 1, i64::MAX] {
            let bytes = enc64(v);
            assert_eq!(bytes.len(), encoded_len_i64(v), "len for {v}");
            assert_eq!(decode_i64(&bytes).unwrap(), (v, bytes.len()));
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_i64(&[0xAD, 0x02, 0xFF]).unwrap(), (300, 2));
    }

    #[test]
    fn test_malformed_varint() {
        let bytes = [0xFF; 6];
        assert!(matches!(decode_i32(&bytes), Err(DirectError::MalformedVarint)));
        let bytes = [0xFF; 11];
        assert!(matches!(decode_i64(&bytes), Err(DirectError::MalformedVarint)));
    }

    #[test]
    fn test_truncated_varint() {
        let err = decode_i32(&[0x80, 0x80]).unwrap_err();
        assert!(matches!(
            err,
            DirectError::BufferUnderflow { needed: 3, limit: 2, .. }
        ));
        assert!(decode_i64(&[]).is_err());
    }

    #[test]
    fn test_frame_readers_advance() {
        let mut frame = Frame::from_vec(vec![0xAD, 0x02, 0x01, 0x07]);
        assert_eq!(read_i64(&mut frame).unwrap(), 300);
        assert_eq!(read_i32(&mut frame).unwrap(), 0);
        assert_eq!(read_u8(&mut frame).unwrap(), 0x07);
        assert_eq!(frame.remaining(), 0);

        let err = read_u8(&mut frame).unwrap_err();
        assert!(matches!(
            err,
            DirectError::BufferUnderflow { position: 4, needed: 1, limit: 4 }
        ));
    }

    #[test]
    fn test_frame_reader_respects_limit() {
        let mut frame = Frame::from_vec(vec![0x00, 0x80, 0x01]);
        frame.set_limit(2);
        assert_eq!(read_i32(&mut frame).unwrap(), -1);
        let err = read_i32(&mut frame).unwrap_err();
        assert!(matches!(
            err,
            DirectError::BufferUnderflow { position: 1, limit: 2, .. }
        ));
        assert_eq!(frame.position(), 1);
    }

    proptest! {
        #[test]
        fn prop_i32_round_trip(v in any::<i32>()) {
            let bytes = enc32(v);
            prop_assert_eq!(decode_i32(&bytes).unwrap(), (v, bytes.len()));
        }

        #[test]
        fn prop_i64_round_trip(v in any::<i64>()) {
            let bytes = enc64(v);
            prop_assert_eq!(bytes.len(), encoded_len_i64(v));
            prop_assert_eq!(decode_i64(&bytes).unwrap(), (v, bytes.len()));
        }
    }
}
