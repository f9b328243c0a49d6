//! Write session: encodes typed fields into a growable scratch buffer.
//!
//! The writer fills a scratch `Vec<u8>` starting at the frame's
//! position. The buffer grows to the next power of two whenever a write
//! does not fit. On [`close`](MessageWriter::close) the written prefix is
//! copied into the frame and the scratch buffer goes back to the cache.
//!
//! Integers written with `write_int`/`write_long` are biased varints.
//! Everything else of fixed width follows the configured byte order.

use std::io;

use serde::Serialize;
use uuid::Uuid;

use super::{CodecConfig, Message, NestingState};
use crate::codec::{BitSet, ExtendedUuid, MsgPackCodec};
use crate::error::{DirectError, Result};
use crate::protocol::buffer_pool::release_thread_buffer;
use crate::protocol::transcode::{self, Primitive};
use crate::protocol::{
    encode_length, grown_capacity, varint, BufferCache, Frame, LENGTH_PREFIX_SIZE,
    MAX_VARINT32_LEN, MAX_VARINT64_LEN, NULL_LENGTH, NULL_MESSAGE_TYPE,
};

/// UUID null flag values.
const UUID_NULL: u8 = 1;
const UUID_PRESENT: u8 = 0;

/// One encode pass over a [`Frame`].
///
/// Created by [`MessageHandler::for_write`](super::MessageHandler::for_write).
pub struct MessageWriter<'a> {
    frame: &'a mut Frame,
    /// Scratch buffer; `len()` is the usable capacity.
    heap: Vec<u8>,
    state: &'a mut NestingState,
    /// `None` when the thread-local cache is in use.
    cache: Option<&'a mut BufferCache>,
    config: &'a CodecConfig,
    swap: bool,
    /// Set once any write returned an error.
    failed: bool,
    closed: bool,
}

impl<'a> MessageWriter<'a> {
    pub(crate) fn new(
        frame: &'a mut Frame,
        heap: Vec<u8>,
        state: &'a mut NestingState,
        cache: Option<&'a mut BufferCache>,
        config: &'a CodecConfig,
    ) -> Self {
        Self {
            frame,
            heap,
            state,
            cache,
            swap: config.swap(),
            config,
            failed: false,
            closed: false,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.frame.position()
    }

    /// Current scratch buffer size.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.heap.len()
    }

    /// Whether a write in this session has returned an error.
    #[inline]
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Mark the session failed and pass the error through.
    pub(crate) fn fail(&mut self, err: DirectError) -> DirectError {
        if !self.failed {
            tracing::debug!(error = %err, position = self.frame.position(), "write session failed");
            self.failed = true;
        }
        err
    }

    /// Make room for `n` more bytes, returning the write offset.
    fn reserve(&mut self, n: usize) -> Result<usize> {
        let pos = self.frame.position();
        let Some(required) = pos.checked_add(n) else {
            return Err(self.fail(DirectError::CapacityOverflow { required: usize::MAX }));
        };
        if required > self.heap.len() {
            let grown = grown_capacity(required).map_err(|e| self.fail(e))?;
            tracing::trace!(from = self.heap.len(), to = grown, "growing scratch buffer");
            self.heap.resize(grown, 0);
        }
        Ok(pos)
    }

    /// Grow the scratch buffer so `n` more bytes fit without moving the cursor.
    pub(crate) fn reserve_ahead(&mut self, n: usize) -> Result<()> {
        self.reserve(n).map(|_| ())
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        let pos = self.frame.position();
        self.frame.set_position(pos + n);
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let pos = self.reserve(bytes.len())?;
        self.heap[pos..pos + bytes.len()].copy_from_slice(bytes);
        self.advance(bytes.len());
        Ok(())
    }

    fn put_fixed<T: Primitive>(&mut self, v: T) -> Result<()> {
        let pos = self.reserve(T::SIZE)?;
        transcode::write_fixed(&mut self.heap[pos..], v, self.swap);
        self.advance(T::SIZE);
        Ok(())
    }

    fn put_length(&mut self, len: usize) -> Result<()> {
        let len = encode_length(len).map_err(|e| self.fail(e))?;
        self.put_fixed(len)
    }

    pub(crate) fn put_null_length(&mut self) -> Result<()> {
        self.put_fixed(NULL_LENGTH)
    }

    fn put_array<T: Primitive>(&mut self, values: Option<&[T]>) -> Result<()> {
        let Some(values) = values else {
            return self.put_null_length();
        };
        let Some(byte_len) = values.len().checked_mul(T::SIZE) else {
            return Err(self.fail(DirectError::CapacityOverflow { required: usize::MAX }));
        };
        self.put_length(values.len())?;
        let pos = self.reserve(byte_len)?;
        transcode::encode_slice(values, &mut self.heap[pos..], self.swap);
        self.advance(byte_len);
        Ok(())
    }

    // Scalars

    /// Write one raw byte.
    pub fn write_byte(&mut self, v: u8) -> Result<()> {
        self.put_bytes(&[v])
    }

    /// Write a 2-byte short.
    pub fn write_short(&mut self, v: i16) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write an int as a biased varint (1 to 5 bytes).
    pub fn write_int(&mut self, v: i32) -> Result<()> {
        let pos = self.reserve(MAX_VARINT32_LEN)?;
        let n = varint::encode_i32(v, &mut self.heap[pos..]);
        self.advance(n);
        Ok(())
    }

    /// Write a long as a biased varint (1 to 10 bytes).
    pub fn write_long(&mut self, v: i64) -> Result<()> {
        let pos = self.reserve(MAX_VARINT64_LEN)?;
        let n = varint::encode_i64(v, &mut self.heap[pos..]);
        self.advance(n);
        Ok(())
    }

    /// Write an int as exactly 4 bytes.
    pub fn write_int_fixed(&mut self, v: i32) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write a long as exactly 8 bytes.
    pub fn write_long_fixed(&mut self, v: i64) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write the raw bits of a float.
    pub fn write_float(&mut self, v: f32) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write the raw bits of a double.
    pub fn write_double(&mut self, v: f64) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write a UTF-16 code unit.
    pub fn write_char(&mut self, v: u16) -> Result<()> {
        self.put_fixed(v)
    }

    /// Write a boolean as one byte.
    pub fn write_boolean(&mut self, v: bool) -> Result<()> {
        self.write_byte(v as u8)
    }

    // Arrays

    /// Write a byte array; `None` is written as length `-1`.
    pub fn write_byte_array(&mut self, values: Option<&[u8]>) -> Result<()> {
        let Some(values) = values else {
            return self.put_null_length();
        };
        self.put_length(values.len())?;
        self.put_bytes(values)
    }

    /// Write `len` bytes of `values` starting at `offset`.
    pub fn write_byte_array_range(&mut self, values: &[u8], offset: usize, len: usize) -> Result<()> {
        let range = offset.checked_add(len).and_then(|end| values.get(offset..end));
        let Some(range) = range else {
            return Err(self.fail(DirectError::InvalidLength {
                kind: "byte array range",
                len: len as i64,
            }));
        };
        self.write_byte_array(Some(range))
    }

    /// Write a short array.
    pub fn write_short_array(&mut self, values: Option<&[i16]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write an int array (fixed width elements).
    pub fn write_int_array(&mut self, values: Option<&[i32]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write a long array (fixed width elements).
    pub fn write_long_array(&mut self, values: Option<&[i64]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write a float array.
    pub fn write_float_array(&mut self, values: Option<&[f32]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write a double array.
    pub fn write_double_array(&mut self, values: Option<&[f64]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write a char array.
    pub fn write_char_array(&mut self, values: Option<&[u16]>) -> Result<()> {
        self.put_array(values)
    }

    /// Write a boolean array, one byte per element.
    pub fn write_boolean_array(&mut self, values: Option<&[bool]>) -> Result<()> {
        let Some(values) = values else {
            return self.put_null_length();
        };
        self.put_length(values.len())?;
        let pos = self.reserve(values.len())?;
        let n = transcode::encode_bools(values, &mut self.heap[pos..]);
        self.advance(n);
        Ok(())
    }

    // Composite values

    /// Write a string as the byte array of its UTF-8 encoding.
    pub fn write_string(&mut self, v: Option<&str>) -> Result<()> {
        self.write_byte_array(v.map(str::as_bytes))
    }

    /// Write a bit set as its long words.
    pub fn write_bit_set(&mut self, v: Option<&BitSet>) -> Result<()> {
        self.put_array(v.map(BitSet::words))
    }

    /// Write a UUID: null flag, then most and least significant halves as varints.
    pub fn write_uuid(&mut self, v: Option<&Uuid>) -> Result<()> {
        let Some(v) = v else {
            return self.write_byte(UUID_NULL);
        };
        let (most, least) = v.as_u64_pair();
        self.write_byte(UUID_PRESENT)?;
        self.write_long(most as i64)?;
        self.write_long(least as i64)
    }

    /// Write an extended UUID: null flag, both UUID halves and the local id.
    pub fn write_extended_uuid(&mut self, v: Option<&ExtendedUuid>) -> Result<()> {
        let Some(v) = v else {
            return self.write_byte(UUID_NULL);
        };
        let (most, least) = v.global_id.as_u64_pair();
        self.write_byte(UUID_PRESENT)?;
        self.write_long(most as i64)?;
        self.write_long(least as i64)?;
        self.write_long(v.local_id)
    }

    /// Write a message type header.
    pub fn write_header(&mut self, direct_type: i16) -> Result<()> {
        self.write_short(direct_type)
    }

    /// Write a nested message one level down.
    ///
    /// `None` writes the absent-message marker. Returns `false` if the
    /// message suspended; its level keeps the progress for the next call.
    pub fn write_message(&mut self, msg: Option<&dyn Message>) -> Result<bool> {
        let Some(msg) = msg else {
            self.write_short(NULL_MESSAGE_TYPE)?;
            return Ok(true);
        };
        self.state.forward();
        let result = msg.write_to(self);
        self.state.backward(matches!(result, Ok(true)));
        result.map_err(|e| self.fail(e))
    }

    /// Write the top-level message.
    ///
    /// Level 0 is cleared once the message finishes; a suspended root keeps
    /// its progress so the next session on this handler resumes it.
    pub fn write_root(&mut self, msg: &dyn Message) -> Result<bool> {
        let finished = msg.write_to(self).map_err(|e| self.fail(e))?;
        if finished {
            self.state.reset();
        }
        Ok(finished)
    }

    /// Write `value` as a size-prefixed MessagePack blob.
    pub fn write_object<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let start = self.reserve(LENGTH_PREFIX_SIZE)?;
        self.advance(LENGTH_PREFIX_SIZE);
        MsgPackCodec::encode_into(self, value).map_err(|e| self.fail(e))?;
        let size = encode_length(self.frame.position() - start - LENGTH_PREFIX_SIZE)
            .map_err(|e| self.fail(e))?;
        transcode::write_fixed(&mut self.heap[start..], size, self.swap);
        Ok(())
    }

    // Nesting state of the current level

    /// Field cursor of the message being written.
    #[inline]
    pub fn state(&self) -> u32 {
        self.state.state()
    }

    /// Advance the field cursor.
    #[inline]
    pub fn increment_state(&mut self) {
        self.state.increment_state();
    }

    /// Whether the current message's header is already out.
    #[inline]
    pub fn is_header_written(&self) -> bool {
        self.state.is_header_written()
    }

    /// Record that the current message's header is out.
    #[inline]
    pub fn on_header_written(&mut self) {
        self.state.on_header_written();
    }

    /// Current nesting depth, 0 for the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.state.depth()
    }

    /// Finish the session: the frame receives the written bytes and becomes
    /// readable. Returns the number of bytes written.
    ///
    /// If a write failed, nothing is handed to the frame: the session ends
    /// as if dropped (frame left unfinalized, nesting state cleared) and 0
    /// is returned.
    pub fn close(mut self) -> usize {
        if self.failed {
            return 0;
        }
        let len = self.frame.position();
        let heap = std::mem::take(&mut self.heap);
        self.frame.finish(heap[..len].to_vec());
        self.release(heap);
        self.closed = true;
        len
    }

    fn release(&mut self, heap: Vec<u8>) {
        match self.cache.as_deref_mut() {
            Some(cache) => cache.release(heap),
            None => release_thread_buffer(heap, self.config.max_cached_buffer),
        }
    }
}

impl io::Write for MessageWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.put_bytes(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MessageWriter<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let heap = std::mem::take(&mut self.heap);
        self.release(heap);
        self.state.clear();
    }
}

impl std::fmt::Debug for MessageWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageWriter")
            .field("position", &self.frame.position())
            .field("capacity", &self.heap.len())
            .field("depth", &self.state.depth())
            .field("swap", &self.swap)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::{ItemType, Value};
    use crate::handler::testing::registry;
    use crate::handler::{LevelState, MessageHandler};
    use crate::protocol::ByteOrder;

    fn encode(order: ByteOrder, f: impl FnOnce(&mut MessageWriter<'_>) -> Result<()>) -> Vec<u8> {
        let config = CodecConfig {
            byte_order: order,
            initial_buffer_size: 8,
            ..Default::default()
        };
        let mut handler = MessageHandler::with_config(Arc::new(registry()), config);
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        f(&mut writer).unwrap();
        writer.close();
        frame.into_vec()
    }

    #[test]
    fn test_varint_scalars() {
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_int(-1)?;
            w.write_long(300)?;
            w.write_int(i32::MAX)
        });
        assert_eq!(bytes, vec![0x00, 0xAD, 0x02, 0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn test_fixed_scalars_follow_byte_order() {
        let little = encode(ByteOrder::Little, |w| {
            w.write_short(0x0102)?;
            w.write_int_fixed(0x0304_0506)?;
            w.write_char(0x0708)
        });
        assert_eq!(little, vec![0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x08, 0x07]);

        let big = encode(ByteOrder::Big, |w| {
            w.write_short(0x0102)?;
            w.write_int_fixed(0x0304_0506)?;
            w.write_char(0x0708)
        });
        assert_eq!(big, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn test_boolean_and_byte() {
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_boolean(true)?;
            w.write_boolean(false)?;
            w.write_byte(0xFE)
        });
        assert_eq!(bytes, vec![1, 0, 0xFE]);
    }

    #[test]
    fn test_null_and_empty_arrays() {
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_int_array(None)?;
            w.write_int_array(Some(&[]))
        });
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_array_layout() {
        let bytes = encode(ByteOrder::Big, |w| w.write_short_array(Some(&[1, -2])));
        assert_eq!(bytes, vec![0, 0, 0, 2, 0x00, 0x01, 0xFF, 0xFE]);
    }

    #[test]
    fn test_close_after_error_leaves_frame_unfinalized() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        writer.write_header(1).unwrap();
        writer.on_header_written();
        writer.increment_state();
        assert!(!writer.has_failed());

        assert!(writer.write_byte_array_range(b"abc", 2, 5).is_err());
        assert!(writer.has_failed());
        assert_eq!(writer.close(), 0);

        assert!(!frame.is_finalized());
        assert_eq!(handler.state().level(0), Some(&LevelState::default()));
        assert!(handler.for_read(&mut frame).is_err());
    }

    #[test]
    fn test_close_after_type_mismatch_discards_output() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::from_vec(vec![9, 9]);
        let mut writer = handler.for_write(&mut frame);
        writer.write_int(7).unwrap();
        let err = writer.write_item(ItemType::Int, &Value::Null).unwrap_err();
        assert!(matches!(err, DirectError::TypeMismatch { .. }));
        assert_eq!(writer.close(), 0);
        assert!(!frame.is_finalized());

        // The next session on the same handler starts clean.
        let mut writer = handler.for_write(&mut frame);
        writer.write_int(7).unwrap();
        assert_eq!(writer.close(), 1);
        assert_eq!(frame.data(), &[0x08]);
    }

    #[test]
    fn test_byte_array_range() {
        let bytes = encode(ByteOrder::Little, |w| w.write_byte_array_range(b"abcdef", 1, 3));
        assert_eq!(bytes, vec![3, 0, 0, 0, b'b', b'c', b'd']);
    }

    #[test]
    fn test_byte_array_range_out_of_bounds() {
        let mut handler = MessageHandler::new(Arc::new(registry()));
        let mut frame = Frame::new();
        let mut writer = handler.for_write(&mut frame);
        let err = writer.write_byte_array_range(b"abc", 2, 5).unwrap_err();
        assert!(matches!(err, DirectError::InvalidLength { kind: "byte array range", .. }));
        assert!(writer.write_byte_array_range(b"abc", usize::MAX, 2).is_err());
    }

    #[test]
    fn test_uuid_layout() {
        let id = Uuid::from_u64_pair(1, 2);
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_uuid(None)?;
            w.write_uuid(Some(&id))
        });
        // null flag, then present flag + varint(1) + varint(2)
        assert_eq!(bytes, vec![1, 0, 0x02, 0x03]);
    }

    #[test]
    fn test_extended_uuid_layout() {
        let id = ExtendedUuid::new(Uuid::from_u64_pair(0, 0), 10);
        let bytes = encode(ByteOrder::Little, |w| w.write_extended_uuid(Some(&id)));
        assert_eq!(bytes, vec![0, 0x01, 0x01, 0x0B]);
    }

    #[test]
    fn test_string_is_utf8_byte_array() {
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_string(Some("hé"))?;
            w.write_string(None)
        });
        assert_eq!(bytes, vec![3, 0, 0, 0, b'h', 0xC3, 0xA9, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bit_set_as_words() {
        let mut bits = BitSet::new();
        bits.set(0);
        bits.set(65);
        let bytes = encode(ByteOrder::Little, |w| w.write_bit_set(Some(&bits)));
        assert_eq!(bytes.len(), 4 + 16);
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[12], 2);
    }

    #[test]
    fn test_growth_keeps_earlier_bytes() {
        let payload: Vec<i64> = (0..100).collect();
        let bytes = encode(ByteOrder::Little, |w| {
            w.write_byte(0xAA)?;
            w.write_long_array(Some(&payload))
        });
        assert_eq!(bytes.len(), 1 + 4 + 800);
        assert_eq!(bytes[0], 0xAA);
        assert_eq!(&bytes[5..13], &0i64.to_le_bytes());
        assert_eq!(&bytes[797..805], &99i64.to_le_bytes());
    }

    #[test]
    fn test_null_message_marker() {
        let bytes = encode(ByteOrder::Little, |w| {
            assert!(w.write_message(None)?);
            Ok(())
        });
        assert_eq!(bytes, vec![0x00, 0x80]);
    }

    #[test]
    fn test_object_size_back_patched() {
        let bytes = encode(ByteOrder::Little, |w| w.write_object(&vec![1u8, 2, 3]));
        let size = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(size, bytes.len() - 4);
        assert_eq!(&bytes[4..], &rmp_serde::to_vec_named(&vec![1u8, 2, 3]).unwrap()[..]);
    }
}
