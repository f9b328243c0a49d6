//! Read session: decodes typed fields from a finalized frame.
//!
//! Reads never look past the frame's limit. Lengths taken from the wire
//! are checked against the readable remainder and the configured maximum
//! before anything is allocated, so a corrupt or hostile length fails fast.

use std::io;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{CodecConfig, Message, MessageFactory, NestingState};
use crate::codec::{BitSet, ExtendedUuid, MsgPackCodec};
use crate::error::{DirectError, Result};
use crate::protocol::transcode::{self, Primitive};
use crate::protocol::{decode_length, varint, Frame, NULL_MESSAGE_TYPE};

/// One decode pass over a [`Frame`].
///
/// Created by [`MessageHandler::for_read`](super::MessageHandler::for_read).
pub struct MessageReader<'a> {
    frame: &'a mut Frame,
    state: &'a mut NestingState,
    factory: &'a dyn MessageFactory,
    config: &'a CodecConfig,
    swap: bool,
    closed: bool,
}

impl<'a> MessageReader<'a> {
    pub(crate) fn new(
        frame: &'a mut Frame,
        state: &'a mut NestingState,
        factory: &'a dyn MessageFactory,
        config: &'a CodecConfig,
    ) -> Self {
        Self {
            frame,
            state,
            factory,
            swap: config.swap(),
            config,
            closed: false,
        }
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.frame.position()
    }

    /// Bytes left before the limit.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.frame.remaining()
    }

    /// Current nesting depth, 0 for the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.state.depth()
    }

    fn underflow(&self, needed: usize) -> DirectError {
        DirectError::BufferUnderflow {
            position: self.frame.position(),
            needed,
            limit: self.frame.limit(),
        }
    }

    /// Consume `n` bytes.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.frame.readable().len() < n {
            return Err(self.underflow(n));
        }
        let pos = self.frame.position();
        self.frame.set_position(pos + n);
        Ok(&self.frame.data()[pos..pos + n])
    }

    fn take_fixed<T: Primitive>(&mut self) -> Result<T> {
        let swap = self.swap;
        let bytes = self.take(T::SIZE)?;
        Ok(transcode::read_fixed(bytes, swap))
    }

    /// Read a 4-byte length and check that `elem_size * len` bytes can follow.
    pub(crate) fn take_length(&mut self, kind: &'static str, elem_size: usize) -> Result<Option<usize>> {
        let raw: i32 = self.take_fixed()?;
        let len = decode_length(kind, raw).map_err(|e| {
            tracing::warn!(kind, len = raw, "corrupt length on the wire");
            e
        })?;
        let Some(len) = len else {
            return Ok(None);
        };
        if len > self.config.max_length {
            tracing::warn!(kind, len, max = self.config.max_length, "length above configured maximum");
            return Err(DirectError::InvalidLength {
                kind,
                len: len as i64,
            });
        }
        let needed = len.saturating_mul(elem_size);
        if needed > self.frame.remaining() {
            tracing::warn!(kind, len, remaining = self.frame.remaining(), "length beyond frame");
            return Err(self.underflow(needed));
        }
        Ok(Some(len))
    }

    fn take_array<T: Primitive>(&mut self) -> Result<Option<Vec<T>>> {
        let Some(len) = self.take_length(T::NAME, T::SIZE)? else {
            return Ok(None);
        };
        let swap = self.swap;
        let bytes = self.take(len * T::SIZE)?;
        Ok(Some(transcode::decode_slice(bytes, len, swap)))
    }

    // Scalars

    /// Read one raw byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        varint::read_u8(self.frame)
    }

    /// Read a 2-byte short.
    pub fn read_short(&mut self) -> Result<i16> {
        self.take_fixed()
    }

    /// Read a biased varint int.
    pub fn read_int(&mut self) -> Result<i32> {
        varint::read_i32(self.frame)
    }

    /// Read a biased varint long.
    pub fn read_long(&mut self) -> Result<i64> {
        varint::read_i64(self.frame)
    }

    /// Read a 4-byte int.
    pub fn read_int_fixed(&mut self) -> Result<i32> {
        self.take_fixed()
    }

    /// Read an 8-byte long.
    pub fn read_long_fixed(&mut self) -> Result<i64> {
        self.take_fixed()
    }

    /// Read a float from its raw bits.
    pub fn read_float(&mut self) -> Result<f32> {
        self.take_fixed()
    }

    /// Read a double from its raw bits.
    pub fn read_double(&mut self) -> Result<f64> {
        self.take_fixed()
    }

    /// Read a UTF-16 code unit.
    pub fn read_char(&mut self) -> Result<u16> {
        self.take_fixed()
    }

    /// Read a boolean; any non-zero byte is `true`.
    pub fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    // Arrays

    /// Read a byte array; length `-1` gives `None`.
    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.take_length("byte array", 1)? else {
            return Ok(None);
        };
        Ok(Some(self.take(len)?.to_vec()))
    }

    /// Read a short array.
    pub fn read_short_array(&mut self) -> Result<Option<Vec<i16>>> {
        self.take_array()
    }

    /// Read an int array.
    pub fn read_int_array(&mut self) -> Result<Option<Vec<i32>>> {
        self.take_array()
    }

    /// Read a long array.
    pub fn read_long_array(&mut self) -> Result<Option<Vec<i64>>> {
        self.take_array()
    }

    /// Read a float array.
    pub fn read_float_array(&mut self) -> Result<Option<Vec<f32>>> {
        self.take_array()
    }

    /// Read a double array.
    pub fn read_double_array(&mut self) -> Result<Option<Vec<f64>>> {
        self.take_array()
    }

    /// Read a char array.
    pub fn read_char_array(&mut self) -> Result<Option<Vec<u16>>> {
        self.take_array()
    }

    /// Read a boolean array.
    pub fn read_boolean_array(&mut self) -> Result<Option<Vec<bool>>> {
        let Some(len) = self.take_length("boolean array", 1)? else {
            return Ok(None);
        };
        let bytes = self.take(len)?;
        Ok(Some(transcode::decode_bools(bytes, len)))
    }

    // Composite values

    /// Read a UTF-8 string.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let Some(len) = self.take_length("string", 1)? else {
            return Ok(None);
        };
        let bytes = self.take(len)?.to_vec();
        Ok(Some(String::from_utf8(bytes)?))
    }

    /// Read a bit set from its long words.
    pub fn read_bit_set(&mut self) -> Result<Option<BitSet>> {
        Ok(self.take_array::<u64>()?.map(BitSet::from_words))
    }

    /// Read a UUID.
    pub fn read_uuid(&mut self) -> Result<Option<Uuid>> {
        if self.read_boolean()? {
            return Ok(None);
        }
        let most = self.read_long()? as u64;
        let least = self.read_long()? as u64;
        Ok(Some(Uuid::from_u64_pair(most, least)))
    }

    /// Read an extended UUID.
    pub fn read_extended_uuid(&mut self) -> Result<Option<ExtendedUuid>> {
        if self.read_boolean()? {
            return Ok(None);
        }
        let most = self.read_long()? as u64;
        let least = self.read_long()? as u64;
        let local_id = self.read_long()?;
        Ok(Some(ExtendedUuid::new(Uuid::from_u64_pair(most, least), local_id)))
    }

    /// Read a type header and create the matching empty message.
    fn create_message(&mut self) -> Result<Option<Box<dyn Message>>> {
        let direct_type = self.read_short()?;
        if direct_type == NULL_MESSAGE_TYPE {
            return Ok(None);
        }
        match self.factory.create(direct_type) {
            Some(msg) => Ok(Some(msg)),
            None => {
                tracing::warn!(direct_type, position = self.frame.position(), "unknown message type");
                Err(DirectError::UnknownMessageType(direct_type))
            }
        }
    }

    /// Read a nested message one level down.
    pub fn read_message(&mut self) -> Result<Option<Box<dyn Message>>> {
        let Some(mut msg) = self.create_message()? else {
            return Ok(None);
        };
        self.state.forward();
        let result = msg.read_from(self);
        self.state.backward(result.is_ok());
        result?;
        Ok(Some(msg))
    }

    /// Read the top-level message.
    pub fn read_root(&mut self) -> Result<Option<Box<dyn Message>>> {
        let Some(mut msg) = self.create_message()? else {
            return Ok(None);
        };
        msg.read_from(self)?;
        self.state.reset();
        Ok(Some(msg))
    }

    /// Read a size-prefixed MessagePack blob.
    ///
    /// The frame limit is narrowed to the blob while decoding, so a
    /// malformed payload cannot consume the fields after it.
    pub fn read_object<T: DeserializeOwned>(&mut self) -> Result<T> {
        let Some(size) = self.take_length("object", 1)? else {
            return Err(DirectError::InvalidLength { kind: "object", len: -1 });
        };
        let end = self.frame.position() + size;
        let saved_limit = self.frame.limit();
        self.frame.set_limit(end);
        let result = MsgPackCodec::decode_from(&mut *self);
        self.frame.set_limit(saved_limit);
        self.frame.set_position(end);
        result
    }

    /// Finish the session.
    pub fn close(mut self) {
        self.closed = true;
    }
}

impl io::Read for MessageReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let src = self.frame.readable();
        let n = buf.len().min(src.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.frame.set_position(self.frame.position() + n);
        Ok(n)
    }
}

impl Drop for MessageReader<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.state.clear();
        }
    }
}

impl std::fmt::Debug for MessageReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReader")
            .field("position", &self.frame.position())
            .field("limit", &self.frame.limit())
            .field("depth", &self.state.depth())
            .field("swap", &self.swap)
            .finish_non_exhaustive()
    }
}
