//! Protocol module - wire format, primitive codecs and the frame cursor.
//!
//! This module implements the byte-level layer under the message codec:
//! - [`Frame`] cursor over the bytes being read or written
//! - biased varints ([`varint`])
//! - fixed-width primitives and primitive slices ([`transcode`])
//! - scratch buffer reuse ([`buffer_pool`])

pub mod buffer_pool;
mod frame;
pub mod transcode;
pub mod varint;
mod wire_format;

pub use buffer_pool::{BufferCache, CacheScope};
pub use frame::Frame;
pub use transcode::Primitive;
pub use wire_format::{
    decode_length, encode_length, grown_capacity, ByteOrder, DEFAULT_BUFFER_SIZE,
    DEFAULT_MAX_CACHED_BUFFER, DEFAULT_STATE_DEPTH, DIRECT_TYPE_SIZE, LENGTH_PREFIX_SIZE,
    MAX_BUFFER_SIZE, MAX_VARINT32_LEN, MAX_VARINT64_LEN, NULL_LENGTH, NULL_MESSAGE_TYPE,
};
