//! Error types for directwire.

use thiserror::Error;

/// Main error type for all encode/decode operations.
///
/// Every variant is fatal to the current pass over a frame: no partial
/// result is handed back to the caller.
#[derive(Debug, Error)]
pub enum DirectError {
    /// Negative length other than the `-1` null marker, or a length that
    /// cannot possibly fit in the frame.
    #[error("Read invalid {kind} length: {len}")]
    InvalidLength {
        /// What was being read (`"int array"`, `"collection"`, ...).
        kind: &'static str,
        /// The length found on the wire.
        len: i64,
    },

    /// Item type tag outside the known set.
    #[error("Unsupported item type tag: {0}")]
    UnsupportedType(u8),

    /// Value variant does not match the declared item type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared item type.
        expected: &'static str,
        /// Variant actually supplied.
        found: &'static str,
    },

    /// The message factory does not know this direct type.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(i16),

    /// Scratch buffer would have to grow past `MAX_BUFFER_SIZE`.
    #[error("Buffer capacity overflow: {required} bytes required")]
    CapacityOverflow {
        /// Total number of bytes the write needed.
        required: usize,
    },

    /// Read past the current frame limit.
    #[error("Buffer underflow: need {needed} bytes at position {position}, limit is {limit}")]
    BufferUnderflow {
        /// Read position.
        position: usize,
        /// Bytes requested.
        needed: usize,
        /// Frame limit.
        limit: usize,
    },

    /// Varint with more continuation bytes than the integer width allows.
    #[error("Malformed varint: too many continuation bytes")]
    MalformedVarint,

    /// String payload is not valid UTF-8.
    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A read session was opened on a frame that was never finalized.
    #[error("Frame is not finalized")]
    FrameNotFinalized,

    /// A read session was requested while a suspended write still holds
    /// nesting progress on the same handler.
    #[error("Write suspended at depth {depth}, finish or reset it before reading")]
    WriteSuspended {
        /// Depth of the deepest level holding progress.
        depth: usize,
    },

    /// A nested message suspended while being written as a collection item.
    #[error("Message of type {0} suspended inside a collection")]
    SuspendedInCollection(i16),

    /// Invalid message registration.
    #[error("Registration error: {0}")]
    Registration(String),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// MsgPack encoding error (opaque objects).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack decoding error (opaque objects).
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// Result type alias using DirectError.
pub type Result<T> = std::result::Result<T, DirectError>;
