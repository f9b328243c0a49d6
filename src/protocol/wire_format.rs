//! Wire format constants and byte order.
//!
//! Field layout is owned by the messages themselves; this module only pins
//! the markers and sizes every message shares:
//! ```text
//! ┌──────────────┬────────────────────────────┐
//! │ array length │ elements                   │
//! │ 4 bytes i32  │ len × size_of(T), wire order│
//! └──────────────┴────────────────────────────┘
//! ┌──────────────┬────────────────────────────┐
//! │ direct type  │ field stream               │
//! │ 2 bytes i16  │ caller-defined             │
//! └──────────────┴────────────────────────────┘
//! ```
//!
//! Length `-1` marks an absent array/collection, direct type `i16::MIN`
//! marks an absent message.

use serde::{Deserialize, Serialize};

use crate::error::{DirectError, Result};

/// Length prefix marking an absent array, string or collection.
pub const NULL_LENGTH: i32 = -1;

/// Direct type marking an absent nested message.
pub const NULL_MESSAGE_TYPE: i16 = i16::MIN;

/// Size of the message type header in bytes.
pub const DIRECT_TYPE_SIZE: usize = 2;

/// Size of an exact length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum encoded size of a 32-bit varint.
pub const MAX_VARINT32_LEN: usize = 5;

/// Maximum encoded size of a 64-bit varint.
pub const MAX_VARINT64_LEN: usize = 10;

/// Default scratch buffer size for a fresh write session (4 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default number of nesting levels allocated up front.
pub const DEFAULT_STATE_DEPTH: usize = 16;

/// Default upper bound on a scratch buffer kept for reuse (16 MB).
pub const DEFAULT_MAX_CACHED_BUFFER: usize = 16 * 1024 * 1024;

/// Hard upper bound on the scratch buffer (max i32, positions are 32-bit on the wire).
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

/// Byte order of multi-byte fixed-width values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Little endian (the default wire order).
    #[default]
    Little,
    /// Big endian.
    Big,
}

impl ByteOrder {
    /// Byte order of the running platform.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Whether values must be byte-reversed between memory and wire.
    #[inline]
    pub fn needs_swap(self) -> bool {
        self != Self::native()
    }
}

/// Capacity the scratch buffer grows to so that `required` bytes fit.
///
/// Rounds up to the next power of two, capped at [`MAX_BUFFER_SIZE`].
pub fn grown_capacity(required: usize) -> Result<usize> {
    if required > MAX_BUFFER_SIZE {
        return Err(DirectError::CapacityOverflow { required });
    }
    Ok(required.next_power_of_two().min(MAX_BUFFER_SIZE))
}

/// Convert a wire length prefix into an element count.
///
/// `Ok(None)` for [`NULL_LENGTH`], an error for any other negative value.
pub fn decode_length(kind: &'static str, len: i32) -> Result<Option<usize>> {
    match len {
        NULL_LENGTH => Ok(None),
        l if l < 0 => Err(DirectError::InvalidLength {
            kind,
            len: l as i64,
        }),
        l => Ok(Some(l as usize)),
    }
}

/// Convert an element count into a wire length prefix.
pub fn encode_length(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| DirectError::CapacityOverflow { required: len })
}
