//! MsgPack codec for opaque object payloads, using `rmp-serde`.
//!
//! Objects that are not [`Message`](crate::handler::Message)s travel as
//! size-prefixed MessagePack blobs (see
//! [`MessageWriter::write_object`](crate::handler::MessageWriter::write_object)).
//! Structs are always encoded with named fields (`to_vec_named` /
//! `write_named`) so that adding a field never shifts the others.
//!
//! # Example
//!
//! ```
//! use directwire::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Lease {
//!     owner: u32,
//!     key: String,
//! }
//!
//! let lease = Lease { owner: 42, key: "cache-1".to_string() };
//! let encoded = MsgPackCodec::encode(&lease).unwrap();
//! let decoded: Lease = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, lease);
//! ```

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Stream a value as MsgPack into `out`.
    #[inline]
    pub fn encode_into<W: Write + ?Sized, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
        Ok(rmp_serde::encode::write_named(out, value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Decode one value from a reader.
    #[inline]
    pub fn decode_from<R: Read, T: DeserializeOwned>(input: R) -> Result<T> {
        Ok(rmp_serde::from_read(input)?)
    }
}
