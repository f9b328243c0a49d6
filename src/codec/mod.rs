//! Codec module - typed items and opaque payloads.
//!
//! - [`ItemType`] / [`Value`] - dynamically typed elements of collections and maps
//! - [`BitSet`], [`ExtendedUuid`], [`DirectMap`] - composite item values
//! - [`MsgPackCodec`] - MessagePack for objects that are not messages
//!
//! # Example
//!
//! ```
//! use directwire::codec::{ItemType, Value};
//!
//! let ty = ItemType::try_from(16).unwrap();
//! assert_eq!(ty, ItemType::String);
//! assert_eq!(Value::from("hi").item_type(), Some(ty));
//! ```

mod msgpack;
mod value;

pub use msgpack::MsgPackCodec;
pub use value::{BitSet, DirectMap, DirectMapIter, ExtendedUuid, ItemType, Value};
