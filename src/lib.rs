//! # directwire
//!
//! Compact binary message codec.
//!
//! Structured messages (primitive fields, primitive arrays, strings, UUIDs,
//! bit sets, collections, maps and nested sub-messages) are encoded into a
//! single growable buffer and decoded back. There is no schema: each
//! [`Message`] writes and reads its own fields in its own order.
//!
//! ## Wire format
//!
//! - `int`/`long` fields: biased varints, 1 to 5 / 1 to 10 bytes
//! - other fixed-width values: raw bytes in the configured [`ByteOrder`]
//!   (little endian by default)
//! - arrays, strings, collections: 4-byte length, `-1` for absent
//! - nested messages: 2-byte type header, `i16::MIN` for absent
//!
//! ## Resumable writes
//!
//! A message may stop part way (return `false` from `write_to`). Its
//! progress is kept per nesting level in the [`MessageHandler`], and the
//! next write session resumes from the same field.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use directwire::{Frame, MessageHandler, MessageRegistry};
//!
//! let mut registry = MessageRegistry::new();
//! registry.register::<Ping>(1)?;
//! let mut handler = MessageHandler::new(Arc::new(registry));
//!
//! let mut frame = Frame::new();
//! let mut writer = handler.for_write(&mut frame);
//! writer.write_root(&Ping { id: 7 })?;
//! writer.close();
//!
//! let bytes = frame.freeze();
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;

pub use codec::{ItemType, Value};
pub use error::{DirectError, Result};
pub use handler::{
    CodecConfig, Message, MessageFactory, MessageHandler, MessageReader, MessageRegistry,
    MessageWriter,
};
pub use protocol::{ByteOrder, Frame};
