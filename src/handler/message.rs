//! The contract every encodable message implements.
//!
//! Messages own their field layout. `write_to` and `read_from` call the
//! typed primitives of the session in a fixed order, using the per-level
//! cursor to resume after a suspended write:
//!
//! ```
//! use std::any::Any;
//! use directwire::handler::{Message, MessageReader, MessageWriter, message_eq};
//! use directwire::Result;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Ping {
//!     id: i64,
//! }
//!
//! impl Message for Ping {
//!     fn direct_type(&self) -> i16 {
//!         1
//!     }
//!
//!     fn write_to(&self, writer: &mut MessageWriter<'_>) -> Result<bool> {
//!         if !writer.is_header_written() {
//!             writer.write_header(self.direct_type())?;
//!             writer.on_header_written();
//!         }
//!         if writer.state() == 0 {
//!             writer.write_long(self.id)?;
//!             writer.increment_state();
//!         }
//!         Ok(true)
//!     }
//!
//!     fn read_from(&mut self, reader: &mut MessageReader<'_>) -> Result<()> {
//!         self.id = reader.read_long()?;
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//!
//!     fn eq_message(&self, other: &dyn Message) -> bool {
//!         message_eq(self, other)
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt::Debug;

use super::{MessageReader, MessageWriter};
use crate::error::Result;

/// A message that encodes its own fields.
pub trait Message: Any + Debug + Send {
    /// Type code written in the 2-byte header. Never `i16::MIN`.
    fn direct_type(&self) -> i16;

    /// Write the fields, including the header.
    ///
    /// Returns `false` to suspend; the next call on a writer bound to the
    /// same handler resumes from the saved cursor.
    fn write_to(&self, writer: &mut MessageWriter<'_>) -> Result<bool>;

    /// Read the fields that follow the header.
    fn read_from(&mut self, reader: &mut MessageReader<'_>) -> Result<()>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another message.
    fn eq_message(&self, other: &dyn Message) -> bool;
}

/// [`Message::eq_message`] for types that implement `PartialEq`.
pub fn message_eq<M: Message + PartialEq>(this: &M, other: &dyn Message) -> bool {
    other
        .as_any()
        .downcast_ref::<M>()
        .is_some_and(|other| this == other)
}

impl dyn Message {
    /// Downcast to a concrete message type.
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}

impl PartialEq for dyn Message {
    fn eq(&self, other: &Self) -> bool {
        self.eq_message(other)
    }
}

/// Creates empty messages by type code while reading.
pub trait MessageFactory: Send + Sync {
    /// A fresh message for `direct_type`, or `None` if the type is unknown.
    fn create(&self, direct_type: i16) -> Option<Box<dyn Message>>;
}

impl<F> MessageFactory for F
where
    F: Fn(i16) -> Option<Box<dyn Message>> + Send + Sync,
{
    fn create(&self, direct_type: i16) -> Option<Box<dyn Message>> {
        self(direct_type)
    }
}
