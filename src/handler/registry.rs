//! Message registry for creating messages by direct type.
//!
//! The registry maps 2-byte type codes to constructors and serves as the
//! [`MessageFactory`] a [`MessageHandler`](super::MessageHandler) uses while
//! reading. `i16::MIN` is reserved for the absent-message marker.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use directwire::handler::{MessageHandler, MessageRegistry};
//!
//! let mut registry = MessageRegistry::new();
//! registry.register::<Ping>(1)?;
//! registry.register::<Pong>(2)?;
//!
//! let handler = MessageHandler::new(Arc::new(registry));
//! ```

use std::collections::HashMap;

use super::{Message, MessageFactory};
use crate::error::{DirectError, Result};
use crate::protocol::NULL_MESSAGE_TYPE;

/// Constructor of an empty message.
pub type Constructor = fn() -> Box<dyn Message>;

fn construct<M: Message + Default>() -> Box<dyn Message> {
    Box::new(M::default())
}

/// Registry mapping direct types to constructors.
#[derive(Debug, Default, Clone)]
pub struct MessageRegistry {
    constructors: HashMap<i16, Constructor>,
}

impl MessageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` under `direct_type`, created with `M::default()`.
    pub fn register<M: Message + Default>(&mut self, direct_type: i16) -> Result<()> {
        self.register_fn(direct_type, construct::<M>)
    }

    /// Register a custom constructor under `direct_type`.
    pub fn register_fn(&mut self, direct_type: i16, constructor: Constructor) -> Result<()> {
        if direct_type == NULL_MESSAGE_TYPE {
            return Err(DirectError::Registration(format!(
                "direct type {direct_type} is reserved for absent messages"
            )));
        }
        if self.constructors.contains_key(&direct_type) {
            return Err(DirectError::Registration(format!(
                "direct type {direct_type} is already registered"
            )));
        }
        self.constructors.insert(direct_type, constructor);
        Ok(())
    }

    /// Whether `direct_type` has a constructor.
    pub fn contains(&self, direct_type: i16) -> bool {
        self.constructors.contains_key(&direct_type)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Registered direct types in ascending order.
    pub fn direct_types(&self) -> Vec<i16> {
        let mut types: Vec<i16> = self.constructors.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl MessageFactory for MessageRegistry {
    fn create(&self, direct_type: i16) -> Option<Box<dyn Message>> {
        self.constructors.get(&direct_type).map(|ctor| ctor())
    }
}
