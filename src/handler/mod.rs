//! Handler module - message encoding sessions and nesting state.
//!
//! Provides:
//! - [`MessageHandler`] - owns the nesting state and scratch buffer cache
//! - [`MessageWriter`] / [`MessageReader`] - one encode or decode pass over a [`Frame`]
//! - [`Message`] / [`MessageFactory`] / [`MessageRegistry`] - the message contract
//!
//! # Lifecycle
//!
//! ```text
//! MessageHandler ──for_write(&mut frame)──► MessageWriter ──close()──► frame finalized
//!        │
//!        └───────for_read(&mut frame)───► MessageReader ──close()
//! ```
//!
//! A session borrows the handler mutably, so one handler serves one pass
//! at a time. Dropping a session without `close()` releases its resources
//! and forgets any partial progress.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use directwire::handler::{MessageHandler, MessageRegistry};
//! use directwire::protocol::Frame;
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
//! frame.rewind();
//! let mut reader = handler.for_read(&mut frame)?;
//! let ping = reader.read_root()?;
//! ```

mod config;
mod dispatch;
mod message;
mod reader;
mod registry;
mod state;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use config::{CodecConfig, DEFAULT_MAX_LENGTH};
pub use message::{message_eq, Message, MessageFactory};
pub use reader::MessageReader;
pub use registry::{Constructor, MessageRegistry};
pub use state::{LevelState, NestingState};
pub use writer::MessageWriter;

use crate::error::{DirectError, Result};
use crate::protocol::buffer_pool::acquire_thread_buffer;
use crate::protocol::{BufferCache, CacheScope, Frame};

/// Entry point for encoding and decoding messages.
///
/// Holds everything that outlives a single pass: the factory used to
/// create messages on read, the configuration, the per-depth nesting
/// state (so a suspended write can resume in the next session) and the
/// scratch buffer cache.
pub struct MessageHandler {
    factory: Arc<dyn MessageFactory>,
    config: CodecConfig,
    state: NestingState,
    cache: BufferCache,
}

impl MessageHandler {
    /// Create a handler with the default configuration.
    pub fn new(factory: Arc<dyn MessageFactory>) -> Self {
        Self::with_config(factory, CodecConfig::default())
    }

    /// Create a handler with a custom configuration.
    pub fn with_config(factory: Arc<dyn MessageFactory>, mut config: CodecConfig) -> Self {
        config.normalize();
        Self {
            factory,
            state: NestingState::new(config.initial_state_depth),
            cache: BufferCache::new(config.max_cached_buffer),
            config,
        }
    }

    /// Handler configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Start a write session. The frame's previous contents are replaced on close.
    pub fn for_write<'a>(&'a mut self, frame: &'a mut Frame) -> MessageWriter<'a> {
        let min_len = self.config.initial_buffer_size;
        let (heap, cache) = match self.config.cache_scope {
            CacheScope::Handler => (self.cache.acquire(min_len), Some(&mut self.cache)),
            CacheScope::Thread => (acquire_thread_buffer(min_len), None),
        };
        frame.begin_write();
        MessageWriter::new(frame, heap, &mut self.state, cache, &self.config)
    }

    /// Start a read session at the frame's current position.
    ///
    /// Fails with [`DirectError::FrameNotFinalized`] if the frame is still
    /// being written, and with [`DirectError::WriteSuspended`] while a
    /// suspended write holds nesting progress (see [`reset`](Self::reset)).
    pub fn for_read<'a>(&'a mut self, frame: &'a mut Frame) -> Result<MessageReader<'a>> {
        if !frame.is_finalized() {
            return Err(DirectError::FrameNotFinalized);
        }
        if let Some(depth) = self.state.suspended_depth() {
            tracing::warn!(depth, "read refused while a write is suspended");
            return Err(DirectError::WriteSuspended { depth });
        }
        Ok(MessageReader::new(
            frame,
            &mut self.state,
            self.factory.as_ref(),
            &self.config,
        ))
    }

    /// Current nesting state.
    pub fn state(&self) -> &NestingState {
        &self.state
    }

    /// Size of the scratch buffer held for the next write session, if any.
    ///
    /// Always `None` with [`CacheScope::Thread`].
    pub fn cached_capacity(&self) -> Option<usize> {
        self.cache.cached_len()
    }

    /// Abandon any suspended write and start over from the root.
    pub fn reset(&mut self) {
        self.state.clear();
    }
}

impl std::fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHandler")
            .field("config", &self.config)
            .field("depth", &self.state.depth())
            .field("cached_capacity", &self.cache.cached_len())
            .finish_non_exhaustive()
    }
}
