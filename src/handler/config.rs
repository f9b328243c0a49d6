//! Codec configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{
    ByteOrder, CacheScope, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CACHED_BUFFER, DEFAULT_STATE_DEPTH,
    MAX_BUFFER_SIZE,
};

/// Default upper bound on any array, string or collection length read from the wire.
pub const DEFAULT_MAX_LENGTH: usize = i32::MAX as usize;

/// Configuration for a [`MessageHandler`](super::MessageHandler).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use directwire::handler::CodecConfig;
/// use directwire::protocol::ByteOrder;
///
/// let config = CodecConfig::from_json(r#"{ "byte_order": "big" }"#).unwrap();
/// assert_eq!(config.byte_order, ByteOrder::Big);
/// assert_eq!(config.initial_buffer_size, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Byte order of fixed-width values on the wire.
    pub byte_order: ByteOrder,
    /// Scratch buffer size for a fresh write session.
    pub initial_buffer_size: usize,
    /// Nesting levels allocated up front.
    pub initial_state_depth: usize,
    /// Largest scratch buffer kept for reuse after a session closes.
    pub max_cached_buffer: usize,
    /// Largest element count accepted from the wire.
    pub max_length: usize,
    /// Whether the scratch buffer cache is per handler or per thread.
    pub cache_scope: CacheScope,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::default(),
            initial_buffer_size: DEFAULT_BUFFER_SIZE,
            initial_state_depth: DEFAULT_STATE_DEPTH,
            max_cached_buffer: DEFAULT_MAX_CACHED_BUFFER,
            max_length: DEFAULT_MAX_LENGTH,
            cache_scope: CacheScope::default(),
        }
    }
}

impl CodecConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.normalize();
        Ok(config)
    }

    /// Clamp values into their usable ranges.
    pub(crate) fn normalize(&mut self) {
        self.initial_buffer_size = self.initial_buffer_size.clamp(1, MAX_BUFFER_SIZE);
        self.initial_state_depth = self.initial_state_depth.max(1);
        self.max_length = self.max_length.min(DEFAULT_MAX_LENGTH);
    }

    /// Whether fixed-width values need byte reversal on this platform.
    #[inline]
    pub fn swap(&self) -> bool {
        self.byte_order.needs_swap()
    }
}
