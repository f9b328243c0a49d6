//! Scratch buffer reuse for write sessions.
//!
//! A write session encodes into a scratch `Vec<u8>` and, on close, copies
//! the written prefix into the frame. The scratch buffer itself goes back
//! into a single-slot cache so the next session can start without
//! allocating.
//!
//! # Design
//!
//! - One slot: the most recently released buffer wins.
//! - Size bound: buffers larger than `max_retained` are dropped instead of kept.
//! - The slot is a hint only. A miss allocates a fresh zeroed buffer.
//! - Each [`MessageHandler`](crate::handler::MessageHandler) owns a cache,
//!   or shares the thread-local one with [`CacheScope::Thread`].

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use super::wire_format::DEFAULT_MAX_CACHED_BUFFER;

/// Where a handler keeps its released scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Private slot owned by the handler.
    #[default]
    Handler,
    /// Slot shared by every handler on the current thread.
    Thread,
}

/// Single-slot, size-bounded cache of one scratch buffer.
#[derive(Debug)]
pub struct BufferCache {
    slot: Option<Vec<u8>>,
    max_retained: usize,
}

impl BufferCache {
    /// Create an empty cache that keeps buffers up to `max_retained` bytes.
    #[inline]
    pub const fn new(max_retained: usize) -> Self {
        Self {
            slot: None,
            max_retained,
        }
    }

    /// Take a buffer of at least `min_len` bytes.
    ///
    /// The returned vector's `len()` is its usable size. A reused buffer
    /// keeps the bytes of its previous session; writers only ever read back
    /// what they wrote.
    pub fn acquire(&mut self, min_len: usize) -> Vec<u8> {
        match self.slot.take() {
            Some(buf) if buf.len() >= min_len => {
                tracing::trace!(len = buf.len(), "scratch buffer cache hit");
                buf
            }
            _ => {
                tracing::debug!(min_len, "scratch buffer cache miss, allocating");
                vec![0u8; min_len]
            }
        }
    }

    /// Hand a buffer back for reuse.
    pub fn release(&mut self, buf: Vec<u8>) {
        if buf.len() > self.max_retained {
            tracing::debug!(
                len = buf.len(),
                max = self.max_retained,
                "dropping oversized scratch buffer"
            );
            return;
        }
        self.slot = Some(buf);
    }

    /// Size of the cached buffer, if any.
    #[inline]
    pub fn cached_len(&self) -> Option<usize> {
        self.slot.as_ref().map(Vec::len)
    }

    /// Upper bound for retained buffers.
    #[inline]
    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Change the retention bound, dropping the cached buffer if it no longer fits.
    pub fn set_max_retained(&mut self, max_retained: usize) {
        self.max_retained = max_retained;
        if self.cached_len().is_some_and(|len| len > max_retained) {
            self.slot = None;
        }
    }

    /// Drop the cached buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.slot = None;
    }
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHED_BUFFER)
    }
}

thread_local! {
    static THREAD_CACHE: RefCell<BufferCache> =
        const { RefCell::new(BufferCache::new(DEFAULT_MAX_CACHED_BUFFER)) };
}

/// Access the thread-local cache directly.
pub fn with_thread_cache<F, R>(f: F) -> R
where
    F: FnOnce(&mut BufferCache) -> R,
{
    THREAD_CACHE.with(|cache| f(&mut cache.borrow_mut()))
}

/// Take a buffer from the thread-local cache, keeping at most `max_retained` bytes there.
pub fn acquire_thread_buffer(min_len: usize) -> Vec<u8> {
    with_thread_cache(|cache| cache.acquire(min_len))
}

/// Return a buffer to the thread-local cache.
pub fn release_thread_buffer(buf: Vec<u8>, max_retained: usize) {
    with_thread_cache(|cache| {
        cache.set_max_retained(max_retained);
        cache.release(buf);
    })
}
