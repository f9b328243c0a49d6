//! Frame: the logical cursor the codec reads from and writes into.
//!
//! A frame owns its backing bytes plus `position`, `limit` and `size`.
//! The codec never looks past `limit` when reading; when a write session
//! closes, the written prefix replaces `data` wholesale and `size` is set.
//!
//! # Example
//!
//! ```
//! use directwire::protocol::Frame;
//!
//! let frame = Frame::from_vec(vec![1, 2, 3]);
//! assert!(frame.is_finalized());
//! assert_eq!(frame.size(), Some(3));
//! assert_eq!(frame.remaining(), 3);
//! ```

use bytes::Bytes;

/// Backing storage and cursor for one message pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    position: usize,
    limit: usize,
    /// `None` while the frame is still being written.
    size: Option<usize>,
}

impl Frame {
    /// Create an empty, unfinalized frame ready for a write session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a finalized frame over received bytes, positioned at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            data,
            position: 0,
            limit: len,
            size: Some(len),
        }
    }

    /// Backing bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Next read/write offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor.
    ///
    /// The cursor may pass the limit; reads from there fail with
    /// [`DirectError::BufferUnderflow`](crate::DirectError::BufferUnderflow).
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Exclusive upper bound of readable bytes.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Narrow or widen the readable range.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is beyond the backing data.
    #[inline]
    pub fn set_limit(&mut self, limit: usize) {
        assert!(limit <= self.data.len(), "limit {limit} beyond data");
        self.limit = limit;
    }

    /// Total valid length, `None` while still being written.
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Whether a write session has finished (or the frame was built from received bytes).
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.size.is_some()
    }

    /// Bytes left between position and limit.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.position)
    }

    /// Move the cursor back to the start, keeping the data.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Prepare the frame for a write session.
    pub(crate) fn begin_write(&mut self) {
        self.position = 0;
        self.limit = 0;
        self.size = None;
    }

    /// Replace the data with the written prefix and mark the frame finalized.
    ///
    /// The cursor stays at the end of the written bytes.
    pub(crate) fn finish(&mut self, data: Vec<u8>) {
        let len = data.len();
        self.data = data;
        self.limit = len;
        self.size = Some(len);
        self.position = len;
    }

    /// Readable bytes `[position, limit)`, empty once the cursor is past the limit.
    #[inline]
    pub(crate) fn readable(&self) -> &[u8] {
        self.data.get(self.position..self.limit).unwrap_or_default()
    }

    /// Take the payload as `Bytes` (zero-copy from the owned vector).
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.data)
    }

    /// Take the backing vector.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl From<&[u8]> for Frame {
    fn from(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }
}
