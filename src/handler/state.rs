//! Per-depth progress of nested message encoding.
//!
//! Every nesting level keeps a field cursor and a header-written flag so a
//! message whose `write_to` returned `false` can be resumed from the field
//! where it stopped. Entering a sub-message moves one level down, leaving
//! it moves back up:
//!
//! ```text
//! depth 0  [cursor=2, header ✓]   root, suspended at field 2
//! depth 1  [cursor=1, header ✓]   child, suspended at field 1
//! depth 2  [cursor=0, header ✗]   clear
//! ```
//!
//! A level is cleared when the message at that level finishes. A level
//! whose message suspended keeps its progress for the next attempt.

use crate::protocol::DEFAULT_STATE_DEPTH;

/// Progress of the message at one nesting level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelState {
    /// Index of the next field to write or read.
    pub cursor: u32,
    /// Whether the 2-byte type header has been written.
    pub header_written: bool,
}

/// Growable stack of [`LevelState`]s with a current depth.
#[derive(Debug, Clone)]
pub struct NestingState {
    levels: Vec<LevelState>,
    depth: usize,
}

impl NestingState {
    /// Create a stack with `capacity` levels allocated up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            levels: vec![LevelState::default(); capacity.max(1)],
            depth: 0,
        }
    }

    /// Enter a nested message.
    pub fn forward(&mut self) {
        self.depth += 1;
        if self.depth == self.levels.len() {
            let doubled = self.levels.len() * 2;
            self.levels.resize(doubled, LevelState::default());
        }
    }

    /// Leave a nested message, clearing its level if it `finished`.
    ///
    /// # Panics
    ///
    /// Panics at depth 0.
    pub fn backward(&mut self, finished: bool) {
        assert!(self.depth > 0, "nesting state popped at depth 0");
        if finished {
            self.levels[self.depth] = LevelState::default();
        }
        self.depth -= 1;
    }

    /// Field cursor of the current level.
    #[inline]
    pub fn state(&self) -> u32 {
        self.levels[self.depth].cursor
    }

    /// Advance the field cursor of the current level.
    #[inline]
    pub fn increment_state(&mut self) {
        self.levels[self.depth].cursor += 1;
    }

    /// Whether the current level's header has been written.
    #[inline]
    pub fn is_header_written(&self) -> bool {
        self.levels[self.depth].header_written
    }

    /// Mark the current level's header as written.
    #[inline]
    pub fn on_header_written(&mut self) {
        self.levels[self.depth].header_written = true;
    }

    /// Clear level 0 after a root message finishes.
    ///
    /// # Panics
    ///
    /// Panics unless the depth is 0.
    pub fn reset(&mut self) {
        assert_eq!(self.depth, 0, "nesting state reset at depth {}", self.depth);
        self.levels[0] = LevelState::default();
    }

    /// Forget all progress at every level.
    pub fn clear(&mut self) {
        self.levels.fill(LevelState::default());
        self.depth = 0;
    }

    /// Deepest level holding progress, or `None` when every level is clear
    /// and the depth is 0.
    pub fn suspended_depth(&self) -> Option<usize> {
        let deepest = self
            .levels
            .iter()
            .rposition(|level| *level != LevelState::default());
        match deepest {
            Some(i) => Some(i.max(self.depth)),
            None if self.depth > 0 => Some(self.depth),
            None => None,
        }
    }

    /// Current depth, 0 at the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// State of level `i`, if allocated.
    #[inline]
    pub fn level(&self, i: usize) -> Option<&LevelState> {
        self.levels.get(i)
    }

    /// Number of allocated levels.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.levels.len()
    }
}

impl Default for NestingState {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_DEPTH)
    }
}
