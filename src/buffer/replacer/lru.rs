//! LRU (Least-Recently-Used) replacement policy.

use std::collections::VecDeque;

use crate::common::BlockId;

/// Tracks recency of resident blocks and picks the least recently used one
/// as the eviction victim.
///
/// The node cache holds at most a handful of entries, so recency is a plain
/// queue (front = least recent) and re-access is a linear move to the back.
#[derive(Debug, Default)]
pub struct LruReplacer {
    queue: VecDeque<BlockId>,
}

impl LruReplacer {
    /// Create a new LRU replacer.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Record that a block was accessed, making it the most recently used.
    pub fn record_access(&mut self, id: BlockId) {
        self.remove(id);
        self.queue.push_back(id);
    }

    /// Select and remove the least recently used block.
    ///
    /// Returns None if nothing is tracked.
    pub fn evict(&mut self) -> Option<BlockId> {
        self.queue.pop_front()
    }

    /// Stop tracking a block.
    pub fn remove(&mut self, id: BlockId) {
        if let Some(pos) = self.queue.iter().position(|&b| b == id) {
            self.queue.remove(pos);
        }
    }

    /// The block `evict` would return, without removing it.
    pub fn victim(&self) -> Option<BlockId> {
        self.queue.front().copied()
    }

    /// Number of tracked blocks.
    pub fn size(&self) -> usize {
        self.queue.len()
    }
}
