//! Node cache statistics tracking.

use std::fmt;

/// Counters tracked by the node cache.
///
/// The cache is owned by a single engine on a single thread, so these are
/// plain integers updated through `&mut`. Callers get a copy via
/// [`NodeCache::stats`](crate::buffer::NodeCache::stats).
///
/// # Example
/// ```
/// use diskbtree::CacheStats;
///
/// let mut stats = CacheStats::default();
/// stats.cache_hits += 3;
/// stats.cache_misses += 1;
/// assert_eq!(stats.hit_rate(), 0.75);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of times a node was already resident.
    pub cache_hits: u64,

    /// Number of times a node had to be decoded from disk.
    pub cache_misses: u64,

    /// Number of nodes evicted to make room.
    pub evictions: u64,

    /// Number of node blocks read from disk.
    pub blocks_read: u64,

    /// Number of node blocks written to disk.
    pub blocks_written: u64,
}

impl CacheStats {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, reads: {}, writes: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.blocks_read,
            self.blocks_written,
            self.hit_rate() * 100.0
        )
    }
}
