//! Node Cache - the bounded write-back layer between the engine and disk.
//!
//! The [`NodeCache`] provides:
//! - Decoded node caching keyed by block id
//! - LRU eviction with at most [`NODE_CACHE_CAPACITY`] resident nodes
//! - Dirty tracking and write-back on eviction or flush
//! - Header commits ordered after node flushes

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::CacheStats;
use crate::common::config::NODE_CACHE_CAPACITY;
use crate::common::{BlockId, Error, Result};
use crate::storage::block::{IndexHeader, Node, NodeLayout};
use crate::storage::BlockStore;

/// Caches decoded nodes for a single index file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         NodeCache                           │
/// │  ┌──────────────────┐  ┌──────────────┐  ┌──────────────┐   │
/// │  │ nodes            │  │   replacer   │  │    dirty     │   │
/// │  │ BlockId → Node   │  │ LruReplacer  │  │ HashSet<Id>  │   │
/// │  └──────────────────┘  └──────────────┘  └──────────────┘   │
/// │                      ┌──────────────┐                       │
/// │                      │  BlockStore  │                       │
/// │                      └──────────────┘                       │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Residency
/// At most [`NODE_CACHE_CAPACITY`] nodes are resident at any time. Room is
/// made BEFORE a missed node is read, so the bound holds even in the middle
/// of a `get`. References handed out by `get`/`get_mut` borrow the cache
/// mutably, so no caller can keep one alive across a call that might evict.
///
/// # Write-back
/// `get_mut` marks a node dirty. Dirty nodes are encoded and written when
/// they are evicted, on `flush_all`, or on `commit` when the header changed.
///
/// # Usage
/// ```ignore
/// let store = BlockStore::open("test.idx", &config)?;
/// let mut cache = NodeCache::new(store);
///
/// let root = cache.root();
/// if let Node::Leaf(leaf) = cache.get_mut(root)? {
///     leaf.insert(1, 100)?;
/// }
/// cache.flush_all()?;
/// ```
pub struct NodeCache {
    /// Resident decoded nodes.
    nodes: HashMap<BlockId, Node>,

    /// Recency order of resident nodes.
    replacer: LruReplacer,

    /// Resident nodes modified since they were loaded or last written.
    dirty: HashSet<BlockId>,

    /// Handles all disk I/O.
    store: BlockStore,

    /// Performance statistics.
    stats: CacheStats,
}

impl NodeCache {
    /// Create an empty cache over a block store.
    pub fn new(store: BlockStore) -> Self {
        Self {
            nodes: HashMap::with_capacity(NODE_CACHE_CAPACITY),
            replacer: LruReplacer::new(),
            dirty: HashSet::new(),
            store,
            stats: CacheStats::default(),
        }
    }

    // ========================================================================
    // Public API: Node access
    // ========================================================================

    /// Fetch a node for reading.
    ///
    /// If the node is resident it becomes the most recently used. Otherwise
    /// the least recently used node is evicted (flushed first if dirty) and
    /// the node is read and decoded from disk.
    ///
    /// # Errors
    /// - `Error::BlockOutOfRange` if the block was never allocated
    /// - `Error::Corrupt` if the block does not decode as a node
    /// - `Error::Io` on read failure or a failed write-back during eviction
    pub fn get(&mut self, id: BlockId) -> Result<&Node> {
        self.fetch(id)?;
        self.lookup(id).map(|node| &*node)
    }

    /// Fetch a node for writing. The node is marked dirty.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn get_mut(&mut self, id: BlockId) -> Result<&mut Node> {
        self.fetch(id)?;
        self.dirty.insert(id);
        self.lookup(id)
    }

    /// Mutable access to a node that is already resident, marking it dirty.
    ///
    /// Never reads, writes or evicts, so it cannot fail halfway; returns
    /// `None` if the node is not resident.
    pub fn get_resident_mut(&mut self, id: BlockId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(&id)?;
        self.replacer.record_access(id);
        self.dirty.insert(id);
        Some(node)
    }

    /// Flag a resident node as modified.
    ///
    /// Returns `false` (and does nothing) if the node is not resident.
    pub fn mark_dirty(&mut self, id: BlockId) -> bool {
        if self.nodes.contains_key(&id) {
            self.dirty.insert(id)
        } else {
            false
        }
    }

    /// Allocate a block for a new node and make it resident and dirty.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot grow or a write-back fails
    pub fn create(&mut self, node: Node) -> Result<BlockId> {
        self.make_room()?;

        let id = self.store.allocate()?;
        self.nodes.insert(id, node);
        self.dirty.insert(id);
        self.replacer.record_access(id);

        trace!(block = %id, "created node");
        Ok(id)
    }

    // ========================================================================
    // Public API: Flushing
    // ========================================================================

    /// Write one node to disk if it is resident and dirty.
    pub fn flush(&mut self, id: BlockId) -> Result<()> {
        self.write_back(id)
    }

    /// Write every dirty resident node to disk, in block order.
    ///
    /// # Errors
    /// - I/O errors from disk writes; nodes flushed before the failure stay
    ///   clean, the rest stay dirty
    pub fn flush_all(&mut self) -> Result<()> {
        let mut ids: Vec<BlockId> = self.dirty.iter().copied().collect();
        ids.sort_unstable();

        for id in ids {
            self.write_back(id)?;
        }

        Ok(())
    }

    /// Make a header change durable.
    ///
    /// If the header is dirty, flushes every dirty node FIRST and then
    /// writes the header, so the root pointer on disk never refers to a node
    /// that is not on disk yet. Does nothing when the header is clean.
    pub fn commit(&mut self) -> Result<()> {
        if self.store.is_header_dirty() {
            self.flush_all()?;
            self.store.write_header()?;
            debug!(root = %self.root(), nodes = self.header().node_count, "committed header");
        }
        Ok(())
    }

    /// Flush everything and fsync. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        self.flush_all()?;
        if self.store.is_header_dirty() {
            self.store.write_header()?;
        }
        self.store.sync()
    }

    // ========================================================================
    // Public API: Header and info
    // ========================================================================

    /// Current root block (in-memory header).
    #[inline]
    pub fn root(&self) -> BlockId {
        self.store.header().root
    }

    /// Point the header at a new root. Durable at the next `commit`.
    pub fn set_root(&mut self, root: BlockId) {
        self.store.set_root(root);
    }

    /// The in-memory header.
    #[inline]
    pub fn header(&self) -> &IndexHeader {
        self.store.header()
    }

    /// Node geometry of the underlying file.
    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        self.store.layout()
    }

    /// The underlying block store.
    #[inline]
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Cache statistics.
    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of resident nodes.
    #[inline]
    pub fn resident_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node is resident.
    #[inline]
    pub fn is_resident(&self, id: BlockId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether a node is resident and dirty.
    #[inline]
    pub fn is_dirty(&self, id: BlockId) -> bool {
        self.dirty.contains(&id)
    }

    /// Number of dirty resident nodes.
    #[inline]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Make `id` resident and most recently used.
    fn fetch(&mut self, id: BlockId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            self.stats.cache_hits += 1;
        } else {
            self.stats.cache_misses += 1;
            self.make_room()?;

            let block = self.store.read(id)?;
            self.stats.blocks_read += 1;
            let node = Node::decode(id, &block, self.store.layout())?;
            self.nodes.insert(id, node);
        }

        self.replacer.record_access(id);
        Ok(())
    }

    fn lookup(&mut self, id: BlockId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| Error::Corrupt(format!("{} is not resident after fetch", id)))
    }

    /// Evict least recently used nodes until there is room for one more.
    fn make_room(&mut self) -> Result<()> {
        while self.nodes.len() >= NODE_CACHE_CAPACITY {
            let Some(victim) = self.replacer.victim() else {
                break;
            };

            // Write back before dropping so a failed write leaves the node
            // resident and dirty.
            self.write_back(victim)?;
            self.replacer.evict();
            self.nodes.remove(&victim);
            self.stats.evictions += 1;

            trace!(block = %victim, "evicted node");
        }
        Ok(())
    }

    /// Encode and write a node if it is dirty.
    fn write_back(&mut self, id: BlockId) -> Result<()> {
        if !self.dirty.contains(&id) {
            return Ok(());
        }

        let block = match self.nodes.get(&id) {
            Some(node) => node.encode(id, self.store.layout())?,
            None => {
                self.dirty.remove(&id);
                return Ok(());
            }
        };

        self.store.write(id, &block)?;
        self.dirty.remove(&id);
        self.stats.blocks_written += 1;

        Ok(())
    }
}
