//! The B-tree engine.
//!
//! Insertion splits top-down: a full root is split before the descent
//! starts, and a full child is split before the descent enters it. A parent
//! is therefore never full when one of its children splits, and no
//! rebalancing pass is needed afterwards.
//!
//! Leaves hold every key/value pair. When a leaf splits, its upper half moves
//! to a new right sibling and the sibling's first key is copied into the
//! parent as a routing separator. When an internal node splits, the key
//! between its two halves moves up.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::buffer::{CacheStats, NodeCache};
use crate::common::{BlockId, Config, Error, Key, Result, Value};
use crate::storage::block::{InternalNode, Node, NodeLayout};
use crate::storage::BlockStore;

use super::iter::Iter;

/// A disk-backed B-tree over `u64` keys and values.
///
/// # Example
/// ```no_run
/// use diskbtree::{BTree, Config};
///
/// let mut tree = BTree::create("numbers.idx", &Config::default())?;
/// tree.insert(7, 700)?;
/// assert_eq!(tree.search(7)?, 700);
///
/// for pair in tree.iter() {
///     let (key, value) = pair?;
///     println!("{} {}", key, value);
/// }
/// tree.close()?;
/// # Ok::<(), diskbtree::Error>(())
/// ```
pub struct BTree {
    cache: NodeCache,
}

/// Structural summary returned by [`BTree::verify`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Number of levels; a lone root leaf has height 1.
    pub height: usize,
    /// Reachable nodes.
    pub nodes: u64,
    /// Reachable leaves.
    pub leaves: u64,
    /// Key/value pairs stored in the leaves.
    pub entries: u64,
}

/// Header summary returned by [`BTree::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub path: PathBuf,
    pub block_size: usize,
    pub order: usize,
    pub root: BlockId,
    pub node_count: u64,
    pub next_free: u64,
    pub height: usize,
}

impl fmt::Display for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "file:       {}", self.path.display())?;
        writeln!(f, "block size: {}", self.block_size)?;
        writeln!(f, "order:      {}", self.order)?;
        writeln!(f, "root:       {}", self.root.0)?;
        writeln!(f, "nodes:      {}", self.node_count)?;
        writeln!(f, "next free:  {}", self.next_free)?;
        write!(f, "height:     {}", self.height)
    }
}

impl BTree {
    /// Create a new index file holding a single empty root leaf.
    ///
    /// # Errors
    /// - `Error::IndexExists` if the file already exists
    /// - `Error::InvalidBlockSize` if `config.block_size` is out of range
    /// - I/O errors while writing the first blocks
    pub fn create<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let store = BlockStore::create(path, config)?;
        let mut cache = NodeCache::new(store);

        let root = cache.create(Node::empty_leaf())?;
        cache.set_root(root);
        cache.commit()?;

        Ok(Self { cache })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// - I/O errors if the file cannot be opened
    /// - `Error::Corrupt` if the header is invalid or has no root
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let store = BlockStore::open(path, config)?;
        if !store.header().root.is_valid() {
            return Err(Error::Corrupt("index has no root node".into()));
        }

        Ok(Self {
            cache: NodeCache::new(store),
        })
    }

    // ========================================================================
    // Public API: Lookups
    // ========================================================================

    /// Look up the value stored for `key`.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key was never inserted
    /// - I/O and format errors from the cache
    pub fn search(&mut self, key: Key) -> Result<Value> {
        self.get(key)?.ok_or(Error::NotFound(key))
    }

    /// Look up the value stored for `key`, with a miss as `None`.
    pub fn get(&mut self, key: Key) -> Result<Option<Value>> {
        let mut id = self.cache.root();
        for _ in 0..=self.depth_limit() {
            match self.cache.get(id)? {
                Node::Leaf(leaf) => return Ok(leaf.get(key)),
                Node::Internal(internal) => id = internal.children[internal.child_index(key)],
            }
        }
        Err(self.cycle_error())
    }

    /// Whether `key` is present.
    pub fn contains_key(&mut self, key: Key) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Ordered traversal of every key/value pair.
    ///
    /// Each call starts a fresh traversal from the root.
    pub fn iter(&mut self) -> Iter<'_> {
        let limit = self.depth_limit();
        Iter::new(&mut self.cache, limit)
    }

    // ========================================================================
    // Public API: Insert
    // ========================================================================

    /// Insert a key/value pair.
    ///
    /// Full nodes on the way down are split before they are entered. If any
    /// split allocated blocks, every dirty node is flushed and then the
    /// header is written before this returns.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if `key` is present; the tree is untouched
    /// - I/O and format errors from the cache
    pub fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        if self.contains_key(key)? {
            return Err(Error::DuplicateKey(key));
        }

        let layout = *self.cache.layout();

        let root = self.cache.root();
        if self.cache.get(root)?.is_full(&layout) {
            let new_root = self
                .cache
                .create(Node::Internal(InternalNode::with_child(root)))?;
            self.split_child(new_root, 0, &layout)?;
            self.cache.set_root(new_root);
            debug!(old_root = %root, new_root = %new_root, "split root");
        }

        let mut id = self.cache.root();
        let mut depth = 0;
        while !self.cache.get(id)?.is_leaf() {
            depth += 1;
            if depth > self.depth_limit() {
                return Err(self.cycle_error());
            }

            let (index, child) = self.route(id, key)?;
            if self.cache.get(child)?.is_full(&layout) {
                self.split_child(id, index, &layout)?;
                id = self.route(id, key)?.1;
            } else {
                id = child;
            }
        }

        match self.cache.get_mut(id)? {
            Node::Leaf(leaf) => leaf.insert(key, value)?,
            Node::Internal(_) => {
                return Err(Error::Corrupt(format!("{} changed kind during insert", id)));
            }
        }

        self.cache.commit()
    }

    // ========================================================================
    // Public API: Inspection
    // ========================================================================

    /// Walk the whole tree and check every structural invariant.
    ///
    /// Checks that all leaves are at the same depth, keys ascend within each
    /// node and respect the separators above them, every non-root node
    /// holds between `min_keys` and `max_keys` keys, and internal nodes have
    /// one more child than keys.
    ///
    /// # Errors
    /// - `Error::Corrupt` describing the first violation found
    pub fn verify(&mut self) -> Result<TreeShape> {
        let root = self.cache.root();
        let limit = self.depth_limit();
        let mut verifier = Verifier {
            layout: *self.cache.layout(),
            cache: &mut self.cache,
            root,
            limit,
            leaf_depth: None,
            shape: TreeShape::default(),
        };
        verifier.visit(root, 0, None, None)?;

        let mut shape = verifier.shape;
        shape.height = verifier.leaf_depth.map_or(0, |d| d + 1);
        Ok(shape)
    }

    /// Number of levels, found by following the leftmost path.
    pub fn height(&mut self) -> Result<usize> {
        let mut id = self.cache.root();
        for height in 1..=self.depth_limit() + 1 {
            match self.cache.get(id)? {
                Node::Leaf(_) => return Ok(height),
                Node::Internal(internal) => id = internal.children[0],
            }
        }
        Err(self.cycle_error())
    }

    /// Header summary.
    pub fn info(&mut self) -> Result<IndexInfo> {
        let height = self.height()?;
        let header = self.cache.header();
        let layout = self.cache.layout();

        Ok(IndexInfo {
            path: self.cache.store().path().to_path_buf(),
            block_size: layout.block_size(),
            order: layout.order(),
            root: header.root,
            node_count: header.node_count,
            next_free: header.next_free,
            height,
        })
    }

    /// Node geometry.
    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        self.cache.layout()
    }

    /// Maximum number of children per internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.cache.layout().order()
    }

    /// Current root block.
    #[inline]
    pub fn root(&self) -> BlockId {
        self.cache.root()
    }

    /// Node cache statistics.
    #[inline]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of nodes currently resident in the cache.
    #[inline]
    pub fn resident_nodes(&self) -> usize {
        self.cache.resident_count()
    }

    // ========================================================================
    // Public API: Lifecycle
    // ========================================================================

    /// Write every dirty node and the header.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush_all()?;
        self.cache.commit()
    }

    /// Flush, fsync and close the index.
    pub fn close(mut self) -> Result<()> {
        self.cache.shutdown()?;
        debug!(stats = %self.cache.stats(), "closed index");
        Ok(())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Child slot and child id that `key` routes to in internal node `id`.
    fn route(&mut self, id: BlockId, key: Key) -> Result<(usize, BlockId)> {
        match self.cache.get(id)? {
            Node::Internal(internal) => {
                let index = internal.child_index(key);
                Ok((index, internal.children[index]))
            }
            Node::Leaf(_) => Err(Error::Corrupt(format!("{} is a leaf, expected internal", id))),
        }
    }

    /// Split the full child at `index` of `parent`.
    ///
    /// Touches exactly three nodes: the parent, the child and the new
    /// sibling. The split is computed on a copy and the sibling gets its
    /// block first, so a failed allocation leaves the cached child whole.
    fn split_child(&mut self, parent: BlockId, index: usize, layout: &NodeLayout) -> Result<()> {
        let child = match self.cache.get(parent)? {
            Node::Internal(internal) => internal.children[index],
            Node::Leaf(_) => {
                return Err(Error::Corrupt(format!("{} is a leaf, expected internal", parent)));
            }
        };

        let mut left = self.cache.get(child)?.clone();
        let (separator, right) = left.split(layout);
        let sibling = self.cache.create(right)?;

        // Parent and child were the two most recent accesses, so making room
        // for the sibling evicted neither; the updates below do no I/O.
        if !self.cache.is_resident(parent) || !self.cache.is_resident(child) {
            return Err(Error::Corrupt(format!(
                "split of {} under {} lost a node from the cache",
                child, parent
            )));
        }
        match self.cache.get_resident_mut(parent) {
            Some(Node::Internal(internal)) => internal.insert_child(index, separator, sibling),
            _ => return Err(Error::Corrupt(format!("{} is not an internal node", parent))),
        }
        if let Some(node) = self.cache.get_resident_mut(child) {
            *node = left;
        }

        debug!(parent = %parent, node = %child, sibling = %sibling, separator, "split node");
        Ok(())
    }

    /// No path can be longer than the number of allocated nodes.
    fn depth_limit(&self) -> usize {
        self.cache.header().node_count as usize
    }

    fn cycle_error(&self) -> Error {
        Error::Corrupt(format!(
            "path from root {} is longer than the {} allocated nodes",
            self.cache.root(),
            self.cache.header().node_count
        ))
    }
}

impl Drop for BTree {
    fn drop(&mut self) {
        if let Err(e) = self.cache.shutdown() {
            warn!(error = %e, "failed to flush index on drop");
        }
    }
}

/// Recursive invariant checker used by [`BTree::verify`].
struct Verifier<'a> {
    cache: &'a mut NodeCache,
    layout: NodeLayout,
    root: BlockId,
    limit: usize,
    leaf_depth: Option<usize>,
    shape: TreeShape,
}

impl Verifier<'_> {
    /// Check node `id` at `depth`, whose keys must lie in `[lower, upper)`.
    fn visit(
        &mut self,
        id: BlockId,
        depth: usize,
        lower: Option<Key>,
        upper: Option<Key>,
    ) -> Result<()> {
        if depth > self.limit {
            return Err(Error::Corrupt(format!("{} reached below depth {}", id, self.limit)));
        }

        // Clone so the cache is free to evict while the subtree is walked.
        let node = self.cache.get(id)?.clone();
        self.shape.nodes += 1;

        let keys = node.keys();
        if keys.len() > self.layout.max_keys() {
            return Err(Error::Corrupt(format!("{} holds {} keys", id, keys.len())));
        }
        if id != self.root && keys.len() < self.layout.min_keys() {
            return Err(Error::Corrupt(format!(
                "{} holds {} keys, minimum is {}",
                id,
                keys.len(),
                self.layout.min_keys()
            )));
        }
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Corrupt(format!("{} keys are not ascending", id)));
        }
        let in_bounds =
            |k: &Key| !matches!(lower, Some(lo) if *k < lo) && !matches!(upper, Some(hi) if *k >= hi);
        if !keys.iter().all(in_bounds) {
            return Err(Error::Corrupt(format!(
                "{} has keys outside its separator range",
                id
            )));
        }

        match &node {
            Node::Leaf(leaf) => {
                if leaf.values.len() != leaf.keys.len() {
                    return Err(Error::Corrupt(format!("{} has unpaired values", id)));
                }
                match self.leaf_depth {
                    None => self.leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(Error::Corrupt(format!(
                            "leaf {} at depth {}, other leaves at depth {}",
                            id, depth, d
                        )));
                    }
                    Some(_) => {}
                }
                self.shape.leaves += 1;
                self.shape.entries += leaf.keys.len() as u64;
            }
            Node::Internal(internal) => {
                if internal.keys.is_empty() || internal.children.len() != internal.keys.len() + 1 {
                    return Err(Error::Corrupt(format!(
                        "{} has {} children for {} keys",
                        id,
                        internal.children.len(),
                        internal.keys.len()
                    )));
                }
                for (i, &child) in internal.children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(internal.keys[i - 1]) };
                    let hi = internal.keys.get(i).copied().or(upper);
                    self.visit(child, depth + 1, lo, hi)?;
                }
            }
        }

        Ok(())
    }
}
