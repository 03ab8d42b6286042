//! Decoded B-tree nodes and their block codec.
//!
//! A [`Node`] is either a [`LeafNode`] holding the authoritative key/value
//! pairs, or an [`InternalNode`] holding separator keys and child block ids.
//! Children are referenced by [`BlockId`] only; there are no in-memory links
//! between nodes.

use crate::common::{BlockId, Error, Key, Result, Value};

use super::block::Block;
use super::layout::NodeLayout;
use super::preamble::{BlockKind, BlockPreamble};

/// Leaf node: sorted keys with one value per key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub keys: Vec<Key>,
    pub values: Vec<Value>,
}

/// Internal node: sorted separator keys and `keys.len() + 1` children.
///
/// `children[i]` holds keys `< keys[i]`; `children[i + 1]` holds keys
/// `>= keys[i]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub keys: Vec<Key>,
    pub children: Vec<BlockId>,
}

/// A decoded node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl LeafNode {
    /// Position of `key`: `Ok(i)` if present, `Err(i)` for the insert slot.
    #[inline]
    pub fn find(&self, key: Key) -> std::result::Result<usize, usize> {
        self.keys.binary_search(&key)
    }

    /// Value stored for `key`.
    pub fn get(&self, key: Key) -> Option<Value> {
        self.find(key).ok().map(|i| self.values[i])
    }

    /// Insert a pair at its sorted position.
    ///
    /// # Errors
    /// Returns `Error::DuplicateKey` if `key` is already present.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        match self.find(key) {
            Ok(_) => Err(Error::DuplicateKey(key)),
            Err(pos) => {
                self.keys.insert(pos, key);
                self.values.insert(pos, value);
                Ok(())
            }
        }
    }

    /// Move the pairs from `at` onwards into a new right sibling.
    ///
    /// Returns the separator (the sibling's first key, which stays in the
    /// sibling as its lower bound) and the sibling.
    pub fn split_off(&mut self, at: usize) -> (Key, LeafNode) {
        let sibling = LeafNode {
            keys: self.keys.split_off(at),
            values: self.values.split_off(at),
        };
        (sibling.keys[0], sibling)
    }
}

impl InternalNode {
    /// Internal node with a single child and no keys.
    ///
    /// Only valid transiently, as the new root of a root split.
    pub fn with_child(child: BlockId) -> Self {
        Self {
            keys: Vec::new(),
            children: vec![child],
        }
    }

    /// Index of the child whose range contains `key`.
    ///
    /// That is the index of the first key strictly greater than `key`, or
    /// the last child if there is none.
    #[inline]
    pub fn child_index(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k <= key)
    }

    /// Move the children from `at` onwards into a new right sibling.
    ///
    /// The key between the two halves moves up and is returned as the
    /// separator.
    pub fn split_off(&mut self, at: usize) -> (Key, InternalNode) {
        let children = self.children.split_off(at);
        let keys = self.keys.split_off(at);
        // The left half kept `at` keys; its last one separates the halves.
        let separator = self.keys.pop().unwrap_or_default();
        (separator, InternalNode { keys, children })
    }

    /// Record a split of `children[index]`: `separator` goes at `index`
    /// and `sibling` becomes child `index + 1`.
    pub fn insert_child(&mut self, index: usize, separator: Key, sibling: BlockId) {
        self.keys.insert(index, separator);
        self.children.insert(index + 1, sibling);
    }
}

impl Node {
    /// An empty leaf, the initial root.
    pub fn empty_leaf() -> Self {
        Node::Leaf(LeafNode::default())
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Sorted keys of this node.
    #[inline]
    pub fn keys(&self) -> &[Key] {
        match self {
            Node::Leaf(leaf) => &leaf.keys,
            Node::Internal(internal) => &internal.keys,
        }
    }

    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys().len()
    }

    /// Whether the node holds `layout.max_keys()` keys and must be split
    /// before anything descends into it.
    #[inline]
    pub fn is_full(&self, layout: &NodeLayout) -> bool {
        self.key_count() >= layout.max_keys()
    }

    /// Split a full node at `layout.split_point()`.
    ///
    /// Returns the separator for the parent and the new right sibling.
    pub fn split(&mut self, layout: &NodeLayout) -> (Key, Node) {
        let at = layout.split_point();
        match self {
            Node::Leaf(leaf) => {
                let (separator, sibling) = leaf.split_off(at);
                (separator, Node::Leaf(sibling))
            }
            Node::Internal(internal) => {
                let (separator, sibling) = internal.split_off(at);
                (separator, Node::Internal(sibling))
            }
        }
    }

    // ========================================================================
    // Codec
    // ========================================================================

    /// Encode into a block.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` if the node holds more keys than the layout
    /// allows or its child count does not match its key count.
    pub fn encode(&self, id: BlockId, layout: &NodeLayout) -> Result<Block> {
        let key_count = self.key_count();
        if key_count > layout.max_keys() {
            return Err(Error::Corrupt(format!(
                "{} holds {} keys, layout allows {}",
                id,
                key_count,
                layout.max_keys()
            )));
        }

        let mut block = Block::zeroed(layout.block_size());
        let kind = match self {
            Node::Leaf(_) => BlockKind::Leaf,
            Node::Internal(_) => BlockKind::Internal,
        };
        BlockPreamble::new(kind).write_to(block.as_mut_slice());
        block.write_u32(NodeLayout::OFFSET_KEY_COUNT, key_count as u32);
        block.write_u64(NodeLayout::OFFSET_SELF_ID, id.0);

        for (i, &key) in self.keys().iter().enumerate() {
            block.write_u64(layout.key_offset(i), key);
        }

        match self {
            Node::Leaf(leaf) => {
                for (i, &value) in leaf.values.iter().enumerate() {
                    block.write_u64(layout.value_offset(i), value);
                }
            }
            Node::Internal(internal) => {
                if internal.children.len() != key_count + 1 {
                    return Err(Error::Corrupt(format!(
                        "{} has {} children for {} keys",
                        id,
                        internal.children.len(),
                        key_count
                    )));
                }
                for (i, child) in internal.children.iter().enumerate() {
                    block.write_u64(layout.child_offset(i), child.0);
                }
            }
        }

        block.update_checksum();
        Ok(block)
    }

    /// Decode a node read from block `id`.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` on a checksum mismatch, a non-node kind, a
    /// self id that differs from `id`, an oversized key count or unsorted
    /// keys.
    pub fn decode(id: BlockId, block: &Block, layout: &NodeLayout) -> Result<Self> {
        if block.len() != layout.block_size() {
            return Err(Error::Corrupt(format!(
                "{} is {} bytes, expected {}",
                id,
                block.len(),
                layout.block_size()
            )));
        }
        if !block.verify_checksum() {
            return Err(Error::Corrupt(format!("{} checksum mismatch", id)));
        }

        let stored_id = block.read_u64(NodeLayout::OFFSET_SELF_ID);
        if stored_id != id.0 {
            return Err(Error::Corrupt(format!(
                "{} claims to be block {}",
                id, stored_id
            )));
        }

        let key_count = block.read_u32(NodeLayout::OFFSET_KEY_COUNT) as usize;
        if key_count > layout.max_keys() {
            return Err(Error::Corrupt(format!(
                "{} key count {} exceeds {}",
                id,
                key_count,
                layout.max_keys()
            )));
        }

        let keys: Vec<Key> = (0..key_count)
            .map(|i| block.read_u64(layout.key_offset(i)))
            .collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Corrupt(format!("{} keys are not ascending", id)));
        }

        match block.preamble().kind {
            BlockKind::Leaf => {
                let values = (0..key_count)
                    .map(|i| block.read_u64(layout.value_offset(i)))
                    .collect();
                Ok(Node::Leaf(LeafNode { keys, values }))
            }
            BlockKind::Internal => {
                let children = (0..=key_count)
                    .map(|i| BlockId::new(block.read_u64(layout.child_offset(i))))
                    .collect();
                Ok(Node::Internal(InternalNode { keys, children }))
            }
            kind => Err(Error::Corrupt(format!(
                "{} has kind {:?}, expected a node",
                id, kind
            ))),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
