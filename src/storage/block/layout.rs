//! Node geometry derived from the block size.

use crate::common::config::{validate_block_size, CHILD_ID_SIZE, KEY_SIZE, VALUE_SIZE};
use crate::common::Result;

use super::preamble::BlockPreamble;

/// Fixed geometry of every node block in an index.
///
/// # Layout
/// ```text
/// ┌──────────┬───────────┬─────────┬──────────────┬──────────────────────────┬─────────┐
/// │ preamble │ key_count │ self id │ keys         │ values (leaf) or         │ padding │
/// │ 5 bytes  │ 4 bytes   │ 8 bytes │ 8 × max_keys │ children (internal)      │         │
/// └──────────┴───────────┴─────────┴──────────────┴──────────────────────────┴─────────┘
/// ```
///
/// The order is the largest EVEN number of children whose internal-node
/// layout fits in one block. An even order is what lets a full internal
/// node split into two halves that both respect the minimum key count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    block_size: usize,
    order: usize,
}

impl NodeLayout {
    pub const OFFSET_KEY_COUNT: usize = BlockPreamble::SIZE;
    pub const OFFSET_SELF_ID: usize = Self::OFFSET_KEY_COUNT + 4;
    /// Size of the per-node header (preamble + key count + self id).
    pub const HEADER_SIZE: usize = Self::OFFSET_SELF_ID + 8;

    /// Smallest supported order.
    pub const MIN_ORDER: usize = 4;

    /// Derive the layout for a block size.
    ///
    /// # Errors
    /// Returns `Error::InvalidBlockSize` if the block cannot hold an
    /// order-4 node or exceeds the maximum block size.
    pub fn for_block_size(block_size: u32) -> Result<Self> {
        validate_block_size(block_size)?;

        let block_size = block_size as usize;
        // Internal nodes are the larger variant: one more child id than keys.
        let capacity =
            (block_size - Self::HEADER_SIZE - CHILD_ID_SIZE) / (KEY_SIZE + CHILD_ID_SIZE);
        let order = (capacity + 1) & !1;
        debug_assert!(order >= Self::MIN_ORDER);

        Ok(Self { block_size, order })
    }

    /// Smallest block size whose layout has exactly the requested order.
    ///
    /// `order` is rounded down to an even number.
    pub fn block_size_for_order(order: usize) -> u32 {
        let order = order.max(Self::MIN_ORDER) & !1;
        let max_keys = order - 1;
        (Self::HEADER_SIZE + max_keys * KEY_SIZE + order * CHILD_ID_SIZE) as u32
    }

    /// Block size in bytes.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Maximum number of children of an internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum key count of any node (`order - 1`).
    #[inline]
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum key count of any non-root node (`ceil(order/2) - 1`).
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Entry index at which a full node is divided.
    #[inline]
    pub fn split_point(&self) -> usize {
        self.order / 2
    }

    /// Offset of key slot `i`.
    #[inline]
    pub fn key_offset(&self, i: usize) -> usize {
        Self::HEADER_SIZE + i * KEY_SIZE
    }

    /// Offset of leaf value slot `i`.
    #[inline]
    pub fn value_offset(&self, i: usize) -> usize {
        self.key_offset(self.max_keys()) + i * VALUE_SIZE
    }

    /// Offset of internal child slot `i`.
    #[inline]
    pub fn child_offset(&self, i: usize) -> usize {
        self.key_offset(self.max_keys()) + i * CHILD_ID_SIZE
    }
}
