//! Block identifier type.

use std::fmt;

/// Identifies a fixed-size block in the index file.
///
/// Block `n` lives at byte offset `n × block_size`. Block 0 always holds the
/// [`IndexHeader`](crate::storage::block::IndexHeader); nodes start at block 1.
///
/// Nodes never reference each other in memory. A parent records its
/// children as `BlockId`s and the engine resolves them through the
/// [`NodeCache`](crate::buffer::NodeCache).
///
/// # Example
/// ```
/// use diskbtree::BlockId;
///
/// let id = BlockId::new(42);
/// assert!(id.is_valid());
/// assert!(!id.is_header());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl BlockId {
    /// The header block.
    pub const HEADER: BlockId = BlockId(0);

    /// Invalid/sentinel block ID ("no block").
    pub const INVALID: BlockId = BlockId(u64::MAX);

    /// Create a new BlockId.
    #[inline]
    pub fn new(id: u64) -> Self {
        BlockId(id)
    }

    /// Check if this block ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Check if this is the header block.
    #[inline]
    pub fn is_header(&self) -> bool {
        *self == Self::HEADER
    }

    /// Byte offset of this block in a file with the given block size.
    ///
    /// Returns `None` if the offset does not fit in a `u64`.
    #[inline]
    pub fn offset(&self, block_size: usize) -> Option<u64> {
        self.0.checked_mul(block_size as u64)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Block(INVALID)")
        } else {
            write!(f, "Block({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_new() {
        let id = BlockId::new(42);
        assert_eq!(id.0, 42);
        assert!(id.is_valid());
    }

    #[test]
    fn test_block_id_sentinels() {
        assert!(!BlockId::INVALID.is_valid());
        assert!(BlockId::HEADER.is_header());
        assert!(BlockId::HEADER.is_valid());
    }

    #[test]
    fn test_block_id_offset() {
        assert_eq!(BlockId::new(0).offset(512), Some(0));
        assert_eq!(BlockId::new(3).offset(512), Some(1536));
    }

    #[test]
    fn test_block_id_offset_overflow() {
        assert_eq!(BlockId::new(u64::MAX / 2).offset(512), None);
        assert_eq!(BlockId::INVALID.offset(73), None);
    }

    #[test]
    fn test_block_id_display() {
        assert_eq!(format!("{}", BlockId::new(7)), "Block(7)");
        assert_eq!(format!("{}", BlockId::INVALID), "Block(INVALID)");
    }
}
