//! Block - the fixed-size unit of storage.
//!
//! A [`Block`] is a raw byte buffer whose length is the index's block size.
//! It is the unit of I/O between the [`BlockStore`](crate::storage::BlockStore)
//! and the node codecs.

use super::preamble::BlockPreamble;

/// A block of data, `block_size` bytes long.
///
/// Unlike a compile-time page, the block size is chosen when the index is
/// created and read back from the header on open, so the buffer is heap
/// allocated.
///
/// # Clone Implementation
/// `Block` does NOT implement `Clone` in production code; copying a block
/// should be explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use diskbtree::storage::block::Block;
///
/// let mut block = Block::zeroed(128);
/// block.as_mut_slice()[0] = 0xFF;
/// assert_eq!(block.as_slice()[0], 0xFF);
/// assert_eq!(block.len(), 128);
/// ```
pub struct Block {
    data: Box<[u8]>,
}

impl Block {
    /// Create a new zeroed block.
    #[inline]
    pub fn zeroed(block_size: usize) -> Self {
        Self {
            data: vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// Get immutable slice of block data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of block data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Block length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the block has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Zero out the entire block.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read the block preamble.
    pub fn preamble(&self) -> BlockPreamble {
        BlockPreamble::from_bytes(&self.data)
    }

    /// Compute and store checksum in the preamble.
    ///
    /// Call this after all modifications to the block are complete.
    pub fn update_checksum(&mut self) {
        let checksum = BlockPreamble::compute_checksum(&self.data);
        self.data[BlockPreamble::OFFSET_CHECKSUM..BlockPreamble::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the block checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.preamble().verify_checksum(&self.data)
    }

    // ========================================================================
    // Little-endian field access
    // ========================================================================

    #[inline]
    pub(crate) fn read_u32(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(buf)
    }

    #[inline]
    pub(crate) fn read_u64(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    pub(crate) fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub(crate) fn write_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Block {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block::BlockKind;

    #[test]
    fn test_block_zeroed() {
        let block = Block::zeroed(512);
        assert_eq!(block.len(), 512);
        assert!(block.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_block_reset() {
        let mut block = Block::zeroed(64);
        block.as_mut_slice()[0] = 0xFF;
        block.as_mut_slice()[63] = 0xAB;

        block.reset();

        assert_eq!(block.as_slice()[0], 0);
        assert_eq!(block.as_slice()[63], 0);
    }

    #[test]
    fn test_field_access_little_endian() {
        let mut block = Block::zeroed(32);
        block.write_u32(5, 0x0403_0201);
        block.write_u64(9, 0x0807_0605_0403_0201);

        assert_eq!(block.as_slice()[5], 0x01);
        assert_eq!(block.as_slice()[8], 0x04);
        assert_eq!(block.as_slice()[9], 0x01);
        assert_eq!(block.as_slice()[16], 0x08);
        assert_eq!(block.read_u32(5), 0x0403_0201);
        assert_eq!(block.read_u64(9), 0x0807_0605_0403_0201);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let mut block = Block::zeroed(128);
        BlockPreamble::new(BlockKind::Leaf).write_to(block.as_mut_slice());
        block.as_mut_slice()[100] = 0x42;
        block.update_checksum();

        assert!(block.verify_checksum());

        let mut corrupted = block.clone();
        corrupted.as_mut_slice()[100] = 0x43;
        assert!(!corrupted.verify_checksum());
    }
}
