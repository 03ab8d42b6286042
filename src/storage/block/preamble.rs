//! Block preamble and kind definitions.
//!
//! Every block starts with a [`BlockPreamble`] containing:
//! - [`BlockKind`] discriminator
//! - CRC32 checksum over the whole block

/// Type of block stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Uninitialized or corrupted block.
    #[default]
    Invalid = 0,
    /// The index header (block 0).
    Header = 1,
    /// B-tree internal (routing) node.
    Internal = 2,
    /// B-tree leaf node.
    Leaf = 3,
}

impl BlockKind {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BlockKind::Header,
            2 => BlockKind::Internal,
            3 => BlockKind::Leaf,
            _ => BlockKind::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every block.
///
/// # Layout (5 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     kind (BlockKind as u8)
/// 1       4     checksum (CRC32, little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire block with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockPreamble {
    /// Type of this block.
    pub kind: BlockKind,
    /// CRC32 checksum of the block contents.
    pub checksum: u32,
}

impl BlockPreamble {
    /// Size of the preamble in bytes.
    pub const SIZE: usize = 5;

    pub const OFFSET_KIND: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;

    /// Create a new preamble with the given kind and a zero checksum.
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, checksum: 0 }
    }

    /// Read a preamble from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < BlockPreamble::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for BlockPreamble");

        let kind = BlockKind::from_u8(data[Self::OFFSET_KIND]);
        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        Self { kind, checksum }
    }

    /// Write this preamble to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < BlockPreamble::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for BlockPreamble");

        data[Self::OFFSET_KIND] = self.kind as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Compute CRC32 checksum of a block.
    ///
    /// The checksum field (bytes 1-4) is treated as zero, so the checksum
    /// doesn't include itself.
    pub fn compute_checksum(block_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&block_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&block_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, block_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(block_data)
    }
}

// ============================================================================
// TESTS
// ============================================================================
