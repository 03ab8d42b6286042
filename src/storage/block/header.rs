//! Index header stored in block 0.

use crate::common::config::{validate_block_size, FORMAT_VERSION, MAGIC};
use crate::common::{BlockId, Error, Result};

use super::block::Block;
use super::preamble::{BlockKind, BlockPreamble};

/// Index-wide metadata stored in block 0.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       5     preamble (kind = Header, CRC32)
/// 5       8     magic "DBTREIDX"
/// 13      4     format version
/// 17      4     block size
/// 21      8     root block id
/// 29      8     node count
/// 37      8     next free block id (allocation cursor)
/// ```
///
/// The rest of the block is zero. All integers are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Block size of every block in the file.
    pub block_size: u32,
    /// Root node, or `BlockId::INVALID` before the first root is allocated.
    pub root: BlockId,
    /// Number of node blocks allocated so far.
    pub node_count: u64,
    /// Next block id handed out by allocation. Never decreases.
    pub next_free: u64,
}

impl IndexHeader {
    pub const OFFSET_MAGIC: usize = BlockPreamble::SIZE;
    pub const OFFSET_VERSION: usize = Self::OFFSET_MAGIC + 8;
    pub const OFFSET_BLOCK_SIZE: usize = Self::OFFSET_VERSION + 4;
    pub const OFFSET_ROOT: usize = Self::OFFSET_BLOCK_SIZE + 4;
    pub const OFFSET_NODE_COUNT: usize = Self::OFFSET_ROOT + 8;
    pub const OFFSET_NEXT_FREE: usize = Self::OFFSET_NODE_COUNT + 8;

    /// Encoded size of the header fields, including the preamble.
    pub const SIZE: usize = Self::OFFSET_NEXT_FREE + 8;

    /// Header for a freshly created, still empty index.
    ///
    /// Block 0 is the header itself, so allocation starts at block 1.
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size,
            root: BlockId::INVALID,
            node_count: 0,
            next_free: 1,
        }
    }

    /// Encode into a full block with a valid checksum.
    pub fn to_block(&self) -> Block {
        let mut block = Block::zeroed(self.block_size as usize);
        BlockPreamble::new(BlockKind::Header).write_to(block.as_mut_slice());
        block.as_mut_slice()[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + 8].copy_from_slice(&MAGIC);
        block.write_u32(Self::OFFSET_VERSION, FORMAT_VERSION);
        block.write_u32(Self::OFFSET_BLOCK_SIZE, self.block_size);
        block.write_u64(Self::OFFSET_ROOT, self.root.0);
        block.write_u64(Self::OFFSET_NODE_COUNT, self.node_count);
        block.write_u64(Self::OFFSET_NEXT_FREE, self.next_free);
        block.update_checksum();
        block
    }

    /// Read the block size from the first [`IndexHeader::SIZE`] bytes.
    ///
    /// Used to size the full header read before the checksum can be checked.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` if the prefix is not a header of this format.
    pub fn peek_block_size(prefix: &[u8]) -> Result<u32> {
        if prefix.len() < Self::SIZE {
            return Err(Error::Corrupt("header block is truncated".into()));
        }
        Self::check_identity(prefix)?;

        let size = u32::from_le_bytes([
            prefix[Self::OFFSET_BLOCK_SIZE],
            prefix[Self::OFFSET_BLOCK_SIZE + 1],
            prefix[Self::OFFSET_BLOCK_SIZE + 2],
            prefix[Self::OFFSET_BLOCK_SIZE + 3],
        ]);
        validate_block_size(size)
            .map_err(|_| Error::Corrupt(format!("header declares invalid block size {}", size)))?;
        Ok(size)
    }

    /// Decode and validate a full header block.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` on a wrong kind, magic, version, block size
    /// or checksum, or when the root lies outside the allocated range.
    pub fn from_block(block: &Block) -> Result<Self> {
        let data = block.as_slice();
        if data.len() < Self::SIZE {
            return Err(Error::Corrupt("header block is truncated".into()));
        }
        Self::check_identity(data)?;

        if !block.verify_checksum() {
            return Err(Error::Corrupt("header checksum mismatch".into()));
        }

        let header = Self {
            block_size: block.read_u32(Self::OFFSET_BLOCK_SIZE),
            root: BlockId::new(block.read_u64(Self::OFFSET_ROOT)),
            node_count: block.read_u64(Self::OFFSET_NODE_COUNT),
            next_free: block.read_u64(Self::OFFSET_NEXT_FREE),
        };

        if header.block_size as usize != data.len() {
            return Err(Error::Corrupt(format!(
                "header block size {} does not match block length {}",
                header.block_size,
                data.len()
            )));
        }
        if header.next_free == 0 || header.node_count != header.next_free - 1 {
            return Err(Error::Corrupt(format!(
                "node count {} inconsistent with next free block {}",
                header.node_count, header.next_free
            )));
        }
        if header.root.is_valid() && (header.root.is_header() || header.root.0 >= header.next_free)
        {
            return Err(Error::Corrupt(format!(
                "root {} outside allocated range",
                header.root
            )));
        }

        Ok(header)
    }

    /// Check kind, magic and version.
    fn check_identity(data: &[u8]) -> Result<()> {
        let preamble = BlockPreamble::from_bytes(data);
        if preamble.kind != BlockKind::Header {
            return Err(Error::Corrupt(format!(
                "block 0 has kind {:?}, expected Header",
                preamble.kind
            )));
        }
        if data[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + 8] != MAGIC {
            return Err(Error::Corrupt("bad magic".into()));
        }
        let version = u32::from_le_bytes([
            data[Self::OFFSET_VERSION],
            data[Self::OFFSET_VERSION + 1],
            data[Self::OFFSET_VERSION + 2],
            data[Self::OFFSET_VERSION + 3],
        ]);
        if version != FORMAT_VERSION {
            return Err(Error::Corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }
        Ok(())
    }
}
