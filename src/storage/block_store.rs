//! Block Store - low-level file I/O for index blocks.
//!
//! The [`BlockStore`] handles all direct file operations:
//! - Reading and writing blocks
//! - Allocating new blocks
//! - Reading and writing the header in block 0

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::{BlockId, Config, Error, Result};
use crate::storage::block::{Block, IndexHeader, NodeLayout};

/// Manages block I/O for a single index file.
///
/// # File Layout
/// The index is stored as a single file with blocks laid out sequentially:
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Block 0  │ Block 1 │ Block 2 │  ...    │ Block N │
/// │ (header) │ (node)  │ (node)  │         │ (node)  │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      B        2B       ...      N×B
/// ```
///
/// Block N is located at file offset `N × block_size`.
///
/// # Header
/// The store owns the in-memory [`IndexHeader`]. Allocation advances its
/// cursor and marks it dirty; it only reaches disk through
/// [`write_header`](Self::write_header), which the node cache calls after
/// every dirty node has been flushed.
///
/// # Thread Safety
/// `BlockStore` is **single-threaded** and assumes exclusive ownership of
/// the file for as long as it is open.
pub struct BlockStore {
    file: File,
    path: PathBuf,
    header: IndexHeader,
    layout: NodeLayout,
    /// Header changed in memory since it was last written.
    header_dirty: bool,
    /// fsync after every write.
    sync_writes: bool,
    /// Writes issued since the last fsync.
    unsynced: bool,
    /// Remaining block writes before writes start failing.
    #[cfg(test)]
    write_budget: Option<u64>,
}

impl BlockStore {
    /// Create a new index file containing only the header block.
    ///
    /// # Errors
    /// - `Error::InvalidBlockSize` if `config.block_size` is out of range
    /// - `Error::IndexExists` if the file already exists
    pub fn create<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let layout = NodeLayout::for_block_size(config.block_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::IndexExists(path.to_path_buf()),
                _ => Error::Io(e),
            })?;

        let mut store = Self {
            file,
            path: path.to_path_buf(),
            header: IndexHeader::new(config.block_size),
            layout,
            header_dirty: true,
            sync_writes: config.sync_writes,
            unsynced: false,
            #[cfg(test)]
            write_budget: None,
        };
        store.write_header()?;

        info!(
            path = %path.display(),
            block_size = config.block_size,
            order = layout.order(),
            "created index file"
        );
        Ok(store)
    }

    /// Open an existing index file.
    ///
    /// The block size comes from the header; `config.block_size` is ignored.
    ///
    /// # Errors
    /// - I/O errors if the file doesn't exist or cannot be read
    /// - `Error::Corrupt` if the header is invalid or the file is shorter
    ///   than the allocation cursor claims
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut prefix = [0u8; IndexHeader::SIZE];
        file.read_exact(&mut prefix).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::Corrupt("file too short for a header".into()),
            _ => Error::Io(e),
        })?;
        let block_size = IndexHeader::peek_block_size(&prefix)?;
        let layout = NodeLayout::for_block_size(block_size)?;

        let mut block = Block::zeroed(block_size as usize);
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(block.as_mut_slice())?;
        let header = IndexHeader::from_block(&block)?;

        let file_size = file.metadata()?.len();
        let required = block_offset(BlockId::new(header.next_free), &layout)?;
        if file_size < required {
            return Err(Error::Corrupt(format!(
                "file is {} bytes but {} blocks of {} bytes are allocated",
                file_size,
                header.next_free,
                block_size
            )));
        }

        debug!(
            path = %path.display(),
            block_size,
            root = %header.root,
            nodes = header.node_count,
            "opened index file"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            header,
            layout,
            header_dirty: false,
            sync_writes: config.sync_writes,
            unsynced: false,
            #[cfg(test)]
            write_budget: None,
        })
    }

    // ========================================================================
    // Block I/O
    // ========================================================================

    /// Read a block from disk.
    ///
    /// # Errors
    /// - `Error::BlockOutOfRange` if the block has not been allocated
    /// - `Error::Io` on a short read or other read failure
    pub fn read(&mut self, id: BlockId) -> Result<Block> {
        self.check_range(id)?;

        let mut block = Block::zeroed(self.layout.block_size());
        self.file
            .seek(SeekFrom::Start(block_offset(id, &self.layout)?))?;
        self.file.read_exact(block.as_mut_slice())?;

        Ok(block)
    }

    /// Write one block to disk.
    ///
    /// The block must have been previously allocated with `allocate()`.
    ///
    /// # Errors
    /// - `Error::BlockOutOfRange` if the block hasn't been allocated
    /// - `Error::Corrupt` if `block` is not exactly one block long
    /// - `Error::Io` on write failure
    pub fn write(&mut self, id: BlockId, block: &Block) -> Result<()> {
        self.check_range(id)?;
        if block.len() != self.layout.block_size() {
            return Err(Error::Corrupt(format!(
                "refusing to write {} bytes to {} (block size {})",
                block.len(),
                id,
                self.layout.block_size()
            )));
        }

        self.consume_write_budget()?;
        self.file
            .seek(SeekFrom::Start(block_offset(id, &self.layout)?))?;
        self.file.write_all(block.as_slice())?;
        self.after_write()
    }

    /// Allocate a new block at the end of the file.
    ///
    /// Returns the `BlockId` of the newly allocated block. The block is
    /// initialized with zeros and the header is marked dirty.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot grow.
    pub fn allocate(&mut self) -> Result<BlockId> {
        let id = BlockId::new(self.header.next_free);

        self.consume_write_budget()?;
        let zeros = Block::zeroed(self.layout.block_size());
        self.file
            .seek(SeekFrom::Start(block_offset(id, &self.layout)?))?;
        self.file.write_all(zeros.as_slice())?;
        self.after_write()?;

        self.header.next_free += 1;
        self.header.node_count += 1;
        self.header_dirty = true;

        debug!(block = %id, "allocated block");
        Ok(id)
    }

    // ========================================================================
    // Header
    // ========================================================================

    /// Re-read and validate the header currently on disk.
    ///
    /// This does not replace the in-memory header.
    pub fn read_header(&mut self) -> Result<IndexHeader> {
        let mut block = Block::zeroed(self.layout.block_size());
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(block.as_mut_slice())?;
        IndexHeader::from_block(&block)
    }

    /// Write the in-memory header to block 0.
    pub fn write_header(&mut self) -> Result<()> {
        self.consume_write_budget()?;
        let block = self.header.to_block();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(block.as_slice())?;
        self.after_write()?;

        self.header_dirty = false;
        debug!(root = %self.header.root, next_free = self.header.next_free, "wrote header");
        Ok(())
    }

    /// The in-memory header.
    #[inline]
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Point the header at a new root. Takes effect on disk at the next
    /// `write_header`.
    pub fn set_root(&mut self, root: BlockId) {
        self.header.root = root;
        self.header_dirty = true;
    }

    /// Whether the in-memory header differs from the one on disk.
    #[inline]
    pub fn is_header_dirty(&self) -> bool {
        self.header_dirty
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Node geometry for this file.
    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Path of the index file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the allocated part of the file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        BlockId::new(self.header.next_free)
            .offset(self.layout.block_size())
            .unwrap_or(u64::MAX)
    }

    /// fsync any writes issued since the last sync.
    pub fn sync(&mut self) -> Result<()> {
        if self.unsynced {
            self.file.sync_all()?;
            self.unsynced = false;
        }
        Ok(())
    }

    /// Limit the number of further block writes; `None` lifts the limit.
    #[cfg(test)]
    pub(crate) fn set_write_budget(&mut self, budget: Option<u64>) {
        self.write_budget = budget;
    }

    /// Fail the write about to be issued once the test write budget is spent.
    fn consume_write_budget(&mut self) -> Result<()> {
        #[cfg(test)]
        if let Some(budget) = self.write_budget.as_mut() {
            if *budget == 0 {
                return Err(Error::Io(std::io::Error::other("write budget exhausted")));
            }
            *budget -= 1;
        }
        Ok(())
    }

    fn after_write(&mut self) -> Result<()> {
        if self.sync_writes {
            self.file.sync_all()?; // fsync for durability
        } else {
            self.unsynced = true;
        }
        Ok(())
    }

    fn check_range(&self, id: BlockId) -> Result<()> {
        if id.0 >= self.header.next_free {
            return Err(Error::BlockOutOfRange {
                id,
                next_free: self.header.next_free,
            });
        }
        Ok(())
    }
}

/// Byte offset of `id`, rejecting ids whose offset overflows.
fn block_offset(id: BlockId, layout: &NodeLayout) -> Result<u64> {
    id.offset(layout.block_size()).ok_or_else(|| {
        Error::Corrupt(format!(
            "{} lies beyond any addressable offset for {}-byte blocks",
            id,
            layout.block_size()
        ))
    })
}
