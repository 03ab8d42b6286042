//! Configuration constants and the runtime [`Config`].

use crate::common::{Error, Result};

/// Default block size in bytes.
///
/// 512-byte blocks give an order of 30 (29 keys per node).
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Smallest block size that still fits an order-4 node.
///
/// # Node Layout
/// A node needs a 17-byte header plus, for an internal node, `max_keys`
/// keys and `max_keys + 1` child ids at 8 bytes each:
/// `17 + 8 × 3 + 8 × 4 = 73`.
pub const MIN_BLOCK_SIZE: u32 = 73;

/// Largest accepted block size (1 MiB).
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

/// Maximum number of decoded nodes resident in the [`NodeCache`](crate::buffer::NodeCache).
///
/// A split touches the node being split, its parent and the new sibling,
/// so three is the smallest capacity that lets a split proceed without
/// re-reading one of them.
pub const NODE_CACHE_CAPACITY: usize = 3;

/// Size of a key on disk.
pub const KEY_SIZE: usize = 8;

/// Size of a value on disk.
pub const VALUE_SIZE: usize = 8;

/// Size of a child block id on disk.
pub const CHILD_ID_SIZE: usize = 8;

/// File magic stored in the header block.
pub const MAGIC: [u8; 8] = *b"DBTREIDX";

/// On-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// What the bulk loader does with a record it cannot insert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Stop at the first malformed record and report it.
    #[default]
    Abort,
    /// Log the record, count it as skipped and continue.
    Skip,
}

/// Runtime configuration for an index.
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Block size used when creating a new index. Ignored by `open`, which
    /// takes the block size from the header.
    pub block_size: u32,

    /// fsync after every block write. When false the file is synced once
    /// when the index is closed.
    pub sync_writes: bool,

    // -------------------------------------------------------------------------
    // Bulk Load Configuration
    // -------------------------------------------------------------------------
    /// Malformed-record policy for [`BulkLoader`](crate::bulk::BulkLoader).
    pub load_policy: LoadPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sync_writes: true,
            load_policy: LoadPolicy::Abort,
        }
    }
}

impl Config {
    /// Create a new config builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configured block size is usable.
    ///
    /// # Errors
    /// Returns `Error::InvalidBlockSize` if the size is outside
    /// `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`.
    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)
    }
}

/// Check that `block_size` lies within `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`.
pub fn validate_block_size(block_size: u32) -> Result<()> {
    if (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        Ok(())
    } else {
        Err(Error::InvalidBlockSize(block_size))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the block size used for new indexes.
    pub fn block_size(mut self, block_size: u32) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Enable or disable fsync after every block write.
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the bulk-load malformed-record policy.
    pub fn load_policy(mut self, policy: LoadPolicy) -> Self {
        self.config.load_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert!(config.sync_writes);
        assert_eq!(config.load_policy, LoadPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .block_size(1024)
            .sync_writes(false)
            .load_policy(LoadPolicy::Skip)
            .build();

        assert_eq!(config.block_size, 1024);
        assert!(!config.sync_writes);
        assert_eq!(config.load_policy, LoadPolicy::Skip);
    }

    #[test]
    fn test_block_size_bounds() {
        assert!(validate_block_size(MIN_BLOCK_SIZE).is_ok());
        assert!(validate_block_size(MAX_BLOCK_SIZE).is_ok());
        assert!(matches!(
            validate_block_size(MIN_BLOCK_SIZE - 1),
            Err(Error::InvalidBlockSize(72))
        ));
        assert!(validate_block_size(MAX_BLOCK_SIZE + 1).is_err());
    }
}
