//! diskbtree - A disk-backed B-tree index with a bounded node cache.
//!
//! One index lives in one file of fixed-size blocks. At most
//! [`NODE_CACHE_CAPACITY`](common::config::NODE_CACHE_CAPACITY) decoded nodes
//! are held in memory at any time.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           diskbtree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              Bulk Layer (bulk/)                         │    │
//! │  │        BulkLoader (CSV in) + Extractor (CSV out)        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              Index Layer (index/)                       │    │
//! │  │   BTree: top-down split insert, search, ordered iter    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              Node Cache (buffer/)                       │    │
//! │  │     NodeCache + LruReplacer + CacheStats (3 nodes)      │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              Storage Layer (storage/)                   │    │
//! │  │   BlockStore + IndexHeader + Node codec + checksums     │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, Error, config)
//! - [`storage`] - Block I/O and on-disk formats
//! - [`buffer`] - Node cache and its eviction policy
//! - [`index`] - The B-tree engine
//! - [`bulk`] - CSV bulk load and extract
//!
//! # Quick Start
//! ```no_run
//! use diskbtree::{BTree, Config, Extractor};
//!
//! let config = Config::builder().block_size(512).build();
//! let mut tree = BTree::create("numbers.idx", &config)?;
//!
//! for k in 1..=100 {
//!     tree.insert(k, k * k)?;
//! }
//! assert_eq!(tree.search(12)?, 144);
//!
//! Extractor::new().extract_path(&mut tree, "numbers.csv")?;
//! tree.close()?;
//! # Ok::<(), diskbtree::Error>(())
//! ```

pub mod buffer;
pub mod bulk;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{BlockId, Config, ConfigBuilder, Error, Key, LoadPolicy, Result, Value};

pub use buffer::{CacheStats, NodeCache};
pub use bulk::{BulkLoader, Extractor, LoadReport};
pub use index::btree::{BTree, IndexInfo, Iter, TreeShape};
pub use storage::BlockStore;
