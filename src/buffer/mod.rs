//! Node cache management.
//!
//! The node cache is the in-memory layer between the B-tree engine and the
//! block store. It keeps a small, fixed number of decoded nodes resident.
//!
//! # Components
//! - [`NodeCache`] - The bounded write-back cache
//! - [`CacheStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod node_cache;
pub mod replacer;
mod stats;

pub use node_cache::NodeCache;
pub use stats::CacheStats;
