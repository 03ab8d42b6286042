//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`LruReplacer`] - Least Recently Used, the node cache's policy

mod lru;

pub use lru::LruReplacer;
