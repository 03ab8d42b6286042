//! Index structures.
//!
//! - [`btree`] - Disk-backed B-tree operating through the node cache

pub mod btree;
