//! Storage layer - disk I/O and block formats.
//!
//! This module handles persistent storage:
//! - [`BlockStore`] - Low-level block file I/O and allocation
//! - [`block`] - Block types and layouts

pub mod block;
mod block_store;

pub use block_store::BlockStore;
