//! Block types and layouts.
//!
//! This module contains:
//! - [`Block`] - A raw fixed-size byte buffer (the unit of I/O)
//! - [`BlockPreamble`] / [`BlockKind`] - Kind tag and CRC32 shared by every block
//! - [`IndexHeader`] - The header stored in block 0
//! - [`NodeLayout`] - Node geometry derived from the block size
//! - [`Node`] - A decoded leaf or internal node

#[allow(clippy::module_inception)]
mod block;
mod header;
mod layout;
mod node;
mod preamble;

pub use block::Block;
pub use header::IndexHeader;
pub use layout::NodeLayout;
pub use node::{InternalNode, LeafNode, Node};
pub use preamble::{BlockKind, BlockPreamble};
