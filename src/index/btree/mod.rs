//! B-tree index implementation.
//!
//! The tree lives in one file of fixed-size blocks and is only ever touched
//! through the [`NodeCache`](crate::buffer::NodeCache):
//! - [`BTree`] - create/open, insert with top-down splitting, search
//! - [`Iter`] - lazy in-order traversal of the leaf entries
//! - [`TreeShape`] / [`IndexInfo`] - structural checks and summaries

mod iter;
mod tree;

pub use iter::Iter;
pub use tree::{BTree, IndexInfo, TreeShape};
