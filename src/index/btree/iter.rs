//! Lazy in-order traversal.

use std::iter::FusedIterator;
use std::vec;

use crate::buffer::NodeCache;
use crate::common::{BlockId, Error, Key, Result, Value};
use crate::storage::block::Node;

/// Remaining children of one internal node on the current path.
struct Frame {
    children: Vec<BlockId>,
    next: usize,
}

/// Ascending iterator over every key/value pair, created by
/// [`BTree::iter`](super::BTree::iter).
///
/// Only the child ids along the current root-to-leaf path and the pairs of
/// the current leaf are held, so nodes are fetched through the cache one at
/// a time. The first error ends the iteration.
pub struct Iter<'a> {
    cache: &'a mut NodeCache,
    stack: Vec<Frame>,
    pending: vec::IntoIter<(Key, Value)>,
    depth_limit: usize,
    started: bool,
    done: bool,
}

impl<'a> Iter<'a> {
    pub(super) fn new(cache: &'a mut NodeCache, depth_limit: usize) -> Self {
        Self {
            cache,
            stack: Vec::new(),
            pending: Vec::new().into_iter(),
            depth_limit,
            started: false,
            done: false,
        }
    }

    /// Follow leftmost children from `id` down to a leaf and queue its pairs.
    fn descend(&mut self, mut id: BlockId) -> Result<()> {
        loop {
            if self.stack.len() > self.depth_limit {
                return Err(Error::Corrupt(format!(
                    "traversal reached {} below depth {}",
                    id, self.depth_limit
                )));
            }

            match self.cache.get(id)? {
                Node::Leaf(leaf) => {
                    let pairs: Vec<(Key, Value)> = leaf
                        .keys
                        .iter()
                        .copied()
                        .zip(leaf.values.iter().copied())
                        .collect();
                    self.pending = pairs.into_iter();
                    return Ok(());
                }
                Node::Internal(internal) => {
                    let children = internal.children.clone();
                    id = children[0];
                    self.stack.push(Frame { children, next: 1 });
                }
            }
        }
    }

    /// Next unvisited subtree to the right of the current leaf.
    fn next_subtree(&mut self) -> Option<BlockId> {
        while let Some(frame) = self.stack.last_mut() {
            if let Some(&child) = frame.children.get(frame.next) {
                frame.next += 1;
                return Some(child);
            }
            self.stack.pop();
        }
        None
    }
}

impl Iterator for Iter<'_> {
    type Item = Result<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(pair) = self.pending.next() {
                return Some(Ok(pair));
            }

            let subtree = if self.started {
                self.next_subtree()
            } else {
                self.started = true;
                Some(self.cache.root())
            };

            let Some(id) = subtree else {
                self.done = true;
                return None;
            };

            if let Err(e) = self.descend(id) {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

impl FusedIterator for Iter<'_> {}
