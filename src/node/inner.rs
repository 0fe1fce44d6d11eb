use std::sync::Arc;

use super::{bit_index, Node, NodeCache};
use crate::spec::{Hasher, TrieSpec};

/// An inner node has exactly 2 children, neither of which is the empty
/// subtree once the trie is in canonical form.
/// In sum tries its digest carries the sum and leaf count of its descendants.
#[derive(Debug)]
pub struct InnerNode<const N: usize> {
    left: Arc<Node<N>>,
    right: Arc<Node<N>>,
    cache: NodeCache,
}

impl<const N: usize> InnerNode<N> {
    pub fn new(left: Arc<Node<N>>, right: Arc<Node<N>>) -> Self {
        Self {
            left,
            right,
            cache: NodeCache::default(),
        }
    }

    /// Builds the inner node at `depth` that places `ours` on the side `path`
    /// takes and `other` on the opposite side.
    pub fn ordered(depth: usize, path: &[u8; N], ours: Arc<Node<N>>, other: Arc<Node<N>>) -> Self {
        if bit_index(depth, path) == 0 {
            Self::new(ours, other)
        } else {
            Self::new(other, ours)
        }
    }

    pub(crate) fn stored(left: Arc<Node<N>>, right: Arc<Node<N>>, digest: Option<Vec<u8>>) -> Self {
        Self {
            left,
            right,
            cache: NodeCache::stored(digest),
        }
    }

    /// Returns the left and right children of this node.
    pub fn children(&self) -> (&Arc<Node<N>>, &Arc<Node<N>>) {
        (&self.left, &self.right)
    }

    pub fn left(&self) -> &Arc<Node<N>> {
        &self.left
    }

    pub fn right(&self) -> &Arc<Node<N>> {
        &self.right
    }

    /// Returns `(next, sibling)` for a walk along `path` through this node,
    /// which sits at `depth`.
    pub fn step(&self, depth: usize, path: &[u8; N]) -> (&Arc<Node<N>>, &Arc<Node<N>>) {
        if bit_index(depth, path) == 0 {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        }
    }

    pub fn digest<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> &[u8] {
        self.cache
            .digest(|| spec.digest_inner(self.left.digest(spec), self.right.digest(spec)))
    }

    pub fn encode<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Vec<u8> {
        spec.encode_inner(self.left.digest(spec), self.right.digest(spec))
    }

    pub(crate) fn cache(&self) -> &NodeCache {
        &self.cache
    }
}
