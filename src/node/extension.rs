use std::sync::Arc;

use super::{bit_index, Node, NodeCache};
use crate::spec::{Hasher, TrieSpec, EXTENSION_PREFIX};

/// An extension compresses the levels `[start, end)` in which every node has a
/// single non-empty child. The bits of `path` in that range spell the route to
/// `child`, which is always an inner node in canonical form.
///
/// Its digest equals the digest of the uncompressed chain of inner nodes, so
/// compression never shows in roots or proofs.
#[derive(Debug)]
pub struct ExtensionNode<const N: usize> {
    path: [u8; N],
    start: usize,
    end: usize,
    child: Arc<Node<N>>,
    cache: NodeCache,
}

impl<const N: usize> ExtensionNode<N> {
    pub fn new(path: [u8; N], start: usize, end: usize, child: Arc<Node<N>>) -> Self {
        debug_assert!(start < end && end <= N * 8);
        Self {
            path,
            start,
            end,
            child,
            cache: NodeCache::default(),
        }
    }

    pub(crate) fn stored(
        path: [u8; N],
        start: usize,
        end: usize,
        child: Arc<Node<N>>,
        digest: Option<Vec<u8>>,
    ) -> Self {
        Self {
            path,
            start,
            end,
            child,
            cache: NodeCache::stored(digest),
        }
    }

    pub fn path(&self) -> &[u8; N] {
        &self.path
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn child(&self) -> &Arc<Node<N>> {
        &self.child
    }

    /// First bit in `[start, end)` where `path` leaves this extension.
    pub fn diverging_bit(&self, path: &[u8; N]) -> Option<usize> {
        (self.start..self.end).find(|index| bit_index(*index, path) != bit_index(*index, &self.path))
    }

    /// Same run, new child.
    pub fn with_child(&self, child: Arc<Node<N>>) -> Self {
        Self::new(self.path, self.start, self.end, child)
    }

    /// Same child, run extended upwards to begin at `start`.
    pub fn widened(&self, start: usize) -> Self {
        Self::new(self.path, start, self.end, self.child.clone())
    }

    /// The part of the run above `bit`, placed over `child`. Returns `child`
    /// when `bit` is the first level of the run.
    pub fn prefix(&self, bit: usize, child: Arc<Node<N>>) -> Arc<Node<N>> {
        if bit > self.start {
            Arc::new(Node::Extension(Self::new(self.path, self.start, bit, child)))
        } else {
            child
        }
    }

    /// The subtree hanging below level `bit` on this extension's side.
    pub fn remainder(&self, bit: usize) -> Arc<Node<N>> {
        if bit + 1 < self.end {
            Arc::new(Node::Extension(Self::new(
                self.path,
                bit + 1,
                self.end,
                self.child.clone(),
            )))
        } else {
            self.child.clone()
        }
    }

    /// The compressed levels, deepest first.
    pub fn levels(&self) -> ExtensionLevels<'_, N> {
        ExtensionLevels::new(&self.path, self.start, self.end)
    }

    pub fn digest<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> &[u8] {
        self.cache
            .digest(|| spec.fold_levels(self.child.digest(spec).to_vec(), self.levels()))
    }

    pub fn encode<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Vec<u8> {
        let bounds = spec.bounds_size();
        let child = self.child.digest(spec);
        let mut record = Vec::with_capacity(1 + 2 * bounds + N + child.len());
        record.push(EXTENSION_PREFIX);
        for bound in [self.start, self.end] {
            record.extend_from_slice(&bound.to_be_bytes()[usize::BITS as usize / 8 - bounds..]);
        }
        record.extend_from_slice(&self.path);
        record.extend_from_slice(child);
        record
    }

    pub(crate) fn cache(&self) -> &NodeCache {
        &self.cache
    }
}

/// Walks the levels of an extension from `end - 1` up to `start`, yielding
/// `(level, bit)`. Call [`ExtensionNode::levels`] again to walk the run anew.
#[derive(Debug, Clone)]
pub struct ExtensionLevels<'a, const N: usize> {
    path: &'a [u8; N],
    start: usize,
    next: usize,
}

impl<'a, const N: usize> ExtensionLevels<'a, N> {
    pub fn new(path: &'a [u8; N], start: usize, end: usize) -> Self {
        Self {
            path,
            start,
            next: end,
        }
    }
}

impl<const N: usize> Iterator for ExtensionLevels<'_, N> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next <= self.start {
            return None;
        }
        self.next -= 1;
        Some((self.next, bit_index(self.next, self.path)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.next.saturating_sub(self.start);
        (len, Some(len))
    }
}

impl<const N: usize> ExactSizeIterator for ExtensionLevels<'_, N> {}
