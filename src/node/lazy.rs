use std::sync::{Arc, OnceLock};

use super::Node;

/// Placeholder for a stored node that has not been read yet. Only its digest
/// is known; the trie resolves it from the store when a walk reaches it and
/// keeps the decoded node for later walks.
#[derive(Debug)]
pub struct LazyNode<const N: usize> {
    digest: Vec<u8>,
    resolved: OnceLock<Arc<Node<N>>>,
}

impl<const N: usize> LazyNode<N> {
    pub fn new(digest: Vec<u8>) -> Self {
        Self {
            digest,
            resolved: OnceLock::new(),
        }
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// The node read from the store, once a walk has resolved it.
    pub fn resolved(&self) -> Option<&Arc<Node<N>>> {
        self.resolved.get()
    }

    pub(crate) fn set_resolved(&self, node: Arc<Node<N>>) -> Arc<Node<N>> {
        self.resolved.get_or_init(|| node).clone()
    }
}
