use super::{NodeCache, Sum};
use crate::spec::{Hasher, TrieSpec};

/// A leaf holds the path of its key, the digest of its value and, in sum
/// tries, the weight of the entry.
#[derive(Debug)]
pub struct LeafNode<const N: usize> {
    path: [u8; N],
    value_hash: Vec<u8>,
    sum: Sum,
    cache: NodeCache,
}

impl<const N: usize> LeafNode<N> {
    pub fn new(path: [u8; N], value_hash: Vec<u8>, sum: Sum) -> Self {
        Self {
            path,
            value_hash,
            sum,
            cache: NodeCache::default(),
        }
    }

    pub(crate) fn stored(
        path: [u8; N],
        value_hash: Vec<u8>,
        sum: Sum,
        digest: Option<Vec<u8>>,
    ) -> Self {
        Self {
            path,
            value_hash,
            sum,
            cache: NodeCache::stored(digest),
        }
    }

    pub fn path(&self) -> &[u8; N] {
        &self.path
    }

    pub fn value_hash(&self) -> &[u8] {
        &self.value_hash
    }

    pub fn sum(&self) -> Sum {
        self.sum
    }

    pub fn digest<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> &[u8] {
        self.cache
            .digest(|| spec.digest_leaf(&self.path, &self.value_hash, self.sum))
    }

    pub fn encode<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Vec<u8> {
        spec.encode_leaf(&self.path, &self.value_hash, self.sum)
    }

    pub(crate) fn cache(&self) -> &NodeCache {
        &self.cache
    }
}
