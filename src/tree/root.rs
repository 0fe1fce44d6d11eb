use std::fmt::{self, Display};

use crate::{
    node::Sum,
    spec::{read_u64, COUNT_SIZE, SUM_SIZE},
};

/// Root digest of a trie. For sum tries the bytes after the hash carry the
/// total sum and the number of leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MerkleRoot<const N: usize>(Vec<u8>);

impl<const N: usize> MerkleRoot<N> {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The hash part of the root.
    pub fn hash(&self) -> &[u8] {
        &self.0[..N.min(self.0.len())]
    }

    pub fn is_sum_root(&self) -> bool {
        self.0.len() == N + SUM_SIZE + COUNT_SIZE
    }

    /// Total sum of a sum trie root.
    pub fn sum(&self) -> Option<Sum> {
        self.is_sum_root().then(|| read_u64(&self.0[N..]))
    }

    /// Leaf count of a sum trie root.
    pub fn count(&self) -> Option<u64> {
        self.is_sum_root().then(|| read_u64(&self.0[N + SUM_SIZE..]))
    }
}

impl<const N: usize> AsRef<[u8]> for MerkleRoot<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> From<MerkleRoot<N>> for Vec<u8> {
    fn from(root: MerkleRoot<N>) -> Self {
        root.0
    }
}

impl<const N: usize> Display for MerkleRoot<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}
