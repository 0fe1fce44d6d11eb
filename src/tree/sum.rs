use crate::{
    db::Db,
    node::Sum,
    proof::{SparseMerkleClosestProof, SparseMerkleProof},
    spec::{Hasher, TrieSpec},
    TreeError,
};

use super::{MerkleRoot, SparseMerkleTrie};

/// Sparse merkle sum trie: every leaf is weighted by a [`Sum`] and every
/// digest carries the total weight and leaf count of its subtree.
///
/// Sums add with wrapping arithmetic.
pub struct SparseMerkleSumTrie<const N: usize, H: Hasher<N>, DbError> {
    trie: SparseMerkleTrie<N, H, DbError>,
}

impl<const N: usize, H: Hasher<N>, DbError> SparseMerkleSumTrie<N, H, DbError> {
    /// Creates an empty sum trie hashing its values.
    pub fn new(db: Box<dyn Db<DbError = DbError>>) -> Self {
        Self::with_spec(db, TrieSpec::new_sum())
    }

    /// Creates an empty sum trie. `spec` is switched to sum mode if it is not.
    pub fn with_spec(db: Box<dyn Db<DbError = DbError>>, spec: TrieSpec<N, H>) -> Self {
        Self {
            trie: SparseMerkleTrie::new(db, spec.into_sum_trie()),
        }
    }

    /// Opens the sum trie committed under `root`.
    pub fn import(db: Box<dyn Db<DbError = DbError>>, spec: TrieSpec<N, H>, root: &[u8]) -> Self {
        Self {
            trie: SparseMerkleTrie::import(db, spec.into_sum_trie(), root),
        }
    }

    /// Sets `key` to `value` with weight `sum`. An empty value removes the key.
    pub fn update(&mut self, key: &[u8], value: &[u8], sum: Sum) -> Result<(), TreeError<DbError>> {
        self.trie.update_with_sum(key, value, sum)
    }

    /// Value digest and weight of `key`; `(vec![], 0)` if absent.
    pub fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Sum), TreeError<DbError>> {
        Ok(self
            .trie
            .get_leaf(&self.trie.spec().path(key))?
            .unwrap_or_default())
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<DbError>> {
        self.trie.delete(key)
    }

    pub fn prove(&self, key: &[u8]) -> Result<SparseMerkleProof, TreeError<DbError>> {
        self.trie.prove(key)
    }

    pub fn prove_closest(
        &self,
        path: &[u8; N],
    ) -> Result<SparseMerkleClosestProof<N>, TreeError<DbError>> {
        self.trie.prove_closest(path)
    }

    pub fn commit(&mut self) -> Result<(), TreeError<DbError>> {
        self.trie.commit()
    }

    pub fn root(&self) -> MerkleRoot<N> {
        self.trie.root()
    }

    pub fn saved_root(&self) -> Option<MerkleRoot<N>> {
        self.trie.saved_root()
    }

    /// Total weight of all leaves.
    pub fn sum(&self) -> Sum {
        self.root().sum().unwrap_or_default()
    }

    /// Number of leaves.
    pub fn count(&self) -> u64 {
        self.root().count().unwrap_or_default()
    }

    pub fn spec(&self) -> &TrieSpec<N, H> {
        self.trie.spec()
    }

    pub fn db(&self) -> &dyn Db<DbError = DbError> {
        self.trie.db()
    }

    pub fn into_db(self) -> Box<dyn Db<DbError = DbError>> {
        self.trie.into_db()
    }

    /// The underlying plain trie.
    pub fn as_trie(&self) -> &SparseMerkleTrie<N, H, DbError> {
        &self.trie
    }
}
