//! Version history and read-only views over committed tries.

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    db::Db,
    node::Sum,
    proof::{SparseMerkleClosestProof, SparseMerkleProof},
    spec::{read_u64, Hasher, TrieSpec},
    MerkleRoot, SparseMerkleTrie, TreeError,
};

/// Root and spec recorded for one committed version.
#[derive(Debug, Clone)]
pub struct VersionEntry<const N: usize, H: Hasher<N>> {
    version: u64,
    root: MerkleRoot<N>,
    spec: TrieSpec<N, H>,
}

impl<const N: usize, H: Hasher<N>> VersionEntry<N, H> {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn root(&self) -> &MerkleRoot<N> {
        &self.root
    }

    pub fn spec(&self) -> &TrieSpec<N, H> {
        &self.spec
    }
}

/// Bounded history of committed versions. Once full, recording a version
/// evicts the oldest one.
#[derive(Debug, Clone)]
pub struct VersionHistory<const N: usize, H: Hasher<N>> {
    entries: VecDeque<VersionEntry<N, H>>,
    capacity: usize,
}

impl<const N: usize, H: Hasher<N>> VersionHistory<N, H> {
    /// A history keeping at most `capacity` versions (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, version: u64, root: MerkleRoot<N>, spec: TrieSpec<N, H>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(VersionEntry {
            version,
            root,
            spec,
        });
    }

    pub fn get(&self, version: u64) -> Option<&VersionEntry<N, H>> {
        self.entries.iter().find(|entry| entry.version == version)
    }

    pub fn latest(&self) -> Option<&VersionEntry<N, H>> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encodes the history as `u64 version`, then length-prefixed spec and
    /// root, for every entry from oldest to newest.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&(self.capacity as u64).to_be_bytes());
        for entry in &self.entries {
            encoded.extend_from_slice(&entry.version.to_be_bytes());
            for part in [entry.spec.encode(), entry.root.as_bytes().to_vec()] {
                encoded.extend_from_slice(&(part.len() as u16).to_be_bytes());
                encoded.extend_from_slice(&part);
            }
        }
        encoded
    }

    pub fn decode<DbError>(data: &[u8]) -> Result<Self, TreeError<DbError>> {
        fn take<'a, DbError>(
            data: &mut &'a [u8],
            len: usize,
        ) -> Result<&'a [u8], TreeError<DbError>> {
            if data.len() < len {
                return Err(TreeError::SpecMismatch("truncated version history"));
            }
            let (head, tail) = data.split_at(len);
            *data = tail;
            Ok(head)
        }
        let mut data = data;
        let capacity = read_u64(take::<DbError>(&mut data, 8)?);
        let mut history = Self::new(usize::try_from(capacity).unwrap_or(usize::MAX));
        while !data.is_empty() {
            let version = read_u64(take::<DbError>(&mut data, 8)?);
            let len = take::<DbError>(&mut data, 2)?;
            let spec = take::<DbError>(&mut data, u16::from_be_bytes([len[0], len[1]]) as usize)?;
            let spec = TrieSpec::decode::<DbError>(spec)?;
            let len = take::<DbError>(&mut data, 2)?;
            let root = take::<DbError>(&mut data, u16::from_be_bytes([len[0], len[1]]) as usize)?;
            history.record(version, MerkleRoot::new(root.to_vec()), spec);
        }
        Ok(history)
    }
}

/// A trie that records its root under an increasing version number on every
/// versioned commit.
pub struct VersionedTrie<const N: usize, H: Hasher<N>, DbError> {
    trie: SparseMerkleTrie<N, H, DbError>,
    history: VersionHistory<N, H>,
    next_version: u64,
    initial_version_set: bool,
}

impl<const N: usize, H: Hasher<N>, DbError> VersionedTrie<N, H, DbError> {
    pub fn new(trie: SparseMerkleTrie<N, H, DbError>, capacity: usize) -> Self {
        Self::with_history(trie, VersionHistory::new(capacity))
    }

    /// Resumes from a restored history; the next version follows its latest entry.
    pub fn with_history(trie: SparseMerkleTrie<N, H, DbError>, history: VersionHistory<N, H>) -> Self {
        let next_version = history.latest().map_or(0, |entry| entry.version + 1);
        Self {
            trie,
            history,
            next_version,
            initial_version_set: false,
        }
    }

    /// Sets the number of the first version. Only allowed before any
    /// version is committed.
    pub fn set_initial_version(&mut self, version: u64) -> Result<(), TreeError<DbError>> {
        if self.initial_version_set || !self.history.is_empty() {
            return Err(TreeError::VersionAlreadySet);
        }
        self.next_version = version;
        self.initial_version_set = true;
        Ok(())
    }

    /// Commits the trie and records its root. Returns the new version.
    pub fn commit_version(&mut self) -> Result<u64, TreeError<DbError>> {
        self.trie.commit()?;
        let version = self.next_version;
        let root = self.trie.root();
        debug!(version, root = %root, "committed version");
        self.history.record(version, root, *self.trie.spec());
        self.next_version += 1;
        Ok(version)
    }

    pub fn latest_version(&self) -> Option<u64> {
        self.history.latest().map(VersionEntry::version)
    }

    pub fn version_root(&self, version: u64) -> Result<MerkleRoot<N>, TreeError<DbError>> {
        self.history
            .get(version)
            .map(|entry| entry.root.clone())
            .ok_or(TreeError::VersionNotFound(version))
    }

    /// Opens a read-only view of `version` over `db`, which must still hold
    /// that version's nodes.
    pub fn open_version(
        &self,
        version: u64,
        db: Box<dyn Db<DbError = DbError>>,
    ) -> Result<ImmutableTrie<N, H, DbError>, TreeError<DbError>> {
        let entry = self
            .history
            .get(version)
            .ok_or(TreeError::VersionNotFound(version))?;
        Ok(ImmutableTrie::import(db, entry.spec, entry.root.as_bytes()))
    }

    pub fn history(&self) -> &VersionHistory<N, H> {
        &self.history
    }

    pub fn trie(&self) -> &SparseMerkleTrie<N, H, DbError> {
        &self.trie
    }

    pub fn trie_mut(&mut self) -> &mut SparseMerkleTrie<N, H, DbError> {
        &mut self.trie
    }

    pub fn into_inner(self) -> (SparseMerkleTrie<N, H, DbError>, VersionHistory<N, H>) {
        (self.trie, self.history)
    }
}

/// Read-only view of a committed trie. Every mutation fails with
/// [`TreeError::ImmutableTrie`].
pub struct ImmutableTrie<const N: usize, H: Hasher<N>, DbError> {
    trie: SparseMerkleTrie<N, H, DbError>,
}

impl<const N: usize, H: Hasher<N>, DbError> ImmutableTrie<N, H, DbError> {
    pub fn import(db: Box<dyn Db<DbError = DbError>>, spec: TrieSpec<N, H>, root: &[u8]) -> Self {
        Self {
            trie: SparseMerkleTrie::import(db, spec, root),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, TreeError<DbError>> {
        self.trie.get(key)
    }

    /// Value digest and sum stored under `key`, for views of sum tries.
    pub fn get_with_sum(&self, key: &[u8]) -> Result<(Vec<u8>, Sum), TreeError<DbError>> {
        Ok(self
            .trie
            .get_leaf(&self.trie.spec().path(key))?
            .unwrap_or_default())
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

    pub fn root(&self) -> MerkleRoot<N> {
        self.trie.root()
    }

    pub fn spec(&self) -> &TrieSpec<N, H> {
        self.trie.spec()
    }

    pub fn update(&mut self, _key: &[u8], _value: &[u8]) -> Result<(), TreeError<DbError>> {
        Err(TreeError::ImmutableTrie)
    }

    pub fn delete(&mut self, _key: &[u8]) -> Result<(), TreeError<DbError>> {
        Err(TreeError::ImmutableTrie)
    }

    pub fn commit(&mut self) -> Result<(), TreeError<DbError>> {
        Err(TreeError::ImmutableTrie)
    }

    pub fn into_db(self) -> Box<dyn Db<DbError = DbError>> {
        self.trie.into_db()
    }
}
