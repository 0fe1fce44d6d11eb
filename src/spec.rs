//! Hashing configuration of a trie.
//!
//! A [`TrieSpec`] fixes how keys become paths, how values are digested and how
//! every node kind is hashed. Proof verification only needs a spec, never a
//! live trie.

use std::{fmt, marker::PhantomData};

use sha2::{Digest, Sha256, Sha512};

use crate::{
    node::{bit_index, Sum},
    TreeError,
};

pub(crate) const LEAF_PREFIX: u8 = 0;
pub(crate) const INNER_PREFIX: u8 = 1;
pub(crate) const EXTENSION_PREFIX: u8 = 2;

pub(crate) const SUM_SIZE: usize = 8;
pub(crate) const COUNT_SIZE: usize = 8;

const SPEC_FORMAT_VERSION: u8 = 1;
const FLAG_HASH_VALUES: u8 = 0b01;
const FLAG_SUM_TRIE: u8 = 0b10;

/// Simple hash trait required to hash keys, values and nodes.
///
/// The hash is an associated function: every call owns its hashing state, so a
/// hasher is never shared between concurrent callers.
///
/// # Type Parameters
/// * `HASH_SIZE` - The size of the hash digest in bytes
pub trait Hasher<const HASH_SIZE: usize> {
    /// Identifies the algorithm in persisted specs.
    const ALGORITHM: &'static str;

    fn hash(data: &[u8]) -> [u8; HASH_SIZE];
}

impl Hasher<32> for Sha256 {
    const ALGORITHM: &'static str = "sha256";

    fn hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

impl Hasher<64> for Sha512 {
    const ALGORITHM: &'static str = "sha512";

    fn hash(data: &[u8]) -> [u8; 64] {
        let mut hasher = Sha512::new();
        hasher.update(data);
        let mut digest = [0u8; 64];
        digest.copy_from_slice(&hasher.finalize());
        digest
    }
}

/// Hashing configuration of a trie.
///
/// * `N` - path size in bytes, which is also the hash size. The trie depth is `N * 8`.
/// * `H` - hasher used for paths, values and nodes.
pub struct TrieSpec<const N: usize, H: Hasher<N>> {
    hash_values: bool,
    sum_trie: bool,
    _phantom: PhantomData<fn() -> H>,
}

impl<const N: usize, H: Hasher<N>> Clone for TrieSpec<N, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const N: usize, H: Hasher<N>> Copy for TrieSpec<N, H> {}

impl<const N: usize, H: Hasher<N>> PartialEq for TrieSpec<N, H> {
    fn eq(&self, other: &Self) -> bool {
        self.hash_values == other.hash_values && self.sum_trie == other.sum_trie
    }
}

impl<const N: usize, H: Hasher<N>> Eq for TrieSpec<N, H> {}

impl<const N: usize, H: Hasher<N>> Default for TrieSpec<N, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, H: Hasher<N>> fmt::Debug for TrieSpec<N, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieSpec")
            .field("algorithm", &H::ALGORITHM)
            .field("path_size", &N)
            .field("hash_values", &self.hash_values)
            .field("sum_trie", &self.sum_trie)
            .finish()
    }
}

impl<const N: usize, H: Hasher<N>> TrieSpec<N, H> {
    /// Spec of a plain trie that hashes its values.
    pub fn new() -> Self {
        Self {
            hash_values: true,
            sum_trie: false,
            _phantom: PhantomData,
        }
    }

    /// Spec of a sum trie that hashes its values.
    pub fn new_sum() -> Self {
        Self {
            sum_trie: true,
            ..Self::new()
        }
    }

    /// Enables or disables value hashing.
    ///
    /// With hashing disabled values are stored as given; callers that pass
    /// pre-hashed values must not hash them again or proofs will not verify.
    pub fn with_value_hashing(mut self, enabled: bool) -> Self {
        self.hash_values = enabled;
        self
    }

    pub(crate) fn into_sum_trie(mut self) -> Self {
        self.sum_trie = true;
        self
    }

    pub fn is_sum_trie(&self) -> bool {
        self.sum_trie
    }

    pub fn hashes_values(&self) -> bool {
        self.hash_values
    }

    /// Max depth of the trie in bits.
    pub const fn depth(&self) -> usize {
        N * 8
    }

    pub const fn path_size(&self) -> usize {
        N
    }

    /// Size of a node digest: the hash, followed by sum and count for sum tries.
    pub fn digest_size(&self) -> usize {
        if self.sum_trie {
            N + SUM_SIZE + COUNT_SIZE
        } else {
            N
        }
    }

    /// Path of a key in the trie.
    pub fn path(&self, key: &[u8]) -> [u8; N] {
        H::hash(key)
    }

    /// Digest stored in the leaf for `value`.
    pub fn value_hash(&self, value: &[u8]) -> Vec<u8> {
        if self.hash_values {
            H::hash(value).to_vec()
        } else {
            value.to_vec()
        }
    }

    /// Digest of the empty subtree.
    pub fn placeholder(&self) -> Vec<u8> {
        vec![0; self.digest_size()]
    }

    pub fn is_placeholder(&self, digest: &[u8]) -> bool {
        digest.len() == self.digest_size() && digest.iter().all(|byte| *byte == 0)
    }

    /// Width of each extension bound on the wire.
    pub(crate) fn bounds_size(&self) -> usize {
        if self.depth() <= 256 {
            1
        } else {
            2
        }
    }

    /// Smallest valid encoding of a leaf.
    pub(crate) fn min_leaf_record_size(&self) -> usize {
        1 + N + if self.sum_trie { SUM_SIZE } else { 0 }
    }

    /// Weight carried by a digest. Always 0 for plain tries.
    pub fn sum_of(&self, digest: &[u8]) -> Sum {
        if !self.sum_trie || digest.len() < N + SUM_SIZE {
            return 0;
        }
        read_u64(&digest[N..N + SUM_SIZE])
    }

    /// Leaf count carried by a digest. Always 0 for plain tries.
    pub fn count_of(&self, digest: &[u8]) -> u64 {
        if !self.sum_trie || digest.len() < N + SUM_SIZE + COUNT_SIZE {
            return 0;
        }
        read_u64(&digest[N + SUM_SIZE..N + SUM_SIZE + COUNT_SIZE])
    }

    pub(crate) fn encode_leaf(&self, path: &[u8; N], value_hash: &[u8], sum: Sum) -> Vec<u8> {
        let mut record = Vec::with_capacity(1 + N + value_hash.len() + SUM_SIZE);
        record.push(LEAF_PREFIX);
        record.extend_from_slice(path);
        record.extend_from_slice(value_hash);
        if self.sum_trie {
            record.extend_from_slice(&sum.to_be_bytes());
        }
        record
    }

    pub(crate) fn digest_leaf(&self, path: &[u8; N], value_hash: &[u8], sum: Sum) -> Vec<u8> {
        self.digest_leaf_record(&self.encode_leaf(path, value_hash, sum))
    }

    /// Digest of an encoded leaf. The record must be at least
    /// `min_leaf_record_size` bytes long.
    pub(crate) fn digest_leaf_record(&self, record: &[u8]) -> Vec<u8> {
        let mut digest = H::hash(record).to_vec();
        if self.sum_trie {
            digest.extend_from_slice(&record[record.len() - SUM_SIZE..]);
            digest.extend_from_slice(&1u64.to_be_bytes());
        }
        digest
    }

    pub(crate) fn encode_inner(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut record = Vec::with_capacity(1 + left.len() + right.len() + SUM_SIZE + COUNT_SIZE);
        record.push(INNER_PREFIX);
        record.extend_from_slice(left);
        record.extend_from_slice(right);
        if self.sum_trie {
            let sum = self.sum_of(left).wrapping_add(self.sum_of(right));
            let count = self.count_of(left).wrapping_add(self.count_of(right));
            record.extend_from_slice(&sum.to_be_bytes());
            record.extend_from_slice(&count.to_be_bytes());
        }
        record
    }

    pub(crate) fn digest_inner(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        let record = self.encode_inner(left, right);
        let mut digest = H::hash(&record).to_vec();
        if self.sum_trie {
            digest.extend_from_slice(&record[record.len() - SUM_SIZE - COUNT_SIZE..]);
        }
        digest
    }

    /// Digest of a run of single-child levels above `child`.
    ///
    /// `levels` yields `(level, bit)` pairs from the deepest level upwards; each
    /// level pairs the running digest with the placeholder on the opposite side.
    pub(crate) fn fold_levels(
        &self,
        child: Vec<u8>,
        levels: impl Iterator<Item = (usize, u8)>,
    ) -> Vec<u8> {
        let placeholder = self.placeholder();
        levels.fold(child, |current, (_, bit)| {
            if bit == 0 {
                self.digest_inner(&current, &placeholder)
            } else {
                self.digest_inner(&placeholder, &current)
            }
        })
    }

    /// Recomputes the root from a leaf digest and bottom-up side nodes.
    pub(crate) fn fold_side_nodes(
        &self,
        path: &[u8; N],
        leaf_digest: Vec<u8>,
        side_nodes: &[Vec<u8>],
    ) -> Vec<u8> {
        let len = side_nodes.len();
        side_nodes
            .iter()
            .enumerate()
            .fold(leaf_digest, |current, (i, side_node)| {
                if bit_index(len - 1 - i, path) == 0 {
                    self.digest_inner(&current, side_node)
                } else {
                    self.digest_inner(side_node, &current)
                }
            })
    }

    /// Encodes the trie spec together with the hasher's algorithm tag.
    pub fn encode(&self) -> Vec<u8> {
        let algorithm = H::ALGORITHM.as_bytes();
        let mut flags = 0;
        if self.hash_values {
            flags |= FLAG_HASH_VALUES;
        }
        if self.sum_trie {
            flags |= FLAG_SUM_TRIE;
        }
        let mut encoded = Vec::with_capacity(5 + algorithm.len());
        encoded.push(SPEC_FORMAT_VERSION);
        encoded.push(algorithm.len() as u8);
        encoded.extend_from_slice(algorithm);
        encoded.extend_from_slice(&(N as u16).to_be_bytes());
        encoded.push(flags);
        encoded
    }

    /// Decodes a spec written by [`TrieSpec::encode`], checking that it was
    /// produced with the same hasher.
    pub fn decode<DbError>(data: &[u8]) -> Result<Self, TreeError<DbError>> {
        let (&version, rest) = data
            .split_first()
            .ok_or(TreeError::SpecMismatch("empty spec"))?;
        if version != SPEC_FORMAT_VERSION {
            return Err(TreeError::SpecMismatch("unknown spec format version"));
        }
        let (&tag_len, rest) = rest
            .split_first()
            .ok_or(TreeError::SpecMismatch("truncated spec"))?;
        let tag_len = tag_len as usize;
        if rest.len() != tag_len + 3 {
            return Err(TreeError::SpecMismatch("truncated spec"));
        }
        if &rest[..tag_len] != H::ALGORITHM.as_bytes() {
            return Err(TreeError::SpecMismatch("hash algorithm differs"));
        }
        let path_size = u16::from_be_bytes([rest[tag_len], rest[tag_len + 1]]) as usize;
        if path_size != N {
            return Err(TreeError::SpecMismatch("path size differs"));
        }
        let flags = rest[tag_len + 2];
        Ok(Self {
            hash_values: flags & FLAG_HASH_VALUES != 0,
            sum_trie: flags & FLAG_SUM_TRIE != 0,
            _phantom: PhantomData,
        })
    }
}

/// Reads a big endian u64 from the first 8 bytes of `bytes`.
pub(crate) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}
