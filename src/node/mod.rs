mod extension;
mod inner;
mod lazy;
mod leaf;

use std::{
    fmt::{self, Display},
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
};

pub use extension::{ExtensionLevels, ExtensionNode};
pub use inner::InnerNode;
pub use lazy::LazyNode;
pub use leaf::LeafNode;

use crate::spec::{Hasher, TrieSpec, EXTENSION_PREFIX, INNER_PREFIX, LEAF_PREFIX, SUM_SIZE};

pub type Sum = u64;

/// Get the bit at `index` of `key`. Bits are read least significant first
/// within each byte.
pub fn bit_index(index: usize, key: &[u8]) -> u8 {
    let byte = key[index / 8];
    (byte >> (index % 8)) & 1
}

/// Flips the bit at `index` of `key`.
pub fn flip_bit(index: usize, key: &mut [u8]) {
    key[index / 8] ^= 1 << (index % 8);
}

/// First bit index `>= from` at which `a` and `b` differ, or the full bit
/// length if they agree from `from` onwards.
pub fn common_prefix_len(a: &[u8], b: &[u8], from: usize) -> usize {
    let depth = a.len().min(b.len()) * 8;
    (from..depth)
        .find(|index| bit_index(*index, a) != bit_index(*index, b))
        .unwrap_or(depth)
}

/// State shared by every materialised node: the memoised digest and whether the
/// node's record is already in the store.
#[derive(Debug, Default)]
pub(crate) struct NodeCache {
    digest: OnceLock<Vec<u8>>,
    persisted: AtomicBool,
}

impl NodeCache {
    /// Cache of a node read back from the store.
    pub(crate) fn stored(digest: Option<Vec<u8>>) -> Self {
        let cache = Self::default();
        if let Some(digest) = digest {
            let _ = cache.digest.set(digest);
        }
        cache.persisted.store(true, Ordering::Release);
        cache
    }

    pub(crate) fn digest(&self, compute: impl FnOnce() -> Vec<u8>) -> &[u8] {
        self.digest.get_or_init(compute)
    }

    pub(crate) fn cached(&self) -> Option<&[u8]> {
        self.digest.get().map(Vec::as_slice)
    }

    pub(crate) fn is_persisted(&self) -> bool {
        self.persisted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_persisted(&self) {
        self.persisted.store(true, Ordering::Release);
    }
}

/// All possible nodes in the trie. The empty subtree has no node: it is
/// represented by `None` wherever a child is optional.
///
/// # Type Parameters
/// * `N` - The path size in bytes
#[derive(Debug)]
pub enum Node<const N: usize> {
    /// A key-value pair, possibly weighted by a sum
    Leaf(LeafNode<N>),
    /// A node with two non-empty children
    Inner(InnerNode<N>),
    /// A run of single-child levels sharing a path segment
    Extension(ExtensionNode<N>),
    /// A stored node known only by its digest
    Lazy(LazyNode<N>),
}

impl<const N: usize> Node<N> {
    /// Digest of the node, computed once and memoised.
    pub fn digest<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> &[u8] {
        match self {
            Self::Leaf(leaf) => leaf.digest(spec),
            Self::Inner(inner) => inner.digest(spec),
            Self::Extension(extension) => extension.digest(spec),
            Self::Lazy(lazy) => lazy.digest(),
        }
    }

    /// Sum carried by the node. Always 0 for plain tries.
    pub fn sum<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Sum {
        spec.sum_of(self.digest(spec))
    }

    /// Whether the node's record is in the store. Lazy nodes always are.
    pub fn is_persisted(&self) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.cache().is_persisted(),
            Self::Inner(inner) => inner.cache().is_persisted(),
            Self::Extension(extension) => extension.cache().is_persisted(),
            Self::Lazy(_) => true,
        }
    }

    pub(crate) fn mark_persisted(&self) {
        match self {
            Self::Leaf(leaf) => leaf.cache().mark_persisted(),
            Self::Inner(inner) => inner.cache().mark_persisted(),
            Self::Extension(extension) => extension.cache().mark_persisted(),
            Self::Lazy(_) => {}
        }
    }

    /// Store record of the node. Lazy nodes have none.
    pub fn encode<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Option<Vec<u8>> {
        match self {
            Self::Leaf(leaf) => Some(leaf.encode(spec)),
            Self::Inner(inner) => Some(inner.encode(spec)),
            Self::Extension(extension) => Some(extension.encode(spec)),
            Self::Lazy(_) => None,
        }
    }

    /// Decodes a store record. Children become [`Node::Lazy`] and the node is
    /// marked persisted; `digest`, when known, primes the digest cache.
    pub fn decode<H: Hasher<N>>(
        spec: &TrieSpec<N, H>,
        record: &[u8],
        digest: Option<Vec<u8>>,
    ) -> Result<Self, &'static str> {
        let (&tag, body) = record.split_first().ok_or("empty record")?;
        let digest_size = spec.digest_size();
        match tag {
            LEAF_PREFIX => {
                if record.len() < spec.min_leaf_record_size() {
                    return Err("leaf record too short");
                }
                let mut path = [0u8; N];
                path.copy_from_slice(&body[..N]);
                let rest = &body[N..];
                let (value_hash, sum) = if spec.is_sum_trie() {
                    let split = rest.len() - SUM_SIZE;
                    (&rest[..split], crate::spec::read_u64(&rest[split..]))
                } else {
                    (rest, 0)
                };
                Ok(Self::Leaf(LeafNode::stored(path, value_hash.to_vec(), sum, digest)))
            }
            INNER_PREFIX => {
                let expected = 2 * digest_size + if spec.is_sum_trie() { 16 } else { 0 };
                if body.len() != expected {
                    return Err("inner record has the wrong size");
                }
                let left = LazyNode::new(body[..digest_size].to_vec());
                let right = LazyNode::new(body[digest_size..2 * digest_size].to_vec());
                Ok(Self::Inner(InnerNode::stored(
                    Self::Lazy(left).into(),
                    Self::Lazy(right).into(),
                    digest,
                )))
            }
            EXTENSION_PREFIX => {
                let bounds = spec.bounds_size();
                if body.len() != 2 * bounds + N + digest_size {
                    return Err("extension record has the wrong size");
                }
                let read_bound = |bytes: &[u8]| {
                    bytes
                        .iter()
                        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize)
                };
                let start = read_bound(&body[..bounds]);
                let end = read_bound(&body[bounds..2 * bounds]);
                if start >= end || end > spec.depth() {
                    return Err("extension bounds out of range");
                }
                let mut path = [0u8; N];
                path.copy_from_slice(&body[2 * bounds..2 * bounds + N]);
                let child = LazyNode::new(body[2 * bounds + N..].to_vec());
                Ok(Self::Extension(ExtensionNode::stored(
                    path,
                    start,
                    end,
                    Self::Lazy(child).into(),
                    digest,
                )))
            }
            _ => Err("unknown node tag"),
        }
    }

    /// Digest of the node encoded by `record`, if it decodes.
    pub fn record_digest<H: Hasher<N>>(spec: &TrieSpec<N, H>, record: &[u8]) -> Option<Vec<u8>> {
        Self::decode(spec, record, None)
            .ok()
            .map(|node| node.digest(spec).to_vec())
    }

    fn cached_digest(&self) -> Option<&[u8]> {
        match self {
            Self::Leaf(leaf) => leaf.cache().cached(),
            Self::Inner(inner) => inner.cache().cached(),
            Self::Extension(extension) => extension.cache().cached(),
            Self::Lazy(lazy) => Some(lazy.digest()),
        }
    }
}

impl<const N: usize> Display for Node<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digest = self.cached_digest().map(hex::encode).unwrap_or_default();
        match self {
            Self::Leaf(leaf) => write!(
                f,
                "Leaf {{ sum: {}, path: {}, value_hash: {} }}",
                leaf.sum(),
                hex::encode(leaf.path()),
                hex::encode(leaf.value_hash())
            ),
            Self::Inner(_) => write!(f, "Inner {{ digest: {digest} }}"),
            Self::Extension(extension) => write!(
                f,
                "Extension {{ bits: {}..{}, digest: {digest} }}",
                extension.start(),
                extension.end()
            ),
            Self::Lazy(_) => write!(f, "Lazy {{ digest: {digest} }}"),
        }
    }
}
