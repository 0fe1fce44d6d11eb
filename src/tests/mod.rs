//! Tests for the sparse merkle trie implementation

mod properties;
mod sha512;
mod sum;

use sha2::Sha256;

use crate::{
    bit_index, error::MemoryDbError, MemoryDb, SparseMerkleTrie, Sum, TrieSpec,
};

pub(crate) type Trie = SparseMerkleTrie<32, Sha256, MemoryDbError>;

pub(crate) fn new_trie() -> Trie {
    SparseMerkleTrie::new(Box::new(MemoryDb::new()), TrieSpec::new())
}

/// Finds a key whose path starts with `bits`, skipping the first `skip` matches.
pub(crate) fn key_with_prefix(bits: &[u8], skip: usize) -> Vec<u8> {
    let spec = TrieSpec::<32, Sha256>::new();
    (0u64..)
        .map(|i| format!("key{i}").into_bytes())
        .filter(|key| {
            let path = spec.path(key);
            bits.iter()
                .enumerate()
                .all(|(index, bit)| bit_index(index, &path) == *bit)
        })
        .nth(skip)
        .unwrap()
}

/// Root of the uncompressed tree holding `leaves`, each at the shallowest
/// depth where it is alone in its subtree.
pub(crate) fn reference_root<const N: usize, H: crate::Hasher<N>>(
    spec: &TrieSpec<N, H>,
    leaves: &[([u8; N], Vec<u8>, Sum)],
    depth: usize,
) -> Vec<u8> {
    match leaves {
        [] => spec.placeholder(),
        [(path, value_hash, sum)] => spec.digest_leaf(path, value_hash, *sum),
        _ => {
            let (left, right): (Vec<_>, Vec<_>) = leaves
                .iter()
                .cloned()
                .partition(|(path, _, _)| bit_index(depth, path) == 0);
            spec.digest_inner(
                &reference_root(spec, &left, depth + 1),
                &reference_root(spec, &right, depth + 1),
            )
        }
    }
}

/// Number of nodes in the path-compressed trie holding `leaves`.
pub(crate) fn reference_node_count<const N: usize>(
    paths: &[[u8; N]],
    depth: usize,
    in_run: bool,
) -> usize {
    match paths.len() {
        0 => 0,
        1 => 1,
        _ => {
            let (left, right): (Vec<_>, Vec<_>) = paths
                .iter()
                .copied()
                .partition(|path| bit_index(depth, path) == 0);
            if left.is_empty() || right.is_empty() {
                let run_start = usize::from(!in_run);
                run_start + reference_node_count(paths, depth + 1, true)
            } else {
                1 + reference_node_count(&left, depth + 1, false)
                    + reference_node_count(&right, depth + 1, false)
            }
        }
    }
}

/// Leaf triples of `entries` as stored by a trie with `spec`.
pub(crate) fn leaves_of<const N: usize, H: crate::Hasher<N>>(
    spec: &TrieSpec<N, H>,
    entries: &[(Vec<u8>, Vec<u8>, Sum)],
) -> Vec<([u8; N], Vec<u8>, Sum)> {
    entries
        .iter()
        .map(|(key, value, sum)| (spec.path(key), spec.value_hash(value), *sum))
        .collect()
}
