//! Sparse Merkle Trie and Sparse Merkle Sum Trie
//!
//! This crate provides a path-compressed sparse merkle trie in which every
//! key is hashed into a fixed-size path. Runs of single-child levels are
//! stored as extension nodes and stored nodes are loaded lazily, while roots
//! and proofs stay identical to those of the uncompressed binary tree.
//!
//! The trie supports:
//! - Copy-on-write updates, committed to any store implementing [`Db`]
//! - Membership, non-membership and closest-leaf proofs, with compact forms
//! - Sum tries whose digests carry the total weight and count of each subtree
//! - Version history and read-only views over committed roots

mod db;
mod error;
mod node;
mod proof;
mod spec;
mod tree;
mod versioned;

pub use db::{Db, MemoryDb, ThreadSafe};
pub use error::{MemoryDbError, ProofError, TreeError};
pub use node::{
    bit_index, ExtensionLevels, ExtensionNode, InnerNode, LazyNode, LeafNode, Node, Sum,
};
pub use proof::{
    compact_closest_proof, compact_proof, decompact_closest_proof, decompact_proof,
    verify_closest_proof, verify_proof, verify_sum_proof, SparseCompactMerkleClosestProof,
    SparseCompactMerkleProof, SparseMerkleClosestProof, SparseMerkleProof,
};
pub use spec::{Hasher, TrieSpec};
pub use tree::{MerkleRoot, SparseMerkleSumTrie, SparseMerkleTrie};
pub use versioned::{ImmutableTrie, VersionEntry, VersionHistory, VersionedTrie};

#[cfg(test)]
mod tests;
