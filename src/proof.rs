//! Proofs are used to verify the membership or non-membership of a key
//! against a root, without access to the trie.
//!
//! Side nodes are ordered from the leaf level upwards. A proof can be
//! compacted by replacing placeholder side nodes with a bitmask.

mod closest;
mod codec;
mod compact;

pub use closest::{
    compact_closest_proof, decompact_closest_proof, verify_closest_proof,
    SparseCompactMerkleClosestProof, SparseMerkleClosestProof,
};
pub use compact::{compact_proof, decompact_proof, SparseCompactMerkleProof};

use crate::{
    error::ProofError,
    node::{Node, Sum},
    spec::{Hasher, TrieSpec, LEAF_PREFIX},
};

use codec::{put_nodes, put_optional, Reader};

/// A merkle proof for a given key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMerkleProof {
    side_nodes: Vec<Vec<u8>>,
    non_membership_leaf_data: Option<Vec<u8>>,
    sibling_data: Option<Vec<u8>>,
}

impl SparseMerkleProof {
    pub fn new(
        side_nodes: Vec<Vec<u8>>,
        non_membership_leaf_data: Option<Vec<u8>>,
        sibling_data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            side_nodes,
            non_membership_leaf_data,
            sibling_data,
        }
    }

    /// Sibling digests from the leaf level up to the root.
    pub fn side_nodes(&self) -> &[Vec<u8>] {
        &self.side_nodes
    }

    /// Encoded leaf found on the queried path when the key is absent.
    pub fn non_membership_leaf_data(&self) -> Option<&[u8]> {
        self.non_membership_leaf_data.as_deref()
    }

    /// Encoded node of the deepest non-placeholder sibling.
    pub fn sibling_data(&self) -> Option<&[u8]> {
        self.sibling_data.as_deref()
    }

    /// Sanity checks every proof must pass before any hashing is done.
    pub fn validate<const N: usize, H: Hasher<N>>(
        &self,
        spec: &TrieSpec<N, H>,
    ) -> Result<(), ProofError> {
        if self.side_nodes.len() > spec.depth() {
            return Err(ProofError::TooManySideNodes {
                got: self.side_nodes.len(),
                max: spec.depth(),
            });
        }
        let expected = spec.digest_size();
        if let Some((index, node)) = self
            .side_nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.len() != expected)
        {
            return Err(ProofError::InvalidSideNodeSize {
                index,
                got: node.len(),
                expected,
            });
        }
        if let Some(data) = &self.non_membership_leaf_data {
            if data.len() < spec.min_leaf_record_size() || data[0] != LEAF_PREFIX {
                return Err(ProofError::InvalidLeafData);
            }
        }
        if let Some(data) = &self.sibling_data {
            let first = self.side_nodes.first().ok_or(ProofError::SiblingMismatch)?;
            match Node::record_digest(spec, data) {
                Some(digest) if &digest == first => {}
                _ => return Err(ProofError::SiblingMismatch),
            }
        }
        Ok(())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        put_nodes(&mut encoded, &self.side_nodes);
        put_optional(&mut encoded, self.non_membership_leaf_data());
        put_optional(&mut encoded, self.sibling_data());
        encoded
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader::new(data);
        let proof = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(proof)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ProofError> {
        Ok(Self {
            side_nodes: reader.nodes()?,
            non_membership_leaf_data: reader.optional()?,
            sibling_data: reader.optional()?,
        })
    }
}

/// Verify a membership proof of `key` with `value`, or a non-membership proof
/// when `value` is empty.
///
/// Returns `Ok(false)` when the proof is well formed but does not lead to
/// `root`, and an error when it fails its sanity checks.
pub fn verify_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
    spec: &TrieSpec<N, H>,
) -> Result<bool, ProofError> {
    verify_sum_proof(proof, root, key, value, 0, spec)
}

/// [`verify_proof`] for sum tries, where the leaf is also weighted by `sum`.
pub fn verify_sum_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
    sum: Sum,
    spec: &TrieSpec<N, H>,
) -> Result<bool, ProofError> {
    let path = spec.path(key);
    let value_hash = (!value.is_empty()).then(|| spec.value_hash(value));
    verify_path(proof, root, &path, value_hash.as_deref(), sum, spec)
}

/// Verification on an already hashed path. `value_hash` is `None` for
/// non-membership.
pub(crate) fn verify_path<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleProof,
    root: &[u8],
    path: &[u8; N],
    value_hash: Option<&[u8]>,
    sum: Sum,
    spec: &TrieSpec<N, H>,
) -> Result<bool, ProofError> {
    proof.validate(spec)?;
    let leaf_digest = match (value_hash, proof.non_membership_leaf_data()) {
        (Some(value_hash), _) => spec.digest_leaf(path, value_hash, sum),
        (None, Some(data)) => {
            if &data[1..1 + N] == path.as_slice() {
                return Err(ProofError::ForgedNonMembership);
            }
            spec.digest_leaf_record(data)
        }
        (None, None) => spec.placeholder(),
    };
    Ok(spec.fold_side_nodes(path, leaf_digest, proof.side_nodes()) == root)
}

#[cfg(test)]
mod test {
    use sha2::Sha256;

    use super::{verify_proof, SparseMerkleProof};
    use crate::{error::ProofError, TrieSpec};

    #[test]
    fn test_empty_proof_of_empty_trie() {
        let spec = TrieSpec::<32, Sha256>::new();
        let proof = SparseMerkleProof::default();
        assert!(verify_proof(&proof, &[0; 32], b"key", b"", &spec).unwrap());
        assert!(!verify_proof(&proof, &[0; 32], b"key", b"value", &spec).unwrap());
    }

    #[test]
    fn test_validate_rejects_malformed_proofs() {
        let spec = TrieSpec::<32, Sha256>::new();
        let too_long = SparseMerkleProof::new(vec![vec![0; 32]; 257], None, None);
        assert_eq!(
            too_long.validate(&spec),
            Err(ProofError::TooManySideNodes { got: 257, max: 256 })
        );
        let bad_size = SparseMerkleProof::new(vec![vec![0; 32], vec![0; 31]], None, None);
        assert_eq!(
            bad_size.validate(&spec),
            Err(ProofError::InvalidSideNodeSize {
                index: 1,
                got: 31,
                expected: 32
            })
        );
        let bad_leaf = SparseMerkleProof::new(vec![], Some(vec![1; 40]), None);
        assert_eq!(bad_leaf.validate(&spec), Err(ProofError::InvalidLeafData));
        let orphan_sibling = SparseMerkleProof::new(vec![], None, Some(vec![0; 40]));
        assert_eq!(
            orphan_sibling.validate(&spec),
            Err(ProofError::SiblingMismatch)
        );
    }

    #[test]
    fn test_proof_encode_decode() {
        let proof = SparseMerkleProof::new(
            vec![vec![1; 32], vec![0; 32]],
            Some(vec![0; 40]),
            None,
        );
        assert_eq!(SparseMerkleProof::decode(&proof.encode()).unwrap(), proof);
        let mut truncated = proof.encode();
        truncated.pop();
        assert!(SparseMerkleProof::decode(&truncated).is_err());
    }
}
