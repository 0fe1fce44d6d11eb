use bitvec::{order::Lsb0, vec::BitVec};

use super::{
    codec::{put_nodes, put_optional, put_u16, Reader},
    SparseMerkleProof,
};
use crate::{
    error::ProofError,
    spec::{Hasher, TrieSpec},
};

/// A compacted merkle proof.
/// Placeholder side nodes are dropped and marked with a set bit in `bit_mask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseCompactMerkleProof {
    side_nodes: Vec<Vec<u8>>,
    non_membership_leaf_data: Option<Vec<u8>>,
    bit_mask: BitVec<u8, Lsb0>,
    num_side_nodes: usize,
    sibling_data: Option<Vec<u8>>,
}

impl SparseCompactMerkleProof {
    pub fn new(
        side_nodes: Vec<Vec<u8>>,
        non_membership_leaf_data: Option<Vec<u8>>,
        bit_mask: BitVec<u8, Lsb0>,
        num_side_nodes: usize,
        sibling_data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            side_nodes,
            non_membership_leaf_data,
            bit_mask,
            num_side_nodes,
            sibling_data,
        }
    }

    /// The side nodes that are not placeholders.
    pub fn side_nodes(&self) -> &[Vec<u8>] {
        &self.side_nodes
    }

    pub fn bit_mask(&self) -> &BitVec<u8, Lsb0> {
        &self.bit_mask
    }

    /// Length of the original side node list.
    pub fn num_side_nodes(&self) -> usize {
        self.num_side_nodes
    }

    pub fn non_membership_leaf_data(&self) -> Option<&[u8]> {
        self.non_membership_leaf_data.as_deref()
    }

    pub fn sibling_data(&self) -> Option<&[u8]> {
        self.sibling_data.as_deref()
    }

    /// Encodes the proof into a byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        put_u16(&mut encoded, self.num_side_nodes);
        let mut mask = self.bit_mask.clone();
        mask.set_uninitialized(false);
        put_u16(&mut encoded, mask.as_raw_slice().len());
        encoded.extend_from_slice(mask.as_raw_slice());
        put_nodes(&mut encoded, &self.side_nodes);
        put_optional(&mut encoded, self.non_membership_leaf_data());
        put_optional(&mut encoded, self.sibling_data());
        encoded
    }

    /// Decodes a proof from a byte vector.
    pub fn decode(data: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader::new(data);
        let proof = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(proof)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ProofError> {
        let num_side_nodes = reader.u16()?;
        let mask_len = reader.u16()?;
        if mask_len != num_side_nodes.div_ceil(8) {
            return Err(ProofError::Encoding("bitmask length does not match side node count"));
        }
        let mut bit_mask = BitVec::<u8, Lsb0>::from_slice(reader.take(mask_len)?);
        if bit_mask[num_side_nodes..].any() {
            return Err(ProofError::Encoding("bitmask padding is not zero"));
        }
        bit_mask.truncate(num_side_nodes);
        Ok(Self {
            bit_mask,
            num_side_nodes,
            side_nodes: reader.nodes()?,
            non_membership_leaf_data: reader.optional()?,
            sibling_data: reader.optional()?,
        })
    }
}

/// Compacts a proof. The proof is validated first.
pub fn compact_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleProof,
    spec: &TrieSpec<N, H>,
) -> Result<SparseCompactMerkleProof, ProofError> {
    proof.validate(spec)?;
    let mut bit_mask = BitVec::with_capacity(proof.side_nodes().len());
    let mut side_nodes = Vec::new();
    for node in proof.side_nodes() {
        if spec.is_placeholder(node) {
            bit_mask.push(true);
        } else {
            bit_mask.push(false);
            side_nodes.push(node.clone());
        }
    }
    Ok(SparseCompactMerkleProof {
        side_nodes,
        non_membership_leaf_data: proof.non_membership_leaf_data.clone(),
        bit_mask,
        num_side_nodes: proof.side_nodes().len(),
        sibling_data: proof.sibling_data.clone(),
    })
}

/// Expands a compacted proof back into a full one, then validates it.
pub fn decompact_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseCompactMerkleProof,
    spec: &TrieSpec<N, H>,
) -> Result<SparseMerkleProof, ProofError> {
    if proof.num_side_nodes > spec.depth()
        || proof.bit_mask.len() != proof.num_side_nodes
        || proof.bit_mask.count_zeros() != proof.side_nodes.len()
    {
        return Err(ProofError::InvalidBitmask);
    }
    let mut kept = proof.side_nodes.iter();
    let side_nodes = proof
        .bit_mask
        .iter()
        .map(|bit| match *bit {
            true => Ok(spec.placeholder()),
            false => kept.next().cloned().ok_or(ProofError::InvalidBitmask),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let full = SparseMerkleProof::new(
        side_nodes,
        proof.non_membership_leaf_data.clone(),
        proof.sibling_data.clone(),
    );
    full.validate(spec)?;
    Ok(full)
}

#[cfg(test)]
mod test {
    use bitvec::prelude::*;
    use sha2::Sha256;

    use super::{compact_proof, decompact_proof, SparseCompactMerkleProof};
    use crate::{error::ProofError, proof::SparseMerkleProof, TrieSpec};

    #[test]
    fn test_compact_drops_placeholders() {
        let spec = TrieSpec::<32, Sha256>::new();
        let proof = SparseMerkleProof::new(
            vec![vec![0; 32], vec![7; 32], vec![0; 32]],
            None,
            None,
        );
        let compact = compact_proof(&proof, &spec).unwrap();
        assert_eq!(compact.side_nodes(), &[vec![7; 32]]);
        assert_eq!(compact.bit_mask(), &bitvec![u8, Lsb0; 1, 0, 1]);
        assert_eq!(compact.num_side_nodes(), 3);
        assert_eq!(decompact_proof(&compact, &spec).unwrap(), proof);
    }

    #[test]
    fn test_decompact_rejects_inconsistent_mask() {
        let spec = TrieSpec::<32, Sha256>::new();
        let compact = SparseCompactMerkleProof::new(
            vec![vec![7; 32], vec![8; 32]],
            None,
            bitvec![u8, Lsb0; 1, 0, 1],
            3,
            None,
        );
        assert_eq!(
            decompact_proof(&compact, &spec),
            Err(ProofError::InvalidBitmask)
        );
        let short_mask =
            SparseCompactMerkleProof::new(vec![], None, bitvec![u8, Lsb0; 1], 2, None);
        assert_eq!(
            decompact_proof(&short_mask, &spec),
            Err(ProofError::InvalidBitmask)
        );
    }

    #[test]
    fn test_compact_encode_decode() {
        let spec = TrieSpec::<32, Sha256>::new();
        let proof = SparseMerkleProof::new(
            vec![vec![0; 32]; 9].into_iter().chain([vec![5; 32]]).collect(),
            None,
            None,
        );
        let compact = compact_proof(&proof, &spec).unwrap();
        let decoded = SparseCompactMerkleProof::decode(&compact.encode()).unwrap();
        assert_eq!(decoded, compact);
        assert_eq!(decompact_proof(&decoded, &spec).unwrap(), proof);
    }
}
