use bitvec::{order::Lsb0, vec::BitVec};

use super::{
    codec::{put_optional, put_u16, Reader},
    compact_proof, decompact_proof, verify_path, SparseCompactMerkleProof, SparseMerkleProof,
};
use crate::{
    error::ProofError,
    node::{common_prefix_len, flip_bit, Sum},
    spec::{Hasher, TrieSpec},
};

/// Proof that a leaf is the closest one to a target path.
///
/// The walk to the closest leaf follows the target path and flips a bit
/// whenever the path runs into an empty subtree. `flipped_bits` records those
/// bits in ascending order and `depth` is the depth of the closest leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMerkleClosestProof<const N: usize> {
    path: [u8; N],
    flipped_bits: Vec<usize>,
    depth: usize,
    closest_path: [u8; N],
    closest_value_hash: Option<Vec<u8>>,
    closest_sum: Sum,
    closest_proof: SparseMerkleProof,
}

impl<const N: usize> SparseMerkleClosestProof<N> {
    pub fn new(
        path: [u8; N],
        flipped_bits: Vec<usize>,
        depth: usize,
        closest_path: [u8; N],
        closest_value_hash: Option<Vec<u8>>,
        closest_sum: Sum,
        closest_proof: SparseMerkleProof,
    ) -> Self {
        Self {
            path,
            flipped_bits,
            depth,
            closest_path,
            closest_value_hash,
            closest_sum,
            closest_proof,
        }
    }

    /// Proof for an empty trie: nothing is closest.
    pub(crate) fn empty(path: [u8; N]) -> Self {
        Self::new(path, Vec::new(), 0, [0; N], None, 0, SparseMerkleProof::default())
    }

    /// The target path.
    pub fn path(&self) -> &[u8; N] {
        &self.path
    }

    pub fn flipped_bits(&self) -> &[usize] {
        &self.flipped_bits
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn closest_path(&self) -> &[u8; N] {
        &self.closest_path
    }

    /// Value digest of the closest leaf, `None` when the trie is empty.
    pub fn closest_value_hash(&self) -> Option<&[u8]> {
        self.closest_value_hash.as_deref()
    }

    pub fn closest_sum(&self) -> Sum {
        self.closest_sum
    }

    pub fn closest_proof(&self) -> &SparseMerkleProof {
        &self.closest_proof
    }

    /// Checks that the parts of the proof agree with each other.
    pub fn validate<H: Hasher<N>>(&self, spec: &TrieSpec<N, H>) -> Result<(), ProofError> {
        if self.depth > spec.depth() {
            return Err(ProofError::InvalidClosestProof("depth exceeds trie depth"));
        }
        if self.depth != self.closest_proof.side_nodes().len() {
            return Err(ProofError::InvalidClosestProof(
                "depth does not match the number of side nodes",
            ));
        }
        if !self.flipped_bits.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(ProofError::InvalidClosestProof("flipped bits are not ascending"));
        }
        if self.flipped_bits.iter().any(|bit| *bit >= self.depth) {
            return Err(ProofError::InvalidClosestProof("flipped bit below the closest leaf"));
        }
        let mut walked = self.path;
        for bit in &self.flipped_bits {
            flip_bit(*bit, &mut walked);
        }
        if common_prefix_len(&walked, &self.closest_path, 0) < self.depth {
            return Err(ProofError::InvalidClosestProof(
                "closest path does not follow the walked path",
            ));
        }
        if self.closest_value_hash.is_none() && self.depth != 0 {
            return Err(ProofError::InvalidClosestProof("missing closest leaf"));
        }
        self.closest_proof.validate(spec)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&self.path);
        put_u16(&mut encoded, self.flipped_bits.len());
        for bit in &self.flipped_bits {
            put_u16(&mut encoded, *bit);
        }
        put_u16(&mut encoded, self.depth);
        encoded.extend_from_slice(&self.closest_path);
        put_optional(&mut encoded, self.closest_value_hash());
        encoded.extend_from_slice(&self.closest_sum.to_be_bytes());
        encoded.extend_from_slice(&self.closest_proof.encode());
        encoded
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader::new(data);
        let path = reader.array()?;
        let flipped = reader.u16()?;
        let flipped_bits = (0..flipped)
            .map(|_| reader.u16())
            .collect::<Result<Vec<_>, _>>()?;
        let depth = reader.u16()?;
        let closest_path = reader.array()?;
        let closest_value_hash = reader.optional()?;
        let closest_sum = reader.u64()?;
        let closest_proof = SparseMerkleProof::read(&mut reader)?;
        reader.finish()?;
        Ok(Self::new(
            path,
            flipped_bits,
            depth,
            closest_path,
            closest_value_hash,
            closest_sum,
            closest_proof,
        ))
    }
}

/// Compacted form of [`SparseMerkleClosestProof`]: the flipped bits become a
/// bitmask of `depth` bits and the inner proof is compacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseCompactMerkleClosestProof<const N: usize> {
    path: [u8; N],
    flipped_bits: BitVec<u8, Lsb0>,
    depth: usize,
    closest_path: [u8; N],
    closest_value_hash: Option<Vec<u8>>,
    closest_sum: Sum,
    closest_proof: SparseCompactMerkleProof,
}

impl<const N: usize> SparseCompactMerkleClosestProof<N> {
    pub fn flipped_bits(&self) -> &BitVec<u8, Lsb0> {
        &self.flipped_bits
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn closest_proof(&self) -> &SparseCompactMerkleProof {
        &self.closest_proof
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&self.path);
        put_u16(&mut encoded, self.depth);
        let mut flipped_bits = self.flipped_bits.clone();
        flipped_bits.set_uninitialized(false);
        encoded.extend_from_slice(flipped_bits.as_raw_slice());
        encoded.extend_from_slice(&self.closest_path);
        put_optional(&mut encoded, self.closest_value_hash.as_deref());
        encoded.extend_from_slice(&self.closest_sum.to_be_bytes());
        encoded.extend_from_slice(&self.closest_proof.encode());
        encoded
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader::new(data);
        let path = reader.array()?;
        let depth = reader.u16()?;
        let mut flipped_bits = BitVec::<u8, Lsb0>::from_slice(reader.take(depth.div_ceil(8))?);
        if flipped_bits[depth..].any() {
            return Err(ProofError::Encoding("bitmask padding is not zero"));
        }
        flipped_bits.truncate(depth);
        let closest_path = reader.array()?;
        let closest_value_hash = reader.optional()?;
        let closest_sum = reader.u64()?;
        let closest_proof = SparseCompactMerkleProof::read(&mut reader)?;
        reader.finish()?;
        Ok(Self {
            path,
            flipped_bits,
            depth,
            closest_path,
            closest_value_hash,
            closest_sum,
            closest_proof,
        })
    }
}

/// Verify that the proof's leaf is the closest one to its target path under
/// `root`. The leaf is checked directly on its path, without re-hashing a key.
pub fn verify_closest_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleClosestProof<N>,
    root: &[u8],
    spec: &TrieSpec<N, H>,
) -> Result<bool, ProofError> {
    proof.validate(spec)?;
    verify_path(
        &proof.closest_proof,
        root,
        &proof.closest_path,
        proof.closest_value_hash(),
        proof.closest_sum,
        spec,
    )
}

/// Compacts a closest proof. The proof is validated first.
pub fn compact_closest_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseMerkleClosestProof<N>,
    spec: &TrieSpec<N, H>,
) -> Result<SparseCompactMerkleClosestProof<N>, ProofError> {
    proof.validate(spec)?;
    let mut flipped_bits = BitVec::repeat(false, proof.depth);
    for bit in &proof.flipped_bits {
        flipped_bits.set(*bit, true);
    }
    Ok(SparseCompactMerkleClosestProof {
        path: proof.path,
        flipped_bits,
        depth: proof.depth,
        closest_path: proof.closest_path,
        closest_value_hash: proof.closest_value_hash.clone(),
        closest_sum: proof.closest_sum,
        closest_proof: compact_proof(&proof.closest_proof, spec)?,
    })
}

/// Expands a compacted closest proof, then validates it.
pub fn decompact_closest_proof<const N: usize, H: Hasher<N>>(
    proof: &SparseCompactMerkleClosestProof<N>,
    spec: &TrieSpec<N, H>,
) -> Result<SparseMerkleClosestProof<N>, ProofError> {
    if proof.flipped_bits.len() != proof.depth {
        return Err(ProofError::InvalidBitmask);
    }
    let full = SparseMerkleClosestProof::new(
        proof.path,
        proof.flipped_bits.iter_ones().collect(),
        proof.depth,
        proof.closest_path,
        proof.closest_value_hash.clone(),
        proof.closest_sum,
        decompact_proof(&proof.closest_proof, spec)?,
    );
    full.validate(spec)?;
    Ok(full)
}
