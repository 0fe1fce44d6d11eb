use std::sync::Arc;

use tracing::trace;

use super::SparseMerkleTrie;
use crate::{
    node::{flip_bit, Node},
    proof::{SparseMerkleClosestProof, SparseMerkleProof},
    spec::Hasher,
    TreeError,
};

impl<const N: usize, H: Hasher<N>, DbError> SparseMerkleTrie<N, H, DbError> {
    /// Membership or non-membership proof for `key` against the current root.
    pub fn prove(&self, key: &[u8]) -> Result<SparseMerkleProof, TreeError<DbError>> {
        self.prove_path(&self.spec().path(key))
    }

    pub(crate) fn prove_path(&self, path: &[u8; N]) -> Result<SparseMerkleProof, TreeError<DbError>> {
        let spec = self.spec();
        let mut side_nodes = Vec::new();
        let mut sibling: Option<Arc<Node<N>>> = None;
        let mut non_membership_leaf_data = None;
        let mut depth = 0;
        let mut current = self.resolve_root()?;
        while let Some(node) = current {
            current = match node.as_ref() {
                Node::Leaf(leaf) => {
                    if leaf.path() != path {
                        non_membership_leaf_data = Some(leaf.encode(spec));
                    }
                    break;
                }
                Node::Inner(inner) => {
                    let (next, other) = inner.step(depth, path);
                    side_nodes.push(other.digest(spec).to_vec());
                    sibling = Some(other.clone());
                    depth += 1;
                    self.resolve_lazy(next)?
                }
                Node::Extension(extension) => {
                    let diverging = extension.diverging_bit(path);
                    let run_end = diverging.unwrap_or(extension.end());
                    // every compressed level has the empty subtree as sibling
                    side_nodes.extend((extension.start()..run_end).map(|_| spec.placeholder()));
                    sibling = None;
                    match diverging {
                        None => {
                            depth = extension.end();
                            self.resolve_lazy(extension.child())?
                        }
                        Some(bit) => {
                            // the path leaves the run: the rest of the run is
                            // the sibling and the path ends in an empty subtree
                            let remainder = extension.remainder(bit);
                            side_nodes.push(remainder.digest(spec).to_vec());
                            sibling = Some(remainder);
                            None
                        }
                    }
                }
                Node::Lazy(lazy) => self.load(lazy)?,
            };
        }
        side_nodes.reverse();
        let sibling_data = match sibling {
            Some(sibling) => self
                .resolve_lazy(&sibling)?
                .and_then(|sibling| sibling.encode(spec)),
            None => None,
        };
        trace!(path = %hex::encode(path), side_nodes = side_nodes.len(), "built proof");
        Ok(SparseMerkleProof::new(
            side_nodes,
            non_membership_leaf_data,
            sibling_data,
        ))
    }

    /// Proof of the leaf closest to `path`.
    ///
    /// The walk follows `path` and, whenever it would enter an empty subtree,
    /// flips the bit of that level and takes the other branch.
    pub fn prove_closest(
        &self,
        path: &[u8; N],
    ) -> Result<SparseMerkleClosestProof<N>, TreeError<DbError>> {
        let mut walked = *path;
        let mut flipped_bits = Vec::new();
        let mut depth = 0;
        let mut closest = None;
        let mut current = self.resolve_root()?;
        while let Some(node) = current {
            current = match node.as_ref() {
                Node::Leaf(leaf) => {
                    closest = Some((*leaf.path(), leaf.value_hash().to_vec(), leaf.sum()));
                    break;
                }
                Node::Inner(inner) => {
                    let (next, other) = inner.step(depth, &walked);
                    let next = match self.resolve_lazy(next)? {
                        Some(next) => Some(next),
                        None => {
                            flip_bit(depth, &mut walked);
                            flipped_bits.push(depth);
                            self.resolve_lazy(other)?
                        }
                    };
                    depth += 1;
                    next
                }
                Node::Extension(extension) => {
                    while let Some(bit) = extension.diverging_bit(&walked) {
                        flip_bit(bit, &mut walked);
                        flipped_bits.push(bit);
                    }
                    depth = extension.end();
                    self.resolve_lazy(extension.child())?
                }
                Node::Lazy(lazy) => self.load(lazy)?,
            };
        }
        let Some((closest_path, value_hash, sum)) = closest else {
            return Ok(SparseMerkleClosestProof::empty(*path));
        };
        let closest_proof = self.prove_path(&closest_path)?;
        trace!(
            path = %hex::encode(path),
            closest = %hex::encode(closest_path),
            flipped = flipped_bits.len(),
            "built closest proof"
        );
        Ok(SparseMerkleClosestProof::new(
            *path,
            flipped_bits,
            closest_proof.side_nodes().len(),
            closest_path,
            Some(value_hash),
            sum,
            closest_proof,
        ))
    }
}
