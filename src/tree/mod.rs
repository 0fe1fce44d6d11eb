mod prove;
mod regular;
mod root;
mod sum;

pub use regular::SparseMerkleTrie;
pub use root::MerkleRoot;
pub use sum::SparseMerkleSumTrie;
