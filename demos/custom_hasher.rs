//! Example of implementing a custom hasher for the Sparse Merkle Trie
//!
//! This example demonstrates:
//! - Creating a custom hasher implementation
//! - Using it with the trie
//! - Basic trie operations with the custom hasher

use sha2::{Digest, Sha256};
use smst::{verify_proof, Hasher, MemoryDb, MemoryDbError, SparseMerkleTrie, TrieSpec};

// Custom hasher that uses SHA256 but adds a prefix to the input
struct PrefixedSha256;

impl Hasher<32> for PrefixedSha256 {
    const ALGORITHM: &'static str = "prefixed-sha256";

    fn hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        // Add a custom prefix to the input
        hasher.update(b"custom_prefix:");
        hasher.update(data);
        hasher.finalize().into()
    }
}

fn main() {
    // Create a new trie with our custom hasher
    let db = Box::new(MemoryDb::new());
    let mut trie =
        SparseMerkleTrie::<32, PrefixedSha256, MemoryDbError>::new(db, TrieSpec::new());
    trie.update(b"key", b"value").unwrap();
    let root = trie.root();
    println!("Root with custom hasher: {root}");

    let proof = trie.prove(b"key").unwrap();
    let valid = verify_proof(&proof, root.as_bytes(), b"key", b"value", trie.spec());
    println!("Proof verification: {valid:?}");

    // Compare with standard SHA256
    let standard_db = Box::new(MemoryDb::new());
    let mut standard_trie =
        SparseMerkleTrie::<32, Sha256, MemoryDbError>::new(standard_db, TrieSpec::new());
    standard_trie.update(b"key", b"value").unwrap();
    println!("Root with standard SHA256: {}", standard_trie.root());

    // An encoded TrieSpec records the hasher, so it cannot be reloaded with another one
    let encoded = trie.spec().encode();
    let mismatch = TrieSpec::<32, Sha256>::decode::<MemoryDbError>(&encoded);
    println!("Decoding the TrieSpec with SHA256: {mismatch:?}");
}
