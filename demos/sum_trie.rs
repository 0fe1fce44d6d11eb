//! Example of using the Sparse Merkle Sum Trie
//!
//! This example demonstrates:
//! - Weighting leaves with a sum
//! - Reading the total sum and leaf count from the root
//! - Proving a leaf together with its sum
//! - Recording versions of the trie

use sha2::Sha256;
use smst::{
    verify_sum_proof, MemoryDb, MemoryDbError, SparseMerkleSumTrie, SparseMerkleTrie, TrieSpec,
    VersionedTrie,
};

fn main() {
    let db = Box::new(MemoryDb::new());
    let mut trie = SparseMerkleSumTrie::<32, Sha256, MemoryDbError>::new(db);

    trie.update(b"account-1", b"owner data", 100).unwrap();
    trie.update(b"account-2", b"owner data", 250).unwrap();
    trie.update(b"account-3", b"owner data", 50).unwrap();

    let root = trie.root();
    println!("Root: {root}");
    println!("Total sum: {}, leaves: {}", trie.sum(), trie.count());

    let proof = trie.prove(b"account-2").unwrap();
    let valid = verify_sum_proof(
        &proof,
        root.as_bytes(),
        b"account-2",
        b"owner data",
        250,
        trie.spec(),
    );
    println!("Sum proof verification: {valid:?}");

    // A wrong sum does not lead to the root
    let valid = verify_sum_proof(
        &proof,
        root.as_bytes(),
        b"account-2",
        b"owner data",
        251,
        trie.spec(),
    );
    println!("Sum proof with a wrong sum: {valid:?}");

    // Versioned commits on a plain trie
    let plain = SparseMerkleTrie::<32, Sha256, MemoryDbError>::new(
        Box::new(MemoryDb::new()),
        TrieSpec::new(),
    );
    let mut versioned = VersionedTrie::new(plain, 16);
    for block in 0..3u8 {
        versioned.trie_mut().update(&[block], b"block data").unwrap();
        let version = versioned.commit_version().unwrap();
        println!("Version {version}: {}", versioned.version_root(version).unwrap());
    }
}
