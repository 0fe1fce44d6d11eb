//! Basic example of using the Sparse Merkle Trie
//!
//! This example demonstrates:
//! - Creating a new trie
//! - Updating and deleting keys
//! - Committing to the store and reopening the trie
//! - Verifying membership and non-membership proofs

use sha2::Sha256;
use smst::{compact_proof, verify_proof, MemoryDb, MemoryDbError, SparseMerkleTrie, TrieSpec};

fn main() {
    // Create a new trie with 32-byte paths using SHA256
    let db = Box::new(MemoryDb::new());
    let mut trie = SparseMerkleTrie::<32, Sha256, MemoryDbError>::new(db, TrieSpec::new());

    trie.update(b"alice", b"likes apples").unwrap();
    trie.update(b"bob", b"likes bananas").unwrap();
    trie.update(b"carol", b"likes cherries").unwrap();
    trie.delete(b"bob").unwrap();

    let root = trie.root();
    println!("Root: {root}");

    // Nothing is written before the commit
    trie.commit().unwrap();
    println!("Stored nodes: {}", trie.db().len().unwrap());

    let proof = trie.prove(b"alice").unwrap();
    println!("Proof side nodes: {}", proof.side_nodes().len());
    let valid = verify_proof(&proof, root.as_bytes(), b"alice", b"likes apples", trie.spec());
    println!("Membership proof verification: {valid:?}");

    // An empty value proves that the key is absent
    let proof = trie.prove(b"bob").unwrap();
    let valid = verify_proof(&proof, root.as_bytes(), b"bob", b"", trie.spec());
    println!("Non-membership proof verification: {valid:?}");

    let compact = compact_proof(&proof, trie.spec()).unwrap();
    println!(
        "Compact proof: {} of {} side nodes kept",
        compact.side_nodes().len(),
        compact.num_side_nodes()
    );

    // Reopen the committed trie; nodes are loaded on demand
    let db = trie.into_db();
    let reopened = SparseMerkleTrie::<32, Sha256, MemoryDbError>::import(
        db,
        TrieSpec::new(),
        root.as_bytes(),
    );
    println!(
        "Reopened value digest for carol: {}",
        hex::encode(reopened.get(b"carol").unwrap())
    );
}
