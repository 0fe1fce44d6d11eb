use sha2::Sha256;

use super::{leaves_of, reference_root};
use crate::{
    error::MemoryDbError, verify_closest_proof, verify_sum_proof, MemoryDb, SparseMerkleSumTrie,
    TreeError, TrieSpec,
};

type SumTrie = SparseMerkleSumTrie<32, Sha256, MemoryDbError>;

fn new_sum_trie() -> SumTrie {
    SparseMerkleSumTrie::new(Box::new(MemoryDb::new()))
}

#[test]
fn test_empty_sum_trie() {
    let trie = new_sum_trie();
    assert_eq!(trie.root().as_bytes(), [0u8; 48].as_slice());
    assert_eq!(trie.sum(), 0);
    assert_eq!(trie.count(), 0);
    assert_eq!(trie.get(b"key").unwrap(), (Vec::new(), 0));
}

#[test]
fn test_sum_and_count_aggregate() {
    let mut trie = new_sum_trie();
    let mut total = 0;
    for i in 0..30u64 {
        let key = format!("account{i}");
        trie.update(key.as_bytes(), b"balance", i * 7).unwrap();
        total += i * 7;
        assert_eq!(trie.sum(), total);
        assert_eq!(trie.count(), i + 1);
    }
    let root = trie.root();
    assert!(root.is_sum_root());
    assert_eq!(root.sum(), Some(total));
    assert_eq!(root.count(), Some(30));
    assert_eq!(root.hash().len(), 32);
}

#[test]
fn test_sum_root_matches_uncompressed_tree() {
    let mut trie = new_sum_trie();
    let entries: Vec<_> = (0..20u64)
        .map(|i| (format!("k{i}").into_bytes(), vec![i as u8 + 1], i + 100))
        .collect();
    for (key, value, sum) in &entries {
        trie.update(key, value, *sum).unwrap();
    }
    let spec = *trie.spec();
    assert_eq!(
        trie.root().as_bytes(),
        reference_root(&spec, &leaves_of(&spec, &entries), 0).as_slice()
    );
}

#[test]
fn test_get_returns_value_and_sum() {
    let mut trie = new_sum_trie();
    trie.update(b"alice", b"data", 50).unwrap();
    trie.update(b"bob", b"more", 25).unwrap();
    let spec = *trie.spec();
    assert_eq!(trie.get(b"alice").unwrap(), (spec.value_hash(b"data"), 50));
    assert_eq!(trie.get(b"bob").unwrap(), (spec.value_hash(b"more"), 25));
    trie.update(b"alice", b"data", 10).unwrap();
    assert_eq!(trie.sum(), 35);
    assert_eq!(trie.count(), 2);
}

#[test]
fn test_delete_updates_sum() {
    let mut trie = new_sum_trie();
    trie.update(b"alice", b"data", 50).unwrap();
    trie.update(b"bob", b"more", 25).unwrap();
    trie.update(b"carol", b"most", 5).unwrap();
    trie.delete(b"bob").unwrap();
    assert_eq!(trie.sum(), 55);
    assert_eq!(trie.count(), 2);
    trie.update(b"carol", b"", 0).unwrap();
    assert_eq!(trie.sum(), 50);
    assert_eq!(trie.count(), 1);
    assert_eq!(trie.delete(b"bob"), Err(TreeError::KeyNotFound));
}

#[test]
fn test_sum_proofs() {
    let mut trie = new_sum_trie();
    for i in 0..12u64 {
        trie.update(format!("k{i}").as_bytes(), b"v", i + 1).unwrap();
    }
    let spec = *trie.spec();
    let root = trie.root();
    for i in 0..12u64 {
        let key = format!("k{i}");
        let proof = trie.prove(key.as_bytes()).unwrap();
        assert!(proof.side_nodes().iter().all(|node| node.len() == 48));
        assert!(verify_sum_proof(&proof, root.as_bytes(), key.as_bytes(), b"v", i + 1, &spec).unwrap());
        assert!(!verify_sum_proof(&proof, root.as_bytes(), key.as_bytes(), b"v", i + 2, &spec).unwrap());
    }
    let proof = trie.prove(b"absent").unwrap();
    assert!(verify_sum_proof(&proof, root.as_bytes(), b"absent", b"", 0, &spec).unwrap());
}

#[test]
fn test_sum_trie_commit_and_import() {
    let mut trie = new_sum_trie();
    for i in 0..10u64 {
        trie.update(&[i as u8], b"v", i).unwrap();
    }
    trie.commit().unwrap();
    let root = trie.root();
    let imported: SumTrie =
        SparseMerkleSumTrie::import(trie.into_db(), TrieSpec::new(), root.as_bytes());
    assert!(imported.spec().is_sum_trie());
    assert_eq!(imported.sum(), 45);
    assert_eq!(imported.get(&[4]).unwrap().1, 4);
    assert_eq!(imported.saved_root(), Some(root));
}

#[test]
fn test_sum_wraps_on_overflow() {
    let mut trie = new_sum_trie();
    trie.update(b"a", b"v", u64::MAX).unwrap();
    trie.update(b"b", b"v", 2).unwrap();
    assert_eq!(trie.sum(), 1);
}

#[test]
fn test_sum_closest_proof() {
    let mut trie = new_sum_trie();
    for i in 0..8u64 {
        trie.update(format!("k{i}").as_bytes(), b"v", i * 3).unwrap();
    }
    let spec = *trie.spec();
    let target = spec.path(b"k5");
    let proof = trie.prove_closest(&target).unwrap();
    assert_eq!(proof.closest_sum(), 15);
    assert!(verify_closest_proof(&proof, trie.root().as_bytes(), &spec).unwrap());
}

#[test]
fn test_with_spec_switches_to_sum_mode() {
    let trie: SumTrie = SparseMerkleSumTrie::with_spec(Box::new(MemoryDb::new()), TrieSpec::new());
    assert!(trie.spec().is_sum_trie());
    assert!(trie.as_trie().spec().is_sum_trie());
}

#[test]
fn test_weighted_accounts() {
    let mut trie = new_sum_trie();
    trie.update(b"foo", b"oof", 10).unwrap();
    trie.update(b"baz", b"zab", 7).unwrap();
    trie.update(b"bin", b"nib", 3).unwrap();
    trie.commit().unwrap();
    assert_eq!(trie.sum(), 20);
    let spec = *trie.spec();
    let root = trie.saved_root().unwrap();
    assert_eq!(root, trie.root());
    assert_eq!(root.sum(), Some(20));
    for (key, value, sum) in [(b"foo", b"oof", 10), (b"baz", b"zab", 7), (b"bin", b"nib", 3)] {
        let proof = trie.prove(key).unwrap();
        assert!(verify_sum_proof(&proof, root.as_bytes(), key, value, sum, &spec).unwrap());
    }
    let proof = trie.prove(b"foo").unwrap();
    assert!(!verify_sum_proof(&proof, root.as_bytes(), b"foo", b"oof", 11, &spec).unwrap());
}
