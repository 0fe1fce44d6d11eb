use hex_literal::hex;
use sha2::Sha512;

use crate::{
    bit_index, error::MemoryDbError, verify_closest_proof, verify_proof, Hasher, MemoryDb,
    SparseMerkleTrie, TrieSpec,
};

type Trie512 = SparseMerkleTrie<64, Sha512, MemoryDbError>;

fn new_trie() -> Trie512 {
    SparseMerkleTrie::new(Box::new(MemoryDb::new()), TrieSpec::new())
}

fn key_with_prefix(bits: &[u8], skip: usize) -> Vec<u8> {
    let spec = TrieSpec::<64, Sha512>::new();
    (0u64..)
        .map(|i| format!("key{i}").into_bytes())
        .filter(|key| {
            let path = spec.path(key);
            bits.iter()
                .enumerate()
                .all(|(index, bit)| bit_index(index, &path) == *bit)
        })
        .nth(skip)
        .unwrap()
}

#[test]
fn test_sha512_hasher() {
    assert_eq!(<Sha512 as Hasher<64>>::ALGORITHM, "sha512");
    assert_eq!(
        <Sha512 as Hasher<64>>::hash(b""),
        hex!("cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e")
    );
}

#[test]
fn test_empty_tree() {
    let trie = new_trie();
    assert_eq!(trie.root().as_bytes(), [0u8; 64].as_slice());
    assert_eq!(trie.spec().depth(), 512);
}

#[test]
fn test_update_prove_verify() {
    let mut trie = new_trie();
    for i in 0..20u8 {
        trie.update(&[i], &[i; 3]).unwrap();
    }
    let root = trie.root();
    assert_eq!(root.as_bytes().len(), 64);
    for i in 0..20u8 {
        assert_eq!(trie.get(&[i]).unwrap(), trie.spec().value_hash(&[i; 3]));
        let proof = trie.prove(&[i]).unwrap();
        assert!(verify_proof(&proof, root.as_bytes(), &[i], &[i; 3], trie.spec()).unwrap());
    }
    let proof = trie.prove(b"absent").unwrap();
    assert!(verify_proof(&proof, root.as_bytes(), b"absent", b"", trie.spec()).unwrap());
    let target = trie.spec().path(b"target");
    let closest = trie.prove_closest(&target).unwrap();
    assert!(verify_closest_proof(&closest, root.as_bytes(), trie.spec()).unwrap());
}

#[test]
fn test_extension_bounds_take_two_bytes() {
    let a = key_with_prefix(&[0, 0, 0], 0);
    let b = key_with_prefix(&[0, 0, 1], 0);
    let mut trie = new_trie();
    trie.update(&a, b"a").unwrap();
    trie.update(&b, b"b").unwrap();
    trie.commit().unwrap();
    let root = trie.root();
    let record = trie.db().get(root.as_bytes()).unwrap().unwrap();
    assert_eq!(record.len(), 1 + 4 + 64 + 64);
    assert_eq!(record[..5], [2, 0, 0, 0, 2]);
    let imported: Trie512 =
        SparseMerkleTrie::import(trie.into_db(), TrieSpec::new(), root.as_bytes());
    assert_eq!(imported.get(&a).unwrap(), imported.spec().value_hash(b"a"));
    assert_eq!(imported.get(&b).unwrap(), imported.spec().value_hash(b"b"));
}
