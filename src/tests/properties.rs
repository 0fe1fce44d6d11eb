//! Randomized operation sequences checked against an uncompressed model.

use std::collections::BTreeMap;

use proptest::prelude::*;
use sha2::Sha256;

use super::{leaves_of, new_trie, reference_node_count, reference_root};
use crate::{
    compact_proof, decompact_proof, error::MemoryDbError, verify_proof, verify_sum_proof,
    MemoryDb, SparseCompactMerkleClosestProof, SparseCompactMerkleProof, SparseMerkleClosestProof,
    SparseMerkleProof, SparseMerkleSumTrie, Sum, VersionHistory,
};

#[derive(Debug, Clone)]
enum Op {
    Update(u8, Vec<u8>, Sum),
    Delete(u8),
    Commit,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..48, prop::collection::vec(any::<u8>(), 1..8), 0u64..1_000)
            .prop_map(|(key, value, sum)| Op::Update(key, value, sum)),
        3 => (0u8..48).prop_map(Op::Delete),
        1 => Just(Op::Commit),
    ]
}

fn key(byte: u8) -> Vec<u8> {
    vec![b'k', byte]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn trie_matches_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut trie = new_trie();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for op in &ops {
            match op {
                Op::Update(byte, value, _) => {
                    trie.update(&key(*byte), value).unwrap();
                    model.insert(key(*byte), value.clone());
                }
                Op::Delete(byte) => {
                    let deleted = trie.delete(&key(*byte)).is_ok();
                    prop_assert_eq!(deleted, model.remove(&key(*byte)).is_some());
                }
                Op::Commit => {
                    trie.commit().unwrap();
                    let paths: Vec<_> = model.keys().map(|key| trie.spec().path(key)).collect();
                    prop_assert_eq!(trie.db().len().unwrap(), reference_node_count(&paths, 0, false));
                }
            }
        }

        let spec = *trie.spec();
        let entries: Vec<_> = model.iter().map(|(k, v)| (k.clone(), v.clone(), 0)).collect();
        let root = trie.root();
        let expected = reference_root(&spec, &leaves_of(&spec, &entries), 0);
        prop_assert_eq!(root.as_bytes(), expected.as_slice());

        for byte in 0u8..48 {
            let value = model.get(&key(byte)).cloned().unwrap_or_default();
            let proof = trie.prove(&key(byte)).unwrap();
            prop_assert!(verify_proof(&proof, root.as_bytes(), &key(byte), &value, &spec).unwrap());
            let compact = compact_proof(&proof, &spec).unwrap();
            prop_assert_eq!(decompact_proof(&compact, &spec).unwrap(), proof);
        }
    }

    #[test]
    fn sum_trie_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut trie = SparseMerkleSumTrie::<32, Sha256, MemoryDbError>::new(Box::new(MemoryDb::new()));
        let mut model: BTreeMap<Vec<u8>, (Vec<u8>, Sum)> = BTreeMap::new();
        for op in &ops {
            match op {
                Op::Update(byte, value, sum) => {
                    trie.update(&key(*byte), value, *sum).unwrap();
                    model.insert(key(*byte), (value.clone(), *sum));
                }
                Op::Delete(byte) => {
                    if model.remove(&key(*byte)).is_some() {
                        trie.delete(&key(*byte)).unwrap();
                    }
                }
                Op::Commit => trie.commit().unwrap(),
            }
        }

        let spec = *trie.spec();
        prop_assert_eq!(trie.sum(), model.values().map(|(_, sum)| *sum).sum::<Sum>());
        prop_assert_eq!(trie.count(), model.len() as u64);
        let entries: Vec<_> = model.iter().map(|(k, (v, s))| (k.clone(), v.clone(), *s)).collect();
        let root = trie.root();
        let expected = reference_root(&spec, &leaves_of(&spec, &entries), 0);
        prop_assert_eq!(root.as_bytes(), expected.as_slice());

        for (key, (value, sum)) in &model {
            let proof = trie.prove(key).unwrap();
            prop_assert!(verify_sum_proof(&proof, root.as_bytes(), key, value, *sum, &spec).unwrap());
        }
    }

    #[test]
    fn flipped_bits_break_proofs(
        count in 2usize..24,
        chosen in any::<prop::sample::Index>(),
        flip in any::<prop::sample::Index>(),
    ) {
        let mut trie = new_trie();
        for i in 0..count {
            trie.update(&key(i as u8), &[i as u8, 1]).unwrap();
        }
        let root = trie.root();
        let byte = chosen.index(count) as u8;
        let value = [byte, 1];
        let proof = trie.prove(&key(byte)).unwrap();

        let mut side_nodes = proof.side_nodes().to_vec();
        let bit = flip.index(side_nodes.len() * 32 * 8);
        side_nodes[bit / 256][(bit % 256) / 8] ^= 1 << (bit % 8);
        let tampered = SparseMerkleProof::new(
            side_nodes,
            None,
            proof.sibling_data().map(<[u8]>::to_vec),
        );
        prop_assert!(!matches!(
            verify_proof(&tampered, root.as_bytes(), &key(byte), &value, trie.spec()),
            Ok(true)
        ));

        let mut wrong_value = value;
        wrong_value[flip.index(2)] ^= 1 << flip.index(8);
        prop_assert!(!verify_proof(&proof, root.as_bytes(), &key(byte), &wrong_value, trie.spec()).unwrap());
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = SparseMerkleProof::decode(&data);
        let _ = SparseCompactMerkleProof::decode(&data);
        let _ = SparseMerkleClosestProof::<32>::decode(&data);
        let _ = SparseCompactMerkleClosestProof::<32>::decode(&data);
        let _ = VersionHistory::<32, Sha256>::decode::<MemoryDbError>(&data);
    }
}
