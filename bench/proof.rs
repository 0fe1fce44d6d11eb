use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sha2::Sha256;
use smst::{
    compact_proof, verify_closest_proof, verify_proof, MemoryDb, MemoryDbError, SparseMerkleTrie,
    TrieSpec,
};

type Trie = SparseMerkleTrie<32, Sha256, MemoryDbError>;

pub fn generate_random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for byte in key.iter_mut() {
        *byte = rand::random();
    }
    key
}

fn setup_trie(num_leaves: usize) -> (Trie, Vec<([u8; 32], Vec<u8>)>) {
    let mut trie = Trie::new(Box::new(MemoryDb::new()), TrieSpec::new());
    let mut entries = Vec::with_capacity(num_leaves);
    for _ in 0..num_leaves {
        let key = generate_random_key();
        let value = generate_random_key().to_vec();
        trie.update(&key, &value).unwrap();
        entries.push((key, value));
    }
    (trie, entries)
}

fn bench_proof_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMT Proof Generation");

    let (trie, entries) = setup_trie(100);

    group.bench_function("Membership", |b| {
        b.iter(|| {
            for (key, _) in &entries {
                black_box(trie.prove(key)).unwrap();
            }
        })
    });

    group.bench_function("Closest", |b| {
        b.iter(|| {
            for _ in 0..100 {
                let path = trie.spec().path(&generate_random_key());
                black_box(trie.prove_closest(&path)).unwrap();
            }
        })
    });

    group.finish();
}

fn bench_proof_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMT Proof Verification");

    let (trie, entries) = setup_trie(100);
    let root = trie.root();
    let spec = *trie.spec();
    let proofs: Vec<_> = entries
        .iter()
        .map(|(key, _)| trie.prove(key).unwrap())
        .collect();

    group.bench_function("Membership", |b| {
        b.iter(|| {
            for ((key, value), proof) in entries.iter().zip(&proofs) {
                assert!(black_box(verify_proof(proof, root.as_bytes(), key, value, &spec)).unwrap());
            }
        })
    });

    group.bench_function("Compaction", |b| {
        b.iter(|| {
            for proof in &proofs {
                black_box(compact_proof(proof, &spec)).unwrap();
            }
        })
    });

    let closest: Vec<_> = (0..100)
        .map(|_| {
            let path = spec.path(&generate_random_key());
            trie.prove_closest(&path).unwrap()
        })
        .collect();
    group.bench_function("Closest", |b| {
        b.iter(|| {
            for proof in &closest {
                black_box(verify_closest_proof(proof, root.as_bytes(), &spec)).unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_proof_generation, bench_proof_verification);
criterion_main!(benches);
