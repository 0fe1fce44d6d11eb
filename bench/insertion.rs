use criterion::{criterion_group, criterion_main, Criterion};
use sha2::Sha256;
use smst::{MemoryDb, MemoryDbError, SparseMerkleSumTrie, SparseMerkleTrie, TrieSpec};

pub fn generate_random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for byte in key.iter_mut() {
        *byte = rand::random();
    }
    key
}

pub fn generate_random_value() -> Vec<u8> {
    (0..32).map(|_| rand::random()).collect()
}

fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMT Insertion");

    group.bench_function("Plain Trie", |b| {
        b.iter(|| {
            let db = Box::new(MemoryDb::new());
            let mut trie = SparseMerkleTrie::<32, Sha256, MemoryDbError>::new(db, TrieSpec::new());
            for _ in 0..100 {
                trie.update(&generate_random_key(), &generate_random_value())
                    .unwrap();
            }
        })
    });

    group.bench_function("Sum Trie", |b| {
        b.iter(|| {
            let db = Box::new(MemoryDb::new());
            let mut trie = SparseMerkleSumTrie::<32, Sha256, MemoryDbError>::new(db);
            for _ in 0..100 {
                trie.update(
                    &generate_random_key(),
                    &generate_random_value(),
                    rand::random::<u32>() as u64,
                )
                .unwrap();
            }
        })
    });

    group.bench_function("Plain Trie With Commit", |b| {
        b.iter(|| {
            let db = Box::new(MemoryDb::new());
            let mut trie = SparseMerkleTrie::<32, Sha256, MemoryDbError>::new(db, TrieSpec::new());
            for _ in 0..100 {
                trie.update(&generate_random_key(), &generate_random_value())
                    .unwrap();
            }
            trie.commit().unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insertion);
criterion_main!(benches);
