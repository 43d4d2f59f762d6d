// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Server-side mutation cost and client-side proof checking cost.

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};

use verisync::asl::AuthSkipList;
use verisync::key::hash;
use verisync::key::Key;
use verisync::proof::Operation;
use verisync::proof_manager::ProofManager;
use verisync::prover;

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn pathname(i: usize) -> String {
    return format!("dir{}/file{:06}.txt", i % 17, i);
}

fn build(size: usize) -> AuthSkipList {
    let mut list = AuthSkipList::new();
    for i in 0..size {
        let name = pathname(i);
        list.insert(&Key::path(&name), hash(&[name.as_bytes()]).0).unwrap();
    }
    return list;
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("lazy", size), &size, |b, &size| {
            b.iter(|| {
                let mut list = build(size);
                black_box(list.basis(false).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_basis(c: &mut Criterion) {
    let mut group = c.benchmark_group("basis");
    for size in SIZES {
        let mut list = build(size);
        list.basis(false).unwrap();
        group.bench_with_input(BenchmarkId::new("update_then_lazy", size), &size, |b, &size| {
            let mut version = 0u64;
            b.iter(|| {
                version += 1;
                let name = pathname(version as usize % size);
                list.update(&Key::path(&name), version.to_be_bytes().to_vec()).unwrap();
                black_box(list.basis(false).unwrap())
            });
        });
        group.bench_with_input(BenchmarkId::new("forced", size), &size, |b, _| {
            b.iter(|| black_box(list.basis(true).unwrap()));
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for size in SIZES {
        let mut list = build(size);
        let manager = ProofManager::new(list.max_tower_height());
        let target = pathname(size / 2);
        let upload = prover::prove(&mut list, Operation::Upload, "new.txt").unwrap();
        let delete = prover::prove(&mut list, Operation::Delete, &target).unwrap();
        group.bench_with_input(BenchmarkId::new("upload", size), &upload, |b, proof| {
            b.iter(|| black_box(manager.evaluate(proof, Some(&[7u8; 32][..])).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("delete", size), &delete, |b, proof| {
            b.iter(|| black_box(manager.evaluate(proof, None).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_basis, bench_evaluate);
criterion_main!(benches);
