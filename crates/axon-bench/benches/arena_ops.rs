//! Criterion micro-benchmarks for block arena allocation and release.

use std::hint::black_box;

use axon_arena::{BlockAllocator, BlockArena};
use axon_bench::reference_shape;
use axon_net::{BackpropScratch, Network};
use axon_test_utils::FIRMWARE_ARENA_BYTES;
use criterion::{criterion_group, criterion_main, Criterion};

/// Benchmark: allocate then free 32 blocks of mixed size.
fn bench_alloc_free_cycle(c: &mut Criterion) {
    let mut arena = BlockArena::with_bytes(FIRMWARE_ARENA_BYTES).unwrap();
    c.bench_function("arena_alloc_free_32", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..32)
                .map(|i| arena.allocate(16 + (i % 7) * 12).unwrap())
                .collect();
            for h in handles {
                arena.deallocate(h);
            }
            black_box(arena.free_words());
        });
    });
}

/// Benchmark: allocation after fragmenting the arena, which forces the
/// first-fit scan to coalesce free runs.
fn bench_alloc_fragmented(c: &mut Criterion) {
    c.bench_function("arena_alloc_fragmented", |b| {
        b.iter_batched(
            || {
                let mut arena = BlockArena::with_bytes(FIRMWARE_ARENA_BYTES).unwrap();
                let handles: Vec<_> = (0..200).map(|_| arena.allocate(64).unwrap()).collect();
                for h in handles.into_iter().step_by(2) {
                    arena.deallocate(h);
                }
                arena
            },
            |mut arena| black_box(arena.allocate(4_000).ok()),
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark: build the firmware controller plus its scratch in a fresh
/// arena.
fn bench_network_setup(c: &mut Criterion) {
    let shape = reference_shape();
    c.bench_function("arena_network_setup", |b| {
        b.iter(|| {
            let arena = BlockArena::with_bytes(FIRMWARE_ARENA_BYTES).unwrap();
            let mut net = Network::from_shape(arena, &shape).unwrap();
            let scratch = BackpropScratch::new(&mut net).unwrap();
            black_box(scratch.size_bytes());
            scratch.release(&mut net);
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_free_cycle,
    bench_alloc_fragmented,
    bench_network_setup
);
criterion_main!(benches);
