//! Performance benchmarks for SequenceMemory
//!
//! Covers the per-step hot paths:
//! - learning steps on a repeating sequence
//! - pure inference once the sequence is learned
//! - inference with backtracking after a context switch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use seqmem::{Config, SequenceMemory};

fn bench_config(num_columns: usize) -> Config {
    Config {
        number_of_columns: num_columns,
        cells_per_column: 8,
        initial_permanence: 0.3,
        connected_permanence: 0.5,
        min_threshold: 6,
        activation_threshold: 8,
        new_synapse_count: 10,
        global_decay: 0.0,
        ..Config::default()
    }
}

/// Random sparse patterns with `active` columns each.
fn patterns(num_columns: usize, active: usize, count: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut cols = index::sample(&mut rng, num_columns, active).into_vec();
            cols.sort_unstable();
            cols
        })
        .collect()
}

fn trained(num_columns: usize, seq: &[Vec<usize>], passes: usize) -> SequenceMemory {
    let mut memory = SequenceMemory::new(bench_config(num_columns)).unwrap();
    for _ in 0..passes {
        memory.reset();
        for input in seq {
            memory.compute(input, true, true).unwrap();
        }
    }
    memory.reset();
    memory
}

fn bench_learn_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("SequenceMemory::compute_learn");

    for num_columns in [256, 512, 1024].iter() {
        let seq = patterns(*num_columns, 20, 10, 42);
        group.throughput(Throughput::Elements(seq.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_columns),
            num_columns,
            |b, &num_columns| {
                let mut memory = SequenceMemory::new(bench_config(num_columns)).unwrap();
                b.iter(|| {
                    memory.reset();
                    for input in &seq {
                        black_box(memory.compute(input, true, true).unwrap());
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_infer_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("SequenceMemory::compute_infer");

    for num_columns in [256, 512, 1024].iter() {
        let seq = patterns(*num_columns, 20, 10, 7);
        let memory = trained(*num_columns, &seq, 5);
        group.throughput(Throughput::Elements(seq.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_columns),
            num_columns,
            |b, _| {
                let mut memory = memory.clone();
                b.iter(|| {
                    memory.reset();
                    for input in &seq {
                        black_box(memory.compute(input, false, true).unwrap());
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_backtrack(c: &mut Criterion) {
    let num_columns = 512;
    let first = patterns(num_columns, 20, 6, 1);
    let mut second = patterns(num_columns, 20, 6, 2);
    second[1..4].clone_from_slice(&first[1..4]);

    let mut memory = trained(num_columns, &first, 5);
    for _ in 0..5 {
        memory.reset();
        for input in &second {
            memory.compute(input, true, true).unwrap();
        }
    }

    // Shared middle of `first`, then the continuation of `second`
    let switched: Vec<Vec<usize>> = first[..4].iter().chain(&second[4..5]).cloned().collect();

    c.bench_function("SequenceMemory::compute_backtrack", |b| {
        b.iter(|| {
            memory.reset();
            for input in &switched {
                black_box(memory.compute(input, false, true).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_learn_step, bench_infer_step, bench_backtrack);
criterion_main!(benches);
