//! Criterion benchmarks for the distributed sort against a single-node sort.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use distributed_radix_sort::verify::parallel_sort;
use distributed_radix_sort::{sort_cluster, SortConfig};
use rand::Rng;

/// Generate `workers` partitions of `length` random values
fn generate_partitions(workers: usize, length: usize) -> Vec<Vec<u32>> {
    let mut rng = rand::thread_rng();
    (0..workers)
        .map(|_| (0..length).map(|_| rng.gen()).collect())
        .collect()
}

/// Benchmark the distributed sort for several worker counts at a fixed total size
fn bench_distributed_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("Distributed Radix Sort");
    let total = 1usize << 16;
    group.throughput(Throughput::Elements(total as u64));

    for workers in [1usize, 2, 4, 8] {
        let config = SortConfig::new(workers, total / workers);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &config, |b, &config| {
            b.iter_batched(
                || generate_partitions(config.worker_count(), config.per_worker_length()),
                |partitions| sort_cluster(config, black_box(partitions)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Baseline: rayon parallel sort of the concatenated input
fn bench_parallel_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parallel CPU Sort");

    for size_exp in [12, 14, 16] {
        let size = 1usize << size_exp;
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || generate_partitions(1, size).concat(),
                |mut data| {
                    parallel_sort(black_box(&mut data));
                    data
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distributed_sort, bench_parallel_sort);
criterion_main!(benches);
