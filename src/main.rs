//! Distributed Radix Sort Demo
//!
//! Launches `P` in-process workers, fills each with `L` random values, sorts
//! them with the distributed LSB radix sort and verifies the result against
//! rayon's parallel pdqsort.

use std::time::Instant;

use anyhow::{ensure, Result};
use clap::Parser;
use distributed_radix_sort::verify::{is_permutation, is_sorted, parallel_sort};
use distributed_radix_sort::{sort_cluster, SortConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sort random data with a distributed LSB radix sort over in-process workers.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of workers (P)
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Elements per worker (L)
    #[arg(short, long, default_value_t = 10)]
    length: usize,

    /// Exclusive upper bound of generated values
    #[arg(short, long, default_value_t = 100)]
    max_value: u32,

    /// Seed for reproducible input
    #[arg(short, long)]
    seed: Option<u64>,

    /// Do not print the partitions
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Time the distributed sort against a parallel CPU sort over several sizes
    #[arg(long, default_value_t = false)]
    benchmark: bool,
}

fn generate_partitions(rng: &mut impl Rng, config: SortConfig, max_value: u32) -> Vec<Vec<u32>> {
    (0..config.worker_count())
        .map(|_| {
            (0..config.per_worker_length())
                .map(|_| rng.gen_range(0..max_value))
                .collect()
        })
        .collect()
}

fn print_partitions(partitions: &[Vec<u32>]) {
    let line: String = partitions.iter().map(|p| format!("{p:?}")).collect();
    println!("{line}");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    ensure!(args.max_value > 0, "--max-value must be at least 1");

    let config = SortConfig::default()
        .with_worker_count(args.workers)
        .with_per_worker_length(args.length);
    config.validate()?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("Distributed Radix Sort");
    println!("======================\n");
    println!(
        "Workers: {}, elements per worker: {}, values in [0, {})",
        config.worker_count(),
        config.per_worker_length(),
        args.max_value
    );

    let partitions = generate_partitions(&mut rng, config, args.max_value);
    if !args.quiet {
        print_partitions(&partitions);
    }
    let input = partitions.concat();

    let start = Instant::now();
    let sorted = sort_cluster(config, partitions)?;
    let duration = start.elapsed();

    if !args.quiet {
        print_partitions(&sorted);
    }
    println!(
        "Distributed sort time: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    let output = sorted.concat();
    ensure!(is_sorted(&output), "distributed sort output is not sorted");
    ensure!(
        is_permutation(&input, &output),
        "distributed sort output is not a permutation of the input"
    );
    println!("Distributed sort verified: OK");

    if args.benchmark {
        run_benchmark(&mut rng, config.worker_count())?;
    }
    Ok(())
}

/// Run benchmarks across multiple partition sizes
fn run_benchmark(rng: &mut impl Rng, workers: usize) -> Result<()> {
    println!("\n\n====================================");
    println!("Running benchmark with {workers} workers...");
    println!("====================================\n");

    let lengths: Vec<usize> = vec![
        1 << 8,  // 256
        1 << 10, // 1K
        1 << 12, // 4K
        1 << 14, // 16K
        1 << 16, // 64K
        1 << 18, // 256K
    ];

    println!(
        "{:>12} | {:>12} | {:>16} | {:>12}",
        "Total", "CPU (ms)", "Distributed (ms)", "Dist/CPU"
    );
    println!("{:-<12}-+-{:-<12}-+-{:-<16}-+-{:-<12}", "", "", "", "");

    for &length in &lengths {
        let config = SortConfig::new(workers, length);
        if config.validate().is_err() {
            continue;
        }
        let partitions = generate_partitions(rng, config, u32::MAX);

        let mut cpu_data = partitions.concat();
        let cpu_start = Instant::now();
        parallel_sort(&mut cpu_data);
        let cpu_ms = cpu_start.elapsed().as_secs_f64() * 1000.0;

        let dist_start = Instant::now();
        let sorted = sort_cluster(config, partitions)?;
        let dist_ms = dist_start.elapsed().as_secs_f64() * 1000.0;

        let status = if sorted.concat() == cpu_data {
            format!("{:.2}x", dist_ms / cpu_ms)
        } else {
            "ERROR".to_string()
        };
        println!(
            "{:>12} | {:>12.3} | {:>16.3} | {:>12}",
            config.total_len(),
            cpu_ms,
            dist_ms,
            status
        );
    }

    println!("\nNote: Dist/CPU > 1.0x means the distributed sort is slower");
    Ok(())
}
