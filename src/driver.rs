//! Sort Driver
//!
//! Checks preconditions, agrees on the bit width, then runs one pass per bit
//! from the least significant upward. Each pass ends in a barrier, so nothing
//! extra is needed between passes.

use std::time::Instant;

use log::info;

use crate::bit_width::reduce_bits;
use crate::config::{validate_shape, SortConfig};
use crate::error::SortError;
use crate::local_cluster::LocalCluster;
use crate::pass::run_pass;
use crate::substrate::{Slot, Substrate};

/// Result of sorting on one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    /// This worker's slice of the globally sorted sequence.
    pub partition: Vec<u32>,
    /// Number of bit passes that were run.
    pub bits: u32,
}

/// Sort `partition` together with every other worker of `substrate`.
///
/// Must be called by every worker. On success the concatenation of all
/// returned partitions in worker-id order is sorted ascending.
pub fn sort<S: Substrate + ?Sized>(
    substrate: &S,
    partition: Vec<u32>,
) -> Result<SortOutcome, SortError> {
    let me = substrate.my_id();
    let workers = substrate.worker_count();
    let length = substrate.slot_len(Slot::NewTab);

    validate_shape(workers, length)?;
    if partition.len() != length {
        return Err(SortError::LengthMismatch {
            worker: me,
            expected: length,
            actual: partition.len(),
        });
    }

    let start = Instant::now();
    let bits = reduce_bits(substrate, partition.iter().copied().max())?;
    if me == 0 {
        info!("sorting {workers} x {length} elements over {bits} bits");
    }

    let mut tab = partition;
    for bit in 0..bits {
        tab = run_pass(substrate, tab, bit)?;
    }

    if me == 0 {
        info!("sort finished in {:.3} ms", start.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(SortOutcome {
        partition: tab,
        bits,
    })
}

/// Sort `partitions` on a fresh in-process cluster shaped by `config`.
///
/// Returns the sorted partitions in worker-id order.
pub fn sort_cluster(config: SortConfig, partitions: Vec<Vec<u32>>) -> Result<Vec<Vec<u32>>, SortError> {
    let outcomes = LocalCluster::new(config)?.run(partitions, |worker, partition| sort(worker, partition))?;
    Ok(outcomes.into_iter().map(|o| o.partition).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::is_sorted;
    use rand::Rng;

    #[test]
    fn test_sort_reports_bits() {
        let outcomes = LocalCluster::new(SortConfig::new(4, 2))
            .unwrap()
            .run(vec![vec![3, 1], vec![4, 1], vec![5, 9], vec![2, 6]], |w, tab| sort(w, tab))
            .unwrap();
        assert!(outcomes.iter().all(|o| o.bits == 4));
        let partitions: Vec<_> = outcomes.into_iter().map(|o| o.partition).collect();
        assert_eq!(partitions, vec![vec![1, 1], vec![2, 3], vec![4, 5], vec![6, 9]]);
    }

    #[test]
    fn test_sort_cluster_random() {
        let mut rng = rand::thread_rng();
        let partitions: Vec<Vec<u32>> = (0..5)
            .map(|_| (0..200).map(|_| rng.gen()).collect())
            .collect();
        let mut expected: Vec<u32> = partitions.concat();
        expected.sort_unstable();

        let sorted = sort_cluster(SortConfig::new(5, 200), partitions).unwrap();
        assert!(sorted.iter().all(|p| p.len() == 200));
        let flat = sorted.concat();
        assert!(is_sorted(&flat));
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_all_zero_input_skips_passes() {
        let outcomes = LocalCluster::new(SortConfig::new(2, 3))
            .unwrap()
            .run(vec![vec![0; 3]; 2], |w, tab| sort(w, tab))
            .unwrap();
        assert!(outcomes.iter().all(|o| o.bits == 0 && o.partition == vec![0; 3]));
    }

    #[test]
    fn test_length_mismatch_is_fatal() {
        let err = sort_cluster(SortConfig::new(3, 2), vec![vec![1, 2], vec![3], vec![4, 5]]).unwrap_err();
        assert_eq!(
            err,
            SortError::LengthMismatch {
                worker: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert_eq!(sort_cluster(SortConfig::new(0, 4), vec![]), Err(SortError::NoWorkers));
    }
}
