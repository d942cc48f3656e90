//! Bit-width Reduction
//!
//! Before the first pass every worker agrees on `B`, the number of bit planes
//! the sort has to process. Each worker folds its local bit count into an
//! atomic max cell on worker 0; after a barrier worker 0 broadcasts the
//! result to everyone's `bits` slot.
//!
//! `B` is the width of the largest value, `floor(log2(max)) + 1`, so an exact
//! power of two still gets its top bit sorted. All-zero input yields `B = 0`.

use log::debug;

use crate::substrate::{Slot, Substrate, SubstrateError};

/// Worker holding the atomic `bits` cell.
const ROOT: usize = 0;

/// Number of significant bits in `max`. Zero for zero.
#[inline]
pub fn local_bits(max: u32) -> u32 {
    u32::BITS - max.leading_zeros()
}

/// Agree on the global bit width across all workers.
///
/// `local_max` is `None` for an empty partition, which contributes no bits.
pub fn reduce_bits<S: Substrate + ?Sized>(
    substrate: &S,
    local_max: Option<u32>,
) -> Result<u32, SubstrateError> {
    let bits = local_max.map_or(0, local_bits);
    // local_bits never exceeds 32, so the cast is lossless.
    substrate.compare_and_max(ROOT, Slot::Bits, bits as i32)?;

    substrate.barrier()?;

    if substrate.my_id() == ROOT {
        let global = substrate.load_scalar(Slot::Bits)?;
        substrate.broadcast_scalar(Slot::Bits, global)?;
    }
    substrate.wait_for(Slot::Bits, 1)?;

    let global = substrate.load_scalar(Slot::Bits)?.clamp(0, u32::BITS as i32) as u32;
    debug!(
        "worker {}: local bits {bits}, global bits {global}",
        substrate.my_id()
    );
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortConfig;
    use crate::local_cluster::LocalCluster;

    #[test]
    fn test_local_bits() {
        assert_eq!(local_bits(0), 0);
        assert_eq!(local_bits(1), 1);
        assert_eq!(local_bits(2), 2);
        assert_eq!(local_bits(3), 2);
        assert_eq!(local_bits(7), 3);
        assert_eq!(local_bits(8), 4);
        assert_eq!(local_bits(9), 4);
        assert_eq!(local_bits(u32::MAX), 32);
    }

    #[test]
    fn test_power_of_two_keeps_top_bit() {
        for k in 0..32 {
            assert_eq!(local_bits(1 << k), k + 1);
        }
    }

    fn reduce(maxima: Vec<Option<u32>>) -> Vec<u32> {
        let workers = maxima.len();
        LocalCluster::new(SortConfig::new(workers, 0))
            .unwrap()
            .run(vec![vec![]; workers], |w, _| {
                Ok(reduce_bits(w, maxima[w.my_id()])?)
            })
            .unwrap()
    }

    #[test]
    fn test_reduce_agrees_on_global_max() {
        let bits = reduce(vec![Some(4), Some(9), Some(1), Some(6)]);
        assert_eq!(bits, vec![4; 4]);
    }

    #[test]
    fn test_reduce_single_worker() {
        assert_eq!(reduce(vec![Some(12)]), vec![4]);
    }

    #[test]
    fn test_reduce_all_zero_or_empty() {
        assert_eq!(reduce(vec![Some(0), None, Some(0)]), vec![0; 3]);
    }

    #[test]
    fn test_reduce_full_width() {
        assert_eq!(reduce(vec![Some(3), Some(u32::MAX)]), vec![32; 2]);
    }
}
