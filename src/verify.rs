//! Verification Helpers
//!
//! Single-node references the distributed result is checked against:
//!
//! - `parallel_sort`: rayon's parallel pdqsort, the fast baseline.
//! - `sort_by_low_bits`: sequential LSB radix sort restricted to the low
//!   bits, i.e. what the global sequence must look like after a given number
//!   of distributed passes.

use rayon::prelude::*;

/// Sort in place using rayon's parallel unstable sort.
pub fn parallel_sort(data: &mut [u32]) {
    data.par_sort_unstable();
}

/// Check if a slice is sorted in ascending order.
#[inline]
pub fn is_sorted(data: &[u32]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}

/// Whether `a` and `b` hold the same multiset of values.
pub fn is_permutation(a: &[u32], b: &[u32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    parallel_sort(&mut a);
    parallel_sort(&mut b);
    a == b
}

/// Stable sort by the low `bits` bits only, one bit per pass.
///
/// Each pass is a two-bucket counting sort: histogram, exclusive scan, scatter.
pub fn sort_by_low_bits(data: &[u32], bits: u32) -> Vec<u32> {
    let mut src = data.to_vec();
    let mut dst = vec![0u32; data.len()];

    for bit in 0..bits.min(u32::BITS) {
        let mask = 1u32 << bit;

        let zeros = src.iter().filter(|&&x| x & mask == 0).count();
        let mut positions = [0usize, zeros];

        for &value in src.iter() {
            let bucket = usize::from(value & mask != 0);
            dst[positions[bucket]] = value;
            positions[bucket] += 1;
        }

        std::mem::swap(&mut src, &mut dst);
    }
    src
}
