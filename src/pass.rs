//! Per-bit Pass Engine
//!
//! One pass stably partitions the global sequence `tab[0] ‖ tab[1] ‖ …` by a
//! single bit: every element with the bit clear ends up before every element
//! with the bit set, and order within each group is kept.
//!
//! ## Placement
//!
//! Every worker publishes how many zeros and ones it holds at the current bit.
//! From those `2P` counts each worker independently derives where its own
//! elements go in the global sequence:
//!
//! ```text
//!   global index of a zero = Σ_{k<w} zeros[k] + (zeros seen so far locally)
//!   global index of a one  = Z + Σ_{k<w} ones[k] + (ones seen so far locally)
//! ```
//!
//! where `Z` is the global number of zeros. Global index `g` lives on worker
//! `g / L` at local index `g % L`. Because all workers compute the same layout,
//! every destination cell has exactly one writer and the exchange needs no
//! locking.

use log::{debug, trace};

use crate::substrate::{Slot, Substrate, SubstrateError};

/// Where this worker's zeros and ones start in the global sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Global number of elements with the bit clear (`Z`).
    pub total_zeros: usize,
    /// Position of this worker's first zero within the zeros group.
    pub zero_offset: usize,
    /// Position of this worker's first one within the ones group.
    pub one_offset: usize,
}

impl Layout {
    /// Derive worker `worker`'s layout from the per-worker bucket counts.
    pub fn from_counts(zeros: &[u32], ones: &[u32], worker: usize) -> Self {
        let sum = |counts: &[u32]| counts.iter().map(|&c| c as usize).sum::<usize>();
        Self {
            total_zeros: sum(zeros),
            zero_offset: sum(&zeros[..worker]),
            one_offset: sum(&ones[..worker]),
        }
    }
}

/// Number of elements of `tab` with `mask` clear.
#[inline]
pub fn count_zeros(tab: &[u32], mask: u32) -> usize {
    tab.iter().filter(|&&x| x & mask == 0).count()
}

/// Global destination index of every element of `tab`, in order.
pub fn destinations(tab: &[u32], mask: u32, layout: Layout) -> impl Iterator<Item = usize> + '_ {
    let mut next_zero = layout.zero_offset;
    let mut next_one = layout.total_zeros + layout.one_offset;
    tab.iter().map(move |&x| {
        let slot = if x & mask == 0 { &mut next_zero } else { &mut next_one };
        let global = *slot;
        *slot += 1;
        global
    })
}

/// Map a global index to `(worker, local index)` for partitions of `length`.
#[inline]
pub fn locate(global: usize, length: usize) -> (usize, usize) {
    (global / length, global % length)
}

/// Run the pass for bit `bit` and return the new local partition.
///
/// Every worker must call this with the same `bit`. The `newTab` slot is not
/// cleared first: the placement is a bijection, so every cell is overwritten.
pub fn run_pass<S: Substrate + ?Sized>(
    substrate: &S,
    tab: Vec<u32>,
    bit: u32,
) -> Result<Vec<u32>, SubstrateError> {
    let me = substrate.my_id();
    let workers = substrate.worker_count();
    let length = tab.len();
    let mask = 1u32 << bit;

    // Count local buckets
    let zeros = count_zeros(&tab, mask);
    let ones = length - zeros;

    // Exchange bucket counts. Partitions never exceed 2^31 - 1 elements, so
    // counts fit a u32 cell.
    substrate.broadcast(Slot::Zeros, me, zeros as u32)?;
    substrate.broadcast(Slot::Ones, me, ones as u32)?;

    substrate.wait_for(Slot::Zeros, workers)?;
    let zero_counts = substrate.read_local(Slot::Zeros)?;
    substrate.wait_for(Slot::Ones, workers)?;
    let one_counts = substrate.read_local(Slot::Ones)?;

    // Prefix sums -> global layout
    let layout = Layout::from_counts(&zero_counts, &one_counts, me);
    debug!(
        "worker {me}: bit {bit}: {zeros} zeros, {ones} ones, Z = {}, offsets = ({}, {})",
        layout.total_zeros, layout.zero_offset, layout.one_offset
    );

    // Scatter elements to their destination worker
    let mut remote = 0usize;
    for (&value, global) in tab.iter().zip(destinations(&tab, mask, layout)) {
        let (dest, index) = locate(global, length);
        if dest == me {
            substrate.write_local(Slot::NewTab, index, value)?;
        } else {
            substrate.put(dest, Slot::NewTab, index, value)?;
            remote += 1;
        }
    }
    trace!(
        "worker {me}: bit {bit}: {} local writes, {remote} remote puts",
        length - remote
    );

    // Peers may still be writing into our newTab until everyone gets here.
    substrate.barrier()?;

    // Commit
    substrate.read_local(Slot::NewTab)
}
