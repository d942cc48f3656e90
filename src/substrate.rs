//! Communication Substrate
//!
//! The sort only talks to its peers through the [`Substrate`] trait. A
//! substrate gives every worker a stable id, a global barrier, and a handful
//! of remotely addressable named slots:
//!
//! | Slot      | Kind   | Length per worker |
//! |-----------|--------|-------------------|
//! | `Zeros`   | vector | `P`               |
//! | `Ones`    | vector | `P`               |
//! | `NewTab`  | vector | `L`               |
//! | `Bits`    | scalar | 1 (atomic on worker 0) |
//!
//! Remote writes are one-sided: the receiver does not post a matching
//! receive. Completion of a `put` is only guaranteed to be visible after the
//! next [`Substrate::barrier`]; counted slots can additionally be awaited with
//! [`Substrate::wait_for`].

use std::fmt;

use thiserror::Error;

/// Named, remotely addressable storage cell on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Per-peer count of elements with a zero at the current bit.
    Zeros,
    /// Per-peer count of elements with a one at the current bit.
    Ones,
    /// Destination buffer of the current pass.
    NewTab,
    /// Global bit width.
    Bits,
}

impl Slot {
    /// Dense index, used by implementations to keep per-slot bookkeeping in arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::Zeros => 0,
            Slot::Ones => 1,
            Slot::NewTab => 2,
            Slot::Bits => 3,
        }
    }

    /// Whether writes into this slot are counted towards [`Substrate::wait_for`].
    ///
    /// `NewTab` carries bulk data and is only synchronized by barriers.
    #[inline]
    pub fn is_counted(self) -> bool {
        !matches!(self, Slot::NewTab)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Zeros => "zeros",
            Slot::Ones => "ones",
            Slot::NewTab => "newTab",
            Slot::Bits => "bits",
        };
        f.write_str(name)
    }
}

/// Failure of a substrate operation. Always fatal to the sort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstrateError {
    /// Another worker failed and the run was torn down.
    #[error("run aborted by a failing peer")]
    Aborted,
    /// Addressed a worker id outside `[0, P)`.
    #[error("worker {worker} out of range (worker count {count})")]
    WorkerOutOfRange { worker: usize, count: usize },
    /// Addressed an index outside the slot.
    #[error("index {index} out of range for slot {slot} of length {len}")]
    IndexOutOfRange { slot: Slot, index: usize, len: usize },
    /// Used a vector operation on a scalar slot.
    #[error("slot {0} is a scalar slot")]
    NotAVector(Slot),
    /// Used a scalar operation on a vector slot.
    #[error("slot {0} is not a scalar slot")]
    NotAScalar(Slot),
    /// Waited on a slot whose writes are not counted.
    #[error("slot {0} does not count writes")]
    NotCounted(Slot),
    /// The launcher could not start a worker.
    #[error("failed to spawn worker {worker}: {reason}")]
    Spawn { worker: usize, reason: String },
    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

/// One worker's view of the communication substrate.
///
/// Implementations must guarantee that every write issued before a
/// [`barrier`](Substrate::barrier) by any worker is visible to every worker
/// after that barrier returns, and that a write counted by
/// [`wait_for`](Substrate::wait_for) is visible once the wait returns.
pub trait Substrate {
    /// Caller's worker id, stable for the run.
    fn my_id(&self) -> usize;

    /// Total number of workers `P`.
    fn worker_count(&self) -> usize;

    /// Number of cells in `slot` on every worker.
    fn slot_len(&self, slot: Slot) -> usize;

    /// Return once every worker has entered the barrier.
    fn barrier(&self) -> Result<(), SubstrateError>;

    /// Write `value` into `slot[index]` on worker `dest`.
    ///
    /// Counts as one write towards [`wait_for`](Substrate::wait_for) on the
    /// destination if the slot [is counted](Slot::is_counted).
    fn put(&self, dest: usize, slot: Slot, index: usize, value: u32) -> Result<(), SubstrateError>;

    /// Write `value` into `slot[src_index]` on every worker, including the caller.
    fn broadcast(&self, slot: Slot, src_index: usize, value: u32) -> Result<(), SubstrateError> {
        for dest in 0..self.worker_count() {
            self.put(dest, slot, src_index, value)?;
        }
        Ok(())
    }

    /// Write into the caller's own `slot[index]` without going through the
    /// substrate. Not counted.
    fn write_local(&self, slot: Slot, index: usize, value: u32) -> Result<(), SubstrateError>;

    /// Snapshot of the caller's vector slot.
    fn read_local(&self, slot: Slot) -> Result<Vec<u32>, SubstrateError>;

    /// Write `value` into the scalar `slot` on worker `dest`. Counted.
    fn store_scalar(&self, dest: usize, slot: Slot, value: i32) -> Result<(), SubstrateError>;

    /// Write `value` into the scalar `slot` of every worker.
    fn broadcast_scalar(&self, slot: Slot, value: i32) -> Result<(), SubstrateError> {
        for dest in 0..self.worker_count() {
            self.store_scalar(dest, slot, value)?;
        }
        Ok(())
    }

    /// Atomically raise the scalar `slot` on worker `dest` to at least
    /// `candidate`. Not counted.
    fn compare_and_max(&self, dest: usize, slot: Slot, candidate: i32) -> Result<(), SubstrateError>;

    /// Current value of the caller's scalar `slot`.
    fn load_scalar(&self, slot: Slot) -> Result<i32, SubstrateError>;

    /// Block until `slot` has received `n` writes since the previous
    /// `wait_for` on it, then consume those `n` writes. Fails with
    /// [`SubstrateError::NotCounted`] for slots that do not count writes.
    fn wait_for(&self, slot: Slot, n: usize) -> Result<(), SubstrateError>;
}
