//! In-process Substrate
//!
//! Runs `P` workers as OS threads of one process. Every worker owns a set of
//! slot cells in shared memory; peers write into them with atomic stores, so a
//! `put` is a genuine one-sided write that the receiver never acknowledges.
//!
//! ## Synchronization
//!
//! - The barrier is a generation-counted `Mutex`/`Condvar` barrier. Every
//!   store issued before a worker enters it happens-before every load issued
//!   after any worker leaves it.
//! - Each worker has a per-slot arrival counter guarded by a mutex. A counted
//!   write bumps the counter after storing, so a `wait_for` that observes the
//!   count also observes the value. `newTab` writes are not counted; they are
//!   plain atomic stores ordered by the end-of-pass barrier.
//!
//! ## Failure
//!
//! Workers are not expected to fail, but when one does (error or panic) the
//! cluster is aborted: every peer blocked in a barrier or a wait wakes up with
//! [`SubstrateError::Aborted`] instead of hanging forever.
//!
//! Workers are plain threads rather than rayon tasks because they block in
//! barriers; a pool with fewer threads than workers would deadlock.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{trace, warn};

use crate::config::SortConfig;
use crate::error::SortError;
use crate::substrate::{Slot, Substrate, SubstrateError};

/// Slot cells owned by one worker.
struct WorkerSlots {
    zeros: Vec<AtomicU32>,
    ones: Vec<AtomicU32>,
    new_tab: Vec<AtomicU32>,
    bits: AtomicI32,
    arrivals: Mutex<[usize; 4]>,
    arrived: Condvar,
}

impl WorkerSlots {
    fn new(workers: usize, length: usize) -> Self {
        Self {
            zeros: zeroed(workers),
            ones: zeroed(workers),
            new_tab: zeroed(length),
            bits: AtomicI32::new(i32::MIN),
            arrivals: Mutex::new([0; 4]),
            arrived: Condvar::new(),
        }
    }

    fn vector(&self, slot: Slot) -> Result<&[AtomicU32], SubstrateError> {
        match slot {
            Slot::Zeros => Ok(&self.zeros),
            Slot::Ones => Ok(&self.ones),
            Slot::NewTab => Ok(&self.new_tab),
            Slot::Bits => Err(SubstrateError::NotAVector(slot)),
        }
    }

    fn scalar(&self, slot: Slot) -> Result<&AtomicI32, SubstrateError> {
        match slot {
            Slot::Bits => Ok(&self.bits),
            _ => Err(SubstrateError::NotAScalar(slot)),
        }
    }

    fn cell(&self, slot: Slot, index: usize) -> Result<&AtomicU32, SubstrateError> {
        let cells = self.vector(slot)?;
        cells.get(index).ok_or(SubstrateError::IndexOutOfRange {
            slot,
            index,
            len: cells.len(),
        })
    }

    fn record_arrival(&self, slot: Slot) {
        let mut arrivals = lock(&self.arrivals);
        arrivals[slot.index()] += 1;
        self.arrived.notify_all();
    }
}

fn zeroed(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct BarrierState {
    waiting: usize,
    generation: u64,
}

/// Reusable barrier that can be torn down while workers are blocked in it.
struct AbortableBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl AbortableBarrier {
    fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    fn wait(&self, aborted: &AtomicBool) -> Result<(), SubstrateError> {
        let mut state = lock(&self.state);
        if aborted.load(Ordering::SeqCst) {
            return Err(SubstrateError::Aborted);
        }
        let generation = state.generation;
        state.waiting += 1;
        if state.waiting == self.parties {
            state.waiting = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return Ok(());
        }
        while state.generation == generation {
            if aborted.load(Ordering::SeqCst) {
                return Err(SubstrateError::Aborted);
            }
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }

    fn wake_all(&self) {
        let _state = lock(&self.state);
        self.released.notify_all();
    }
}

struct Shared {
    workers: Vec<WorkerSlots>,
    per_worker_length: usize,
    barrier: AbortableBarrier,
    aborted: AtomicBool,
}

impl Shared {
    fn worker(&self, id: usize) -> Result<&WorkerSlots, SubstrateError> {
        self.workers.get(id).ok_or(SubstrateError::WorkerOutOfRange {
            worker: id,
            count: self.workers.len(),
        })
    }

    fn abort(&self) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!("aborting cluster of {} workers", self.workers.len());
        self.barrier.wake_all();
        for worker in &self.workers {
            let _arrivals = lock(&worker.arrivals);
            worker.arrived.notify_all();
        }
    }
}

/// Aborts the cluster if the owning worker thread unwinds.
struct AbortOnPanic<'a>(&'a Shared);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// A set of `P` in-process workers sharing slot memory.
///
/// A cluster is good for exactly one [`run`](LocalCluster::run): slot state
/// such as the `bits` cell is not reset between runs.
pub struct LocalCluster {
    config: SortConfig,
    shared: Arc<Shared>,
}

impl LocalCluster {
    /// Allocate slots for `config.worker_count()` workers of
    /// `config.per_worker_length()` elements each.
    pub fn new(config: SortConfig) -> Result<Self, SortError> {
        config.validate()?;
        let workers = config.worker_count();
        let length = config.per_worker_length();
        let shared = Shared {
            workers: (0..workers).map(|_| WorkerSlots::new(workers, length)).collect(),
            per_worker_length: length,
            barrier: AbortableBarrier::new(workers),
            aborted: AtomicBool::new(false),
        };
        Ok(Self {
            config,
            shared: Arc::new(shared),
        })
    }

    pub fn config(&self) -> SortConfig {
        self.config
    }

    /// Handle for worker `id`, or `None` if out of range.
    pub fn worker(&self, id: usize) -> Option<LocalWorker> {
        (id < self.config.worker_count()).then(|| LocalWorker {
            id,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Tear the cluster down, waking every blocked worker with an error.
    pub fn abort(&self) {
        self.shared.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }

    /// Run `f` on every worker concurrently, handing worker `w` its partition
    /// `partitions[w]`. Results come back in worker-id order.
    ///
    /// Only the number of partitions is checked here. Partition lengths are
    /// checked by each worker in [`sort`](crate::driver::sort) before the
    /// first pass, so a mismatch surfaces as the failing worker's error.
    ///
    /// The first worker that fails aborts the cluster. The returned error is
    /// the root cause, not the `Aborted` errors it induces in the peers.
    pub fn run<T, F>(self, partitions: Vec<Vec<u32>>, f: F) -> Result<Vec<T>, SortError>
    where
        T: Send,
        F: Fn(&LocalWorker, Vec<u32>) -> Result<T, SortError> + Sync,
    {
        let workers = self.config.worker_count();
        if partitions.len() != workers {
            return Err(SortError::PartitionCount {
                expected: workers,
                actual: partitions.len(),
            });
        }

        let f = &f;
        let shared = &self.shared;
        let results: Vec<Result<T, SortError>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for (id, partition) in partitions.into_iter().enumerate() {
                let worker = LocalWorker {
                    id,
                    shared: Arc::clone(shared),
                };
                let spawned = thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn_scoped(scope, move || {
                        let _guard = AbortOnPanic(&worker.shared);
                        let result = f(&worker, partition);
                        if result.is_err() {
                            worker.shared.abort();
                        }
                        result
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        shared.abort();
                        return vec![Err(SubstrateError::Spawn {
                            worker: id,
                            reason: e.to_string(),
                        }
                        .into())];
                    }
                }
            }
            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(SubstrateError::WorkerPanicked(id).into()))
                })
                .collect()
        });

        collect_results(results)
    }
}

fn collect_results<T>(results: Vec<Result<T, SortError>>) -> Result<Vec<T>, SortError> {
    let mut values = Vec::with_capacity(results.len());
    let mut induced = None;
    let mut root_cause = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) if e.is_aborted() => induced = Some(e),
            Err(e) => {
                root_cause.get_or_insert(e);
            }
        }
    }
    match root_cause.or(induced) {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// One worker of a [`LocalCluster`].
pub struct LocalWorker {
    id: usize,
    shared: Arc<Shared>,
}

impl LocalWorker {
    fn own(&self) -> &WorkerSlots {
        &self.shared.workers[self.id]
    }

    fn check_aborted(&self) -> Result<(), SubstrateError> {
        if self.shared.aborted.load(Ordering::SeqCst) {
            Err(SubstrateError::Aborted)
        } else {
            Ok(())
        }
    }
}

impl Substrate for LocalWorker {
    fn my_id(&self) -> usize {
        self.id
    }

    fn worker_count(&self) -> usize {
        self.shared.workers.len()
    }

    fn slot_len(&self, slot: Slot) -> usize {
        match slot {
            Slot::Zeros | Slot::Ones => self.shared.workers.len(),
            Slot::NewTab => self.shared.per_worker_length,
            Slot::Bits => 1,
        }
    }

    fn barrier(&self) -> Result<(), SubstrateError> {
        self.shared.barrier.wait(&self.shared.aborted)
    }

    fn put(&self, dest: usize, slot: Slot, index: usize, value: u32) -> Result<(), SubstrateError> {
        self.check_aborted()?;
        let target = self.shared.worker(dest)?;
        target.cell(slot, index)?.store(value, Ordering::Relaxed);
        if slot.is_counted() {
            target.record_arrival(slot);
        }
        Ok(())
    }

    fn write_local(&self, slot: Slot, index: usize, value: u32) -> Result<(), SubstrateError> {
        self.own().cell(slot, index)?.store(value, Ordering::Relaxed);
        Ok(())
    }

    fn read_local(&self, slot: Slot) -> Result<Vec<u32>, SubstrateError> {
        let cells = self.own().vector(slot)?;
        Ok(cells.iter().map(|c| c.load(Ordering::Relaxed)).collect())
    }

    fn store_scalar(&self, dest: usize, slot: Slot, value: i32) -> Result<(), SubstrateError> {
        self.check_aborted()?;
        let target = self.shared.worker(dest)?;
        target.scalar(slot)?.store(value, Ordering::Release);
        target.record_arrival(slot);
        Ok(())
    }

    fn compare_and_max(&self, dest: usize, slot: Slot, candidate: i32) -> Result<(), SubstrateError> {
        self.check_aborted()?;
        let cell = self.shared.worker(dest)?.scalar(slot)?;
        let mut current = cell.load(Ordering::Acquire);
        while current < candidate {
            match cell.compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => break,
                Err(actual) => {
                    trace!("worker {}: lost race on {slot}@{dest}, retrying", self.id);
                    current = actual;
                }
            }
        }
        Ok(())
    }

    fn load_scalar(&self, slot: Slot) -> Result<i32, SubstrateError> {
        Ok(self.own().scalar(slot)?.load(Ordering::Acquire))
    }

    fn wait_for(&self, slot: Slot, n: usize) -> Result<(), SubstrateError> {
        if !slot.is_counted() {
            return Err(SubstrateError::NotCounted(slot));
        }
        let own = self.own();
        let mut arrivals = lock(&own.arrivals);
        loop {
            let count = &mut arrivals[slot.index()];
            if *count >= n {
                *count -= n;
                return Ok(());
            }
            if self.shared.aborted.load(Ordering::SeqCst) {
                return Err(SubstrateError::Aborted);
            }
            arrivals = own
                .arrived
                .wait(arrivals)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
