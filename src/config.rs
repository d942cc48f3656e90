//! Sort configuration.

use crate::error::SortError;

/// Largest global index space the placement arithmetic supports (`2^31 - 1`).
pub const MAX_GLOBAL_LEN: usize = i32::MAX as usize;

/// Shape of a distributed sort: `P` workers holding `L` elements each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    worker_count: usize,
    per_worker_length: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            per_worker_length: 10,
        }
    }
}

impl SortConfig {
    pub fn new(worker_count: usize, per_worker_length: usize) -> Self {
        Self {
            worker_count,
            per_worker_length,
        }
    }

    /// Set the number of workers `P`.
    pub fn with_worker_count(mut self, p: usize) -> Self {
        self.worker_count = p;
        self
    }

    /// Set the per-worker partition length `L`.
    pub fn with_per_worker_length(mut self, l: usize) -> Self {
        self.per_worker_length = l;
        self
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    #[inline]
    pub fn per_worker_length(&self) -> usize {
        self.per_worker_length
    }

    /// Total number of elements across all workers.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.worker_count * self.per_worker_length
    }

    /// Check `P >= 1` and `P * L <= 2^31 - 1`.
    pub fn validate(&self) -> Result<(), SortError> {
        validate_shape(self.worker_count, self.per_worker_length)
    }
}

pub(crate) fn validate_shape(workers: usize, length: usize) -> Result<(), SortError> {
    if workers == 0 {
        return Err(SortError::NoWorkers);
    }
    match workers.checked_mul(length) {
        Some(total) if total <= MAX_GLOBAL_LEN => Ok(()),
        _ => Err(SortError::IndexOverflow { workers, length }),
    }
}
