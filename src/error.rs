//! Errors surfaced by the distributed sort.

use thiserror::Error;

use crate::substrate::SubstrateError;

/// Fatal condition that aborts a sort run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// `P = 0`.
    #[error("worker count must be at least 1")]
    NoWorkers,
    /// A worker's partition length differs from the cluster-wide `L`.
    #[error("worker {worker} holds {actual} elements, expected {expected}")]
    LengthMismatch {
        worker: usize,
        expected: usize,
        actual: usize,
    },
    /// The launcher was handed a different number of partitions than workers.
    #[error("got {actual} partitions for {expected} workers")]
    PartitionCount { expected: usize, actual: usize },
    /// `P * L` does not fit in the 31-bit global index space.
    #[error("{workers} workers x {length} elements exceeds the global index space")]
    IndexOverflow { workers: usize, length: usize },
    /// Communication failure, passed through unchanged.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),
}

impl SortError {
    /// Whether this error was induced by a peer failing rather than being a root cause.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SortError::Substrate(SubstrateError::Aborted))
    }
}
