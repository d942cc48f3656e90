//! Distributed LSB Radix Sort
//!
//! `P` peer workers each hold `L` unsigned 32-bit keys. After [`sort`] the
//! concatenation of the partitions in worker-id order is sorted ascending.
//!
//! The sort runs one pass per bit, least significant first. In every pass the
//! workers exchange their zero/one bucket counts, each computes the final
//! `(worker, index)` of its own elements from the prefix sums, and the
//! elements are moved with one-sided remote writes followed by a barrier.
//! There is no coordinator: worker 0 only hosts the atomic cell used to agree
//! on the number of bits.
//!
//! Communication goes through the [`Substrate`] trait; [`LocalCluster`]
//! implements it for workers running as threads of one process.
//!
//! ```
//! use distributed_radix_sort::{sort_cluster, SortConfig};
//!
//! let partitions = vec![vec![3, 1], vec![4, 1], vec![5, 9], vec![2, 6]];
//! let sorted = sort_cluster(SortConfig::new(4, 2), partitions).unwrap();
//! assert_eq!(sorted, vec![vec![1, 1], vec![2, 3], vec![4, 5], vec![6, 9]]);
//! ```

pub mod bit_width;
pub mod config;
pub mod driver;
pub mod error;
pub mod local_cluster;
pub mod pass;
pub mod substrate;
pub mod verify;

pub use config::SortConfig;
pub use driver::{sort, sort_cluster, SortOutcome};
pub use error::SortError;
pub use local_cluster::{LocalCluster, LocalWorker};
pub use substrate::{Slot, Substrate, SubstrateError};
