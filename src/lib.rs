#![doc = include_str!("../README.md")]
#![deny(unsafe_op_in_unsafe_fn)]

mod cfg;
mod chaining;
mod concurrent;
mod error;
mod hash;
mod probing;
mod raw;
mod table;

#[cfg(feature = "rayon")]
mod rayon_impls;

pub use chaining::{ChainingTable, Iter as ChainingIter};
pub use concurrent::{ConcurrentBuilder, ConcurrentProbingTable, ConcurrentRef};
pub use error::TableError;
pub use hash::{IdentityHasher, IdentityState};
pub use probing::{Iter as ProbingIter, ProbingTable};
pub use raw::prime::{DEFAULT_CAPACITY, MIN_CAPACITY};
pub use table::Table;

pub use seize::{Collector, Guard, LocalGuard, OwnedGuard};
