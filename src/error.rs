use std::error::Error;
use std::fmt;

/// An error returned by a table operation.
///
/// Every variant is recoverable, the table is left in a consistent state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableError {
    /// The key is not present in the table.
    NotFound,
    /// No free slot could be found, or the table cannot grow any further.
    CapacityExceeded,
    /// An explicit rehash target is too small to hold the live entries.
    InvalidCapacity {
        /// The capacity that was requested.
        requested: usize,
        /// The smallest capacity that would keep the load factor within bounds.
        required: usize,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::NotFound => write!(f, "key not found in table"),
            TableError::CapacityExceeded => write!(f, "table capacity exceeded"),
            TableError::InvalidCapacity {
                requested,
                required,
            } => write!(
                f,
                "requested capacity {} cannot hold the live entries, at least {} is required",
                requested, required
            ),
        }
    }
}

impl Error for TableError {}
