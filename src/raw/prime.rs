use crate::TableError;

/// The smallest capacity of any table.
pub const MIN_CAPACITY: usize = 3;

/// The capacity of a table created without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 11;

// Trial division up to the integer square root.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }

    if n % 2 == 0 {
        return n == 2;
    }

    let mut i = 3;
    // `i <= n / i` is `i * i <= n` without overflow.
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }

    true
}

// Returns the smallest prime >= `n`, or `None` if it does not fit in a `usize`.
pub fn next_prime(n: usize) -> Option<usize> {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}

// Returns the table capacity used for a requested capacity.
pub fn capacity_for(requested: usize) -> Result<usize, TableError> {
    next_prime(requested.max(MIN_CAPACITY)).ok_or(TableError::CapacityExceeded)
}

// Returns the capacity a table of `capacity` grows to.
pub fn grow(capacity: usize) -> Result<usize, TableError> {
    capacity
        .checked_mul(2)
        .ok_or(TableError::CapacityExceeded)
        .and_then(capacity_for)
}

// Returns the capacity for a newly constructed table.
pub fn initial(requested: usize) -> usize {
    capacity_for(requested).expect("capacity overflow")
}

// Returns `true` if `len` entries in `capacity` buckets exceed a 0.75 load factor.
#[inline]
pub fn exceeds_load(len: usize, capacity: usize) -> bool {
    (len as u128) * 4 > (capacity as u128) * 3
}

// Returns the smallest capacity that holds `len` entries within the load factor.
pub fn required_for(len: usize) -> usize {
    let required = ((len as u128) * 4).div_ceil(3);
    usize::try_from(required).unwrap_or(usize::MAX).max(MIN_CAPACITY)
}

// Returns the capacity for an explicit rehash to `requested` holding `len` entries.
pub fn rehash_target(requested: usize, len: usize) -> Result<usize, TableError> {
    let capacity = capacity_for(requested)?;

    if exceeds_load(len, capacity) {
        return Err(TableError::InvalidCapacity {
            requested,
            required: required_for(len),
        });
    }

    Ok(capacity)
}
