use crate::TableError;

/// The operations shared by every table in this crate.
///
/// The trait is object safe, so the engines can be used interchangeably through a
/// `&mut dyn Table<K, V>`.
///
/// # Examples
///
/// ```
/// use primetable::{ChainingTable, ProbingTable, Table, TableError};
///
/// fn fill(table: &mut dyn Table<u32, u32>) {
///     for i in 0..100 {
///         table.insert(i, i * 2).unwrap();
///     }
/// }
///
/// let mut chaining: ChainingTable<u32, u32> = ChainingTable::new();
/// let mut probing: ProbingTable<u32, u32> = ProbingTable::new();
/// fill(&mut chaining);
/// fill(&mut probing);
///
/// assert_eq!(chaining.at(&7), Ok(&14));
/// assert_eq!(probing.at(&200), Err(TableError::NotFound));
/// ```
pub trait Table<K, V> {
    /// Returns the number of live entries.
    fn size(&self) -> usize;

    /// Returns `true` if the table holds no live entries.
    fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Inserts a key-value pair.
    ///
    /// The table does not check for an existing entry with the same key, inserting a
    /// key twice stores two entries. The table is resized first if the insertion would
    /// push the load factor over 0.75.
    ///
    /// Fails with [`TableError::CapacityExceeded`] only if the table cannot grow any
    /// further, in which case it is left unchanged.
    fn insert(&mut self, key: K, value: V) -> Result<(), TableError>;

    /// Inserts a key-value pair. Equivalent to [`Table::insert`].
    fn emplace(&mut self, key: K, value: V) -> Result<(), TableError> {
        self.insert(key, value)
    }

    /// Returns a reference to the value of the first entry matching `key`.
    fn at(&self, key: &K) -> Result<&V, TableError>;

    /// Returns the number of entries stored under `key`.
    fn count(&self, key: &K) -> usize;

    /// Removes the first entry matching `key`.
    ///
    /// Fails with [`TableError::NotFound`] and leaves the table unchanged if the key is
    /// absent.
    fn erase(&mut self, key: &K) -> Result<(), TableError>;

    /// Removes every entry and shrinks the table back to its initial capacity.
    fn clear(&mut self);

    /// Returns the number of buckets.
    fn bucket_count(&self) -> usize;

    /// Returns the number of entries stored in bucket `n`, or 0 if there is no such bucket.
    fn bucket_size(&self, n: usize) -> usize;

    /// Returns the index of the bucket holding `key`.
    ///
    /// The index is invalidated by any resize.
    fn bucket(&self, key: &K) -> Result<usize, TableError>;

    /// Returns the ratio of live entries to buckets.
    fn load_factor(&self) -> f64 {
        self.size() as f64 / self.bucket_count() as f64
    }

    /// Rebuilds the table.
    ///
    /// With no target the capacity is doubled, otherwise the target becomes the new
    /// capacity. Either way the capacity is rounded up to the next prime. A target too
    /// small to hold the live entries at a load factor of 0.75 fails with
    /// [`TableError::InvalidCapacity`], and the table is left unchanged.
    fn rehash(&mut self, capacity: Option<usize>) -> Result<(), TableError>;
}
