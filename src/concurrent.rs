use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use seize::{Collector, Guard, LocalGuard, OwnedGuard};

use crate::hash::IdentityState;
use crate::raw::{self, prime::DEFAULT_CAPACITY};
use crate::{Table, TableError};

/// A linear-probing hash table that supports concurrent mutation.
///
/// Operations take `&self` along with a [`Guard`], which can be acquired through
/// [`ConcurrentProbingTable::guard`] or using the [`ConcurrentProbingTable::pin`] API.
/// Inserts, lookups and erases on distinct slots proceed in parallel. Resizing is
/// stop-the-world: while the table grows, every other operation waits.
///
/// Values returned by [`at`](ConcurrentProbingTable::at) remain valid for as long as the
/// guard they were loaded with, even if another thread erases the entry in the
/// meantime.
///
/// # Examples
///
/// ```
/// use primetable::ConcurrentProbingTable;
/// use std::thread;
///
/// let table = ConcurrentProbingTable::new();
///
/// thread::scope(|s| {
///     for t in 0..4_u64 {
///         let table = &table;
///         s.spawn(move || {
///             let table = table.pin();
///             for i in 0..100 {
///                 table.insert(t * 100 + i, i).unwrap();
///             }
///         });
///     }
/// });
///
/// assert_eq!(table.pin().size(), 400);
/// assert_eq!(table.pin().at(&250), Ok(&50));
/// ```
pub struct ConcurrentProbingTable<K, V, S = IdentityState> {
    raw: raw::HashTable<K, V, S>,
}

/// A builder for a [`ConcurrentProbingTable`].
///
/// # Examples
///
/// ```rust
/// use primetable::ConcurrentProbingTable;
/// use seize::Collector;
/// use std::collections::hash_map::RandomState;
///
/// let table: ConcurrentProbingTable<i32, i32, _> = ConcurrentProbingTable::builder()
///     // Set the initial capacity.
///     .capacity(2048)
///     // Set the hasher.
///     .hasher(RandomState::new())
///     // Set a custom garbage collector.
///     .collector(Collector::new().batch_size(128))
///     // Construct the table.
///     .build();
///
/// assert_eq!(table.pin().bucket_count(), 2053);
/// ```
pub struct ConcurrentBuilder<K, V, S = IdentityState> {
    hasher: S,
    capacity: usize,
    collector: Collector,
    _kv: PhantomData<(K, V)>,
}

impl<K, V> ConcurrentBuilder<K, V> {
    /// Set the hash builder used to hash keys.
    ///
    /// The default hasher maps integer keys to themselves. A randomized hasher such as
    /// [`RandomState`](std::collections::hash_map::RandomState) spreads keys with
    /// patterns that collide modulo the capacity.
    pub fn hasher<S>(self, hasher: S) -> ConcurrentBuilder<K, V, S> {
        ConcurrentBuilder {
            hasher,
            capacity: self.capacity,
            collector: self.collector,
            _kv: PhantomData,
        }
    }
}

impl<K, V, S> ConcurrentBuilder<K, V, S> {
    /// Set the initial capacity of the table.
    ///
    /// The capacity is rounded up to the next prime, and to at least 3.
    pub fn capacity(self, capacity: usize) -> ConcurrentBuilder<K, V, S> {
        ConcurrentBuilder {
            capacity,
            hasher: self.hasher,
            collector: self.collector,
            _kv: PhantomData,
        }
    }

    /// Set the [`seize::Collector`] used for memory reclamation.
    ///
    /// Note that all `Guard` references used to access the table must be produced by
    /// the provided `collector`.
    pub fn collector(self, collector: Collector) -> ConcurrentBuilder<K, V, S> {
        ConcurrentBuilder {
            collector,
            hasher: self.hasher,
            capacity: self.capacity,
            _kv: PhantomData,
        }
    }

    /// Construct a [`ConcurrentProbingTable`] from the builder, using the configured
    /// options.
    pub fn build(self) -> ConcurrentProbingTable<K, V, S> {
        ConcurrentProbingTable {
            raw: raw::HashTable::new(self.capacity, self.hasher, self.collector),
        }
    }
}

impl<K, V, S> fmt::Debug for ConcurrentBuilder<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentBuilder")
            .field("capacity", &self.capacity)
            .field("collector", &self.collector)
            .finish()
    }
}

impl<K, V> ConcurrentProbingTable<K, V> {
    /// Creates an empty `ConcurrentProbingTable` with the default capacity of 11 slots.
    ///
    /// # Examples
    ///
    /// ```
    /// use primetable::ConcurrentProbingTable;
    /// let table: ConcurrentProbingTable<u32, &str> = ConcurrentProbingTable::new();
    /// ```
    pub fn new() -> ConcurrentProbingTable<K, V> {
        ConcurrentProbingTable::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty `ConcurrentProbingTable` with at least `capacity` slots.
    ///
    /// The capacity is rounded up to the next prime, and to at least 3.
    pub fn with_capacity(capacity: usize) -> ConcurrentProbingTable<K, V> {
        ConcurrentProbingTable::builder().capacity(capacity).build()
    }

    /// Returns a builder for a `ConcurrentProbingTable`.
    ///
    /// The builder can be used for more complex configuration, such as using a custom
    /// [`Collector`].
    pub fn builder() -> ConcurrentBuilder<K, V> {
        ConcurrentBuilder {
            capacity: DEFAULT_CAPACITY,
            hasher: IdentityState::default(),
            collector: Collector::new(),
            _kv: PhantomData,
        }
    }
}

impl<K, V> Default for ConcurrentProbingTable<K, V> {
    fn default() -> Self {
        ConcurrentProbingTable::new()
    }
}

impl<K, V, S> ConcurrentProbingTable<K, V, S> {
    /// Returns a pinned reference to the table.
    ///
    /// The returned reference manages a guard internally, preventing memory reclamation
    /// for as long as it is held.
    #[inline]
    pub fn pin(&self) -> ConcurrentRef<'_, K, V, S, LocalGuard<'_>> {
        ConcurrentRef {
            guard: self.guard(),
            table: self,
        }
    }

    /// Returns a pinned reference to the table.
    ///
    /// Unlike [`ConcurrentProbingTable::pin`], the returned reference implements `Send`
    /// and `Sync`, allowing it to be moved to and shared with other threads.
    #[inline]
    pub fn pin_owned(&self) -> ConcurrentRef<'_, K, V, S, OwnedGuard<'_>> {
        ConcurrentRef {
            guard: self.owned_guard(),
            table: self,
        }
    }

    /// Returns a guard for use with this table.
    ///
    /// Note that holding on to a guard prevents erased entries from being reclaimed.
    #[inline]
    pub fn guard(&self) -> LocalGuard<'_> {
        self.raw.collector().enter()
    }

    /// Returns an owned guard for use with this table.
    ///
    /// Owned guards implement `Send` and `Sync`.
    #[inline]
    pub fn owned_guard(&self) -> OwnedGuard<'_> {
        self.raw.collector().enter_owned()
    }

    /// Returns a reference to the table's hasher.
    #[inline]
    pub fn hasher(&self) -> &S {
        self.raw.hasher()
    }

    /// Returns the number of live entries in the table.
    ///
    /// While other threads are inserting or erasing, the result is only an estimate.
    #[inline]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the table holds no live entries.
    #[inline]
    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the number of slots in the table.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns 1 if slot `n` holds a live entry, and 0 otherwise.
    ///
    /// Out of range slots are reported as empty.
    #[inline]
    pub fn bucket_size(&self, n: usize) -> usize {
        self.raw.slot_len(n)
    }

    /// Returns the ratio of live entries to slots.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.size() as f64 / self.bucket_count() as f64
    }

    /// Removes every entry, restoring the initial capacity.
    ///
    /// This blocks until all in-flight operations have left the table.
    ///
    /// # Examples
    ///
    /// ```
    /// use primetable::ConcurrentProbingTable;
    ///
    /// let table = ConcurrentProbingTable::with_capacity(100);
    /// let table = table.pin();
    /// for i in 0..1000_u32 {
    ///     table.insert(i, ()).unwrap();
    /// }
    ///
    /// table.clear();
    /// assert!(table.empty());
    /// assert_eq!(table.bucket_count(), 101);
    /// ```
    #[inline]
    pub fn clear(&self, guard: &impl Guard) {
        self.raw.clear(guard)
    }

    /// Returns the live entries observed in a single pass over the table.
    ///
    /// Entries inserted or erased concurrently may or may not be included.
    #[inline]
    pub fn snapshot<'g>(&self, guard: &'g impl Guard) -> Vec<(&'g K, &'g V)> {
        self.raw.snapshot(guard)
    }
}

impl<K, V, S> ConcurrentProbingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts a key-value pair into the table, without checking for an existing entry.
    ///
    /// The table grows whenever the insert takes it above a load factor of 0.75.
    ///
    /// # Examples
    ///
    /// ```
    /// use primetable::ConcurrentProbingTable;
    ///
    /// let table = ConcurrentProbingTable::new();
    /// let guard = table.guard();
    /// table.insert(37, "a", &guard).unwrap();
    /// assert_eq!(table.at(&37, &guard), Ok(&"a"));
    /// ```
    #[inline]
    pub fn insert(&self, key: K, value: V, guard: &impl Guard) -> Result<(), TableError> {
        self.raw.insert(key, value, guard)
    }

    /// Inserts a key-value pair into the table. Identical to
    /// [`insert`](ConcurrentProbingTable::insert).
    #[inline]
    pub fn emplace(&self, key: K, value: V, guard: &impl Guard) -> Result<(), TableError> {
        self.insert(key, value, guard)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The reference is valid for the lifetime of the guard.
    #[inline]
    pub fn at<'g>(&self, key: &K, guard: &'g impl Guard) -> Result<&'g V, TableError> {
        self.raw.get(key, guard).ok_or(TableError::NotFound)
    }

    /// Returns 1 if the table contains the key, and 0 otherwise.
    #[inline]
    pub fn count(&self, key: &K, guard: &impl Guard) -> usize {
        usize::from(self.raw.get(key, guard).is_some())
    }

    /// Removes an entry matching the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use primetable::{ConcurrentProbingTable, TableError};
    ///
    /// let table = ConcurrentProbingTable::new();
    /// let guard = table.guard();
    /// table.insert(177, (), &guard).unwrap();
    ///
    /// assert_eq!(table.erase(&177, &guard), Ok(()));
    /// assert_eq!(table.erase(&177, &guard), Err(TableError::NotFound));
    /// ```
    #[inline]
    pub fn erase(&self, key: &K, guard: &impl Guard) -> Result<(), TableError> {
        self.raw.remove(key, guard)
    }

    /// Returns the slot currently holding the key.
    ///
    /// The index is invalidated by any resize.
    #[inline]
    pub fn bucket(&self, key: &K, guard: &impl Guard) -> Result<usize, TableError> {
        self.raw.slot_of(key, guard).ok_or(TableError::NotFound)
    }

    /// Rebuilds the table with at least `capacity` slots, or double the current number
    /// of slots if `capacity` is `None`.
    ///
    /// Fails with [`TableError::InvalidCapacity`] if the requested capacity cannot hold
    /// the live entries within a load factor of 0.75, leaving the table unchanged.
    #[inline]
    pub fn rehash(&self, capacity: Option<usize>, guard: &impl Guard) -> Result<(), TableError> {
        self.raw.rehash(capacity, guard)
    }
}

impl<K, V, S> fmt::Debug for ConcurrentProbingTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.guard();
        f.debug_map().entries(self.snapshot(&guard)).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for &ConcurrentProbingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let guard = self.guard();

        for (key, value) in iter {
            self.insert(key, value, &guard).expect("capacity overflow");
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentProbingTable<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let table = ConcurrentProbingTable::new();
        (&table).extend(iter);
        table
    }
}

/// A pinned reference to a [`ConcurrentProbingTable`].
///
/// This type is created with [`ConcurrentProbingTable::pin`] and can be used to access
/// the table without explicitly managing a guard. It implements [`Table`], so code
/// written against the trait runs unchanged on the concurrent engine.
pub struct ConcurrentRef<'table, K, V, S, G> {
    guard: G,
    table: &'table ConcurrentProbingTable<K, V, S>,
}

impl<'table, K, V, S, G> ConcurrentRef<'table, K, V, S, G>
where
    G: Guard,
{
    /// Returns a reference to the inner [`ConcurrentProbingTable`].
    #[inline]
    pub fn table(&self) -> &'table ConcurrentProbingTable<K, V, S> {
        self.table
    }

    /// Returns the number of live entries.
    ///
    /// See [`ConcurrentProbingTable::size`] for details.
    #[inline]
    pub fn size(&self) -> usize {
        self.table.size()
    }

    /// Returns `true` if the table holds no live entries.
    #[inline]
    pub fn empty(&self) -> bool {
        self.table.empty()
    }

    /// Returns the number of slots in the table.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns 1 if slot `n` holds a live entry, and 0 otherwise.
    #[inline]
    pub fn bucket_size(&self, n: usize) -> usize {
        self.table.bucket_size(n)
    }

    /// Returns the ratio of live entries to slots.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Removes every entry, restoring the initial capacity.
    ///
    /// See [`ConcurrentProbingTable::clear`] for details.
    #[inline]
    pub fn clear(&self) {
        self.table.clear(&self.guard)
    }

    /// Returns the live entries observed in a single pass over the table.
    #[inline]
    pub fn snapshot(&self) -> Vec<(&K, &V)> {
        self.table.snapshot(&self.guard)
    }
}

impl<'table, K, V, S, G> ConcurrentRef<'table, K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: Guard,
{
    /// Inserts a key-value pair into the table.
    ///
    /// See [`ConcurrentProbingTable::insert`] for details.
    #[inline]
    pub fn insert(&self, key: K, value: V) -> Result<(), TableError> {
        self.table.insert(key, value, &self.guard)
    }

    /// Inserts a key-value pair into the table.
    #[inline]
    pub fn emplace(&self, key: K, value: V) -> Result<(), TableError> {
        self.table.emplace(key, value, &self.guard)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// See [`ConcurrentProbingTable::at`] for details.
    #[inline]
    pub fn at(&self, key: &K) -> Result<&V, TableError> {
        self.table.at(key, &self.guard)
    }

    /// Returns 1 if the table contains the key, and 0 otherwise.
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        self.table.count(key, &self.guard)
    }

    /// Removes an entry matching the key.
    ///
    /// See [`ConcurrentProbingTable::erase`] for details.
    #[inline]
    pub fn erase(&self, key: &K) -> Result<(), TableError> {
        self.table.erase(key, &self.guard)
    }

    /// Returns the slot currently holding the key.
    #[inline]
    pub fn bucket(&self, key: &K) -> Result<usize, TableError> {
        self.table.bucket(key, &self.guard)
    }

    /// Rebuilds the table.
    ///
    /// See [`ConcurrentProbingTable::rehash`] for details.
    #[inline]
    pub fn rehash(&self, capacity: Option<usize>) -> Result<(), TableError> {
        self.table.rehash(capacity, &self.guard)
    }
}

impl<K, V, S, G> Table<K, V> for ConcurrentRef<'_, K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: Guard,
{
    fn size(&self) -> usize {
        ConcurrentRef::size(self)
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), TableError> {
        ConcurrentRef::insert(self, key, value)
    }

    fn at(&self, key: &K) -> Result<&V, TableError> {
        ConcurrentRef::at(self, key)
    }

    fn count(&self, key: &K) -> usize {
        ConcurrentRef::count(self, key)
    }

    fn erase(&mut self, key: &K) -> Result<(), TableError> {
        ConcurrentRef::erase(self, key)
    }

    fn clear(&mut self) {
        ConcurrentRef::clear(self)
    }

    fn bucket_count(&self) -> usize {
        ConcurrentRef::bucket_count(self)
    }

    fn bucket_size(&self, n: usize) -> usize {
        ConcurrentRef::bucket_size(self, n)
    }

    fn bucket(&self, key: &K) -> Result<usize, TableError> {
        ConcurrentRef::bucket(self, key)
    }

    fn rehash(&mut self, capacity: Option<usize>) -> Result<(), TableError> {
        ConcurrentRef::rehash(self, capacity)
    }
}

impl<K, V, S, G> fmt::Debug for ConcurrentRef<'_, K, V, S, G>
where
    K: fmt::Debug,
    V: fmt::Debug,
    G: Guard,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}
