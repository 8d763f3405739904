use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::mem;
use std::ops::Index;

use crate::cfg::trace;
use crate::hash::{self, IdentityState};
use crate::raw::prime::{self, DEFAULT_CAPACITY};
use crate::{Table, TableError};

/// A hash table using separate chaining.
///
/// Every bucket owns an ordered sequence of entries, and colliding keys are appended to
/// the sequence of their home bucket. The number of buckets is always prime, and the
/// table doubles (to the next prime) whenever the load factor would exceed 0.75.
///
/// Duplicate keys are permitted: inserting an existing key appends a second entry.
/// Lookups and removals act on the first entry in chain order, which is the earliest
/// insertion, and [`Table::count`] reports how many entries share the key.
///
/// # Examples
///
/// ```
/// use primetable::{ChainingTable, Table};
///
/// let mut table = ChainingTable::new();
/// table.insert(1, "a").unwrap();
/// table.insert(1, "b").unwrap();
///
/// assert_eq!(table.count(&1), 2);
/// assert_eq!(table[&1], "a");
///
/// table.erase(&1).unwrap();
/// assert_eq!(table[&1], "b");
/// ```
pub struct ChainingTable<K, V, S = IdentityState> {
    buckets: Vec<Vec<(K, V)>>,
    len: usize,
    initial_capacity: usize,
    hasher: S,
}

impl<K, V> ChainingTable<K, V> {
    /// Creates an empty `ChainingTable` with the default capacity of 11 buckets.
    pub fn new() -> ChainingTable<K, V> {
        ChainingTable::with_capacity_and_hasher(DEFAULT_CAPACITY, IdentityState::default())
    }

    /// Creates an empty `ChainingTable` with at least `capacity` buckets.
    ///
    /// The capacity is rounded up to the next prime, and to at least 3.
    pub fn with_capacity(capacity: usize) -> ChainingTable<K, V> {
        ChainingTable::with_capacity_and_hasher(capacity, IdentityState::default())
    }
}

impl<K, V, S> ChainingTable<K, V, S> {
    /// Creates an empty `ChainingTable` which will use the given hash builder to hash
    /// keys.
    pub fn with_hasher(hasher: S) -> ChainingTable<K, V, S> {
        ChainingTable::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    /// Creates an empty `ChainingTable` with at least `capacity` buckets, using
    /// `hasher` to hash the keys.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> ChainingTable<K, V, S> {
        let capacity = prime::initial(capacity);

        ChainingTable {
            buckets: buckets(capacity),
            len: 0,
            initial_capacity: capacity,
            hasher,
        }
    }

    /// Returns a reference to the table's hasher.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// An iterator visiting all entries, bucket by bucket.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: [].iter(),
            remaining: self.len,
        }
    }
}

fn buckets<K, V>(capacity: usize) -> Vec<Vec<(K, V)>> {
    (0..capacity).map(|_| Vec::new()).collect()
}

impl<K, V, S> ChainingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn home(&self, key: &K) -> usize {
        hash::home(&self.hasher, key, self.buckets.len())
    }

    /// Returns the length of the chain in the home bucket of `key`.
    ///
    /// This counts every entry that collides with `key`, whether or not it matches.
    pub fn chain_len(&self, key: &K) -> usize {
        self.buckets[self.home(key)].len()
    }

    // Rebuilds the buckets with the given capacity, keeping chain order.
    fn rebuild(&mut self, capacity: usize) {
        let old = mem::replace(&mut self.buckets, buckets(capacity));

        for (key, value) in old.into_iter().flatten() {
            let i = hash::home(&self.hasher, &key, capacity);
            self.buckets[i].push((key, value));
        }
    }
}

impl<K, V, S> Table<K, V> for ChainingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn size(&self) -> usize {
        self.len
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), TableError> {
        let capacity = self.buckets.len();

        if prime::exceeds_load(self.len + 1, capacity) {
            let next = prime::grow(capacity)?;
            trace!(
                "growing chaining table from {} to {} buckets with {} entries",
                capacity,
                next,
                self.len
            );
            self.rebuild(next);
        }

        let i = self.home(&key);
        self.buckets[i].push((key, value));
        self.len += 1;
        Ok(())
    }

    fn at(&self, key: &K) -> Result<&V, TableError> {
        self.buckets[self.home(key)]
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or(TableError::NotFound)
    }

    fn count(&self, key: &K) -> usize {
        self.buckets[self.home(key)]
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }

    fn erase(&mut self, key: &K) -> Result<(), TableError> {
        let i = self.home(key);
        let chain = &mut self.buckets[i];

        let position = chain
            .iter()
            .position(|(k, _)| k == key)
            .ok_or(TableError::NotFound)?;

        chain.remove(position);
        self.len -= 1;
        Ok(())
    }

    fn clear(&mut self) {
        trace!("clearing chaining table of {} entries", self.len);

        // Drops every chain, releasing its storage.
        self.buckets = buckets(self.initial_capacity);
        self.len = 0;
    }

    #[inline]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_size(&self, n: usize) -> usize {
        self.buckets.get(n).map_or(0, Vec::len)
    }

    fn bucket(&self, key: &K) -> Result<usize, TableError> {
        let i = self.home(key);

        if self.buckets[i].iter().any(|(k, _)| k == key) {
            Ok(i)
        } else {
            Err(TableError::NotFound)
        }
    }

    fn rehash(&mut self, capacity: Option<usize>) -> Result<(), TableError> {
        let next = match capacity {
            Some(requested) => prime::rehash_target(requested, self.len)?,
            None => prime::grow(self.buckets.len())?,
        };

        trace!(
            "rehashing chaining table from {} to {} buckets",
            self.buckets.len(),
            next
        );

        self.rebuild(next);
        Ok(())
    }
}

impl<K, V, S> Index<&K> for ChainingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value of the first entry matching `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the table.
    fn index(&self, key: &K) -> &V {
        self.at(key).expect("key not found in table")
    }
}

impl<K, V> Default for ChainingTable<K, V> {
    fn default() -> Self {
        ChainingTable::new()
    }
}

impl<K, V, S> Extend<(K, V)> for ChainingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value).expect("capacity overflow");
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ChainingTable<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = ChainingTable::new();
        table.extend(iter);
        table
    }
}

impl<K, V, S> fmt::Debug for ChainingTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over the entries of a [`ChainingTable`].
///
/// This struct is created by the [`iter`](ChainingTable::iter) method on [`ChainingTable`].
pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, Vec<(K, V)>>,
    chain: std::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.chain.next() {
                self.remaining -= 1;
                return Some((key, value));
            }

            self.chain = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            buckets: self.buckets.clone(),
            chain: self.chain.clone(),
            remaining: self.remaining,
        }
    }
}
