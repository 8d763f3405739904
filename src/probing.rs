use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::mem;
use std::ops::Index;

use crate::cfg::trace;
use crate::hash::IdentityState;
use crate::raw::prime::{self, DEFAULT_CAPACITY};
use crate::raw::Probe;
use crate::{Table, TableError};

/// A hash table using open addressing with linear probing.
///
/// Entries live directly in a prime-sized slot array. A key is stored in the first free
/// slot at or after its home slot, wrapping around the end of the array. Erasing an
/// entry leaves a tombstone behind, which keeps later entries of the probe sequence
/// reachable and can be reused by a later insert. Tombstones are only purged when the
/// table is resized.
///
/// Duplicate keys are permitted. [`Table::count`] reports whether any entry matches, and
/// lookups return the entry found first along the probe sequence.
///
/// # Examples
///
/// ```
/// use primetable::{ProbingTable, Table};
///
/// let mut table = ProbingTable::new();
/// table.insert(3, "three").unwrap();
/// table.insert(14, "fourteen").unwrap();
///
/// // Both keys hash to slot 3 of 11.
/// assert_eq!(table.bucket(&3), Ok(3));
/// assert_eq!(table.bucket(&14), Ok(4));
///
/// table.erase(&3).unwrap();
/// assert_eq!(table.tombstones(), 1);
/// assert_eq!(table[&14], "fourteen");
/// ```
pub struct ProbingTable<K, V, S = IdentityState> {
    slots: Box<[Slot<K, V>]>,
    len: usize,
    tombstones: usize,
    initial_capacity: usize,
    hasher: S,
}

// The state of a single slot.
enum Slot<K, V> {
    // Never occupied since the last resize.
    Empty,
    Occupied(K, V),
    // Held an entry that was erased.
    Tombstone,
}

fn slots<K, V>(capacity: usize) -> Box<[Slot<K, V>]> {
    (0..capacity).map(|_| Slot::Empty).collect()
}

impl<K, V> ProbingTable<K, V> {
    /// Creates an empty `ProbingTable` with the default capacity of 11 slots.
    pub fn new() -> ProbingTable<K, V> {
        ProbingTable::with_capacity_and_hasher(DEFAULT_CAPACITY, IdentityState::default())
    }

    /// Creates an empty `ProbingTable` with at least `capacity` slots.
    ///
    /// The capacity is rounded up to the next prime, and to at least 3.
    pub fn with_capacity(capacity: usize) -> ProbingTable<K, V> {
        ProbingTable::with_capacity_and_hasher(capacity, IdentityState::default())
    }
}

impl<K, V, S> ProbingTable<K, V, S> {
    /// Creates an empty `ProbingTable` which will use the given hash builder to hash
    /// keys.
    pub fn with_hasher(hasher: S) -> ProbingTable<K, V, S> {
        ProbingTable::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    /// Creates an empty `ProbingTable` with at least `capacity` slots, using `hasher`
    /// to hash the keys.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> ProbingTable<K, V, S> {
        let capacity = prime::initial(capacity);

        ProbingTable {
            slots: slots(capacity),
            len: 0,
            tombstones: 0,
            initial_capacity: capacity,
            hasher,
        }
    }

    /// Returns a reference to the table's hasher.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the number of tombstones left behind by erased entries.
    ///
    /// Tombstones lengthen failed searches until the next resize drops them.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// An iterator visiting all entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.len,
        }
    }
}

impl<K, V, S> ProbingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    // Returns the index of the slot holding `key`.
    fn find(&self, key: &K) -> Option<usize> {
        let hash = self.hasher.hash_one(key);

        for i in Probe::start(hash, self.slots.len()) {
            match &self.slots[i] {
                // Slots only become empty again on resize, so the probe sequence ends here.
                Slot::Empty => return None,
                Slot::Occupied(k, _) if k == key => return Some(i),
                Slot::Occupied(..) | Slot::Tombstone => {}
            }
        }

        None
    }

    // Returns the first free slot in the probe sequence of `hash`.
    fn free(slots: &[Slot<K, V>], hash: u64) -> Option<usize> {
        Probe::start(hash, slots.len()).find(|&i| !matches!(slots[i], Slot::Occupied(..)))
    }

    // Rebuilds the slot array with the given capacity, dropping tombstones.
    fn rebuild(&mut self, capacity: usize) {
        let old = mem::replace(&mut self.slots, slots(capacity));

        for slot in old.into_vec() {
            if let Slot::Occupied(key, value) = slot {
                let hash = self.hasher.hash_one(&key);

                // The new capacity always holds every live entry.
                if let Some(i) = Self::free(&self.slots, hash) {
                    self.slots[i] = Slot::Occupied(key, value);
                }
            }
        }

        self.tombstones = 0;
    }
}

impl<K, V, S> Table<K, V> for ProbingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn size(&self) -> usize {
        self.len
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), TableError> {
        let capacity = self.slots.len();

        if prime::exceeds_load(self.len + 1, capacity) {
            let next = prime::grow(capacity)?;
            trace!(
                "growing probing table from {} to {} slots with {} entries and {} tombstones",
                capacity,
                next,
                self.len,
                self.tombstones
            );
            self.rebuild(next);
        }

        let hash = self.hasher.hash_one(&key);
        let i = Self::free(&self.slots, hash).ok_or(TableError::CapacityExceeded)?;

        if let Slot::Tombstone = mem::replace(&mut self.slots[i], Slot::Occupied(key, value)) {
            self.tombstones -= 1;
        }

        self.len += 1;
        Ok(())
    }

    fn at(&self, key: &K) -> Result<&V, TableError> {
        match self.find(key).map(|i| &self.slots[i]) {
            Some(Slot::Occupied(_, value)) => Ok(value),
            _ => Err(TableError::NotFound),
        }
    }

    fn count(&self, key: &K) -> usize {
        usize::from(self.find(key).is_some())
    }

    fn erase(&mut self, key: &K) -> Result<(), TableError> {
        let i = self.find(key).ok_or(TableError::NotFound)?;

        self.slots[i] = Slot::Tombstone;
        self.tombstones += 1;
        self.len -= 1;
        Ok(())
    }

    fn clear(&mut self) {
        trace!(
            "clearing probing table of {} entries and {} tombstones",
            self.len,
            self.tombstones
        );

        self.slots = slots(self.initial_capacity);
        self.len = 0;
        self.tombstones = 0;
    }

    #[inline]
    fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    fn bucket_size(&self, n: usize) -> usize {
        match self.slots.get(n) {
            Some(Slot::Occupied(..)) => 1,
            _ => 0,
        }
    }

    fn bucket(&self, key: &K) -> Result<usize, TableError> {
        self.find(key).ok_or(TableError::NotFound)
    }

    fn rehash(&mut self, capacity: Option<usize>) -> Result<(), TableError> {
        let next = match capacity {
            Some(requested) => prime::rehash_target(requested, self.len)?,
            None => prime::grow(self.slots.len())?,
        };

        trace!(
            "rehashing probing table from {} to {} slots, dropping {} tombstones",
            self.slots.len(),
            next,
            self.tombstones
        );

        self.rebuild(next);
        Ok(())
    }
}

impl<K, V, S> Index<&K> for ProbingTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value corresponding to `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the table.
    fn index(&self, key: &K) -> &V {
        self.at(key).expect("key not found in table")
    }
}

impl<K, V> Default for ProbingTable<K, V> {
    fn default() -> Self {
        ProbingTable::new()
    }
}

impl<K, V, S> Extend<(K, V)> for ProbingTable<K, V, S>
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

impl<K, V> FromIterator<(K, V)> for ProbingTable<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = ProbingTable::new();
        table.extend(iter);
        table
    }
}

impl<K, V, S> fmt::Debug for ProbingTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over the entries of a [`ProbingTable`].
///
/// This struct is created by the [`iter`](ProbingTable::iter) method on [`ProbingTable`].
pub struct Iter<'a, K, V> {
    slots: std::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(key, value) = slot {
                self.remaining -= 1;
                return Some((key, value));
            }
        }

        None
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
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}
