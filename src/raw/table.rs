use std::cell::UnsafeCell;
use std::hash::{BuildHasher, Hash};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use seize::{Collector, Guard};

use super::gate::Gate;
use super::prime;
use super::probe::Probe;
use super::utils::Counter;
use crate::cfg::trace;
use crate::TableError;

/// A linear-probing hash table that supports concurrent mutation.
pub struct HashTable<K, V, S> {
    /// The slot array.
    ///
    /// Only accessed while holding the gate. The array itself is only replaced while
    /// holding the gate exclusively.
    slots: UnsafeCell<Box<[AtomicPtr<Entry<K, V>>]>>,

    /// Excludes all other operations from a resize.
    gate: Gate,

    /// An atomic counter of the number of live entries.
    count: Counter,

    /// The capacity the table was created with, restored by `clear`.
    initial_capacity: usize,

    /// Collector for memory reclamation.
    collector: Collector,

    /// The hasher for keys.
    hasher: S,
}

// Safety: Entries are shared across threads through `&self`, and may be dropped by
// whichever thread reclaims them. Slot accesses are synchronized by the gate.
unsafe impl<K: Send, V: Send, S: Send> Send for HashTable<K, V, S> {}
unsafe impl<K: Send + Sync, V: Send + Sync, S: Sync> Sync for HashTable<K, V, S> {}

// An entry in the hash table, boxed and never modified after it is published.
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

/// A sentinel pointer for a deleted entry.
///
/// No allocation can end at the last address, so this never aliases a live entry.
#[inline]
fn tombstone<K, V>() -> *mut Entry<K, V> {
    ptr::null_mut::<u8>().wrapping_sub(1).cast()
}

/// The status of a slot.
enum Slot<K, V> {
    /// The slot has never been occupied since the last resize.
    Empty,

    /// The slot held an entry that was removed.
    Tombstone,

    /// A live entry.
    Occupied(*mut Entry<K, V>),
}

impl<K, V> Slot<K, V> {
    #[inline]
    fn of(entry: *mut Entry<K, V>) -> Slot<K, V> {
        if entry.is_null() {
            Slot::Empty
        } else if entry == tombstone() {
            Slot::Tombstone
        } else {
            Slot::Occupied(entry)
        }
    }
}

// Reclaims an erased entry.
unsafe fn reclaim<K, V>(entry: *mut Entry<K, V>, _collector: &Collector) {
    // Safety: Entries are allocated with `Box` and retired exactly once.
    drop(unsafe { Box::from_raw(entry) });
}

// Allocate a slot array of the given capacity, with every slot empty.
fn alloc<K, V>(capacity: usize) -> Box<[AtomicPtr<Entry<K, V>>]> {
    (0..capacity)
        .map(|_| AtomicPtr::new(ptr::null_mut()))
        .collect()
}

/// The outcome of a claim on the slot array.
enum Claim {
    /// The entry was written to a slot.
    Inserted,

    /// Every slot is occupied.
    Full,
}

impl<K, V, S> HashTable<K, V, S> {
    /// Creates new hash-table with the given options.
    pub fn new(capacity: usize, hasher: S, collector: Collector) -> HashTable<K, V, S> {
        let capacity = prime::initial(capacity);

        HashTable {
            slots: UnsafeCell::new(alloc(capacity)),
            gate: Gate::new(),
            count: Counter::default(),
            initial_capacity: capacity,
            collector,
            hasher,
        }
    }

    /// Returns a reference to the collector.
    #[inline]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Returns a reference to the hasher.
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Verify a guard is valid to use with this table.
    #[inline]
    fn verify(&self, guard: &impl Guard) {
        assert_eq!(
            *guard.collector(),
            self.collector,
            "Attempted to access table with incorrect guard"
        );
    }

    /// Returns the slot array.
    ///
    /// # Safety
    ///
    /// The gate must be held for the lifetime of the returned slice.
    #[inline]
    unsafe fn slots(&self) -> &[AtomicPtr<Entry<K, V>>] {
        unsafe { &*self.slots.get() }
    }

    /// Returns the slot array mutably.
    ///
    /// # Safety
    ///
    /// The gate must be held exclusively for the lifetime of the returned reference.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn slots_mut(&self) -> &mut Box<[AtomicPtr<Entry<K, V>>]> {
        unsafe { &mut *self.slots.get() }
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.sum()
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        let _shared = self.gate.shared();
        // Safety: Holding the gate.
        unsafe { self.slots() }.len()
    }

    /// Returns the number of entries in slot `n`.
    pub fn slot_len(&self, n: usize) -> usize {
        let _shared = self.gate.shared();
        // Safety: Holding the gate.
        let slots = unsafe { self.slots() };

        match slots.get(n).map(|slot| Slot::of(slot.load(Ordering::Acquire))) {
            Some(Slot::Occupied(_)) => 1,
            _ => 0,
        }
    }

    /// Returns the live entries observed in one traversal of the table.
    pub fn snapshot<'g>(&self, guard: &'g impl Guard) -> Vec<(&'g K, &'g V)> {
        self.verify(guard);

        let _shared = self.gate.shared();
        // Safety: Holding the gate.
        let slots = unsafe { self.slots() };

        slots
            .iter()
            .filter_map(|slot| match Slot::of(guard.protect(slot, Ordering::Acquire)) {
                // Safety: The entry was loaded while protected by the guard, and is
                // not reclaimed until the guard is dropped.
                Slot::Occupied(entry) => unsafe { Some((&(*entry).key, &(*entry).value)) },
                _ => None,
            })
            .collect()
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    /// Returns a reference to the value corresponding to the key.
    #[inline]
    pub fn get<'g>(&self, key: &K, guard: &'g impl Guard) -> Option<&'g V> {
        self.verify(guard);

        let _shared = self.gate.shared();
        // Safety: The entry was loaded while protected by the guard, and is not
        // reclaimed until the guard is dropped.
        self.find(key, guard)
            .map(|(_, entry)| unsafe { &(*entry).value })
    }

    /// Returns the slot currently holding the key.
    pub fn slot_of(&self, key: &K, guard: &impl Guard) -> Option<usize> {
        self.verify(guard);

        let _shared = self.gate.shared();
        self.find(key, guard).map(|(i, _)| i)
    }

    /// Returns the slot index and entry for the key.
    ///
    /// The gate must be held by the caller.
    #[inline]
    fn find(&self, key: &K, guard: &impl Guard) -> Option<(usize, *mut Entry<K, V>)> {
        // Safety: The caller holds the gate.
        let slots = unsafe { self.slots() };

        for i in Probe::start(self.hash(key), slots.len()) {
            match Slot::of(guard.protect(&slots[i], Ordering::Acquire)) {
                // Inserts fill the first free slot of a probe sequence, and slots never
                // become empty outside a resize, so the key cannot be further along.
                Slot::Empty => return None,

                // Deleted entries do not end the probe sequence.
                Slot::Tombstone => continue,

                // Safety: The entry was loaded while protected by the guard.
                Slot::Occupied(entry) if unsafe { (*entry).key == *key } => {
                    return Some((i, entry))
                }

                // The slot contains a different key, keep probing.
                Slot::Occupied(_) => {}
            }
        }

        None
    }

    /// Inserts a key-value pair, without checking for an existing entry.
    pub fn insert(&self, key: K, value: V, guard: &impl Guard) -> Result<(), TableError> {
        self.verify(guard);

        let hash = self.hash(&key);
        let entry = Box::into_raw(Box::new(Entry { key, value }));

        loop {
            let (claim, capacity) = {
                let _shared = self.gate.shared();
                // Safety: Holding the gate.
                let slots = unsafe { self.slots() };

                let claim = Self::claim(slots, hash, entry);
                if let Claim::Inserted = claim {
                    // Counted while holding the gate, so a resize always sees a count
                    // matching the slot array.
                    self.count.increment(guard);
                }

                (claim, slots.len())
            };

            match claim {
                Claim::Inserted => {
                    let len = self.len();

                    if prime::exceeds_load(len, capacity) {
                        // The entry is already in the table, growth can only fail if the
                        // next capacity overflows, which no allocation could satisfy.
                        if let Err(_err) = self.grow(capacity) {
                            trace!("failed to grow table of {} slots: {}", capacity, _err);
                        }
                    }

                    return Ok(());
                }

                // Concurrent inserts filled the table before a resize could be triggered.
                Claim::Full => {
                    if let Err(err) = self.grow(capacity) {
                        // Safety: The entry was never published.
                        drop(unsafe { Box::from_raw(entry) });
                        return Err(err);
                    }
                }
            }
        }
    }

    // Writes `entry` into the first free slot of its probe sequence.
    fn claim(slots: &[AtomicPtr<Entry<K, V>>], hash: u64, entry: *mut Entry<K, V>) -> Claim {
        for i in Probe::start(hash, slots.len()) {
            let mut found = slots[i].load(Ordering::Acquire);

            // Both empty slots and tombstones can be claimed.
            while let Slot::Empty | Slot::Tombstone = Slot::of(found) {
                match slots[i].compare_exchange(found, entry, Ordering::Release, Ordering::Acquire)
                {
                    Ok(_) => return Claim::Inserted,

                    // Lost the slot to a concurrent update, it may have been deleted again.
                    Err(current) => found = current,
                }
            }
        }

        Claim::Full
    }

    /// Removes the first entry matching the key.
    pub fn remove(&self, key: &K, guard: &impl Guard) -> Result<(), TableError> {
        self.verify(guard);

        let _shared = self.gate.shared();
        // Safety: Holding the gate.
        let slots = unsafe { self.slots() };

        for i in Probe::start(self.hash(key), slots.len()) {
            let mut entry = guard.protect(&slots[i], Ordering::Acquire);

            loop {
                match Slot::of(entry) {
                    Slot::Empty => return Err(TableError::NotFound),

                    Slot::Tombstone => break,

                    // Safety: The entry was loaded while protected by the guard.
                    Slot::Occupied(found) if unsafe { (*found).key == *key } => {
                        match slots[i].compare_exchange(
                            found,
                            tombstone(),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        ) {
                            Ok(_) => {
                                self.count.decrement(guard);

                                // Safety: The entry was unlinked from the table above, so no
                                // new references can be created, and existing ones are
                                // protected by their guards.
                                unsafe { guard.defer_retire(found, reclaim::<K, V>) };
                                return Ok(());
                            }

                            // Lost to a concurrent removal, reload the slot.
                            Err(_) => entry = guard.protect(&slots[i], Ordering::Acquire),
                        }
                    }

                    Slot::Occupied(_) => break,
                }
            }
        }

        Err(TableError::NotFound)
    }

    /// Grows the table, unless it was already resized past `observed` slots.
    fn grow(&self, observed: usize) -> Result<(), TableError> {
        let _exclusive = self.gate.exclusive();
        // Safety: Holding the gate exclusively.
        let slots = unsafe { self.slots_mut() };

        // Another thread resized the table.
        if slots.len() != observed {
            return Ok(());
        }

        let capacity = prime::grow(observed)?;
        trace!(
            "growing table from {} to {} slots with {} entries",
            observed,
            capacity,
            self.count.sum()
        );

        self.migrate(slots, capacity);
        Ok(())
    }

    /// Rebuilds the table with `capacity` slots, or double the current capacity.
    pub fn rehash(&self, capacity: Option<usize>, guard: &impl Guard) -> Result<(), TableError> {
        self.verify(guard);

        let _exclusive = self.gate.exclusive();
        // Safety: Holding the gate exclusively.
        let slots = unsafe { self.slots_mut() };

        let capacity = match capacity {
            Some(requested) => prime::rehash_target(requested, self.count.sum())?,
            None => prime::grow(slots.len())?,
        };

        trace!("rehashing table from {} to {} slots", slots.len(), capacity);

        self.migrate(slots, capacity);
        Ok(())
    }

    // Moves every live entry into a new slot array, dropping tombstones.
    //
    // Entries are moved by pointer, so outstanding references remain valid.
    fn migrate(&self, slots: &mut Box<[AtomicPtr<Entry<K, V>>]>, capacity: usize) {
        let mut next = alloc::<K, V>(capacity);

        for slot in slots.iter_mut() {
            if let Slot::Occupied(entry) = Slot::of(*slot.get_mut()) {
                // Safety: Live entries are only retired after being unlinked, which
                // cannot happen while the gate is held exclusively.
                let hash = self.hash(unsafe { &(*entry).key });

                let free = Probe::start(hash, capacity)
                    .find(|&i| next[i].get_mut().is_null())
                    .expect("resized table must hold every live entry");

                *next[free].get_mut() = entry;
            }
        }

        *slots = next;
    }
}

impl<K, V, S> HashTable<K, V, S> {
    /// Removes every entry, restoring the initial capacity.
    pub fn clear(&self, guard: &impl Guard) {
        self.verify(guard);

        let _exclusive = self.gate.exclusive();
        // Safety: Holding the gate exclusively.
        let slots = unsafe { self.slots_mut() };

        trace!("clearing table of {} entries", self.count.sum());

        let old = std::mem::replace(slots, alloc(self.initial_capacity));
        self.count.reset();

        for mut slot in old.into_vec() {
            if let Slot::Occupied(entry) = Slot::of(*slot.get_mut()) {
                // Safety: The old slot array is unreachable, and references created
                // from it are protected by their guards.
                unsafe { guard.defer_retire(entry, reclaim::<K, V>) };
            }
        }
    }
}

impl<K, V, S> Drop for HashTable<K, V, S> {
    fn drop(&mut self) {
        for slot in self.slots.get_mut().iter_mut() {
            if let Slot::Occupied(entry) = Slot::of(*slot.get_mut()) {
                // Safety: We have unique access to the table, so no guards are live and
                // the entry is not shared.
                drop(unsafe { Box::from_raw(entry) });
            }
        }
    }
}
