use std::sync::{
    atomic::{AtomicIsize, Ordering},
    OnceLock,
};

use super::CachePadded;

// A sharded atomic counter of live entries.
//
// Inserts and erases only touch the shard of the calling thread. Every operation is
// `SeqCst`, so an insert that reads the sum after its own increment observes every
// increment ordered before it, and the last insert into a table always sees the
// true number of entries.
pub struct Counter(Box<[CachePadded<AtomicIsize>]>);

// The number of shards, one per available core rounded up to a power of two.
fn shards() -> usize {
    // Querying the parallelism of the machine takes microseconds, so it is cached.
    static SHARDS: OnceLock<usize> = OnceLock::new();

    *SHARDS.get_or_init(|| {
        std::thread::available_parallelism()
            .map_or(1, usize::from)
            .next_power_of_two()
    })
}

impl Default for Counter {
    fn default() -> Counter {
        Counter((0..shards()).map(|_| CachePadded::default()).collect())
    }
}

impl Counter {
    // Records an insertion on the shard of the given guard's thread.
    #[inline]
    pub fn increment(&self, guard: &impl seize::Guard) {
        self.shard(guard).fetch_add(1, Ordering::SeqCst);
    }

    // Records a removal on the shard of the given guard's thread.
    #[inline]
    pub fn decrement(&self, guard: &impl seize::Guard) {
        self.shard(guard).fetch_sub(1, Ordering::SeqCst);
    }

    #[inline]
    fn shard(&self, guard: &impl seize::Guard) -> &AtomicIsize {
        // Guard thread IDs are densely allocated, so consecutive threads
        // land on distinct shards.
        let shard = guard.thread_id() & (self.0.len() - 1);

        &self.0[shard].value
    }

    // Returns the sum of all counter shards.
    #[inline]
    pub fn sum(&self) -> usize {
        self.0
            .iter()
            .map(|x| x.value.load(Ordering::SeqCst))
            .sum::<isize>()
            .try_into()
            // An erase can be counted on its shard before the matching insert is
            // counted on another, in which case we assume the table is empty.
            .unwrap_or(0)
    }

    // Resets every shard to zero.
    //
    // Must only be called while no other thread updates the counter.
    pub fn reset(&self) {
        for shard in self.0.iter() {
            shard.value.store(0, Ordering::SeqCst);
        }
    }
}
