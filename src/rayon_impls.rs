//! Rayon parallel insertion for `ConcurrentProbingTable`.

use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};
use std::hash::{BuildHasher, Hash};

use crate::ConcurrentProbingTable;

/// Inserts the pairs of a parallel iterator from every worker of the pool.
///
/// Each worker enters the collector once per split of the iterator, rather than once
/// per entry.
impl<K, V, S> ParallelExtend<(K, V)> for &ConcurrentProbingTable<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = (K, V)>,
    {
        let table = *self;

        par_iter.into_par_iter().for_each_init(
            || table.guard(),
            |guard, (key, value)| {
                table.insert(key, value, &*guard).expect("capacity overflow");
            },
        );
    }
}

impl<K, V, S> ParallelExtend<(K, V)> for ConcurrentProbingTable<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = (K, V)>,
    {
        (&*self).par_extend(par_iter);
    }
}

impl<K, V> FromParallelIterator<(K, V)> for ConcurrentProbingTable<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (K, V)>,
    {
        let mut table = ConcurrentProbingTable::new();
        table.par_extend(par_iter);
        table
    }
}
