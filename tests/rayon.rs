#![cfg(feature = "rayon")]

use primetable::ConcurrentProbingTable;
use rayon::prelude::*;

mod common;
use common::{is_prime, threads, with_concurrent};

#[test]
fn par_extend() {
    with_concurrent::<usize, usize>(|table| {
        let mut table = table();
        let len = if cfg!(miri) { 100 } else { 100_000 };

        table.par_extend((0..len).into_par_iter().map(|i| (i, i + 1)));

        let guard = table.guard();
        assert_eq!(table.size(), len);
        assert!(is_prime(table.bucket_count()));
        assert!(table.load_factor() <= 0.75);
        for i in 0..len {
            assert_eq!(table.at(&i, &guard), Ok(&(i + 1)));
        }
    });
}

#[test]
fn par_extend_shared() {
    let table = ConcurrentProbingTable::<usize, usize>::new();
    let len = if cfg!(miri) { 100 } else { 10_000 };

    (&table).par_extend((0..len).into_par_iter().map(|i| (i, i)));
    (&table).par_extend((len..2 * len).into_par_iter().map(|i| (i, i)));

    let mut got: Vec<_> = table
        .snapshot(&table.guard())
        .into_iter()
        .map(|(&k, _)| k)
        .collect();
    got.sort();
    assert_eq!(got, (0..2 * len).collect::<Vec<_>>());
}

#[test]
fn from_par_iter() {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads())
        .build()
        .unwrap();

    let table: ConcurrentProbingTable<u64, u64> =
        pool.install(|| (0..50_000).into_par_iter().map(|i| (i, i * 2)).collect());

    let table = table.pin();
    assert_eq!(table.size(), 50_000);
    assert_eq!(table.at(&177), Ok(&354));
    assert!(table.at(&2_000_000).is_err());
}
