#![allow(dead_code)]

use primetable::{ChainingTable, ConcurrentProbingTable, ProbingTable, Table};

use std::hash::Hash;

// Run the test against every engine, through the `Table` trait.
pub fn with_table<K, V>(mut test: impl FnMut(&mut dyn Table<K, V>))
where
    K: Hash + Eq,
{
    test(&mut ChainingTable::new());
    test(&mut ProbingTable::new());

    let table = ConcurrentProbingTable::new();
    test(&mut table.pin());
}

// Run the test on different configurations of a `ConcurrentProbingTable`.
pub fn with_concurrent<K, V>(mut test: impl FnMut(&dyn Fn() -> ConcurrentProbingTable<K, V>)) {
    // The default capacity.
    test(&(|| ConcurrentProbingTable::new()));

    // The smallest capacity, so that nearly every round of inserts races a resize.
    test(&(|| ConcurrentProbingTable::with_capacity(0)));

    // Large enough that stress tests rarely resize, stressing the slot claims instead.
    test(&(|| ConcurrentProbingTable::with_capacity(1 << 16)));
}

// Prints a log message if `RUST_LOG=debug` is set.
#[macro_export]
macro_rules! debug {
    ($($x:tt)*) => {
        if std::env::var("RUST_LOG").as_deref() == Ok("debug") {
            println!($($x)*);
        }
    };
}

// Returns the number of threads to use for stress testing.
pub fn threads() -> usize {
    if cfg!(miri) {
        2
    } else {
        num_cpus::get_physical().next_power_of_two()
    }
}

// Trial division, independent of the crate's own arithmetic.
pub fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|i| i * i <= n).all(|i| n % i != 0)
}
