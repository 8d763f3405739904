use primetable::{ChainingTable, ConcurrentProbingTable, ProbingTable, Table, TableError};
use rand::prelude::*;

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

mod common;
use common::{is_prime, with_table};

#[test]
fn new() {
    with_table::<usize, usize>(|table| {
        assert!(table.empty());
        assert_eq!(table.size(), 0);
        assert_eq!(table.bucket_count(), 11);
        assert_eq!(table.load_factor(), 0.0);
    });
}

#[test]
fn insert_and_at() {
    with_table::<usize, usize>(|table| {
        table.insert(42, 0).unwrap();
        assert_eq!(table.at(&42), Ok(&0));
        assert_eq!(table.count(&42), 1);
        assert_eq!(table.size(), 1);
        assert!(!table.empty());
    });
}

#[test]
fn at_empty() {
    with_table::<usize, usize>(|table| {
        assert_eq!(table.at(&42), Err(TableError::NotFound));
        assert_eq!(table.count(&42), 0);
        assert_eq!(table.bucket(&42), Err(TableError::NotFound));
    });
}

#[test]
fn erase_empty() {
    with_table::<usize, usize>(|table| {
        assert_eq!(table.erase(&42), Err(TableError::NotFound));
        assert_eq!(table.size(), 0);
    });
}

#[test]
fn insert_and_erase() {
    with_table::<i32, i32>(|table| {
        table.insert(177, 1).unwrap();
        table.erase(&177).unwrap();

        assert_eq!(table.at(&177), Err(TableError::NotFound));
        assert_eq!(table.size(), 0);
        assert_eq!(table.erase(&177), Err(TableError::NotFound));
    });
}

#[test]
fn emplace() {
    with_table::<usize, &str>(|table| {
        table.emplace(7, "seven").unwrap();
        assert_eq!(table.at(&7), Ok(&"seven"));
        assert_eq!(table.size(), 1);
    });
}

#[test]
fn duplicates() {
    with_table::<usize, char>(|table| {
        table.insert(5, 'a').unwrap();
        table.insert(5, 'b').unwrap();
        assert_eq!(table.size(), 2);
        assert_eq!(table.at(&5), Ok(&'a'));

        table.erase(&5).unwrap();
        assert_eq!(table.size(), 1);
        assert_eq!(table.at(&5), Ok(&'b'));

        table.erase(&5).unwrap();
        assert_eq!(table.at(&5), Err(TableError::NotFound));
        assert!(table.empty());
    });
}

#[test]
fn bucket() {
    with_table::<usize, usize>(|table| {
        table.insert(3, 0).unwrap();
        table.insert(14, 1).unwrap();
        table.insert(20, 2).unwrap();

        // 3 and 14 share the home bucket 3.
        assert_eq!(table.bucket(&3), Ok(3));
        assert_eq!(table.bucket(&20), Ok(9));

        for key in [3, 14, 20] {
            let n = table.bucket(&key).unwrap();
            assert!(table.bucket_size(n) >= 1);
        }

        assert_eq!(table.bucket_size(10), 0);
        assert_eq!(table.bucket_size(11), 0);
        assert_eq!(table.bucket_size(usize::MAX), 0);
    });
}

#[test]
fn erased_slot_is_reused() {
    with_table::<usize, usize>(|table| {
        table.insert(3, 3).unwrap();
        table.insert(14, 14).unwrap();
        table.erase(&3).unwrap();

        table.insert(25, 25).unwrap();
        assert_eq!(table.bucket(&25), Ok(3));
        assert_eq!(table.at(&3), Err(TableError::NotFound));
        assert_eq!(table.at(&14), Ok(&14));
        assert_eq!(table.at(&25), Ok(&25));
    });
}

#[test]
fn clear() {
    with_table::<usize, usize>(|table| {
        for i in 0..100 {
            table.insert(i, i).unwrap();
        }
        assert!(table.bucket_count() > 11);

        table.clear();
        assert!(table.empty());
        assert_eq!(table.bucket_count(), 11);
        assert_eq!(table.at(&50), Err(TableError::NotFound));

        // Still usable.
        table.insert(50, 1).unwrap();
        assert_eq!(table.at(&50), Ok(&1));
    });
}

#[test]
fn load_factor_bound() {
    with_table::<usize, ()>(|table| {
        for i in 0..10_000 {
            table.insert(i, ()).unwrap();
            assert!(table.load_factor() <= 0.75, "load factor exceeded at {i}");
            assert!(is_prime(table.bucket_count()));
        }
    });
}

#[test]
fn growth_sequence() {
    with_table::<usize, ()>(|table| {
        let mut capacities = vec![table.bucket_count()];
        for i in 0..40 {
            table.insert(i, ()).unwrap();
            if capacities.last() != Some(&table.bucket_count()) {
                capacities.push(table.bucket_count());
            }
        }

        assert_eq!(capacities, [11, 23, 47, 97]);
    });
}

#[test]
fn million() {
    with_table::<usize, usize>(|table| {
        for i in 0..1_000_000 {
            table.insert(i, i + 1).unwrap();
        }

        assert_eq!(table.size(), 1_000_000);
        assert!(table.bucket_count() >= 1_333_334);
        assert!(is_prime(table.bucket_count()));
        assert!(table.load_factor() <= 0.75);

        assert_eq!(table.at(&177), Ok(&178));
        assert_eq!(table.at(&999_999), Ok(&1_000_000));
        assert_eq!(table.at(&2_000_000), Err(TableError::NotFound));
        assert_eq!(table.count(&2_000_000), 0);

        for i in (0..1_000_000).step_by(7) {
            assert_eq!(table.at(&i), Ok(&(i + 1)));
        }

        table.erase(&177).unwrap();
        assert_eq!(table.at(&177), Err(TableError::NotFound));
        assert_eq!(table.size(), 999_999);
    });
}

#[test]
fn rehash_grows() {
    with_table::<usize, usize>(|table| {
        for i in 0..8 {
            table.insert(i, i).unwrap();
        }

        table.rehash(None).unwrap();
        assert_eq!(table.bucket_count(), 23);

        table.rehash(Some(1000)).unwrap();
        assert_eq!(table.bucket_count(), 1009);

        for i in 0..8 {
            assert_eq!(table.at(&i), Ok(&i));
        }
    });
}

#[test]
fn rehash_shrinks() {
    with_table::<usize, usize>(|table| {
        for i in 0..1000 {
            table.insert(i, i).unwrap();
        }
        for i in 10..1000 {
            table.erase(&i).unwrap();
        }

        table.rehash(Some(0)).unwrap_err();
        table.rehash(Some(14)).unwrap();
        assert_eq!(table.bucket_count(), 17);
        assert_eq!(table.size(), 10);

        for i in 0..10 {
            assert_eq!(table.at(&i), Ok(&i));
        }
        assert_eq!(table.at(&10), Err(TableError::NotFound));
    });
}

#[test]
fn rehash_too_small() {
    with_table::<usize, usize>(|table| {
        for i in 0..100 {
            table.insert(i, i).unwrap();
        }
        let capacity = table.bucket_count();

        assert_eq!(
            table.rehash(Some(50)),
            Err(TableError::InvalidCapacity {
                requested: 50,
                required: 134
            })
        );

        assert_eq!(table.bucket_count(), capacity);
        assert_eq!(table.size(), 100);
        for i in 0..100 {
            assert_eq!(table.at(&i), Ok(&i));
        }

        table.rehash(Some(134)).unwrap();
        assert_eq!(table.bucket_count(), 137);
    });
}

#[test]
fn string_keys() {
    with_table::<String, usize>(|table| {
        for i in 0..500 {
            table.insert(format!("key-{i}"), i).unwrap();
        }

        for i in 0..500 {
            assert_eq!(table.at(&format!("key-{i}")), Ok(&i));
        }
        assert_eq!(table.at(&"key-500".to_owned()), Err(TableError::NotFound));
    });
}

#[test]
fn negative_keys() {
    with_table::<i64, i64>(|table| {
        for i in -500..500 {
            table.insert(i, -i).unwrap();
        }

        for i in -500..500 {
            assert_eq!(table.at(&i), Ok(&-i));
            let n = table.bucket(&i).unwrap();
            assert!(n < table.bucket_count());
        }
    });
}

#[test]
fn random_workload() {
    const OPERATIONS: usize = if cfg!(miri) { 500 } else { 100_000 };
    const KEYS: u32 = 2_000;

    with_table::<u32, u32>(|table| {
        // Number of entries stored under each key.
        let mut model: HashMap<u32, usize> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(177);

        for _ in 0..OPERATIONS {
            let key = rng.gen_range(0..KEYS);

            if rng.gen_bool(0.6) {
                table.insert(key, key).unwrap();
                *model.entry(key).or_default() += 1;
            } else {
                let present = model.get(&key).is_some_and(|&n| n > 0);
                assert_eq!(table.erase(&key).is_ok(), present);
                if present {
                    *model.get_mut(&key).unwrap() -= 1;
                }
            }

            assert!(table.load_factor() <= 0.75);
        }

        assert_eq!(table.size(), model.values().sum::<usize>());
        for key in 0..KEYS {
            let stored = model.get(&key).copied().unwrap_or(0);
            assert_eq!(table.at(&key).is_ok(), stored > 0);
            assert_eq!(table.count(&key) > 0, stored > 0);
        }
    });
}

// Sends every key to the same bucket.
#[derive(Clone, Default)]
struct ConstantHasher;

impl Hasher for ConstantHasher {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, _: &[u8]) {}
}

#[test]
fn custom_hasher() {
    let hasher = BuildHasherDefault::<ConstantHasher>::default();

    let mut chaining: ChainingTable<u32, u32, _> = ChainingTable::with_hasher(hasher.clone());
    let mut probing: ProbingTable<u32, u32, _> = ProbingTable::with_hasher(hasher.clone());

    for table in [
        &mut chaining as &mut dyn Table<u32, u32>,
        &mut probing as &mut dyn Table<u32, u32>,
    ] {
        for i in 0..100 {
            table.insert(i, i).unwrap();
        }

        for i in 0..100 {
            assert_eq!(table.at(&i), Ok(&i));
        }
        assert_eq!(table.at(&100), Err(TableError::NotFound));
    }

    assert_eq!(chaining.bucket_size(0), 100);
    assert_eq!(chaining.chain_len(&12345), 100);
    assert_eq!(probing.bucket(&0), Ok(0));
    assert_eq!(probing.bucket(&99), Ok(99));

    let concurrent: ConcurrentProbingTable<u32, u32, _> =
        ConcurrentProbingTable::builder().hasher(hasher).build();
    let guard = concurrent.guard();
    for i in 0..100 {
        concurrent.insert(i, i, &guard).unwrap();
    }
    assert_eq!(concurrent.bucket(&99, &guard), Ok(99));
    assert_eq!(concurrent.at(&100, &guard), Err(TableError::NotFound));
}

#[test]
fn chaining_count_is_multiplicity() {
    let mut table = ChainingTable::new();
    table.insert(3_u32, ()).unwrap();
    table.insert(3, ()).unwrap();
    table.insert(14, ()).unwrap();

    assert_eq!(table.count(&3), 2);
    assert_eq!(table.count(&14), 1);
    assert_eq!(table.count(&25), 0);
    assert_eq!(table.chain_len(&25), 3);
    assert_eq!(table.bucket_size(3), 3);
}

#[test]
fn probing_count_is_existence() {
    let mut table = ProbingTable::new();
    table.insert(3_u32, ()).unwrap();
    table.insert(3, ()).unwrap();

    assert_eq!(table.count(&3), 1);
    assert_eq!(table.size(), 2);
    assert_eq!(table.bucket_size(3), 1);
    assert_eq!(table.bucket_size(4), 1);
}

#[test]
fn probing_tombstones() {
    let mut table = ProbingTable::new();
    for i in 0..8_u32 {
        table.insert(i, i).unwrap();
    }
    for i in 0..8 {
        table.erase(&i).unwrap();
    }

    assert_eq!(table.tombstones(), 8);
    assert_eq!(table.bucket_count(), 11);
    assert_eq!(table.at(&3), Err(TableError::NotFound));

    // Lookups keep probing past tombstones.
    table.insert(11, 11).unwrap();
    assert_eq!(table.bucket(&11), Ok(0));
    assert_eq!(table.at(&22), Err(TableError::NotFound));

    table.rehash(Some(11)).unwrap();
    assert_eq!(table.tombstones(), 0);
    assert_eq!(table.at(&11), Ok(&11));
}

#[test]
#[should_panic(expected = "key not found")]
fn index_missing() {
    let table: ChainingTable<u32, u32> = ChainingTable::new();
    let _value: u32 = table[&1];
}

#[test]
fn index() {
    let probing: ProbingTable<u32, &str> = [(1, "one"), (2, "two")].into_iter().collect();
    assert_eq!(probing[&2], "two");

    let chaining: ChainingTable<u32, &str> = [(1, "one"), (2, "two")].into_iter().collect();
    assert_eq!(chaining[&1], "one");
}

#[test]
fn extend() {
    let mut chaining = ChainingTable::new();
    chaining.extend((0..100_u32).map(|i| (i, i)));
    assert_eq!(chaining.size(), 100);

    let mut probing = ProbingTable::with_capacity(3);
    probing.extend((0..100_u32).map(|i| (i, i)));
    assert_eq!(probing.size(), 100);

    let concurrent = ConcurrentProbingTable::<u32, u32>::new();
    (&concurrent).extend((0..100_u32).map(|i| (i, i)));
    assert_eq!(concurrent.size(), 100);

    let collected: ConcurrentProbingTable<u32, u32> = (0..100).map(|i| (i, i)).collect();
    assert_eq!(collected.pin().at(&99), Ok(&99));
}

#[test]
fn iter() {
    let mut probing: ProbingTable<u32, u32> = (0..50).map(|i| (i, i * 3)).collect();
    probing.erase(&10).unwrap();

    let mut entries: Vec<_> = probing.iter().map(|(&k, &v)| (k, v)).collect();
    entries.sort();
    let expected: Vec<_> = (0..50).filter(|&i| i != 10).map(|i| (i, i * 3)).collect();
    assert_eq!(entries, expected);

    let chaining: ChainingTable<u32, u32> = (0..50).map(|i| (i, i * 3)).collect();
    assert_eq!(chaining.iter().count(), 50);

    let concurrent: ConcurrentProbingTable<u32, u32> = (0..50).map(|i| (i, i * 3)).collect();
    let guard = concurrent.guard();
    let mut snapshot: Vec<_> = concurrent
        .snapshot(&guard)
        .into_iter()
        .map(|(&k, &v)| (k, v))
        .collect();
    snapshot.sort();
    assert_eq!(snapshot, (0..50).map(|i| (i, i * 3)).collect::<Vec<_>>());
}

#[test]
fn debug() {
    let mut chaining = ChainingTable::new();
    chaining.insert(1_u32, 2_u32).unwrap();
    assert_eq!(format!("{chaining:?}"), "{1: 2}");

    let mut probing = ProbingTable::new();
    probing.insert(1_u32, 2_u32).unwrap();
    assert_eq!(format!("{probing:?}"), "{1: 2}");

    let concurrent = ConcurrentProbingTable::new();
    concurrent.pin().insert(1_u32, 2_u32).unwrap();
    assert_eq!(format!("{concurrent:?}"), "{1: 2}");
    assert_eq!(format!("{:?}", concurrent.pin()), "{1: 2}");
}

#[test]
fn with_capacity() {
    assert_eq!(ChainingTable::<u32, u32>::with_capacity(0).bucket_count(), 3);
    assert_eq!(ProbingTable::<u32, u32>::with_capacity(100).bucket_count(), 101);
    assert_eq!(
        ConcurrentProbingTable::<u32, u32>::with_capacity(1_000).bucket_count(),
        1_009
    );
    assert_eq!(
        ConcurrentProbingTable::<u32, u32>::builder()
            .capacity(24)
            .build()
            .bucket_count(),
        29
    );
}

#[test]
fn error_display() {
    assert_eq!(TableError::NotFound.to_string(), "key not found in table");
    assert_eq!(
        TableError::InvalidCapacity {
            requested: 5,
            required: 14
        }
        .to_string(),
        "requested capacity 5 cannot hold the live entries, at least 14 is required"
    );
}

#[test]
#[should_panic(expected = "incorrect guard")]
fn foreign_guard() {
    let a = ConcurrentProbingTable::<u32, u32>::new();
    let b = ConcurrentProbingTable::<u32, u32>::new();
    let _ = a.at(&0, &b.guard());
}
