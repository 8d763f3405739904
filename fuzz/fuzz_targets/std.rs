#![no_main]

use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;
use primetable::{ChainingTable, ConcurrentProbingTable, ProbingTable, Table, TableError};
use std::collections::HashMap;

#[derive(Debug, Arbitrary)]
enum Operation<K, V> {
    Insert(K, V),
    Emplace(K, V),
    Erase(K),
    At(K),
    Count(K),
    Bucket(K),
    Clear,
    Size,
    Rehash(Option<u16>),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    operations: Vec<Operation<u16, u32>>,
}

// The number of entries stored under each key.
type Model = HashMap<u16, usize>;

// Caps the growth caused by repeated `Rehash(None)` operations.
const MAX_CAPACITY: usize = 1 << 16;

fn fuzz_table(table: &mut dyn Table<u16, u32>, operations: &[Operation<u16, u32>]) {
    let mut model = Model::new();

    for op in operations {
        match *op {
            Operation::Insert(k, v) | Operation::Emplace(k, v) => {
                let result = match op {
                    Operation::Insert(..) => table.insert(k, v),
                    _ => table.emplace(k, v),
                };
                assert_eq!(result, Ok(()));
                *model.entry(k).or_default() += 1;
            }
            Operation::Erase(k) => match model.get_mut(&k).filter(|stored| **stored > 0) {
                Some(stored) => {
                    assert_eq!(table.erase(&k), Ok(()));
                    *stored -= 1;
                }
                None => assert_eq!(table.erase(&k), Err(TableError::NotFound)),
            },
            Operation::At(k) => {
                let stored = model.get(&k).copied().unwrap_or(0);
                match table.at(&k) {
                    Ok(_) => assert!(stored > 0),
                    Err(err) => {
                        assert_eq!(err, TableError::NotFound);
                        assert_eq!(stored, 0);
                    }
                }
            }
            Operation::Count(k) => {
                let stored = model.get(&k).copied().unwrap_or(0);
                assert_eq!(table.count(&k) > 0, stored > 0);
                assert!(table.count(&k) <= stored);
            }
            Operation::Bucket(k) => {
                let stored = model.get(&k).copied().unwrap_or(0);
                match table.bucket(&k) {
                    Ok(n) => {
                        assert!(stored > 0);
                        assert!(n < table.bucket_count());
                        assert!(table.bucket_size(n) > 0);
                    }
                    Err(err) => {
                        assert_eq!(err, TableError::NotFound);
                        assert_eq!(stored, 0);
                    }
                }
            }
            Operation::Clear => {
                table.clear();
                model.clear();
            }
            Operation::Size => {
                let stored: usize = model.values().sum();
                assert_eq!(table.size(), stored);
                assert_eq!(table.empty(), stored == 0);
            }
            Operation::Rehash(None) if table.bucket_count() >= MAX_CAPACITY => {}
            Operation::Rehash(capacity) => {
                let stored: usize = model.values().sum();
                let before = table.bucket_count();

                match table.rehash(capacity.map(usize::from)) {
                    Ok(()) => assert!(table.load_factor() <= 0.75),
                    Err(TableError::InvalidCapacity { requested, required }) => {
                        assert_eq!(Some(requested), capacity.map(usize::from));
                        assert!(required * 3 >= stored * 4);
                        assert_eq!(table.bucket_count(), before);
                    }
                    Err(err) => panic!("unexpected rehash error: {err}"),
                }
            }
        }

        assert!(table.load_factor() <= 0.75);
    }

    // Final consistency checks
    let stored: usize = model.values().sum();
    assert_eq!(table.size(), stored);
    for (k, &stored) in &model {
        assert_eq!(table.at(k).is_ok(), stored > 0);
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz_table(&mut ChainingTable::new(), &input.operations);
    fuzz_table(&mut ProbingTable::new(), &input.operations);

    let concurrent = ConcurrentProbingTable::new();
    fuzz_table(&mut concurrent.pin(), &input.operations);
});
