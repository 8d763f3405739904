// A linear probe sequence with wraparound.
//
// The sequence starts at the home slot `hash % capacity` and visits every slot of the
// table exactly once, so a lookup gives up after at most `capacity` probes.
pub struct Probe {
    // The current index in the probe sequence.
    pub i: usize,
    // The number of slots left to visit.
    remaining: usize,
    // The length of the table.
    capacity: usize,
}

impl Probe {
    // Initialize the probe sequence for a table of the given capacity.
    #[inline]
    pub fn start(hash: u64, capacity: usize) -> Probe {
        debug_assert!(capacity > 0);

        Probe {
            i: (hash % capacity as u64) as usize,
            remaining: capacity,
            capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        let i = self.i;
        self.remaining -= 1;
        self.i += 1;
        if self.i == self.capacity {
            self.i = 0;
        }

        Some(i)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[test]
fn wraparound() {
    let probe: Vec<_> = Probe::start(9, 11).collect();
    assert_eq!(probe, [9, 10, 0, 1, 2, 3, 4, 5, 6, 7, 8]);

    let probe: Vec<_> = Probe::start(177, 11).take(3).collect();
    assert_eq!(probe, [1, 2, 3]);

    assert_eq!(Probe::start(0, 1).collect::<Vec<_>>(), [0]);
}

#[test]
fn visits_every_slot_once() {
    let mut seen: Vec<_> = Probe::start(2_000_000, 1_646_237).collect();
    assert_eq!(seen.len(), 1_646_237);
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 1_646_237);
}
