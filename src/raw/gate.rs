use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cfg::trace;

// A reader-writer gate guarding the shape of a table.
//
// Table operations enter the gate in shared mode and coordinate through per-slot
// atomics. A resize enters in exclusive mode, which waits for every shared holder to
// leave and blocks new ones until the resize is complete.
//
// The gate is a single atomic word. The high bit is set while a writer holds or is
// acquiring the gate, and the remaining bits count the shared holders. Blocked threads
// sleep on the word using `atomic-wait`.
//
// The gate is not reentrant: a thread holding a shared entry must never request the
// exclusive one.
pub struct Gate {
    state: AtomicU32,
    // Serializes writers, only one may own the WRITER bit.
    writer: Mutex<()>,
}

/// The bit set while a writer holds or is acquiring the gate.
const WRITER: u32 = 1 << 31;

/// The bits counting shared holders.
const READERS: u32 = !WRITER;

impl Gate {
    pub fn new() -> Gate {
        Gate {
            state: AtomicU32::new(0),
            writer: Mutex::new(()),
        }
    }

    // Enter the gate in shared mode, waiting for any active writer to finish.
    #[inline]
    pub fn shared(&self) -> Shared<'_> {
        loop {
            let state = self.state.fetch_add(1, Ordering::Acquire);
            debug_assert!(state & READERS != READERS, "gate reader overflow");

            if state & WRITER == 0 {
                return Shared { gate: self };
            }

            // A writer is active, back out and wait for it.
            self.leave();
            self.wait_for_writer();
        }
    }

    #[cold]
    fn wait_for_writer(&self) {
        let mut state = self.state.load(Ordering::Relaxed);
        while state & WRITER != 0 {
            atomic_wait::wait(&self.state, state);
            state = self.state.load(Ordering::Relaxed);
        }
    }

    #[inline]
    fn leave(&self) {
        let state = self.state.fetch_sub(1, Ordering::Release);

        // The last shared holder wakes a waiting writer.
        if state == WRITER | 1 {
            atomic_wait::wake_all(&self.state);
        }
    }

    // Enter the gate in exclusive mode, waiting for all shared holders to leave.
    pub fn exclusive(&self) -> Exclusive<'_> {
        // A panic during a previous resize leaves the table intact, so poisoning
        // carries no information here.
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut state = self.state.fetch_or(WRITER, Ordering::Acquire) | WRITER;
        while state != WRITER {
            trace!("waiting for {} threads to leave the table", state & READERS);
            atomic_wait::wait(&self.state, state);
            state = self.state.load(Ordering::Acquire);
        }

        Exclusive {
            gate: self,
            _writer: writer,
        }
    }
}

impl Default for Gate {
    fn default() -> Gate {
        Gate::new()
    }
}

// A shared entry on a `Gate`.
pub struct Shared<'gate> {
    gate: &'gate Gate,
}

impl Drop for Shared<'_> {
    #[inline]
    fn drop(&mut self) {
        self.gate.leave();
    }
}

// An exclusive entry on a `Gate`.
pub struct Exclusive<'gate> {
    gate: &'gate Gate,
    // Released after the WRITER bit is cleared.
    _writer: MutexGuard<'gate, ()>,
}

impl Drop for Exclusive<'_> {
    fn drop(&mut self) {
        self.gate.state.fetch_and(!WRITER, Ordering::Release);
        atomic_wait::wake_all(&self.gate.state);
    }
}
