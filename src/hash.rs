use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

/// A hasher that maps integers to themselves.
///
/// Every primitive integer is widened to a `u64` without any mixing: unsigned values are
/// zero-extended and signed values are sign-extended. Keys are therefore distributed
/// across buckets exactly as well as the keys themselves are.
///
/// Types that hash as several integers (tuples, structs) or as raw bytes (strings) are
/// folded together, but a single integer write is always the identity.
///
/// # Examples
///
/// ```
/// use primetable::IdentityState;
/// use std::hash::BuildHasher;
///
/// let state = IdentityState::default();
/// assert_eq!(state.hash_one(177_u32), 177);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    hash: u64,
}

/// The default [`BuildHasher`] for every table in this crate.
pub type IdentityState = BuildHasherDefault<IdentityHasher>;

impl IdentityHasher {
    #[inline]
    fn push(&mut self, value: u64) {
        // The first write leaves `value` untouched.
        self.hash = self.hash.rotate_left(32) ^ value;
    }
}

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut word = [0; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.push(u64::from_le_bytes(word));
        }
    }

    #[inline]
    fn write_u8(&mut self, n: u8) {
        self.push(n.into())
    }

    #[inline]
    fn write_u16(&mut self, n: u16) {
        self.push(n.into())
    }

    #[inline]
    fn write_u32(&mut self, n: u32) {
        self.push(n.into())
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.push(n)
    }

    #[inline]
    fn write_u128(&mut self, n: u128) {
        self.push(n as u64)
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        self.push(n as u64)
    }

    #[inline]
    fn write_i8(&mut self, n: i8) {
        self.push(n as u64)
    }

    #[inline]
    fn write_i16(&mut self, n: i16) {
        self.push(n as u64)
    }

    #[inline]
    fn write_i32(&mut self, n: i32) {
        self.push(n as u64)
    }

    #[inline]
    fn write_i64(&mut self, n: i64) {
        self.push(n as u64)
    }

    #[inline]
    fn write_i128(&mut self, n: i128) {
        self.push(n as u64)
    }

    #[inline]
    fn write_isize(&mut self, n: isize) {
        self.push(n as u64)
    }
}

// Returns the home bucket of `key` in a table with `capacity` buckets.
#[inline]
pub(crate) fn home<K, S>(hasher: &S, key: &K, capacity: usize) -> usize
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    (hasher.hash_one(key) % capacity as u64) as usize
}
