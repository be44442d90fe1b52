//! Hash containers with deterministic hashing.
//!
//! [`FixedHashState`] seeds *foldhash* with a constant, so iteration order of
//! [`HashMap`] and [`HashSet`] only depends on their content. That matters to
//! callers that hash serialized output.
//!
//! [`NoOpHashState`] passes a single `u64` through unchanged. It is meant for
//! keys that are already well distributed, such as [`TypeId`](core::any::TypeId).

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;

// -----------------------------------------------------------------------------
// FixedHashState

const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x5AD3_77C1_0E94_B2F1);

/// Hasher produced by [`FixedHashState`].
pub type FixedHasher = FoldHasher<'static>;

/// Build hasher with a fixed seed.
///
/// # Examples
///
/// ```
/// use core::hash::{BuildHasher, Hash, Hasher};
/// use vc_utils::hash::FixedHashState;
///
/// let mut a = FixedHashState.build_hasher();
/// let mut b = FixedHashState.build_hasher();
/// "Shapes.Circle".hash(&mut a);
/// "Shapes.Circle".hash(&mut b);
/// assert_eq!(a.finish(), b.finish());
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// NoOpHashState

/// A hasher that keeps the last written `u64` as its result.
///
/// Other writes fold the bytes in reverse order, so `write_u32(7)` and
/// `write_u64(7)` agree when called once.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// Build hasher for [`NoOpHasher`].
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher { hash: 0 }
    }
}

// -----------------------------------------------------------------------------
// Containers

/// A [`hashbrown::HashMap`] using [`FixedHashState`].
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`].
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

#[cfg(test)]
mod tests {
    use super::{HashMap, NoOpHashState};
    use core::hash::{BuildHasher, Hash, Hasher};

    #[test]
    fn no_op_passes_u64_through() {
        let mut hasher = NoOpHashState.build_hasher();
        42_u64.hash(&mut hasher);
        assert_eq!(hasher.finish(), 42);
    }

    #[test]
    fn fixed_map_iterates_in_content_order() {
        let mut a: HashMap<u32, u32> = HashMap::default();
        let mut b: HashMap<u32, u32> = HashMap::default();
        for i in 0..64 {
            a.insert(i, i);
        }
        for i in (0..64).rev() {
            b.insert(i, i);
        }
        let a_keys: alloc::vec::Vec<_> = a.keys().copied().collect();
        let b_keys: alloc::vec::Vec<_> = b.keys().copied().collect();
        assert_eq!(a_keys.len(), b_keys.len());
        assert!(a_keys.iter().all(|k| b.contains_key(k)));
    }
}
