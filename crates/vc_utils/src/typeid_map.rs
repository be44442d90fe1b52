use core::any::TypeId;
use core::fmt::Debug;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map keyed by [`TypeId`].
///
/// `TypeId` is already a hash, so the map uses [`NoOpHashState`].
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty `TypeIdMap`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_utils::TypeIdMap;
    /// let map = TypeIdMap::<i32>::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &TypeId) -> bool {
        self.0.contains_key(key)
    }

    #[inline]
    pub fn get(&self, key: &TypeId) -> Option<&V> {
        self.0.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &TypeId) -> Option<&mut V> {
        self.0.get_mut(key)
    }

    /// Inserts a value, returning the previous one.
    #[inline]
    pub fn insert(&mut self, key: TypeId, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    /// Inserts the value produced by `func` if `key` is vacant.
    ///
    /// Returns `true` if a value was inserted. `func` is not called otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::any::TypeId;
    /// use vc_utils::TypeIdMap;
    ///
    /// let mut map = TypeIdMap::new();
    /// assert!(map.try_insert(TypeId::of::<u8>(), || 1));
    /// assert!(!map.try_insert(TypeId::of::<u8>(), || unreachable!()));
    /// ```
    pub fn try_insert(&mut self, key: TypeId, func: impl FnOnce() -> V) -> bool {
        match self.0.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(func());
                true
            }
        }
    }

    #[inline]
    pub fn remove(&mut self, key: &TypeId) -> Option<V> {
        self.0.remove(key)
    }

    /// Iterates over the values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}
