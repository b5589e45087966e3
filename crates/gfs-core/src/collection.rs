//! Size-limited sorted collections.
//!
//! Both collections keep the `capacity` elements with the largest keys seen
//! so far, in ascending key order. Keys and values live in two parallel
//! vectors so the binary search runs over keys only.
//!
//! # Insertion rules
//!
//! 1. The insert position is the upper bound of the new key among the kept
//!    keys (equal keys sort before the new element).
//! 2. When the collection is full and that position is 0, the element is
//!    older than everything kept and is dropped without touching the vectors.
//! 3. Otherwise the element is inserted; on overflow the lowest key is
//!    evicted.
//!
//! [`BoundedSortedSet`] additionally merges an element into an existing
//! entry with the same key, keeping the greater value.

use std::fmt;

// ---------------------------------------------------------------------------
// BoundedSortedList
// ---------------------------------------------------------------------------

/// A sorted list that keeps at most `capacity` elements, largest keys first
/// to survive. Elements with equal keys are all kept.
pub struct BoundedSortedList<T, K, F> {
    capacity: usize,
    key_fn: F,
    keys: Vec<K>,
    values: Vec<T>,
}

impl<T, K, F> BoundedSortedList<T, K, F>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    /// Create an empty list.
    pub fn new(capacity: usize, key_fn: F) -> Self {
        Self {
            capacity,
            key_fn,
            keys: Vec::with_capacity(capacity.saturating_add(1)),
            values: Vec::with_capacity(capacity.saturating_add(1)),
        }
    }

    /// Create a list and insert `values` one at a time, in order.
    pub fn with_values(capacity: usize, key_fn: F, values: impl IntoIterator<Item = T>) -> Self {
        let mut list = Self::new(capacity, key_fn);
        list.extend(values);
        list
    }

    /// Insert a value.
    pub fn insert(&mut self, value: T) {
        let key = (self.key_fn)(&value);
        let idx = self.upper_bound(&key);
        self.insert_at(idx, key, value);
    }

    pub(crate) fn key_of(&self, value: &T) -> K {
        (self.key_fn)(value)
    }

    pub(crate) fn upper_bound(&self, key: &K) -> usize {
        self.keys.partition_point(|kept| kept <= key)
    }

    /// Insert at a precomputed upper-bound position.
    pub(crate) fn insert_at(&mut self, idx: usize, key: K, value: T) {
        if idx == 0 && self.keys.len() >= self.capacity {
            return;
        }

        self.keys.insert(idx, key);
        self.values.insert(idx, value);

        if self.keys.len() > self.capacity {
            self.keys.remove(0);
            self.values.remove(0);
        }
    }

    pub(crate) fn entry_mut(&mut self, idx: usize) -> Option<(&K, &mut T)> {
        let key = self.keys.get(idx)?;
        let value = self.values.get_mut(idx)?;
        Some((key, value))
    }
}

impl<T, K, F> BoundedSortedList<T, K, F> {
    /// Maximum number of kept elements.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of kept elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing is kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Kept values in ascending key order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Kept keys, ascending.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Kept values, ascending by key.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Consume the list, returning the kept values in ascending key order.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }
}

impl<T, K, F> Extend<T> for BoundedSortedList<T, K, F>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, K, F> IntoIterator for &'a BoundedSortedList<T, K, F> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<T: fmt::Debug, K, F> fmt::Debug for BoundedSortedList<T, K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

// ---------------------------------------------------------------------------
// BoundedSortedSet
// ---------------------------------------------------------------------------

/// A [`BoundedSortedList`] holding at most one value per key.
///
/// When a value arrives for a key that is already kept, it replaces the kept
/// value if it compares greater or equal, and is dropped otherwise. This path
/// never changes the size of the set.
pub struct BoundedSortedSet<T, K, F> {
    list: BoundedSortedList<T, K, F>,
}

impl<T, K, F> BoundedSortedSet<T, K, F>
where
    T: Ord,
    K: Ord,
    F: Fn(&T) -> K,
{
    /// Create an empty set.
    pub fn new(capacity: usize, key_fn: F) -> Self {
        Self {
            list: BoundedSortedList::new(capacity, key_fn),
        }
    }

    /// Create a set and insert `values` one at a time, in order.
    pub fn with_values(capacity: usize, key_fn: F, values: impl IntoIterator<Item = T>) -> Self {
        let mut set = Self::new(capacity, key_fn);
        set.extend(values);
        set
    }

    /// Insert a value, merging it with an existing entry of the same key.
    pub fn insert(&mut self, value: T) {
        let key = self.list.key_of(&value);
        let idx = self.list.upper_bound(&key);

        let collision = idx
            .checked_sub(1)
            .and_then(|prev| self.list.entry_mut(prev))
            .filter(|(kept_key, _)| **kept_key == key);

        if let Some((_, kept)) = collision {
            if value >= *kept {
                *kept = value;
            }
            return;
        }

        self.list.insert_at(idx, key, value);
    }
}

impl<T, K, F> BoundedSortedSet<T, K, F> {
    /// Maximum number of kept keys.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.list.capacity()
    }

    /// Number of kept keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` when nothing is kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Kept values in ascending key order. Can be called any number of times.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.list.iter()
    }

    /// Kept keys, strictly ascending.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        self.list.keys()
    }

    /// Kept values, ascending by key.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.list.as_slice()
    }

    /// Consume the set, returning the kept values in ascending key order.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.list.into_vec()
    }
}

impl<T, K, F> Extend<T> for BoundedSortedSet<T, K, F>
where
    T: Ord,
    K: Ord,
    F: Fn(&T) -> K,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, K, F> IntoIterator for &'a BoundedSortedSet<T, K, F> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl<T: fmt::Debug, K, F> fmt::Debug for BoundedSortedSet<T, K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.list.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
