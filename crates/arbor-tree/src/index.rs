//! Interface shared by the ordered trees.

use arbor_common::Result;

/// An in-memory ordered set of keys with logarithmic operations.
///
/// Duplicate keys are allowed; `search` and `remove` act on one equivalent
/// key at a time.
pub trait OrderedIndex<K> {
    /// Inserts a key. Insertion never fails.
    fn insert(&mut self, key: K);

    /// Removes one key equivalent to `key` and returns it.
    ///
    /// Fails with `EmptyTree` on an empty tree and `KeyNotFound` when no
    /// equivalent key is stored. A failed remove leaves the tree unchanged.
    fn remove(&mut self, key: &K) -> Result<K>;

    /// Returns a stored key equivalent to `key`.
    fn search(&self, key: &K) -> Result<&K>;

    /// Returns true if a key equivalent to `key` is stored.
    fn contains(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    /// Number of stored keys.
    fn num_keys(&self) -> usize;

    /// Edges from the root to any leaf.
    fn height(&self) -> usize;

    /// Bytes occupied by the stored keys.
    fn size_in_bytes(&self) -> usize {
        self.num_keys() * std::mem::size_of::<K>()
    }

    fn is_empty(&self) -> bool {
        self.num_keys() == 0
    }
}
