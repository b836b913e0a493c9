//! Interface shared by the approximate-membership filters.

use arbor_common::Result;

/// Approximate set membership with no false negatives.
///
/// A key whose `insert` returned `Ok` is reported by `lookup` until it is
/// removed. Keys never inserted may still be reported (false positives).
pub trait MembershipFilter<K: ?Sized> {
    /// Adds a key to the filter.
    fn insert(&mut self, key: &K) -> Result<()>;

    /// Returns true if the key may have been inserted.
    fn lookup(&self, key: &K) -> bool;

    /// Number of successful inserts not yet removed.
    fn num_keys(&self) -> u64;

    /// Bytes of backing storage.
    fn size_in_bytes(&self) -> u64;

    /// Stored keys relative to nominal capacity.
    fn load_factor(&self) -> f64;
}
