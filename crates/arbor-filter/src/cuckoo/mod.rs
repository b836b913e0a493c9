//! Cuckoo filters storing one fingerprint per slot.
//!
//! Both variants start a key at `hash(key) mod size` in bucket 0 and derive
//! every further position from the slot and the fingerprint alone, so a
//! displaced fingerprint can move without knowing its key.
//!
//! A zero slot is empty. A key whose fingerprint is zero is therefore
//! indistinguishable from a free slot: inserting it stores nothing and
//! looking it up matches any empty probe position. Integer key `0` and the
//! empty string both fingerprint to zero.

mod high_load;
mod low_load;
mod table;

pub use high_load::CuckooFilterHighLoad;
pub use low_load::CuckooFilterLowLoad;

use arbor_hash::{FilterKey, MurmurHash3, RabinFingerprint};

/// Hash and fingerprint families a filter places keys with.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeyDigest {
    hasher: MurmurHash3,
    fingerprint: RabinFingerprint,
}

impl KeyDigest {
    /// Pairs the default block hash with `fingerprint`.
    pub fn new(fingerprint: RabinFingerprint) -> Self {
        Self {
            hasher: MurmurHash3::new(),
            fingerprint,
        }
    }

    /// Slot in bucket 0 where the key is tried first.
    #[inline]
    pub fn primary<K: FilterKey + ?Sized>(&self, key: &K, size: u64) -> u64 {
        self.hasher.hash_key(key, 0) as u64 % size
    }

    #[inline]
    pub fn fingerprint<K: FilterKey + ?Sized>(&self, key: &K) -> u64 {
        self.fingerprint.fingerprint_key(key)
    }

    /// Hash of a stored fingerprint, used to derive alternate slots.
    #[inline]
    pub fn scatter(&self, fp: u64) -> u64 {
        self.hasher.hash_u64(fp, 0) as u64
    }
}
