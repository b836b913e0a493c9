//! Multi-bucket cuckoo filter tuned for high fill ratios.

use std::marker::PhantomData;

use arbor_common::{ArborError, CuckooConfig, Result};
use arbor_hash::{FilterKey, RabinFingerprint};
use tracing::{debug, trace};

use super::table::{BucketTable, UndoLog};
use super::KeyDigest;
use crate::filter::MembershipFilter;

/// A stored fingerprint and its hop distance from the key's first slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Slot {
    fp: u64,
    depth: u32,
}

impl Slot {
    fn new(fp: u64, depth: u32) -> Self {
        if fp == 0 {
            return Self::default();
        }
        Self { fp, depth }
    }
}

/// Cuckoo filter with `n >= 2` buckets of `expected_keys + 7` slots.
///
/// A key's candidate positions form a chain: `(0, p)`, then each step moves
/// to `((b + 1) mod n, (s ^ hash(fp)) mod size)`. Every stored fingerprint
/// remembers how far along its chain it sits and is never placed past
/// `relocation_threshold` hops, so lookup and remove walking that many hops
/// always reach it.
///
/// When both the current and the next chain position are taken, the
/// eviction target alternates between them on a rotating hand; no random
/// source is involved.
pub struct CuckooFilterHighLoad<K: ?Sized> {
    table: BucketTable<Slot>,
    threshold: u32,
    digest: KeyDigest,
    eviction_hand: usize,
    key_count: u64,
    _key: PhantomData<fn(&K)>,
}

impl<K: FilterKey + ?Sized> CuckooFilterHighLoad<K> {
    /// Creates an empty filter with `bucket_count` buckets.
    pub fn new(expected_keys: u64, relocation_threshold: u32, bucket_count: usize) -> Result<Self> {
        let config = CuckooConfig {
            expected_keys,
            relocation_threshold,
            bucket_count,
            ..Default::default()
        };
        Self::from_config(&config)
    }

    /// Creates an empty filter from a validated configuration.
    pub fn from_config(config: &CuckooConfig) -> Result<Self> {
        config.validate_high_load()?;
        Ok(Self {
            table: BucketTable::new(config.bucket_count, config.high_load_slots()),
            threshold: config.relocation_threshold,
            digest: KeyDigest::default(),
            eviction_hand: 0,
            key_count: 0,
            _key: PhantomData,
        })
    }

    /// Replaces the fingerprint family. Must be called before the first
    /// insert; stored fingerprints are not recomputed.
    pub fn with_fingerprint(mut self, fingerprint: RabinFingerprint) -> Self {
        self.digest = KeyDigest::new(fingerprint);
        self
    }

    /// Slots per bucket.
    pub fn size(&self) -> u64 {
        self.table.size()
    }

    /// Number of parallel buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Maximum hops a fingerprint may sit from its first slot.
    pub fn relocation_threshold(&self) -> u32 {
        self.threshold
    }

    /// Next position on the chain of fingerprint `fp`.
    #[inline]
    fn step(&self, bucket: usize, slot: u64, fp: u64) -> (usize, u64) {
        (
            (bucket + 1) % self.table.bucket_count(),
            (slot ^ self.digest.scatter(fp)) % self.table.size(),
        )
    }

    /// Adds a key.
    ///
    /// Fails with `RelocationThresholdReached` when no placement within the
    /// hop budget exists. The table is then restored to its prior state.
    pub fn insert(&mut self, key: &K) -> Result<()> {
        let fp = self.digest.fingerprint(key);
        let primary = self.digest.primary(key, self.table.size());

        let mut log = UndoLog::new();
        match self.place(fp, primary, &mut log) {
            Ok(()) => {
                self.key_count += 1;
                Ok(())
            }
            Err(e) => {
                self.table.rollback(log);
                debug!(error = %e, "high-load cuckoo insert rolled back");
                Err(e)
            }
        }
    }

    fn place(&mut self, fp: u64, primary: u64, log: &mut UndoLog<Slot>) -> Result<()> {
        let exhausted = ArborError::RelocationThresholdReached {
            threshold: self.threshold,
        };
        let (mut bucket, mut slot) = (0, primary);
        let (mut carried, mut depth) = (fp, 0u32);
        let mut evictions = 0u32;

        loop {
            if depth > self.threshold {
                return Err(exhausted);
            }
            if self.table.is_empty(bucket, slot) {
                self.table.replace_logged(bucket, slot, Slot::new(carried, depth), log);
                return Ok(());
            }

            let (next_bucket, next_slot) = self.step(bucket, slot, carried);
            let next_allowed = depth < self.threshold;
            if next_allowed && self.table.is_empty(next_bucket, next_slot) {
                let placed = Slot::new(carried, depth + 1);
                self.table.replace_logged(next_bucket, next_slot, placed, log);
                return Ok(());
            }

            if evictions == self.threshold {
                return Err(exhausted);
            }
            evictions += 1;

            self.eviction_hand = (self.eviction_hand + 1) % 2;
            let (target_bucket, target_slot, target_depth) =
                if next_allowed && self.eviction_hand == 1 {
                    (next_bucket, next_slot, depth + 1)
                } else {
                    (bucket, slot, depth)
                };

            let victim = self.table.replace_logged(
                target_bucket,
                target_slot,
                Slot::new(carried, target_depth),
                log,
            );
            trace!(
                hop = evictions,
                bucket = target_bucket,
                slot = target_slot,
                "high-load cuckoo eviction"
            );

            (bucket, slot) = self.step(target_bucket, target_slot, victim.fp);
            carried = victim.fp;
            depth = victim.depth + 1;
        }
    }

    /// Chain position holding `key`'s fingerprint, if any.
    fn find(&self, key: &K) -> Option<(usize, u64)> {
        let fp = self.digest.fingerprint(key);
        let (mut bucket, mut slot) = (0, self.digest.primary(key, self.table.size()));
        for _ in 0..=self.threshold {
            if self.table.get(bucket, slot).fp == fp {
                return Some((bucket, slot));
            }
            (bucket, slot) = self.step(bucket, slot, fp);
        }
        None
    }

    /// Walks the key's chain for a matching fingerprint.
    pub fn lookup(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Clears the first matching fingerprint on the key's chain.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.find(key) {
            Some((bucket, slot)) => {
                self.table.set(bucket, slot, Slot::default());
                self.key_count = self.key_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Number of stored keys.
    pub fn num_keys(&self) -> u64 {
        self.key_count
    }

    /// Keys stored per slot of one bucket.
    pub fn load_factor(&self) -> f64 {
        self.key_count as f64 / self.table.size() as f64
    }

    /// Bytes of fingerprint storage: 8 per slot across all buckets. Hop
    /// depths are bookkeeping and not counted.
    pub fn size_in_bytes(&self) -> u64 {
        self.table.bucket_count() as u64 * self.table.size() * std::mem::size_of::<u64>() as u64
    }
}

impl<K: ?Sized> Clone for CuckooFilterHighLoad<K> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            threshold: self.threshold,
            digest: self.digest,
            eviction_hand: self.eviction_hand,
            key_count: self.key_count,
            _key: PhantomData,
        }
    }
}

impl<K: FilterKey + ?Sized> MembershipFilter<K> for CuckooFilterHighLoad<K> {
    fn insert(&mut self, key: &K) -> Result<()> {
        CuckooFilterHighLoad::insert(self, key)
    }

    fn lookup(&self, key: &K) -> bool {
        CuckooFilterHighLoad::lookup(self, key)
    }

    fn num_keys(&self) -> u64 {
        self.key_count
    }

    fn size_in_bytes(&self) -> u64 {
        CuckooFilterHighLoad::size_in_bytes(self)
    }

    fn load_factor(&self) -> f64 {
        CuckooFilterHighLoad::load_factor(self)
    }
}
