//! Two-bucket cuckoo filter sized by a target load factor.

use std::marker::PhantomData;

use arbor_common::{ArborError, CuckooConfig, Result};
use arbor_hash::{FilterKey, RabinFingerprint};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, trace};

use super::table::{BucketTable, UndoLog};
use super::KeyDigest;
use crate::filter::MembershipFilter;

const BUCKETS: usize = 2;

/// Cuckoo filter with two buckets of `ceil(expected_keys / load_factor)`
/// slots.
///
/// Each fingerprint lives at one of two positions: `(0, p)` or
/// `(1, p ^ (hash(fp) mod size))`. The mapping is its own inverse, so a
/// fingerprint evicted from either position knows where its partner slot
/// is. Alternate slots that land outside the table are reported as
/// [`ArborError::OutOfRange`] rather than wrapped.
///
/// Eviction chains start from a randomly chosen position; the random
/// source is injectable for reproducible runs.
pub struct CuckooFilterLowLoad<K: ?Sized, R = StdRng> {
    table: BucketTable<u64>,
    threshold: u32,
    digest: KeyDigest,
    rng: R,
    key_count: u64,
    _key: PhantomData<fn(&K)>,
}

impl<K: FilterKey + ?Sized> CuckooFilterLowLoad<K, StdRng> {
    /// Creates a filter seeded from system entropy.
    pub fn new(expected_keys: u64, relocation_threshold: u32, load_factor: f64) -> Result<Self> {
        Self::with_rng(
            expected_keys,
            relocation_threshold,
            load_factor,
            StdRng::from_entropy(),
        )
    }

    /// Creates an empty filter from a validated configuration.
    pub fn from_config(config: &CuckooConfig) -> Result<Self> {
        Self::new(
            config.expected_keys,
            config.relocation_threshold,
            config.load_factor,
        )
    }
}

impl<K: FilterKey + ?Sized, R: RngCore> CuckooFilterLowLoad<K, R> {
    /// Creates a filter that draws eviction choices from `rng`.
    pub fn with_rng(
        expected_keys: u64,
        relocation_threshold: u32,
        load_factor: f64,
        rng: R,
    ) -> Result<Self> {
        let config = CuckooConfig {
            expected_keys,
            relocation_threshold,
            load_factor,
            ..Default::default()
        };
        config.validate_low_load()?;

        Ok(Self {
            table: BucketTable::new(BUCKETS, config.low_load_slots()),
            threshold: relocation_threshold,
            digest: KeyDigest::default(),
            rng,
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

    /// Number of buckets, always 2.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Maximum eviction hops per insert.
    pub fn relocation_threshold(&self) -> u32 {
        self.threshold
    }

    /// Position paired with `(bucket, slot)` for fingerprint `fp`.
    fn partner(&self, bucket: usize, slot: u64, fp: u64) -> Result<(usize, u64)> {
        let size = self.table.size();
        let alternate = slot ^ (self.digest.scatter(fp) % size);
        if alternate >= size {
            return Err(ArborError::OutOfRange {
                index: alternate,
                size,
            });
        }
        Ok((1 - bucket, alternate))
    }

    /// Adds a key.
    ///
    /// Fails with `RelocationThresholdReached` when the eviction chain runs
    /// out of hops and `OutOfRange` when an alternate slot falls outside the
    /// table. Either way every displaced fingerprint is restored and the
    /// filter is left exactly as it was.
    pub fn insert(&mut self, key: &K) -> Result<()> {
        let fp = self.digest.fingerprint(key);
        let primary = self.digest.primary(key, self.table.size());

        if self.table.is_empty(0, primary) {
            self.table.set(0, primary, fp);
            self.key_count += 1;
            return Ok(());
        }

        let alternate = self.partner(0, primary, fp)?;
        if self.table.is_empty(alternate.0, alternate.1) {
            self.table.set(alternate.0, alternate.1, fp);
            self.key_count += 1;
            return Ok(());
        }

        let mut log = UndoLog::new();
        match self.relocate(fp, [(0, primary), alternate], &mut log) {
            Ok(()) => {
                self.key_count += 1;
                Ok(())
            }
            Err(e) => {
                self.table.rollback(log);
                debug!(error = %e, "low-load cuckoo insert rolled back");
                Err(e)
            }
        }
    }

    /// Evicts along the partner chain until a displaced fingerprint finds a
    /// free slot or the hop budget runs out.
    fn relocate(
        &mut self,
        fp: u64,
        candidates: [(usize, u64); 2],
        log: &mut UndoLog<u64>,
    ) -> Result<()> {
        let (mut bucket, mut slot) = candidates[self.rng.gen_range(0..BUCKETS)];
        let mut carried = fp;

        for hop in 0..self.threshold {
            carried = self.table.replace_logged(bucket, slot, carried, log);
            let (next_bucket, next_slot) = self.partner(bucket, slot, carried)?;
            trace!(hop, bucket = next_bucket, slot = next_slot, "low-load cuckoo eviction");

            if self.table.is_empty(next_bucket, next_slot) {
                self.table.replace_logged(next_bucket, next_slot, carried, log);
                return Ok(());
            }
            bucket = next_bucket;
            slot = next_slot;
        }

        Err(ArborError::RelocationThresholdReached {
            threshold: self.threshold,
        })
    }

    fn find(&self, key: &K) -> Option<(usize, u64)> {
        let fp = self.digest.fingerprint(key);
        let primary = self.digest.primary(key, self.table.size());
        if self.table.get(0, primary) == fp {
            return Some((0, primary));
        }
        let (bucket, slot) = self.partner(0, primary, fp).ok()?;
        (self.table.get(bucket, slot) == fp).then_some((bucket, slot))
    }

    /// Returns true if the key's fingerprint sits at either of its positions.
    pub fn lookup(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Clears one matching fingerprint. Returns false if none was found.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.find(key) {
            Some((bucket, slot)) => {
                self.table.set(bucket, slot, 0);
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

    /// Bytes of fingerprint storage across both buckets.
    pub fn size_in_bytes(&self) -> u64 {
        self.table.bucket_count() as u64 * self.table.size() * std::mem::size_of::<u64>() as u64
    }
}

impl<K: ?Sized, R: Clone> Clone for CuckooFilterLowLoad<K, R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            threshold: self.threshold,
            digest: self.digest,
            rng: self.rng.clone(),
            key_count: self.key_count,
            _key: PhantomData,
        }
    }
}

impl<K: FilterKey + ?Sized, R: RngCore> MembershipFilter<K> for CuckooFilterLowLoad<K, R> {
    fn insert(&mut self, key: &K) -> Result<()> {
        CuckooFilterLowLoad::insert(self, key)
    }

    fn lookup(&self, key: &K) -> bool {
        CuckooFilterLowLoad::lookup(self, key)
    }

    fn num_keys(&self) -> u64 {
        self.key_count
    }

    fn size_in_bytes(&self) -> u64 {
        CuckooFilterLowLoad::size_in_bytes(self)
    }

    fn load_factor(&self) -> f64 {
        CuckooFilterLowLoad::load_factor(self)
    }
}
