//! Bloom filter over a packed bit vector.

use std::marker::PhantomData;

use arbor_common::{BloomConfig, Result};
use arbor_hash::{FilterKey, MurmurHash3};

use crate::filter::MembershipFilter;

const WORD_BITS: u64 = u64::BITS as u64;

/// Bloom filter with `bit_count` bits and `ceil(bit_count * ln 2 / expected_keys)`
/// hash functions.
///
/// Hash function `i` is the block hash seeded with `i`.
pub struct BloomFilter<K: ?Sized> {
    words: Vec<u64>,
    bit_count: u64,
    hash_count: u32,
    expected_keys: u64,
    key_count: u64,
    hasher: MurmurHash3,
    _key: PhantomData<fn(&K)>,
}

impl<K: FilterKey + ?Sized> BloomFilter<K> {
    /// Creates an empty filter of `bit_count` bits sized for `expected_keys`.
    pub fn new(expected_keys: u64, bit_count: u64) -> Result<Self> {
        Self::from_config(&BloomConfig {
            expected_keys,
            bit_count,
        })
    }

    /// Creates an empty filter from a validated configuration.
    pub fn from_config(config: &BloomConfig) -> Result<Self> {
        config.validate()?;
        let word_count = config.bit_count.div_ceil(WORD_BITS);
        Ok(Self {
            words: vec![0; word_count as usize],
            bit_count: config.bit_count,
            hash_count: config.hash_count(),
            expected_keys: config.expected_keys,
            key_count: 0,
            hasher: MurmurHash3::new(),
            _key: PhantomData,
        })
    }

    /// Number of bits in the filter.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Number of seeded hashes set per key.
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    #[inline]
    fn bit_index(&self, key: &K, seed: u32) -> u64 {
        self.hasher.hash_key(key, seed) as u64 % self.bit_count
    }

    /// Sets the key's bits. Never fails.
    pub fn insert(&mut self, key: &K) {
        for seed in 0..self.hash_count {
            let bit = self.bit_index(key, seed);
            self.words[(bit / WORD_BITS) as usize] |= 1 << (bit % WORD_BITS);
        }
        self.key_count += 1;
    }

    /// Returns true if every bit for the key is set.
    pub fn lookup(&self, key: &K) -> bool {
        (0..self.hash_count).all(|seed| {
            let bit = self.bit_index(key, seed);
            self.words[(bit / WORD_BITS) as usize] & (1 << (bit % WORD_BITS)) != 0
        })
    }

    /// Estimated false-positive probability at the current key count:
    /// `2^-(bit_count * ln 2 / num_keys)`. Zero while empty.
    pub fn fp_prob(&self) -> f64 {
        let exponent = self.bit_count as f64 * std::f64::consts::LN_2 / self.key_count as f64;
        2f64.powf(-exponent)
    }

    /// Inserted keys relative to the sizing estimate.
    pub fn occupancy_ratio(&self) -> f64 {
        self.key_count as f64 / self.expected_keys as f64
    }

    /// Number of inserted keys.
    pub fn num_keys(&self) -> u64 {
        self.key_count
    }

    /// Bytes of the packed bit vector.
    pub fn size_in_bytes(&self) -> u64 {
        self.words.len() as u64 * std::mem::size_of::<u64>() as u64
    }

    /// Number of set bits.
    pub fn ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }
}

impl<K: ?Sized> Clone for BloomFilter<K> {
    fn clone(&self) -> Self {
        Self {
            words: self.words.clone(),
            bit_count: self.bit_count,
            hash_count: self.hash_count,
            expected_keys: self.expected_keys,
            key_count: self.key_count,
            hasher: self.hasher,
            _key: PhantomData,
        }
    }
}

impl<K: FilterKey + ?Sized> MembershipFilter<K> for BloomFilter<K> {
    fn insert(&mut self, key: &K) -> Result<()> {
        BloomFilter::insert(self, key);
        Ok(())
    }

    fn lookup(&self, key: &K) -> bool {
        BloomFilter::lookup(self, key)
    }

    fn num_keys(&self) -> u64 {
        self.key_count
    }

    fn size_in_bytes(&self) -> u64 {
        BloomFilter::size_in_bytes(self)
    }

    fn load_factor(&self) -> f64 {
        self.occupancy_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::ArborError;

    #[test]
    fn test_sizing() {
        let filter = BloomFilter::<str>::new(1000, 10_000).unwrap();
        assert_eq!(filter.hash_count(), 7);
        assert_eq!(filter.bit_count(), 10_000);
        assert_eq!(filter.size_in_bytes(), 157 * 8);

        let filter = BloomFilter::<str>::new(10, 64).unwrap();
        assert_eq!(filter.hash_count(), 5);
        assert_eq!(filter.size_in_bytes(), 8);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            BloomFilter::<str>::new(0, 100),
            Err(ArborError::InvalidParameter { .. })
        ));
        assert!(BloomFilter::<str>::new(100, 0).is_err());
    }

    #[test]
    fn test_insert_then_lookup() {
        let mut filter = BloomFilter::<str>::new(100, 2000).unwrap();
        for i in 0..100 {
            filter.insert(&format!("bloom-{i}"));
        }
        for i in 0..100 {
            assert!(filter.lookup(&format!("bloom-{i}")));
        }
        assert_eq!(filter.num_keys(), 100);
        assert!(filter.ones() <= 100 * filter.hash_count() as u64);
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = BloomFilter::<u64>::new(10, 100).unwrap();
        for key in 0..100u64 {
            assert!(!filter.lookup(&key));
        }
        assert_eq!(filter.fp_prob(), 0.0);
        assert_eq!(filter.occupancy_ratio(), 0.0);
    }

    #[test]
    fn test_fp_prob_and_occupancy() {
        let mut filter = BloomFilter::<u64>::new(100, 1000).unwrap();
        for key in 0..50u64 {
            filter.insert(&key);
        }
        let expected = 2f64.powf(-(1000.0 * std::f64::consts::LN_2 / 50.0));
        assert!((filter.fp_prob() - expected).abs() < 1e-12);
        assert!((filter.occupancy_ratio() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bits_set_per_key() {
        let mut filter = BloomFilter::<str>::new(1, 640).unwrap();
        filter.insert("solo");
        let ones = filter.ones();
        assert!(ones >= 1 && ones <= filter.hash_count() as u64);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut filter = BloomFilter::<str>::new(10, 256).unwrap();
        let copy = filter.clone();
        filter.insert("later");
        assert!(filter.lookup("later"));
        assert_eq!(copy.ones(), 0);
    }
}
