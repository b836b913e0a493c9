//! Filter Validation Tests
//!
//! Integration tests for the arbor membership filters:
//! - Low-load cuckoo sizing and fill at the documented load factor
//! - High-load cuckoo fill, removal and hop-bounded lookup
//! - Bloom filter false-positive rate against its own estimate
//! - Byte-buffer keys and shared use through `MembershipFilter`
//!
//! Every successful insert is re-checked afterwards: a filter may report
//! keys it never saw, but never forget one it accepted.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arbor_common::{ArborError, BloomConfig, CuckooConfig};
use arbor_filter::{BloomFilter, CuckooFilterHighLoad, CuckooFilterLowLoad, MembershipFilter};

// =============================================================================
// Workload Constants
// =============================================================================

const SEED: u64 = 0x5eed_f11e;
const PROBE_KEYS: usize = 20_000;

// =============================================================================
// Helpers
// =============================================================================

fn string_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

/// Inserts every key and returns the ones the filter accepted.
fn fill<'a, F>(filter: &mut F, keys: &'a [String]) -> Vec<&'a str>
where
    F: MembershipFilter<str> + ?Sized,
{
    let mut accepted = Vec::with_capacity(keys.len());
    for key in keys {
        match filter.insert(key) {
            Ok(()) => accepted.push(key.as_str()),
            Err(ArborError::RelocationThresholdReached { .. })
            | Err(ArborError::OutOfRange { .. }) => {}
            Err(e) => panic!("unexpected error for {key}: {e}"),
        }
    }
    accepted
}

fn assert_no_false_negatives<F: MembershipFilter<str> + ?Sized>(filter: &F, accepted: &[&str]) {
    for key in accepted {
        assert!(filter.lookup(key), "accepted key {key} not found");
    }
}

fn false_positive_rate<F: MembershipFilter<str> + ?Sized>(filter: &F, probes: &[String]) -> f64 {
    let hits = probes.iter().filter(|key| filter.lookup(key)).count();
    hits as f64 / probes.len() as f64
}

// =============================================================================
// Low-Load Cuckoo Tests
// =============================================================================

#[test]
fn test_low_load_fill_at_half_load() {
    let rng = StdRng::seed_from_u64(SEED);
    let mut filter = CuckooFilterLowLoad::<str, _>::with_rng(1000, 500, 0.5, rng).unwrap();
    assert_eq!(filter.size(), 2000);
    assert_eq!(filter.size_in_bytes(), 2 * 2000 * 8);

    let keys = string_keys("member", 1000);
    let accepted = fill(&mut filter, &keys);

    let dropped = keys.len() - accepted.len();
    assert!(dropped < 60, "dropped {dropped} of {} keys", keys.len());
    assert_eq!(filter.num_keys(), accepted.len() as u64);
    assert!((filter.load_factor() - accepted.len() as f64 / 2000.0).abs() < 1e-12);
    assert_no_false_negatives(&filter, &accepted);
}

#[test]
fn test_low_load_from_config() {
    let config = CuckooConfig {
        expected_keys: 300,
        relocation_threshold: 64,
        load_factor: 0.25,
        ..Default::default()
    };
    let mut filter = CuckooFilterLowLoad::<str>::from_config(&config).unwrap();
    assert_eq!(filter.size(), 1200);

    let keys = string_keys("config", 300);
    let accepted = fill(&mut filter, &keys);
    assert!(accepted.len() >= 280);
    assert_no_false_negatives(&filter, &accepted);
}

#[test]
fn test_low_load_remove_half() {
    let rng = StdRng::seed_from_u64(SEED ^ 1);
    let mut filter = CuckooFilterLowLoad::<str, _>::with_rng(500, 200, 0.5, rng).unwrap();
    let keys = string_keys("evict", 500);
    let accepted = fill(&mut filter, &keys);

    let (gone, kept) = accepted.split_at(accepted.len() / 2);
    for key in gone {
        assert!(filter.remove(key), "could not remove {key}");
    }
    assert_eq!(filter.num_keys(), kept.len() as u64);
    assert_no_false_negatives(&filter, kept);

    let reappeared = gone.iter().filter(|key| filter.lookup(key)).count();
    assert!(reappeared <= 1, "{reappeared} removed keys still reported");
}

#[test]
fn test_low_load_rare_false_positives() {
    let rng = StdRng::seed_from_u64(SEED ^ 2);
    let mut filter = CuckooFilterLowLoad::<str, _>::with_rng(1000, 500, 0.5, rng).unwrap();
    fill(&mut filter, &string_keys("present", 1000));

    let probes = string_keys("absent", PROBE_KEYS);
    assert!(false_positive_rate(&filter, &probes) < 0.001);
}

#[test]
fn test_low_load_integer_keys() {
    let rng = StdRng::seed_from_u64(SEED ^ 3);
    let mut filter = CuckooFilterLowLoad::<u64, _>::with_rng(2000, 500, 0.5, rng).unwrap();
    let mut accepted = Vec::new();
    for key in 1..=2000u64 {
        if filter.insert(&key).is_ok() {
            accepted.push(key);
        }
    }
    assert!(accepted.len() >= 1900);
    for key in &accepted {
        assert!(filter.lookup(key));
    }
}

// =============================================================================
// High-Load Cuckoo Tests
// =============================================================================

#[test]
fn test_high_load_fill() {
    let mut filter = CuckooFilterHighLoad::<str>::new(2000, 64, 2).unwrap();
    assert_eq!(filter.size(), 2007);

    let keys = string_keys("dense", 1500);
    let accepted = fill(&mut filter, &keys);
    assert!(accepted.len() >= 1400, "accepted only {}", accepted.len());
    assert_eq!(filter.num_keys(), accepted.len() as u64);
    assert_no_false_negatives(&filter, &accepted);
}

#[test]
fn test_high_load_many_buckets() {
    let config = CuckooConfig {
        expected_keys: 1000,
        relocation_threshold: 100,
        bucket_count: 4,
        ..Default::default()
    };
    let mut filter = CuckooFilterHighLoad::<str>::from_config(&config).unwrap();
    assert_eq!(filter.bucket_count(), 4);
    assert_eq!(filter.size_in_bytes(), 4 * 1007 * 8);

    let keys = string_keys("wide", 3000);
    let accepted = fill(&mut filter, &keys);
    assert!(accepted.len() >= 1000);
    assert_no_false_negatives(&filter, &accepted);
}

#[test]
fn test_high_load_remove_then_reinsert() {
    let mut filter = CuckooFilterHighLoad::<str>::new(400, 40, 3).unwrap();
    let keys = string_keys("cycle", 400);
    let accepted = fill(&mut filter, &keys);
    assert!(accepted.len() >= 390);

    for key in &accepted {
        assert!(filter.remove(key));
    }
    assert_eq!(filter.num_keys(), 0);
    for key in &accepted {
        assert!(!filter.lookup(key));
    }

    let again = fill(&mut filter, &keys);
    assert!(again.len() >= 390);
    assert_no_false_negatives(&filter, &again);
}

#[test]
fn test_high_load_random_workload() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut filter = CuckooFilterHighLoad::<u64>::new(1000, 50, 2).unwrap();
    let mut stored: Vec<u64> = Vec::new();

    for _ in 0..5000 {
        if stored.is_empty() || rng.gen_bool(0.6) {
            let key = rng.gen_range(1..u64::MAX);
            if filter.insert(&key).is_ok() {
                stored.push(key);
            }
        } else {
            let index = rng.gen_range(0..stored.len());
            let key = stored.swap_remove(index);
            assert!(filter.remove(&key), "stored key {key} not removable");
        }
    }

    assert_eq!(filter.num_keys(), stored.len() as u64);
    for key in &stored {
        assert!(filter.lookup(key));
    }
}

// =============================================================================
// Bloom Filter Tests
// =============================================================================

#[test]
fn test_bloom_false_positive_rate() {
    let mut filter = BloomFilter::<str>::new(1000, 10_000).unwrap();
    let keys = string_keys("bloom", 1000);
    let accepted = fill(&mut filter, &keys);
    assert_eq!(accepted.len(), 1000);
    assert_no_false_negatives(&filter, &accepted);

    let estimate = filter.fp_prob();
    let observed = false_positive_rate(&filter, &string_keys("outside", PROBE_KEYS));
    assert!(estimate > 0.005 && estimate < 0.012, "estimate {estimate}");
    assert!(observed < 3.0 * estimate, "observed {observed} vs {estimate}");
    assert!((filter.occupancy_ratio() - 1.0).abs() < 1e-12);
}

#[test]
fn test_bloom_overfilled_rate_grows() {
    let config = BloomConfig {
        expected_keys: 100,
        bit_count: 1000,
    };
    let mut filter = BloomFilter::<str>::from_config(&config).unwrap();
    let probes = string_keys("probe", 5000);

    fill(&mut filter, &string_keys("light", 100));
    let light = false_positive_rate(&filter, &probes);
    fill(&mut filter, &string_keys("heavy", 400));
    let heavy = false_positive_rate(&filter, &probes);

    assert!(heavy > light);
    assert!((filter.load_factor() - 5.0).abs() < 1e-12);
}

// =============================================================================
// Key Type and Trait Tests
// =============================================================================

#[test]
fn test_bytes_keys() {
    let rng = StdRng::seed_from_u64(SEED);
    let mut cuckoo = CuckooFilterLowLoad::<Bytes, _>::with_rng(64, 50, 0.5, rng).unwrap();
    let mut bloom = BloomFilter::<Bytes>::new(64, 1024).unwrap();

    let keys: Vec<Bytes> = (0..64u32)
        .map(|i| Bytes::from(format!("frame:{i:04}").into_bytes()))
        .collect();
    let mut accepted = Vec::new();
    for key in &keys {
        bloom.insert(key);
        if cuckoo.insert(key).is_ok() {
            accepted.push(key.clone());
        }
    }

    for key in &keys {
        assert!(bloom.lookup(key));
    }
    for key in &accepted {
        assert!(cuckoo.lookup(key));
    }
    assert_eq!(cuckoo.num_keys(), accepted.len() as u64);
    assert!(cuckoo.remove(&accepted[0]));
    assert_eq!(bloom.num_keys(), 64);
}

#[test]
fn test_filters_behind_trait_object() {
    let rng = StdRng::seed_from_u64(SEED);
    let mut filters: Vec<Box<dyn MembershipFilter<str>>> = vec![
        Box::new(CuckooFilterLowLoad::<str, _>::with_rng(200, 100, 0.5, rng).unwrap()),
        Box::new(CuckooFilterHighLoad::<str>::new(200, 32, 2).unwrap()),
        Box::new(BloomFilter::<str>::new(200, 4000).unwrap()),
    ];

    let keys = string_keys("shared", 150);
    for filter in filters.iter_mut() {
        let accepted = fill(filter.as_mut(), &keys);
        assert_eq!(filter.num_keys(), accepted.len() as u64);
        assert!(filter.size_in_bytes() > 0);
        assert!(filter.load_factor() > 0.0);
        assert_no_false_negatives(filter.as_ref(), &accepted);
    }
}

#[test]
fn test_invalid_configs_rejected() {
    let zero = CuckooConfig {
        expected_keys: 0,
        ..Default::default()
    };
    assert!(matches!(
        CuckooFilterLowLoad::<str>::from_config(&zero),
        Err(ArborError::InvalidParameter { .. })
    ));
    assert!(CuckooFilterHighLoad::<str>::from_config(&zero).is_err());
    assert!(CuckooFilterLowLoad::<str>::new(10, 10, 1.5).is_err());
    assert!(matches!(
        CuckooFilterLowLoad::<str>::new(1000, 10, 1e-300),
        Err(ArborError::InvalidParameter { .. })
    ));
    assert!(CuckooFilterHighLoad::<str>::new(u64::MAX, 10, 2).is_err());
    assert!(BloomFilter::<str>::new(10, 0).is_err());
}
