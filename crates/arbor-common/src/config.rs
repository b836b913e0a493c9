//! Configuration structures for trees and filters.

use crate::error::{ArborError, Result};
use serde::{Deserialize, Serialize};

/// Smallest minimum degree a multiway tree accepts.
pub const MIN_TREE_DEGREE: usize = 2;

/// Fixed headroom the high-load cuckoo filter adds to its requested capacity.
pub const HIGH_LOAD_HEADROOM: u64 = 7;

/// Largest per-bucket slot count a cuckoo table may be sized to. A slot is at
/// most 16 bytes and a single allocation cannot exceed `isize::MAX` bytes.
pub const MAX_BUCKET_SLOTS: u64 = isize::MAX as u64 / 16;

/// Configuration for B-tree and B+ tree construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Minimum degree `m`. Nodes hold between `m - 1` and `2m - 1` keys.
    pub min_degree: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { min_degree: 3 }
    }
}

impl TreeConfig {
    /// Checks that the degree can form a valid multiway tree.
    pub fn validate(&self) -> Result<()> {
        if self.min_degree < MIN_TREE_DEGREE {
            return Err(ArborError::invalid("min_degree", self.min_degree));
        }
        Ok(())
    }

    /// Maximum number of keys a node may hold.
    pub fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }
}

/// Configuration shared by both cuckoo filter variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuckooConfig {
    /// Number of keys the filter is sized for.
    pub expected_keys: u64,
    /// Maximum eviction hops before an insert is abandoned.
    pub relocation_threshold: u32,
    /// Target fill ratio for the low-load variant, in (0, 1].
    pub load_factor: f64,
    /// Number of parallel buckets for the high-load variant (at least 2).
    pub bucket_count: usize,
}

impl Default for CuckooConfig {
    fn default() -> Self {
        Self {
            expected_keys: 1000,
            relocation_threshold: 500,
            load_factor: 0.25,
            bucket_count: 2,
        }
    }
}

impl CuckooConfig {
    /// Checks the parameters used by the low-load variant.
    pub fn validate_low_load(&self) -> Result<()> {
        self.validate_common()?;
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(ArborError::invalid("load_factor", self.load_factor));
        }
        let slots = (self.expected_keys as f64 / self.load_factor).ceil();
        if !slots.is_finite() || slots > MAX_BUCKET_SLOTS as f64 {
            return Err(ArborError::invalid("load_factor", self.load_factor));
        }
        Ok(())
    }

    /// Checks the parameters used by the high-load variant.
    pub fn validate_high_load(&self) -> Result<()> {
        self.validate_common()?;
        if self.bucket_count < 2 {
            return Err(ArborError::invalid("bucket_count", self.bucket_count));
        }
        match self.expected_keys.checked_add(HIGH_LOAD_HEADROOM) {
            Some(slots) if slots <= MAX_BUCKET_SLOTS => Ok(()),
            _ => Err(ArborError::invalid("expected_keys", self.expected_keys)),
        }
    }

    fn validate_common(&self) -> Result<()> {
        if self.expected_keys == 0 {
            return Err(ArborError::invalid("expected_keys", self.expected_keys));
        }
        if self.relocation_threshold == 0 {
            return Err(ArborError::invalid(
                "relocation_threshold",
                self.relocation_threshold,
            ));
        }
        Ok(())
    }

    /// Slots per bucket for the low-load variant: `ceil(expected_keys / load_factor)`.
    pub fn low_load_slots(&self) -> u64 {
        (self.expected_keys as f64 / self.load_factor).ceil() as u64
    }

    /// Slots per bucket for the high-load variant.
    pub fn high_load_slots(&self) -> u64 {
        self.expected_keys + HIGH_LOAD_HEADROOM
    }
}

/// Configuration for a Bloom filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomConfig {
    /// Number of keys the filter is sized for.
    pub expected_keys: u64,
    /// Number of bits in the filter.
    pub bit_count: u64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            expected_keys: 1000,
            bit_count: 10_000,
        }
    }
}

impl BloomConfig {
    /// Checks that both sizes are non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.expected_keys == 0 {
            return Err(ArborError::invalid("expected_keys", self.expected_keys));
        }
        if self.bit_count == 0 {
            return Err(ArborError::invalid("bit_count", self.bit_count));
        }
        Ok(())
    }

    /// Number of hash functions: `ceil(bit_count * ln 2 / expected_keys)`.
    pub fn hash_count(&self) -> u32 {
        ((self.bit_count as f64 * std::f64::consts::LN_2) / self.expected_keys as f64).ceil()
            as u32
    }
}
