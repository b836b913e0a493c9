//! Approximate-membership filters.
//!
//! This crate provides:
//! - A two-bucket cuckoo filter with randomized eviction for light fill ratios
//! - A multi-bucket cuckoo filter with bounded hop chains for heavy fill ratios
//! - A Bloom filter over a packed bit vector
//! - The `MembershipFilter` trait all three implement
//!
//! Keys are anything implementing [`arbor_hash::FilterKey`]. Cuckoo filters
//! store Rabin fingerprints and support removal; the Bloom filter only grows.

mod bloom;
mod cuckoo;
mod filter;

pub use bloom::BloomFilter;
pub use cuckoo::{CuckooFilterHighLoad, CuckooFilterLowLoad};
pub use filter::MembershipFilter;
