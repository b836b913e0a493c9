//! Hash and fingerprint families for the arbor filters.
//!
//! This crate provides:
//! - A seedable 32-bit block hash (MurmurHash3 family, doubled block multiplier)
//! - A polynomial rolling fingerprint over a fixed prime-like modulus
//! - The `FilterKey` byte view shared by both

mod key;
mod murmur;
mod rabin;

pub use key::FilterKey;
pub use murmur::{murmurhash3, MurmurHash3};
pub use rabin::{RabinFingerprint, DEFAULT_BASE, DEFAULT_MODULUS};

#[cfg(test)]
mod proptests;
