//! 32-bit block hash in the MurmurHash3 family.
//!
//! Input is consumed in 4-byte little-endian blocks, the 0-3 byte tail is
//! folded in with the same block mixing, and the state is finished with the
//! usual avalanche step. Both block multipliers are `0xcc9e2d51`; this differs
//! from canonical MurmurHash3 (whose second multiplier is `0x1b873593`) and
//! must stay that way because filter slot placement depends on it.

use crate::key::FilterKey;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0xcc9e_2d51;
const BLOCK_ROTATION: u32 = 15;
const STATE_ROTATION: u32 = 13;
const STATE_MULTIPLIER: u32 = 5;
const STATE_ADDEND: u32 = 0xe654_6b64;
const FMIX_C1: u32 = 0x85eb_ca6b;
const FMIX_C2: u32 = 0xc2b2_ae35;

/// Hashes `data` with the given seed.
pub fn murmurhash3(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h ^= mix_block(k);
        h = h.rotate_left(STATE_ROTATION);
        h = h.wrapping_mul(STATE_MULTIPLIER).wrapping_add(STATE_ADDEND);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        if tail.len() >= 3 {
            k ^= (tail[2] as u32) << 16;
        }
        if tail.len() >= 2 {
            k ^= (tail[1] as u32) << 8;
        }
        k ^= tail[0] as u32;
        h ^= mix_block(k);
    }

    // Length is folded in as a 32-bit value.
    h ^= data.len() as u32;
    fmix32(h)
}

#[inline(always)]
fn mix_block(k: u32) -> u32 {
    k.wrapping_mul(C1)
        .rotate_left(BLOCK_ROTATION)
        .wrapping_mul(C2)
}

#[inline(always)]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(FMIX_C1);
    h ^= h >> 13;
    h = h.wrapping_mul(FMIX_C2);
    h ^= h >> 16;
    h
}

/// Stateless hasher handle, so filters can hold "a hash family" by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MurmurHash3;

impl MurmurHash3 {
    /// Creates a hasher.
    pub const fn new() -> Self {
        Self
    }

    /// Hashes a raw byte buffer.
    #[inline]
    pub fn hash_bytes(&self, data: &[u8], seed: u32) -> u32 {
        murmurhash3(data, seed)
    }

    /// Hashes the UTF-8 content of a string.
    #[inline]
    pub fn hash_str(&self, text: &str, seed: u32) -> u32 {
        murmurhash3(text.as_bytes(), seed)
    }

    /// Hashes the big-endian bytes of a 64-bit integer.
    #[inline]
    pub fn hash_u64(&self, value: u64, seed: u32) -> u32 {
        murmurhash3(&value.to_be_bytes(), seed)
    }

    /// Hashes any filter key through its byte view.
    #[inline]
    pub fn hash_key<K: FilterKey + ?Sized>(&self, key: &K, seed: u32) -> u32 {
        key.with_bytes(|bytes| murmurhash3(bytes, seed))
    }
}
