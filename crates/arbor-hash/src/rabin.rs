//! Polynomial rolling fingerprint.
//!
//! `fp = sum(byte[i] * base^i) mod modulus`, with each power computed by
//! binary exponentiation. The exponentiation keeps its running base in a
//! 32-bit register: squaring wraps at 2^32 before it is reduced, and the
//! accumulator product wraps at 2^64. Stored fingerprints depend on those
//! widths, so they are reproduced exactly rather than widened.

use crate::key::FilterKey;
use rand::Rng;

/// Default polynomial base.
pub const DEFAULT_BASE: u32 = 0x101;

/// Default modulus.
pub const DEFAULT_MODULUS: u64 = 0xe8_d4a5_1027;

/// Rabin-style fingerprint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RabinFingerprint {
    base: u32,
    modulus: u64,
}

impl Default for RabinFingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl RabinFingerprint {
    /// Creates a fingerprint with the default base and modulus.
    pub const fn new() -> Self {
        Self {
            base: DEFAULT_BASE,
            modulus: DEFAULT_MODULUS,
        }
    }

    /// Creates a fingerprint with explicit parameters.
    ///
    /// Returns None for a zero modulus.
    pub fn with_params(base: u32, modulus: u64) -> Option<Self> {
        if modulus == 0 {
            return None;
        }
        Some(Self { base, modulus })
    }

    /// Draws a random base and a random modulus in `[2^32, DEFAULT_MODULUS]`.
    ///
    /// Filters keyed this way place the same key differently per instance.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            base: rng.gen_range(2..=u32::MAX),
            modulus: rng.gen_range((1u64 << 32)..=DEFAULT_MODULUS),
        }
    }

    /// Returns the polynomial base.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Returns the modulus.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Fingerprints a raw byte buffer.
    pub fn fingerprint_bytes(&self, data: &[u8]) -> u64 {
        let mut fp = 0u64;
        for (i, &byte) in data.iter().enumerate() {
            let term = (byte as u64).wrapping_mul(mod_exp(self.base, i, self.modulus));
            fp = fp.wrapping_add(term % self.modulus);
            fp %= self.modulus;
        }
        fp
    }

    /// Fingerprints the UTF-8 content of a string.
    #[inline]
    pub fn fingerprint_str(&self, text: &str) -> u64 {
        self.fingerprint_bytes(text.as_bytes())
    }

    /// Fingerprints the big-endian bytes of a 64-bit integer.
    ///
    /// Only the low 32 bits are kept, matching every other integer key.
    #[inline]
    pub fn fingerprint_u64(&self, value: u64) -> u64 {
        self.fingerprint_bytes(&value.to_be_bytes()) as u32 as u64
    }

    /// Fingerprints any filter key through its byte view.
    #[inline]
    pub fn fingerprint_key<K: FilterKey + ?Sized>(&self, key: &K) -> u64 {
        let fp = key.with_bytes(|bytes| self.fingerprint_bytes(bytes));
        if K::NARROW_FINGERPRINT {
            fp as u32 as u64
        } else {
            fp
        }
    }
}

/// Binary exponentiation with a 32-bit base register.
///
/// A base that reduces to zero yields zero for every exponent, including 0.
fn mod_exp(base: u32, mut exp: usize, modulus: u64) -> u64 {
    let mut res = 1u64;
    let mut base = (base as u64 % modulus) as u32;

    if base == 0 {
        return 0;
    }

    while exp > 0 {
        if exp & 1 == 1 {
            res = res.wrapping_mul(base as u64) % modulus;
        }
        exp >>= 1;
        base = (base.wrapping_mul(base) as u64 % modulus) as u32;
    }

    res
}
