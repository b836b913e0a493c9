use super::*;

use proptest::prelude::*;

proptest! {
    #[test]
    fn hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..64), seed in any::<u32>()) {
        prop_assert_eq!(murmurhash3(&data, seed), murmurhash3(&data, seed));
    }

    #[test]
    fn hash_overloads_agree(text in ".{0,32}", seed in any::<u32>()) {
        let hasher = MurmurHash3::new();
        let expected = hasher.hash_bytes(text.as_bytes(), seed);
        prop_assert_eq!(hasher.hash_str(&text, seed), expected);
        prop_assert_eq!(hasher.hash_key(text.as_str(), seed), expected);
        prop_assert_eq!(hasher.hash_key(&text.clone().into_bytes(), seed), expected);
    }

    #[test]
    fn integer_keys_hash_big_endian(value in any::<u64>(), seed in any::<u32>()) {
        let hasher = MurmurHash3::new();
        prop_assert_eq!(hasher.hash_key(&value, seed), hasher.hash_bytes(&value.to_be_bytes(), seed));
        prop_assert_eq!(hasher.hash_u64(value, seed), hasher.hash_bytes(&value.to_be_bytes(), seed));
    }

    #[test]
    fn fingerprint_is_deterministic_and_bounded(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let rf = RabinFingerprint::new();
        let fp = rf.fingerprint_bytes(&data);
        prop_assert_eq!(fp, rf.fingerprint_bytes(&data));
        prop_assert!(fp < DEFAULT_MODULUS);
    }

    #[test]
    fn integer_fingerprint_fits_in_32_bits(value in any::<u64>()) {
        let rf = RabinFingerprint::new();
        let fp = rf.fingerprint_key(&value);
        prop_assert!(fp <= u32::MAX as u64);
        prop_assert_eq!(fp, rf.fingerprint_u64(value));
    }

    #[test]
    fn short_inputs_match_exact_polynomial(data in proptest::collection::vec(any::<u8>(), 0..4)) {
        // Below index 4 no power of the base overflows its register.
        let rf = RabinFingerprint::new();
        let exact = data
            .iter()
            .enumerate()
            .map(|(i, &b)| b as u64 * (DEFAULT_BASE as u64).pow(i as u32))
            .sum::<u64>()
            % DEFAULT_MODULUS;
        prop_assert_eq!(rf.fingerprint_bytes(&data), exact);
    }
}
