use legacyvault::crypto::{decrypt, derive_key_with_params, encrypt, Pbkdf2Params};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_arbitrary_plaintext(
        key in any::<[u8; 32]>(),
        data in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let envelope = encrypt(&key, &data).unwrap();
        prop_assert_eq!(decrypt(&key, &envelope).unwrap(), data);
    }

    #[test]
    fn foreign_key_never_decrypts(
        key in any::<[u8; 32]>(),
        other in any::<[u8; 32]>(),
        data in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(key != other);
        let envelope = encrypt(&key, &data).unwrap();
        prop_assert!(decrypt(&other, &envelope).is_err());
    }

    #[test]
    fn single_bit_flip_is_detected(
        key in any::<[u8; 32]>(),
        data in proptest::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut envelope = encrypt(&key, &data).unwrap();
        let i = position.index(envelope.len());
        envelope[i] ^= 1 << bit;
        prop_assert!(decrypt(&key, &envelope).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn different_passwords_reject_each_other(
        first in "[a-z]{8,16}",
        second in "[a-z]{8,16}",
        salt in any::<[u8; 32]>(),
    ) {
        prop_assume!(first != second);
        let params = Pbkdf2Params { iterations: 10_000 };
        let k1 = derive_key_with_params(first.as_bytes(), &salt, &params).unwrap();
        let k2 = derive_key_with_params(second.as_bytes(), &salt, &params).unwrap();

        let envelope = encrypt(&k1, b"vault_test").unwrap();
        prop_assert!(decrypt(&k2, &envelope).is_err());
    }
}
