//! Shared key fixtures; RSA generation is too slow to repeat in every test

use crate::keys::{KeyPair, DEFAULT_KEY_BITS, MIN_KEY_BITS};
use std::sync::OnceLock;

pub(crate) fn alice() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_with_bits(MIN_KEY_BITS).unwrap())
}

pub(crate) fn bob() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_with_bits(MIN_KEY_BITS).unwrap())
}

pub(crate) fn default_sized() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_with_bits(DEFAULT_KEY_BITS).unwrap())
}
