//! Payload cipher for feed posts
//!
//! Implements RSA-OAEP with SHA-256 over a single block:
//! - Plaintext is UTF-8 encoded and must fit in one block (no chunking)
//! - Ciphertext is base64 encoded for JSON transport
//! - Encryption is randomized, the same post encrypts differently every time

use crate::{
    keys::{PrivateKey, PublicKey},
    CryptoError, Result,
};
use base64::Engine;
use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;

/// SHA-256 output length used by the OAEP padding
const HASH_LEN: usize = 32;

/// Largest plaintext (in bytes) that fits in one block for the given key
pub fn max_plaintext_len(key: &PublicKey) -> usize {
    key.size().saturating_sub(2 * HASH_LEN + 2)
}

/// Encrypt a plaintext payload for the holder of `key`
pub fn encrypt(key: &PublicKey, plaintext: &str) -> Result<String> {
    let bytes = plaintext.as_bytes();
    let max = max_plaintext_len(key);
    if bytes.len() > max {
        return Err(CryptoError::DataTooLarge {
            size: bytes.len() as u64,
            max: max as u64,
        });
    }

    let ciphertext = key
        .as_rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), bytes)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(ciphertext))
}

/// Decrypt a base64 ciphertext with the local private key
pub fn decrypt(key: &PrivateKey, ciphertext: &str) -> Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {}", e)))?;

    // Padding failures are reported uniformly
    let plaintext = key
        .as_rsa()
        .decrypt(Oaep::new::<Sha256>(), &bytes)
        .map_err(|_| CryptoError::DecryptionFailed("ciphertext does not match this key".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::DecryptionFailed("plaintext is not valid UTF-8".to_string()))
}
