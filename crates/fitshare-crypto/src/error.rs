//! Error types for the fitshare-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The platform has no usable entropy source
    #[error("cryptographic provider unavailable: {0}")]
    CryptoUnavailable(String),

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Invalid key encoding or structure
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Ciphertext could not be decrypted with the given key
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Plaintext does not fit in a single encryption block
    #[error("data too large: {size} bytes exceeds maximum {max} bytes")]
    DataTooLarge { size: u64, max: u64 },

    /// Key serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

