//! # FitShare Crypto
//!
//! Cryptographic primitives for FitShare's end-to-end encrypted news feed.
//!
//! This crate provides:
//! - **Key pairs**: per-device RSA-OAEP (SHA-256) key pairs
//! - **Key codec**: base64 SubjectPublicKeyInfo export/import for JSON transport
//! - **Payload cipher**: single-block encryption of short feed payloads
//!
//! ## Security Model
//!
//! - Each device owns one key pair; only the public half is ever exported
//! - Imported (remote) keys are encryption-only: [`PublicKey`] has no decrypt path
//! - Every feed post is encrypted once per recipient, there is no shared ciphertext
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitshare_crypto::{KeyPair, export_public_key, import_public_key, encrypt, decrypt};
//!
//! let keypair = KeyPair::generate()?;
//! let exported = export_public_key(keypair.public_key());
//!
//! // On the author's side, with the exported key fetched from the backend
//! let recipient = import_public_key(&exported)?;
//! let ciphertext = encrypt(&recipient, "Ran 5km this morning")?;
//!
//! // On the recipient's device
//! let plaintext = decrypt(keypair.private_key(), &ciphertext)?;
//! ```

pub mod cipher;
pub mod error;
pub mod keys;

#[cfg(test)]
mod test_keys;

pub use cipher::{decrypt, encrypt, max_plaintext_len};
pub use error::{CryptoError, Result};
pub use keys::{
    export_public_key, import_public_key, KeyPair, PrivateKey, PublicKey, DEFAULT_KEY_BITS,
    MIN_KEY_BITS,
};
