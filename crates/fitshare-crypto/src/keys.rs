//! Device key pairs and the public key codec
//!
//! Each device generates one RSA-OAEP key pair:
//! - The public half is exported as base64 SubjectPublicKeyInfo DER and
//!   registered with the backend so friends can encrypt posts for us
//! - The private half never leaves the device; it is only serialized (PKCS#8)
//!   for the local key store

use crate::{CryptoError, Result};
use base64::Engine;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// Smallest accepted modulus size in bits
pub const MIN_KEY_BITS: usize = 2048;

/// Modulus size used by [`KeyPair::generate`]
///
/// 3072 bits leaves room for 318-byte payloads under OAEP/SHA-256, enough for
/// a serialized post of a couple hundred characters.
pub const DEFAULT_KEY_BITS: usize = 3072;

/// An encryption-only public key
///
/// Produced either locally from a [`KeyPair`] or by importing a friend's
/// exported key. There is intentionally no way to decrypt with it.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
    /// Cached SubjectPublicKeyInfo DER, so export is infallible and deterministic
    der: Vec<u8>,
}

impl PublicKey {
    fn from_rsa(inner: RsaPublicKey) -> Result<Self> {
        let der = inner
            .to_public_key_der()
            .map_err(|e| CryptoError::Serialization(format!("SubjectPublicKeyInfo: {}", e)))?
            .as_bytes()
            .to_vec();
        Ok(Self { inner, der })
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }

    /// Modulus size in bytes, which is also the ciphertext size
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.size() * 8
    }

    /// Get the SubjectPublicKeyInfo DER bytes
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        import_public_key(s)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let encoded = self.to_base64();
        let tail = &encoded[encoded.len().saturating_sub(12)..];
        write!(f, "PublicKey(rsa-{}, ...{})", self.bits(), tail)
    }
}

/// A private key for decrypting feed payloads addressed to this device
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_rsa(self.inner.to_public_key())
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// Serialize as base64 PKCS#8 DER for the local key store
    pub fn to_pkcs8_base64(&self) -> Result<Zeroizing<String>> {
        let document = self
            .inner
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Serialization(format!("PKCS#8: {}", e)))?;
        Ok(Zeroizing::new(
            base64::engine::general_purpose::STANDARD.encode(document.as_bytes()),
        ))
    }

    /// Deserialize from base64 PKCS#8 DER
    pub fn from_pkcs8_base64(s: &str) -> Result<Self> {
        let der = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map_err(|e| CryptoError::MalformedKey(format!("invalid base64: {}", e)))?,
        );
        let inner = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::MalformedKey(format!("invalid PKCS#8 private key: {}", e)))?;
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey(rsa-{}, <redacted>)", self.bits())
    }
}

/// A device key pair
#[derive(Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a new key pair with [`DEFAULT_KEY_BITS`]
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(DEFAULT_KEY_BITS)
    }

    /// Generate a new key pair with the given modulus size
    ///
    /// Nothing is persisted; the caller decides when to store the private half.
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::KeyGeneration(format!(
                "modulus must be at least {} bits, got {}",
                MIN_KEY_BITS, bits
            )));
        }
        ensure_entropy()?;

        let inner = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private_key(PrivateKey { inner })
    }

    /// Rebuild a key pair from a stored private key
    pub fn from_private_key(private: PrivateKey) -> Result<Self> {
        let public = private.public_key()?;
        Ok(Self { public, private })
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Get the private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Split off the private key, dropping the public half
    pub fn into_private_key(self) -> PrivateKey {
        self.private
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// Export a public key as base64 SubjectPublicKeyInfo DER
pub fn export_public_key(key: &PublicKey) -> String {
    key.to_base64()
}

/// Import a base64 SubjectPublicKeyInfo DER public key
///
/// The result can only be used for encryption.
pub fn import_public_key(text: &str) -> Result<PublicKey> {
    let der = base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| CryptoError::MalformedKey(format!("invalid base64: {}", e)))?;
    let inner = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::MalformedKey(format!("invalid SubjectPublicKeyInfo: {}", e)))?;

    let bits = inner.size() * 8;
    if bits < MIN_KEY_BITS {
        return Err(CryptoError::MalformedKey(format!(
            "public key is {} bits, minimum is {}",
            bits, MIN_KEY_BITS
        )));
    }

    Ok(PublicKey { inner, der })
}

/// Fail early with `CryptoUnavailable` when the OS entropy source is missing
fn ensure_entropy() -> Result<()> {
    let mut sample = [0u8; 16];
    getrandom::getrandom(&mut sample).map_err(|e| CryptoError::CryptoUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{alice, bob};

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate_with_bits(MIN_KEY_BITS).unwrap();
        assert_eq!(kp.public_key().bits(), MIN_KEY_BITS);
        assert_ne!(kp.public_key(), alice().public_key());
    }

    #[test]
    fn test_default_key_size() {
        assert_eq!(crate::test_keys::default_sized().public_key().bits(), DEFAULT_KEY_BITS);
    }

    #[test]
    fn test_small_modulus_rejected() {
        let result = KeyPair::generate_with_bits(1024);
        assert!(matches!(result, Err(CryptoError::KeyGeneration(_))));
    }

    #[test]
    fn test_public_key_derivation() {
        let kp = alice();
        let derived = kp.private_key().public_key().unwrap();
        assert_eq!(kp.public_key(), &derived);
    }

    #[test]
    fn test_export_is_deterministic() {
        let kp = alice();
        assert_eq!(export_public_key(kp.public_key()), export_public_key(kp.public_key()));
        assert_ne!(export_public_key(kp.public_key()), export_public_key(bob().public_key()));
    }

    #[test]
    fn test_base64_roundtrip() {
        let kp = alice();
        let encoded = export_public_key(kp.public_key());
        let decoded = import_public_key(&encoded).unwrap();
        assert_eq!(kp.public_key(), &decoded);
        assert_eq!(decoded.as_der(), kp.public_key().as_der());
    }

    #[test]
    fn test_import_invalid_base64() {
        let result = import_public_key("not base64 at all!!");
        assert!(matches!(result, Err(CryptoError::MalformedKey(_))));
    }

    #[test]
    fn test_import_invalid_structure() {
        use base64::Engine;
        let garbage = base64::engine::general_purpose::STANDARD.encode(b"definitely not DER");
        let result = import_public_key(&garbage);
        assert!(matches!(result, Err(CryptoError::MalformedKey(_))));
    }

    #[test]
    fn test_import_truncated_key() {
        let encoded = export_public_key(alice().public_key());
        let truncated = &encoded[..encoded.len() / 2];
        assert!(import_public_key(truncated).is_err());
    }

    #[test]
    fn test_private_key_pkcs8_roundtrip() {
        let kp = alice();
        let stored = kp.private_key().to_pkcs8_base64().unwrap();
        let restored = PrivateKey::from_pkcs8_base64(&stored).unwrap();
        let rebuilt = KeyPair::from_private_key(restored).unwrap();
        assert_eq!(rebuilt.public_key(), kp.public_key());
    }

    #[test]
    fn test_private_key_rejects_public_der() {
        let public = export_public_key(alice().public_key());
        let result = PrivateKey::from_pkcs8_base64(&public);
        assert!(matches!(result, Err(CryptoError::MalformedKey(_))));
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let rendered = format!("{:?}", alice().private_key());
        assert!(rendered.contains("redacted"));
        let stored = alice().private_key().to_pkcs8_base64().unwrap();
        assert!(!rendered.contains(&stored.as_str()[..32]));
    }
}
