//! Key material types and the AEAD / HMAC primitives built on them.
//!
//! Both key types hold exactly 256 bits and zeroize themselves on drop.
//! The [`MasterKey`] is derived from the user's mnemonic and only ever
//! exists transiently: it seals the configuration file and authenticates it
//! with HMAC-SHA256. The [`DataKey`] is random, lives encrypted inside the
//! configuration, and encrypts every object body.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use hmac::{Hmac, Mac};
use hmac::KeyInit as _;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Symmetric key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// MasterKey
// ---------------------------------------------------------------------------

/// The 256-bit key derived from the user's mnemonic.
///
/// Never persisted; wraps the configuration file at rest.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

// ---------------------------------------------------------------------------
// DataKey
// ---------------------------------------------------------------------------

/// The 256-bit key that encrypts object bodies.
///
/// Generated once at configuration creation and persisted only inside the
/// sealed configuration file. Rotating the mnemonic re-wraps this key but
/// never changes it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Generate a fresh random data key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey(***)")
    }
}

// ---------------------------------------------------------------------------
// AEAD primitives
// ---------------------------------------------------------------------------

/// Seal `plaintext` with AES-256-GCM under `key`, returning
/// `nonce(12) ‖ ciphertext ‖ tag(16)` with a fresh random nonce.
///
/// # Errors
///
/// Returns [`CryptoError::EncryptionFailed`] if the cipher rejects the
/// input (plaintext larger than the AES-GCM limit).
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload::from(plaintext))
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a `nonce(12) ‖ ciphertext ‖ tag(16)` blob sealed by [`seal`].
///
/// # Errors
///
/// - [`CryptoError::InvalidCiphertext`] if the blob is shorter than the
///   fixed overhead.
/// - [`CryptoError::DecryptionFailed`] on tag mismatch (wrong key or
///   tampered bytes).
pub fn open(key: &[u8; KEY_LEN], blob: &[u8]) -> CryptoResult<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidCiphertext(
            "blob shorter than nonce + tag",
        ));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), Payload::from(ciphertext))
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Compute HMAC-SHA256 over `data` under `key`.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify an HMAC-SHA256 tag in constant time (via the `Mac` trait).
#[must_use]
pub fn hmac_verify(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_LEN] {
        [7u8; KEY_LEN]
    }

    #[test]
    fn test_should_roundtrip_seal_open() {
        let key = test_key();
        let plaintext = b"attack at dawn";
        let blob = seal(&key, plaintext).expect("seal");
        assert_eq!(blob.len(), plaintext.len() + NONCE_LEN + TAG_LEN);

        let opened = open(&key, &blob).expect("open");
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_should_fail_open_with_wrong_key() {
        let blob = seal(&test_key(), b"secret").expect("seal");
        let wrong = [8u8; KEY_LEN];
        assert!(matches!(
            open(&wrong, &blob),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_should_fail_open_on_tampered_ciphertext() {
        let key = test_key();
        let mut blob = seal(&key, b"secret").expect("seal");
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(matches!(
            open(&key, &blob),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_should_reject_truncated_blob() {
        let key = test_key();
        assert!(matches!(
            open(&key, &[0u8; NONCE_LEN + TAG_LEN - 1]),
            Err(CryptoError::InvalidCiphertext(_))
        ));
    }

    #[test]
    fn test_should_use_fresh_nonce_per_seal() {
        let key = test_key();
        let a = seal(&key, b"same input").expect("seal a");
        let b = seal(&key, b"same input").expect("seal b");
        assert_ne!(a, b, "two seals of the same plaintext must differ");
        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN], "nonces must be fresh");
    }

    #[test]
    fn test_should_seal_empty_plaintext() {
        let key = test_key();
        let blob = seal(&key, b"").expect("seal");
        assert_eq!(blob.len(), NONCE_LEN + TAG_LEN);
        assert_eq!(open(&key, &blob).expect("open"), Vec::<u8>::new());
    }

    #[test]
    fn test_should_verify_hmac() {
        let tag = hmac_sha256(b"key", b"message");
        assert!(hmac_verify(b"key", b"message", &tag));
        assert!(!hmac_verify(b"key", b"other message", &tag));
        assert!(!hmac_verify(b"other key", b"message", &tag));
    }

    #[test]
    fn test_should_generate_distinct_data_keys() {
        let a = DataKey::generate();
        let b = DataKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_should_redact_keys_in_debug() {
        let dk = DataKey::generate();
        assert_eq!(format!("{dk:?}"), "DataKey(***)");
        let mk = MasterKey::from_bytes([1u8; KEY_LEN]);
        assert_eq!(format!("{mk:?}"), "MasterKey(***)");
    }
}
