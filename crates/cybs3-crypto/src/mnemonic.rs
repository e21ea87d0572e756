//! BIP-39 mnemonic handling and master-key derivation.
//!
//! The mnemonic is the only secret the user ever sees. It is normalized
//! (trimmed, lowercased, whitespace-collapsed), validated against the
//! English wordlist including the checksum, and held only for the duration
//! of an operation.
//!
//! Derivation is the standard BIP-39 seed construction
//! (PBKDF2-HMAC-SHA512, empty passphrase); the master key is the first 32
//! bytes of the 64-byte seed. The same normalized mnemonic always derives
//! the same key, on any machine, in any process.

use bip39::Language;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{KEY_LEN, MasterKey};

/// Valid BIP-39 word counts.
const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// A validated BIP-39 English mnemonic.
///
/// The phrase is zeroized on drop and intentionally carries no `Serialize`
/// implementation: it must never be persisted in plaintext.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    phrase: String,
}

impl Mnemonic {
    /// Parse and validate a mnemonic phrase.
    ///
    /// Input is normalized first: surrounding whitespace trimmed, interior
    /// whitespace collapsed to single spaces, everything lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidMnemonic`] on a bad word count, a word
    /// outside the English wordlist, or a checksum failure.
    pub fn parse(input: &str) -> CryptoResult<Self> {
        let phrase = normalize(input);

        let word_count = phrase.split(' ').filter(|w| !w.is_empty()).count();
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(CryptoError::InvalidMnemonic(format!(
                "expected 12/15/18/21/24 words, got {word_count}"
            )));
        }

        bip39::Mnemonic::parse_in_normalized(Language::English, &phrase)
            .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;

        Ok(Self { phrase })
    }

    /// Generate a fresh random mnemonic with the given word count.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidMnemonic`] for an unsupported word
    /// count.
    pub fn generate(word_count: usize) -> CryptoResult<Self> {
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(CryptoError::InvalidMnemonic(format!(
                "unsupported word count: {word_count}"
            )));
        }

        let inner = bip39::Mnemonic::generate_in(Language::English, word_count)
            .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;

        Ok(Self {
            phrase: inner.to_string(),
        })
    }

    /// Read the mnemonic from the `CYBS3_MNEMONIC` environment variable.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidMnemonic`] when the variable is unset or its
    /// value fails validation.
    pub fn from_env() -> CryptoResult<Self> {
        let phrase = std::env::var("CYBS3_MNEMONIC")
            .map_err(|_| CryptoError::InvalidMnemonic("CYBS3_MNEMONIC is not set".to_owned()))?;
        Self::parse(&phrase)
    }

    /// The normalized phrase.
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Number of words in the phrase.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.phrase.split(' ').count()
    }

    /// Derive the 256-bit master key.
    ///
    /// The BIP-39 seed (PBKDF2-HMAC-SHA512 over the phrase with an empty
    /// passphrase) is computed and its first 32 bytes become the key; the
    /// remainder of the seed is discarded and zeroized.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidMnemonic`] if the stored phrase fails
    /// to re-parse (cannot happen for a value built through [`parse`] or
    /// [`generate`], but the fallible path is kept rather than unwrapped).
    ///
    /// [`parse`]: Self::parse
    /// [`generate`]: Self::generate
    pub fn derive_master_key(&self) -> CryptoResult<MasterKey> {
        let inner = bip39::Mnemonic::parse_in_normalized(Language::English, &self.phrase)
            .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;

        let mut seed = inner.to_seed("");
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&seed[..KEY_LEN]);
        seed.zeroize();

        Ok(MasterKey::from_bytes(key))
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mnemonic({} words)", self.word_count())
    }
}

/// Trim, lowercase, and collapse interior whitespace to single spaces.
fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
