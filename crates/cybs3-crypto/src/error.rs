//! Crypto and configuration-store error types.

/// Convenience result alias.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from key derivation, AEAD operations, the streaming pipeline,
/// and the encrypted configuration store.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The mnemonic failed validation (word count, unknown word, checksum).
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Authenticated decryption failed: wrong key or tampered ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The ciphertext framing is structurally invalid (truncated chunk,
    /// frame shorter than the nonce + tag overhead).
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(&'static str),

    /// The configuration file was written by a newer version of the format.
    #[error("unsupported configuration version: {0}")]
    UnsupportedVersion(u32),

    /// The configuration file exists but cannot be interpreted.
    #[error("configuration corrupted: {0}")]
    Corrupted(String),

    /// An error propagated from the upstream byte source of a streaming
    /// pipeline (e.g. the HTTP transport during a download).
    #[error("upstream stream error: {0}")]
    Upstream(String),

    /// Filesystem I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_invalid_ciphertext() {
        let err = CryptoError::InvalidCiphertext("final chunk shorter than overhead");
        assert!(err.to_string().contains("final chunk"));
    }

    #[test]
    fn test_should_convert_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CryptoError = io.into();
        assert!(matches!(err, CryptoError::Io(_)));
    }
}
