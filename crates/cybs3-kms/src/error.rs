//! KMS failure taxonomy.

/// Convenience result alias.
pub type KmsResult<T> = Result<T, KmsError>;

/// Errors surfaced by the KMS service.
///
/// The wire representation (`__type` field and HTTP status) is derived in
/// [`KmsError::wire_type`] and [`KmsError::http_status`]: a lookup, not
/// control flow.
#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    /// The key does not exist.
    #[error("key not found: {key_id}")]
    NotFound {
        /// The missing key ID.
        key_id: String,
    },

    /// The caller is not allowed to use this key.
    #[error("access denied")]
    AccessDenied,

    /// The key exists but does not support the requested usage.
    #[error("invalid key usage: {0}")]
    InvalidKeyUsage(String),

    /// The key is disabled or pending deletion.
    #[error("key unavailable: {key_id}")]
    KeyUnavailable {
        /// The unavailable key ID.
        key_id: String,
    },

    /// The ciphertext blob cannot be decrypted by any candidate key.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// The caller is being throttled.
    #[error("throttled")]
    Throttling,

    /// A grant token was malformed.
    #[error("invalid grant token")]
    InvalidGrantToken,

    /// The key ID is syntactically invalid.
    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    /// Internal failure (keystore I/O, serialization).
    #[error("internal error: {0}")]
    Internal(String),
}

impl KmsError {
    /// The AWS-style `__type` discriminator for the JSON error body.
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundException",
            Self::AccessDenied => "AccessDeniedException",
            Self::InvalidKeyUsage(_) => "InvalidKeyUsageException",
            Self::KeyUnavailable { .. } => "KMSInvalidStateException",
            Self::InvalidCiphertext => "InvalidCiphertextException",
            Self::Throttling => "ThrottlingException",
            Self::InvalidGrantToken => "InvalidGrantTokenException",
            Self::InvalidKeyId(_) => "ValidationException",
            Self::Internal(_) => "KMSInternalException",
        }
    }

    /// The HTTP status for the error response.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::AccessDenied => 403,
            Self::Throttling => 429,
            Self::Internal(_) => 500,
            _ => 400,
        }
    }
}
