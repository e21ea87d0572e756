//! Client-side error taxonomy.
//!
//! [`ClientError`] is the single error type surfaced by the CybS3 client
//! stack. Each variant belongs to one of the taxonomy groups
//! (authentication, resource, configuration, crypto, transport, protocol,
//! user), and two classification methods drive behavior elsewhere:
//!
//! - [`ClientError::is_retryable`] feeds the retry loop: only transport-class
//!   failures (network errors, HTTP 5xx/429/408) are retried. Crypto and
//!   authorization failures are terminal; a retry cannot recover a bad key
//!   or a denied request.
//! - [`ClientError::exit_code`] maps the error group to the process exit
//!   code reported by command-line frontends.

use std::time::Duration;

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced by the CybS3 client stack.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // -----------------------------------------------------------------------
    // Authentication / authorization
    // -----------------------------------------------------------------------
    /// The access key or signature was rejected by the server.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The server denied access to a resource.
    #[error("access denied{}", .resource.as_deref().map(|r| format!(" to {r}")).unwrap_or_default())]
    AccessDenied {
        /// The resource the request targeted, when known.
        resource: Option<String>,
    },

    // -----------------------------------------------------------------------
    // Resource
    // -----------------------------------------------------------------------
    /// The specified bucket does not exist.
    #[error("bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The missing bucket name.
        bucket: String,
    },

    /// The specified key does not exist.
    #[error("key does not exist: {key}")]
    NoSuchKey {
        /// The missing object key.
        key: String,
    },

    /// The bucket cannot be deleted because it still contains objects.
    #[error("bucket is not empty: {bucket}")]
    BucketNotEmpty {
        /// The non-empty bucket name.
        bucket: String,
    },

    /// No vault with the given name exists in the configuration.
    #[error("vault not found: {name}")]
    VaultNotFound {
        /// The missing vault name.
        name: String,
    },

    /// A vault with the given name already exists.
    #[error("vault already exists: {name}")]
    VaultAlreadyExists {
        /// The duplicate vault name.
        name: String,
    },

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    /// The configuration file does not exist.
    #[error("configuration not found")]
    ConfigurationNotFound,

    /// The configuration file failed integrity verification or parsing.
    #[error("configuration corrupted: {reason}")]
    ConfigurationCorrupted {
        /// What went wrong while reading the configuration.
        reason: String,
    },

    /// The configuration file was written by a newer version.
    #[error("unsupported configuration version: {0}")]
    UnsupportedVersion(u32),

    // -----------------------------------------------------------------------
    // Crypto
    // -----------------------------------------------------------------------
    /// Authenticated decryption failed (wrong key or corrupted data).
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Deriving a key from the mnemonic failed.
    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed {
        /// Why derivation failed (e.g. invalid word, bad checksum).
        reason: String,
    },

    /// The ciphertext structure is invalid (truncated or malformed framing).
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    // -----------------------------------------------------------------------
    // Transport / protocol
    // -----------------------------------------------------------------------
    /// A network-level failure (connect, DNS, broken stream).
    #[error("transport error: {0}")]
    Transport(String),

    /// An HTTP error status without a recognized S3 error code.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// The server response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A per-operation deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// The circuit breaker is open for this endpoint.
    #[error("circuit open, retry in {retry_after:?}")]
    CircuitOpen {
        /// How long until the breaker will allow a probe.
        retry_after: Duration,
    },

    // -----------------------------------------------------------------------
    // User
    // -----------------------------------------------------------------------
    /// The user cancelled the operation.
    #[error("cancelled by user")]
    UserCancelled,

    /// User-supplied input was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation was aborted.
    #[error("operation aborted")]
    OperationAborted,

    /// Internal error with context.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether a retry at the request boundary may succeed.
    ///
    /// Transport failures and HTTP 5xx/429/408 are retryable; everything
    /// else is terminal for the current attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::HttpStatus(status) => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }

    /// The process exit code for command-line frontends.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigurationNotFound
            | Self::ConfigurationCorrupted { .. }
            | Self::UnsupportedVersion(_) => 100,
            Self::InvalidCredentials | Self::AccessDenied { .. } => 101,
            Self::KeyDerivationFailed { .. } => 102,
            Self::VaultNotFound { .. } | Self::VaultAlreadyExists { .. } => 103,
            Self::NoSuchBucket { .. }
            | Self::NoSuchKey { .. }
            | Self::BucketNotEmpty { .. }
            | Self::Transport(_)
            | Self::HttpStatus(_)
            | Self::InvalidResponse(_)
            | Self::Timeout
            | Self::CircuitOpen { .. } => 104,
            Self::DecryptionFailed | Self::EncryptionFailed | Self::InvalidCiphertext => 106,
            Self::UserCancelled | Self::InvalidInput(_) | Self::OperationAborted => 107,
            Self::Internal(_) => 1,
        }
    }
}

/// Map an S3 wire error code (from an XML `<Error><Code>` element) to a
/// [`ClientError`].
///
/// Unrecognized codes fall back to [`ClientError::HttpStatus`] with the
/// response status so that retryability is still decided correctly.
#[must_use]
pub fn from_s3_code(code: &str, status: u16, bucket: &str, key: Option<&str>) -> ClientError {
    match code {
        "AccessDenied" => ClientError::AccessDenied {
            resource: Some(key.map_or_else(|| bucket.to_owned(), |k| format!("{bucket}/{k}"))),
        },
        "NoSuchBucket" => ClientError::NoSuchBucket {
            bucket: bucket.to_owned(),
        },
        "NoSuchKey" => ClientError::NoSuchKey {
            key: key.unwrap_or_default().to_owned(),
        },
        "BucketNotEmpty" => ClientError::BucketNotEmpty {
            bucket: bucket.to_owned(),
        },
        "InvalidAccessKeyId" | "SignatureDoesNotMatch" => ClientError::InvalidCredentials,
        _ => ClientError::HttpStatus(status),
    }
}
