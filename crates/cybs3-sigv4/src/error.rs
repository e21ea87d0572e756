//! Authentication error type shared by signing and verification.

/// Errors from SigV4 processing.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request has no `Authorization` header.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header does not parse as SigV4.
    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    /// The algorithm is not `AWS4-HMAC-SHA256`.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The credential scope is malformed.
    #[error("invalid credential scope")]
    InvalidCredential,

    /// The access key ID is not known to the credential provider.
    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    /// A header listed in SignedHeaders is absent from the request.
    #[error("missing signed header: {0}")]
    MissingHeader(String),

    /// The computed signature does not match the provided one.
    #[error("signature does not match")]
    SignatureDoesNotMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_errors() {
        assert_eq!(
            AuthError::MissingHeader("x-amz-date".to_owned()).to_string(),
            "missing signed header: x-amz-date"
        );
        assert_eq!(
            AuthError::SignatureDoesNotMatch.to_string(),
            "signature does not match"
        );
    }
}
