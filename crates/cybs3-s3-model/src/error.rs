//! S3 wire error codes and the service error type.

use std::fmt;

/// Well-known S3 error codes this server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum S3ErrorCode {
    /// Access denied.
    #[default]
    AccessDenied,
    /// The bucket name is taken by another account.
    BucketAlreadyExists,
    /// The bucket already exists and the caller owns it.
    BucketAlreadyOwnedByYou,
    /// The bucket is not empty.
    BucketNotEmpty,
    /// Internal server error.
    InternalError,
    /// The access key ID does not exist.
    InvalidAccessKeyId,
    /// An argument was invalid.
    InvalidArgument,
    /// The bucket name is invalid.
    InvalidBucketName,
    /// A multipart part could not be found or its ETag did not match.
    InvalidPart,
    /// The part list was not in ascending order.
    InvalidPartOrder,
    /// The requested range is not satisfiable.
    InvalidRange,
    /// The request is invalid.
    InvalidRequest,
    /// The request XML is malformed.
    MalformedXML,
    /// The bucket policy JSON is malformed.
    MalformedPolicy,
    /// The HTTP method is not allowed against this resource.
    MethodNotAllowed,
    /// Content-Length is required.
    MissingContentLength,
    /// The bucket does not exist.
    NoSuchBucket,
    /// The bucket has no policy.
    NoSuchBucketPolicy,
    /// The key does not exist.
    NoSuchKey,
    /// The bucket has no lifecycle configuration.
    NoSuchLifecycleConfiguration,
    /// The tag set does not exist.
    NoSuchTagSet,
    /// The multipart upload does not exist.
    NoSuchUpload,
    /// The version does not exist.
    NoSuchVersion,
    /// The requested feature is not implemented.
    NotImplemented,
    /// The signature does not match.
    SignatureDoesNotMatch,
    /// An error code outside the standard set.
    Custom(&'static str),
}

impl S3ErrorCode {
    /// The code as it appears in the XML `<Code>` element.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InternalError => "InternalError",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidPart => "InvalidPart",
            Self::InvalidPartOrder => "InvalidPartOrder",
            Self::InvalidRange => "InvalidRange",
            Self::InvalidRequest => "InvalidRequest",
            Self::MalformedXML => "MalformedXML",
            Self::MalformedPolicy => "MalformedPolicy",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MissingContentLength => "MissingContentLength",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchBucketPolicy => "NoSuchBucketPolicy",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchLifecycleConfiguration => "NoSuchLifecycleConfiguration",
            Self::NoSuchTagSet => "NoSuchTagSet",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::NoSuchVersion => "NoSuchVersion",
            Self::NotImplemented => "NotImplemented",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::Custom(code) => code,
        }
    }

    /// The HTTP status this code is served with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AccessDenied | Self::InvalidAccessKeyId | Self::SignatureDoesNotMatch => 403,
            Self::NoSuchBucket
            | Self::NoSuchBucketPolicy
            | Self::NoSuchKey
            | Self::NoSuchLifecycleConfiguration
            | Self::NoSuchTagSet
            | Self::NoSuchUpload
            | Self::NoSuchVersion => 404,
            Self::BucketAlreadyExists | Self::BucketAlreadyOwnedByYou | Self::BucketNotEmpty => 409,
            Self::MethodNotAllowed => 405,
            Self::InvalidRange => 416,
            Self::MissingContentLength => 411,
            Self::InternalError => 500,
            Self::NotImplemented => 501,
            _ => 400,
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An S3 service error: code, human message, and the resource involved.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct S3Error {
    /// The wire error code.
    pub code: S3ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// The bucket or object the error concerns, if any.
    pub resource: Option<String>,
}

impl S3Error {
    /// Build an error with a message.
    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
        }
    }

    /// Attach the resource the error concerns.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// `NoSuchBucket` for a bucket.
    #[must_use]
    pub fn no_such_bucket(bucket: &str) -> Self {
        Self::with_message(
            S3ErrorCode::NoSuchBucket,
            "The specified bucket does not exist",
        )
        .with_resource(bucket)
    }

    /// `NoSuchKey` for a key.
    #[must_use]
    pub fn no_such_key(key: &str) -> Self {
        Self::with_message(S3ErrorCode::NoSuchKey, "The specified key does not exist")
            .with_resource(key)
    }

    /// `AccessDenied`.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::with_message(S3ErrorCode::AccessDenied, "Access Denied")
    }

    /// `InternalError` with context.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(S3ErrorCode::InternalError, message)
    }

    /// `MethodNotAllowed`.
    #[must_use]
    pub fn method_not_allowed(method: &str) -> Self {
        Self::with_message(
            S3ErrorCode::MethodNotAllowed,
            format!("The method {method} is not allowed against this resource"),
        )
    }

    /// The HTTP status for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}
