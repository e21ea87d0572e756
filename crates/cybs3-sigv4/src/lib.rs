//! AWS Signature Version 4 for CybS3.
//!
//! One implementation serves both directions:
//!
//! - [`sign`] produces the `Authorization` header (and the headers that
//!   must accompany it) for outbound client requests, bit-for-bit
//!   compatible with the AWS reference vectors.
//! - [`verify`] checks inbound requests on the server against a
//!   [`CredentialProvider`], using constant-time signature comparison.
//!
//! Both share the canonical-request construction in [`canonical`], which is
//! where all of the encoding and ordering rules live.

pub mod canonical;
pub mod error;
pub mod sign;
pub mod verify;

pub use error::AuthError;
pub use sign::{SigningParams, UNSIGNED_PAYLOAD, hash_payload, sign_request};
pub use verify::{AuthResult, CredentialProvider, StaticCredentialProvider, verify_request};
