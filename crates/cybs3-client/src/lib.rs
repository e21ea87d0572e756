//! The CybS3 client: SigV4 signing, transparent client-side encryption,
//! and resilience, over plain HTTP.
//!
//! Uploads run caller bytes through the chunked AEAD pipeline
//! ([`cybs3_crypto::EncryptStream`]) and sign the request with
//! `UNSIGNED-PAYLOAD`; downloads invert through
//! [`cybs3_crypto::DecryptStream`]. Every exchange passes the endpoint's
//! circuit breaker, and buffered exchanges additionally retry with
//! exponential backoff.

pub mod client;
pub mod vault;
pub mod wire;

pub use client::{ObjectEntry, ObjectInfo, S3Client, S3ClientConfig};
pub use vault::{EffectiveSettings, EnvSettings, Overrides, resolve};
