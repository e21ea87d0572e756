//! S3 server core for CybS3.
//!
//! # Architecture
//!
//! ```text
//! HTTP layer (routing, XML, SigV4)
//!        |
//!        v
//! StorageBackend trait  <- the seam the HTTP layer consumes
//!        |
//!        v
//!   MemoryBackend
//!     |        \
//!     v         v
//! S3ServiceState  BlobStore        (metadata)   (object bytes)
//!     |
//!     v
//! access::evaluate                 (policy + ACL decision engine)
//! ```
//!
//! The access-control engine is a pure function over the state; SSE-KMS
//! envelope encryption is applied by the backend through a
//! [`cybs3_kms::KmsService`] handle when a put requests it.

pub mod access;
pub mod backend;
pub mod blob;
pub mod checksums;
pub mod state;
pub mod storage;

pub use access::AccessRequest;
pub use backend::MemoryBackend;
pub use storage::{
    BucketSummary, DeleteObjectResult, GetObjectResult, ListObjectsQuery, ListObjectsResult,
    ObjectSummary, PutObjectParams, PutObjectResult, StorageBackend, VersionSummary,
};
