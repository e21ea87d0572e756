//! Wire-level S3 model shared by the server core and the HTTP layer.
//!
//! Holds the things both sides need to agree on: error codes and their
//! HTTP statuses, the ACL grammar (owners, grantees, permissions, canned
//! presets), the bucket-policy JSON model, versioning status, object
//! metadata, and the routed operation set.

pub mod acl;
pub mod error;
pub mod operations;
pub mod policy;
pub mod types;

pub use acl::{AccessControlPolicy, CannedAcl, Grant, Grantee, Owner, Permission};
pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;
pub use policy::{BucketPolicy, Effect, Statement};
pub use types::{ObjectMetadata, VersioningStatus};
