//! The per-version object record.

use chrono::{DateTime, Utc};
use cybs3_s3_model::{AccessControlPolicy, ObjectMetadata};

/// Version ID used for objects written while versioning is off or
/// suspended.
pub const NULL_VERSION_ID: &str = "null";

/// One stored object version (or delete marker).
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    /// The object key.
    pub key: String,
    /// The version ID (`"null"` outside enabled versioning).
    pub version_id: String,
    /// Quoted ETag.
    pub etag: String,
    /// Size of the stored bytes (ciphertext size when SSE-KMS applied).
    pub size: u64,
    /// When this version was written.
    pub last_modified: DateTime<Utc>,
    /// Content type, user metadata, tags, SSE fields.
    pub metadata: ObjectMetadata,
    /// This version's ACL.
    pub acl: AccessControlPolicy,
    /// Whether this version is a delete marker.
    pub delete_marker: bool,
    /// Part count when written via multipart upload.
    pub parts_count: Option<u32>,
}

impl ObjectRecord {
    /// A delete marker for `key` with the given version ID.
    #[must_use]
    pub fn delete_marker(
        key: String,
        version_id: String,
        acl: AccessControlPolicy,
    ) -> Self {
        Self {
            key,
            version_id,
            etag: String::new(),
            size: 0,
            last_modified: Utc::now(),
            metadata: ObjectMetadata::default(),
            acl,
            delete_marker: true,
            parts_count: None,
        }
    }
}
