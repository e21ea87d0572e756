//! The storage-backend trait the HTTP layer consumes.
//!
//! Everything the wire surface can do is a method here, so alternative
//! backends (disk-backed, remote) can slot in behind the same HTTP stack.
//! [`crate::MemoryBackend`] is the in-process implementation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use cybs3_s3_model::{
    AccessControlPolicy, CannedAcl, ObjectMetadata, S3Error, VersioningStatus,
};

use crate::access::AccessRequest;

/// Parameters of a `PutObject`.
#[derive(Debug, Clone, Default)]
pub struct PutObjectParams {
    /// Content type from the request.
    pub content_type: Option<String>,
    /// User metadata (`x-amz-meta-*`).
    pub user_metadata: std::collections::HashMap<String, String>,
    /// Tags from `x-amz-tagging`.
    pub tags: Vec<(String, String)>,
    /// Canned ACL from `x-amz-acl`.
    pub acl: CannedAcl,
    /// KMS key for SSE-KMS, from
    /// `x-amz-server-side-encryption-aws-kms-key-id`.
    pub sse_kms_key_id: Option<String>,
}

/// Result of a `PutObject` / `CopyObject` / `CompleteMultipartUpload`.
#[derive(Debug, Clone)]
pub struct PutObjectResult {
    /// Quoted ETag.
    pub etag: String,
    /// Version ID when the bucket is versioned.
    pub version_id: Option<String>,
    /// SSE algorithm applied, if any.
    pub sse_algorithm: Option<String>,
    /// KMS key used, if any.
    pub sse_kms_key_id: Option<String>,
}

/// Result of a `GetObject` / `HeadObject`.
#[derive(Debug, Clone)]
pub struct GetObjectResult {
    /// The object body (empty for `HeadObject`).
    pub body: Bytes,
    /// Quoted ETag.
    pub etag: String,
    /// Body size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// The served version.
    pub version_id: Option<String>,
    /// Object metadata.
    pub metadata: ObjectMetadata,
}

/// Result of a `DeleteObject`.
#[derive(Debug, Clone)]
pub struct DeleteObjectResult {
    /// Whether a delete marker was created.
    pub delete_marker: bool,
    /// The version affected or created.
    pub version_id: Option<String>,
}

/// A `ListObjectsV2` query.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsQuery {
    /// Key prefix filter.
    pub prefix: Option<String>,
    /// Delimiter for common-prefix grouping (`/` in practice).
    pub delimiter: Option<String>,
    /// Continuation token (the key to resume after).
    pub continuation_token: Option<String>,
    /// Page size; capped at 1000.
    pub max_keys: Option<u32>,
}

/// One listed object.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Key.
    pub key: String,
    /// Quoted ETag.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Owner ID.
    pub owner_id: String,
}

/// A `ListObjectsV2` page.
#[derive(Debug, Clone)]
pub struct ListObjectsResult {
    /// Objects on this page, in key order.
    pub objects: Vec<ObjectSummary>,
    /// Delimiter-grouped prefixes.
    pub common_prefixes: Vec<String>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Token to fetch the next page.
    pub next_continuation_token: Option<String>,
}

/// One listed version.
#[derive(Debug, Clone)]
pub struct VersionSummary {
    /// Key.
    pub key: String,
    /// Version ID.
    pub version_id: String,
    /// Whether this entry is a delete marker.
    pub is_delete_marker: bool,
    /// Whether this is the key's current version.
    pub is_latest: bool,
    /// Quoted ETag (empty for markers).
    pub etag: String,
    /// Size (zero for markers).
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// A bucket listing entry.
#[derive(Debug, Clone)]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation time.
    pub creation_date: DateTime<Utc>,
    /// Owner ID.
    pub owner_id: String,
}

/// The abstract storage surface.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Evaluate an access request against policies and ACLs.
    async fn check_access(&self, request: &AccessRequest<'_>) -> Result<(), S3Error>;

    // -- buckets --

    /// Create a bucket owned by `principal`.
    async fn create_bucket(
        &self,
        bucket: &str,
        region: Option<&str>,
        principal: &str,
    ) -> Result<(), S3Error>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), S3Error>;

    /// `NoSuchBucket` unless the bucket exists.
    async fn head_bucket(&self, bucket: &str) -> Result<(), S3Error>;

    /// All buckets owned by `principal` (all buckets for the root owner).
    async fn list_buckets(&self, principal: &str) -> Result<Vec<BucketSummary>, S3Error>;

    // -- objects --

    /// Store an object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error>;

    /// Fetch an object (current or explicit version).
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error>;

    /// Fetch object metadata without the body.
    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error>;

    /// Delete an object or one of its versions.
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        principal: &str,
    ) -> Result<DeleteObjectResult, S3Error>;

    /// Server-side copy.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error>;

    /// Paginated listing with delimiter grouping.
    async fn list_objects(
        &self,
        bucket: &str,
        query: ListObjectsQuery,
    ) -> Result<ListObjectsResult, S3Error>;

    /// All versions of all keys (optionally prefix-filtered).
    async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<VersionSummary>, S3Error>;

    // -- multipart --

    /// Start a multipart upload; returns the upload ID.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<String, S3Error>;

    /// Upload one part; returns its ETag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String, S3Error>;

    /// Complete an upload from `(part_number, etag)` pairs.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<(u32, String)>,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error>;

    /// Abort an upload, dropping its parts.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error>;

    // -- bucket configuration --

    /// Versioning status.
    async fn get_versioning(&self, bucket: &str) -> Result<VersioningStatus, S3Error>;

    /// Enable or suspend versioning.
    async fn put_versioning(&self, bucket: &str, status: VersioningStatus) -> Result<(), S3Error>;

    /// Bucket tags.
    async fn get_bucket_tagging(&self, bucket: &str) -> Result<Vec<(String, String)>, S3Error>;

    /// Replace bucket tags.
    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), S3Error>;

    /// Drop bucket tags.
    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), S3Error>;

    /// Lifecycle configuration (JSON form).
    async fn get_lifecycle(&self, bucket: &str) -> Result<serde_json::Value, S3Error>;

    /// Store a lifecycle configuration.
    async fn put_lifecycle(&self, bucket: &str, config: serde_json::Value) -> Result<(), S3Error>;

    /// Drop the lifecycle configuration.
    async fn delete_lifecycle(&self, bucket: &str) -> Result<(), S3Error>;

    /// Notification configuration (JSON form).
    async fn get_notification(&self, bucket: &str) -> Result<serde_json::Value, S3Error>;

    /// Store a notification configuration.
    async fn put_notification(
        &self,
        bucket: &str,
        config: serde_json::Value,
    ) -> Result<(), S3Error>;

    /// The bucket policy document.
    async fn get_bucket_policy(&self, bucket: &str) -> Result<String, S3Error>;

    /// Parse and store a bucket policy.
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> Result<(), S3Error>;

    /// Drop the bucket policy.
    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), S3Error>;

    /// The bucket ACL.
    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy, S3Error>;

    /// Replace the bucket ACL.
    async fn put_bucket_acl(&self, bucket: &str, acl: AccessControlPolicy) -> Result<(), S3Error>;

    /// An object's ACL.
    async fn get_object_acl(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<AccessControlPolicy, S3Error>;

    /// Replace an object's ACL.
    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: AccessControlPolicy,
    ) -> Result<(), S3Error>;

    /// Restrict the bucket to VPC access.
    async fn put_vpc_config(&self, bucket: &str, vpc_only: bool) -> Result<(), S3Error>;
}
