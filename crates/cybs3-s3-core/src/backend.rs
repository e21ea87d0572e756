//! The in-memory storage backend.
//!
//! [`MemoryBackend`] wires the metadata state, the blob store, the access
//! engine, and (optionally) a KMS handle into one [`StorageBackend`]
//! implementation. SSE-KMS puts envelope-encrypt the body through the KMS
//! service before it reaches the blob store; gets invert that
//! transparently.
//!
//! `complete_multipart_upload` assembles the parts first and only then
//! swaps the finished record into the object store under the bucket's
//! object lock, so a concurrent reader observes either the old object or
//! the completed one, never a partial concatenation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use cybs3_kms::KmsService;
use cybs3_s3_model::{
    AccessControlPolicy, ObjectMetadata, Owner, S3Error, S3ErrorCode, VersioningStatus,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::{self, AccessRequest};
use crate::blob::BlobStore;
use crate::checksums;
use crate::state::multipart::{MAX_PART_NUMBER, MultipartUpload, UploadPart};
use crate::state::object::{NULL_VERSION_ID, ObjectRecord};
use crate::state::{S3Bucket, S3ServiceState};
use crate::storage::{
    BucketSummary, DeleteObjectResult, GetObjectResult, ListObjectsQuery, ListObjectsResult,
    ObjectSummary, PutObjectParams, PutObjectResult, StorageBackend, VersionSummary,
};

/// Hard cap S3 applies to `max-keys`.
const MAX_KEYS_CAP: u32 = 1000;

/// In-memory backend over [`S3ServiceState`] and [`BlobStore`].
pub struct MemoryBackend {
    state: S3ServiceState,
    blobs: BlobStore,
    kms: Option<Arc<KmsService>>,
    region: String,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("state", &self.state)
            .field("region", &self.region)
            .field("kms", &self.kms.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// A backend without SSE-KMS support.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            state: S3ServiceState::new(),
            blobs: BlobStore::new(),
            kms: None,
            region: region.into(),
        }
    }

    /// Attach a KMS service for SSE-KMS puts.
    #[must_use]
    pub fn with_kms(mut self, kms: Arc<KmsService>) -> Self {
        self.kms = Some(kms);
        self
    }

    /// The underlying metadata state (used by tests and the access layer).
    #[must_use]
    pub fn state(&self) -> &S3ServiceState {
        &self.state
    }

    /// Envelope-encrypt a body if the put requested SSE-KMS.
    async fn maybe_seal(
        &self,
        body: Bytes,
        sse_kms_key_id: Option<&str>,
    ) -> Result<(Bytes, Option<String>), S3Error> {
        let Some(key_id) = sse_kms_key_id else {
            return Ok((body, None));
        };
        let kms = self.kms.as_ref().ok_or_else(|| {
            S3Error::with_message(
                S3ErrorCode::InvalidArgument,
                "server-side encryption requested but no KMS service is configured",
            )
        })?;
        let sealed = kms
            .encrypt_raw(key_id, &body)
            .await
            .map_err(|e| S3Error::internal(format!("KMS encryption failed: {e}")))?;
        Ok((Bytes::from(sealed), Some(key_id.to_owned())))
    }

    /// Invert [`Self::maybe_seal`] on reads.
    async fn maybe_open(
        &self,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> Result<Bytes, S3Error> {
        let Some(key_id) = metadata.sse_kms_key_id.as_deref() else {
            return Ok(body);
        };
        let kms = self.kms.as_ref().ok_or_else(|| {
            S3Error::internal("object is KMS-encrypted but no KMS service is configured")
        })?;
        let opened = kms
            .decrypt_raw(key_id, &body)
            .await
            .map_err(|e| S3Error::internal(format!("KMS decryption failed: {e}")))?;
        Ok(Bytes::from(opened))
    }

    /// Pick the version ID for a new write in `bucket`.
    fn new_version_id(bucket: &S3Bucket) -> String {
        match bucket.versioning_status() {
            VersioningStatus::Enabled => Uuid::new_v4().to_string(),
            VersioningStatus::Unversioned | VersioningStatus::Suspended => {
                NULL_VERSION_ID.to_owned()
            }
        }
    }

    fn record_from_put(
        key: &str,
        version_id: String,
        etag: String,
        size: u64,
        params: &PutObjectParams,
        sse_kms_key_id: Option<String>,
        owner: Owner,
        bucket_owner: &Owner,
        parts_count: Option<u32>,
    ) -> ObjectRecord {
        let metadata = ObjectMetadata {
            content_type: params.content_type.clone(),
            user_metadata: params.user_metadata.clone(),
            tags: params.tags.clone(),
            sse_algorithm: sse_kms_key_id.as_ref().map(|_| "aws:kms".to_owned()),
            sse_kms_key_id,
        };
        ObjectRecord {
            key: key.to_owned(),
            version_id,
            etag,
            size,
            last_modified: Utc::now(),
            metadata,
            acl: params.acl.expand(owner, Some(bucket_owner)),
            delete_marker: false,
            parts_count,
        }
    }

    fn get_result(record: &ObjectRecord, body: Bytes) -> GetObjectResult {
        GetObjectResult {
            body,
            etag: record.etag.clone(),
            size: record.size,
            last_modified: record.last_modified,
            version_id: (record.version_id != NULL_VERSION_ID)
                .then(|| record.version_id.clone()),
            metadata: record.metadata.clone(),
        }
    }

    fn find_record(
        bucket: &S3Bucket,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<ObjectRecord, S3Error> {
        let objects = bucket.objects.read();
        let record = match version_id {
            Some(version) => objects.version(key, version).ok_or_else(|| {
                S3Error::with_message(
                    S3ErrorCode::NoSuchVersion,
                    "The specified version does not exist",
                )
                .with_resource(key)
            })?,
            None => objects
                .current(key)
                .ok_or_else(|| S3Error::no_such_key(key))?,
        };
        if record.delete_marker {
            return Err(S3Error::no_such_key(key));
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn check_access(&self, request: &AccessRequest<'_>) -> Result<(), S3Error> {
        access::evaluate(&self.state, request)
    }

    // -- buckets --

    async fn create_bucket(
        &self,
        bucket: &str,
        region: Option<&str>,
        principal: &str,
    ) -> Result<(), S3Error> {
        validate_bucket_name(bucket)?;
        let region = region.unwrap_or(self.region.as_str());
        self.state
            .create_bucket(bucket, region, Owner::new(principal))
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), S3Error> {
        self.state.delete_bucket(bucket)?;
        self.blobs.drop_bucket(bucket);
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), S3Error> {
        self.state.bucket(bucket).map(|_| ())
    }

    async fn list_buckets(&self, principal: &str) -> Result<Vec<BucketSummary>, S3Error> {
        Ok(self
            .state
            .list_buckets()
            .into_iter()
            .filter(|(_, _, owner_id)| owner_id == principal)
            .map(|(name, creation_date, owner_id)| BucketSummary {
                name,
                creation_date,
                owner_id,
            })
            .collect())
    }

    // -- objects --

    async fn put_object(
        &self,
        bucket_name: &str,
        key: &str,
        body: Bytes,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error> {
        let (stored, sse_kms_key_id) =
            self.maybe_seal(body, params.sse_kms_key_id.as_deref()).await?;

        let bucket = self.state.bucket(bucket_name)?;
        let version_id = Self::new_version_id(&bucket);
        let etag = checksums::compute_etag(&stored);

        let record = Self::record_from_put(
            key,
            version_id.clone(),
            etag.clone(),
            stored.len() as u64,
            &params,
            sse_kms_key_id.clone(),
            Owner::new(principal),
            &bucket.owner,
            None,
        );

        self.blobs.write_object(bucket_name, key, &version_id, stored);
        bucket.objects.write().put(record);

        debug!(bucket = bucket_name, key, version_id, "object stored");
        Ok(PutObjectResult {
            etag,
            version_id: (version_id != NULL_VERSION_ID).then_some(version_id),
            sse_algorithm: sse_kms_key_id.as_ref().map(|_| "aws:kms".to_owned()),
            sse_kms_key_id,
        })
    }

    async fn get_object(
        &self,
        bucket_name: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        let record = {
            let bucket = self.state.bucket(bucket_name)?;
            Self::find_record(&bucket, key, version_id)?
        };

        let body = self
            .blobs
            .read_object(bucket_name, key, &record.version_id)
            .ok_or_else(|| S3Error::internal("object metadata present but bytes missing"))?;
        let body = self.maybe_open(body, &record.metadata).await?;

        let mut result = Self::get_result(&record, body);
        // The wire size is the plaintext size after SSE-KMS unwrapping.
        result.size = result.body.len() as u64;
        Ok(result)
    }

    async fn head_object(
        &self,
        bucket_name: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        let bucket = self.state.bucket(bucket_name)?;
        let record = Self::find_record(&bucket, key, version_id)?;
        Ok(Self::get_result(&record, Bytes::new()))
    }

    async fn delete_object(
        &self,
        bucket_name: &str,
        key: &str,
        version_id: Option<&str>,
        principal: &str,
    ) -> Result<DeleteObjectResult, S3Error> {
        let bucket = self.state.bucket(bucket_name)?;

        // Explicit version deletion removes that version outright.
        if let Some(version) = version_id {
            let removed = bucket.objects.write().remove_version(key, version);
            if let Some(removed) = removed {
                self.blobs.delete_object(bucket_name, key, &removed.version_id);
                return Ok(DeleteObjectResult {
                    delete_marker: removed.delete_marker,
                    version_id: Some(version.to_owned()),
                });
            }
            return Ok(DeleteObjectResult {
                delete_marker: false,
                version_id: Some(version.to_owned()),
            });
        }

        match bucket.versioning_status() {
            VersioningStatus::Enabled => {
                // Insert a delete marker instead of removing data.
                let marker_version = Uuid::new_v4().to_string();
                let acl = AccessControlPolicy::private(Owner::new(principal));
                bucket.objects.write().put(ObjectRecord::delete_marker(
                    key.to_owned(),
                    marker_version.clone(),
                    acl,
                ));
                debug!(bucket = bucket_name, key, marker_version, "delete marker created");
                Ok(DeleteObjectResult {
                    delete_marker: true,
                    version_id: Some(marker_version),
                })
            }
            VersioningStatus::Unversioned | VersioningStatus::Suspended => {
                let removed = bucket.objects.write().remove_current(key);
                if let Some(removed) = removed {
                    self.blobs.delete_object(bucket_name, key, &removed.version_id);
                }
                Ok(DeleteObjectResult {
                    delete_marker: false,
                    version_id: None,
                })
            }
        }
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error> {
        let source = self.get_object(src_bucket, src_key, None).await?;

        // Copy carries the source metadata unless the caller overrode it.
        let mut params = params;
        if params.content_type.is_none() {
            params.content_type = source.metadata.content_type.clone();
        }
        if params.user_metadata.is_empty() {
            params.user_metadata = source.metadata.user_metadata.clone();
        }

        self.put_object(dst_bucket, dst_key, source.body, params, principal)
            .await
    }

    async fn list_objects(
        &self,
        bucket_name: &str,
        query: ListObjectsQuery,
    ) -> Result<ListObjectsResult, S3Error> {
        let bucket = self.state.bucket(bucket_name)?;
        let objects = bucket.objects.read();

        let prefix = query.prefix.as_deref().unwrap_or("");
        let max_keys = query.max_keys.unwrap_or(MAX_KEYS_CAP).min(MAX_KEYS_CAP) as usize;

        // First pass: fold current records into listing entries in key
        // order. A delimiter groups every key that continues past it into
        // one common-prefix entry whose resume position is the group's
        // last member key, so a page break never splits a group.
        enum Entry {
            Object(ObjectSummary),
            Prefix {
                group: String,
                resume_key: String,
            },
        }

        let mut entries: Vec<Entry> = Vec::new();
        for record in objects.current_records() {
            if !record.key.starts_with(prefix) {
                continue;
            }

            if let Some(delimiter) = query.delimiter.as_deref() {
                if let Some(pos) = record.key[prefix.len()..].find(delimiter) {
                    let group = record.key[..prefix.len() + pos + delimiter.len()].to_owned();
                    if let Some(Entry::Prefix {
                        group: last_group,
                        resume_key,
                    }) = entries.last_mut()
                    {
                        if *last_group == group {
                            resume_key.clone_from(&record.key);
                            continue;
                        }
                    }
                    entries.push(Entry::Prefix {
                        group,
                        resume_key: record.key.clone(),
                    });
                    continue;
                }
            }

            entries.push(Entry::Object(ObjectSummary {
                key: record.key.clone(),
                etag: record.etag.clone(),
                size: record.size,
                last_modified: record.last_modified,
                owner_id: record.acl.owner.id.clone(),
            }));
        }

        // Second pass: apply the continuation token and the page size.
        let resume_key_of = |entry: &Entry| -> String {
            match entry {
                Entry::Object(summary) => summary.key.clone(),
                Entry::Prefix { resume_key, .. } => resume_key.clone(),
            }
        };

        let mut listed = Vec::new();
        let mut common_prefixes = Vec::new();
        let mut is_truncated = false;
        let mut next_continuation_token = None;
        let mut taken = 0usize;

        for entry in entries {
            if let Some(token) = query.continuation_token.as_deref() {
                if resume_key_of(&entry).as_str() <= token {
                    continue;
                }
            }
            if taken >= max_keys {
                is_truncated = true;
                break;
            }
            taken += 1;
            next_continuation_token = Some(resume_key_of(&entry));
            match entry {
                Entry::Object(summary) => listed.push(summary),
                Entry::Prefix { group, .. } => common_prefixes.push(group),
            }
        }

        if !is_truncated {
            next_continuation_token = None;
        }

        Ok(ListObjectsResult {
            objects: listed,
            common_prefixes,
            is_truncated,
            next_continuation_token,
        })
    }

    async fn list_object_versions(
        &self,
        bucket_name: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<VersionSummary>, S3Error> {
        let bucket = self.state.bucket(bucket_name)?;
        let objects = bucket.objects.read();
        let prefix = prefix.unwrap_or("");

        // all_versions returns key order with each key's versions oldest
        // to newest, so a record is the latest exactly when the next one
        // belongs to a different key.
        let all = objects.all_versions();
        let mut versions = Vec::new();
        for (index, record) in all.iter().enumerate() {
            if !record.key.starts_with(prefix) {
                continue;
            }
            let is_latest = all
                .get(index + 1)
                .is_none_or(|next| next.key != record.key);
            versions.push(VersionSummary {
                key: record.key.clone(),
                version_id: record.version_id.clone(),
                is_delete_marker: record.delete_marker,
                is_latest,
                etag: record.etag.clone(),
                size: record.size,
                last_modified: record.last_modified,
            });
        }
        Ok(versions)
    }

    // -- multipart --

    async fn create_multipart_upload(
        &self,
        bucket_name: &str,
        key: &str,
        params: PutObjectParams,
        principal: &str,
    ) -> Result<String, S3Error> {
        let bucket = self.state.bucket(bucket_name)?;
        let upload_id = Uuid::new_v4().to_string();

        let metadata = ObjectMetadata {
            content_type: params.content_type,
            user_metadata: params.user_metadata,
            tags: params.tags,
            sse_algorithm: params.sse_kms_key_id.as_ref().map(|_| "aws:kms".to_owned()),
            sse_kms_key_id: params.sse_kms_key_id.clone(),
        };
        bucket.multipart_uploads.insert(
            upload_id.clone(),
            MultipartUpload::new(
                upload_id.clone(),
                key.to_owned(),
                principal.to_owned(),
                metadata,
                params.acl,
                params.sse_kms_key_id,
            ),
        );

        info!(bucket = bucket_name, key, upload_id, "multipart upload initiated");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket_name: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String, S3Error> {
        if part_number == 0 || part_number > MAX_PART_NUMBER {
            return Err(S3Error::with_message(
                S3ErrorCode::InvalidArgument,
                format!("part number must be between 1 and {MAX_PART_NUMBER}"),
            ));
        }

        let bucket = self.state.bucket(bucket_name)?;
        let mut upload = bucket.multipart_uploads.get_mut(upload_id).ok_or_else(|| {
            S3Error::with_message(
                S3ErrorCode::NoSuchUpload,
                "The specified upload does not exist",
            )
            .with_resource(key)
        })?;

        let etag = checksums::compute_etag(&body);
        let size = body.len() as u64;
        self.blobs.write_part(bucket_name, upload_id, part_number, body);
        upload.put_part(UploadPart {
            part_number,
            etag: etag.clone(),
            size,
            last_modified: Utc::now(),
        });

        debug!(bucket = bucket_name, upload_id, part_number, size, "part stored");
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket_name: &str,
        key: &str,
        upload_id: &str,
        mut parts: Vec<(u32, String)>,
        principal: &str,
    ) -> Result<PutObjectResult, S3Error> {
        // Phase 1: validate and assemble under the bucket handle. No
        // awaits happen while it is held.
        let (upload, body, etag, version_id, bucket_owner, part_count) = {
            let bucket = self.state.bucket(bucket_name)?;
            let upload = bucket
                .multipart_uploads
                .get(upload_id)
                .ok_or_else(|| {
                    S3Error::with_message(
                        S3ErrorCode::NoSuchUpload,
                        "The specified upload does not exist",
                    )
                    .with_resource(key)
                })?
                .clone();

            if parts.is_empty() {
                return Err(S3Error::with_message(
                    S3ErrorCode::MalformedXML,
                    "CompleteMultipartUpload requires at least one part",
                ));
            }

            // The caller may list parts in any order; sort by part number
            // and then require them to be contiguous from 1.
            parts.sort_by_key(|(number, _)| *number);
            for (index, (number, etag)) in parts.iter().enumerate() {
                let expected = u32::try_from(index).unwrap_or(u32::MAX) + 1;
                if *number != expected {
                    return Err(S3Error::with_message(
                        S3ErrorCode::InvalidPartOrder,
                        "parts must be contiguous starting at 1",
                    ));
                }
                let stored = upload.parts.get(number).ok_or_else(|| {
                    S3Error::with_message(
                        S3ErrorCode::InvalidPart,
                        format!("part {number} was never uploaded"),
                    )
                })?;
                if !etags_equal(&stored.etag, etag) {
                    return Err(S3Error::with_message(
                        S3ErrorCode::InvalidPart,
                        format!("part {number} etag does not match"),
                    ));
                }
            }

            let numbers: Vec<u32> = parts.iter().map(|(number, _)| *number).collect();
            let body = self
                .blobs
                .assemble_parts(bucket_name, upload_id, &numbers)
                .ok_or_else(|| {
                    S3Error::with_message(S3ErrorCode::InvalidPart, "a part body is missing")
                })?;

            let part_md5s: Vec<String> = parts
                .iter()
                .filter_map(|(number, _)| upload.parts.get(number))
                .map(|part| part.etag.trim_matches('"').to_owned())
                .collect();
            let etag = checksums::compute_multipart_etag(&part_md5s, parts.len());
            let version_id = Self::new_version_id(&bucket);
            let part_count = u32::try_from(parts.len()).unwrap_or(u32::MAX);

            (upload, body, etag, version_id, bucket.owner.clone(), part_count)
        };

        // Phase 2: optional SSE-KMS envelope (may await).
        let (stored, sse_kms_key_id) = self
            .maybe_seal(body, upload.sse_kms_key_id.as_deref())
            .await?;

        // Phase 3: atomic swap. Bytes land first, then the record flips
        // under the object-store lock; readers see the old object until
        // then.
        let params = PutObjectParams {
            content_type: upload.metadata.content_type.clone(),
            user_metadata: upload.metadata.user_metadata.clone(),
            tags: upload.metadata.tags.clone(),
            acl: upload.acl,
            sse_kms_key_id: None,
        };
        let record = Self::record_from_put(
            key,
            version_id.clone(),
            etag.clone(),
            stored.len() as u64,
            &params,
            sse_kms_key_id.clone(),
            Owner::new(principal),
            &bucket_owner,
            Some(part_count),
        );

        self.blobs.write_object(bucket_name, key, &version_id, stored);
        {
            let bucket = self.state.bucket(bucket_name)?;
            bucket.objects.write().put(record);
            bucket.multipart_uploads.remove(upload_id);
        }
        self.blobs.drop_upload(bucket_name, upload_id);

        info!(
            bucket = bucket_name,
            key,
            upload_id,
            parts = parts.len(),
            "multipart upload completed"
        );
        Ok(PutObjectResult {
            etag,
            version_id: (version_id != NULL_VERSION_ID).then_some(version_id),
            sse_algorithm: sse_kms_key_id.as_ref().map(|_| "aws:kms".to_owned()),
            sse_kms_key_id,
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket_name: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error> {
        let bucket = self.state.bucket(bucket_name)?;
        let removed = bucket.multipart_uploads.remove(upload_id);
        if removed.is_none() {
            return Err(S3Error::with_message(
                S3ErrorCode::NoSuchUpload,
                "The specified upload does not exist",
            )
            .with_resource(key));
        }
        self.blobs.drop_upload(bucket_name, upload_id);
        debug!(bucket = bucket_name, upload_id, "multipart upload aborted");
        Ok(())
    }

    // -- bucket configuration --

    async fn get_versioning(&self, bucket: &str) -> Result<VersioningStatus, S3Error> {
        Ok(self.state.bucket(bucket)?.versioning_status())
    }

    async fn put_versioning(&self, bucket: &str, status: VersioningStatus) -> Result<(), S3Error> {
        let bucket = self.state.bucket(bucket)?;
        match status {
            VersioningStatus::Enabled => bucket.enable_versioning(),
            VersioningStatus::Suspended => bucket.suspend_versioning(),
            VersioningStatus::Unversioned => {
                return Err(S3Error::with_message(
                    S3ErrorCode::InvalidArgument,
                    "versioning cannot be disabled once enabled",
                ));
            }
        }
        Ok(())
    }

    async fn get_bucket_tagging(&self, bucket: &str) -> Result<Vec<(String, String)>, S3Error> {
        let bucket = self.state.bucket(bucket)?;
        let tags = bucket.tags.read().clone();
        if tags.is_empty() {
            return Err(S3Error::with_message(
                S3ErrorCode::NoSuchTagSet,
                "The TagSet does not exist",
            ));
        }
        Ok(tags)
    }

    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.tags.write() = tags;
        Ok(())
    }

    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), S3Error> {
        self.state.bucket(bucket)?.tags.write().clear();
        Ok(())
    }

    async fn get_lifecycle(&self, bucket: &str) -> Result<serde_json::Value, S3Error> {
        self.state
            .bucket(bucket)?
            .lifecycle
            .read()
            .clone()
            .ok_or_else(|| {
                S3Error::with_message(
                    S3ErrorCode::NoSuchLifecycleConfiguration,
                    "The lifecycle configuration does not exist",
                )
            })
    }

    async fn put_lifecycle(&self, bucket: &str, config: serde_json::Value) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.lifecycle.write() = Some(config);
        Ok(())
    }

    async fn delete_lifecycle(&self, bucket: &str) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.lifecycle.write() = None;
        Ok(())
    }

    async fn get_notification(&self, bucket: &str) -> Result<serde_json::Value, S3Error> {
        Ok(self
            .state
            .bucket(bucket)?
            .notification
            .read()
            .clone()
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn put_notification(
        &self,
        bucket: &str,
        config: serde_json::Value,
    ) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.notification.write() = Some(config);
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<String, S3Error> {
        let bucket = self.state.bucket(bucket)?;
        let policy = bucket.policy.read();
        match policy.as_ref() {
            Some(policy) => serde_json::to_string(policy)
                .map_err(|e| S3Error::internal(format!("cannot serialize policy: {e}"))),
            None => Err(S3Error::with_message(
                S3ErrorCode::NoSuchBucketPolicy,
                "The bucket policy does not exist",
            )),
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> Result<(), S3Error> {
        let parsed = cybs3_s3_model::BucketPolicy::parse(policy_json).map_err(|e| {
            S3Error::with_message(
                S3ErrorCode::MalformedPolicy,
                format!("policy does not parse: {e}"),
            )
        })?;
        *self.state.bucket(bucket)?.policy.write() = Some(parsed);
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.policy.write() = None;
        Ok(())
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy, S3Error> {
        Ok(self.state.bucket(bucket)?.acl.read().clone())
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: AccessControlPolicy) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.acl.write() = acl;
        Ok(())
    }

    async fn get_object_acl(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<AccessControlPolicy, S3Error> {
        let bucket = self.state.bucket(bucket)?;
        let record = Self::find_record(&bucket, key, version_id)?;
        Ok(record.acl)
    }

    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: AccessControlPolicy,
    ) -> Result<(), S3Error> {
        let bucket = self.state.bucket(bucket)?;
        let mut objects = bucket.objects.write();
        let record = objects
            .current_mut(key)
            .ok_or_else(|| S3Error::no_such_key(key))?;
        record.acl = acl;
        Ok(())
    }

    async fn put_vpc_config(&self, bucket: &str, vpc_only: bool) -> Result<(), S3Error> {
        *self.state.bucket(bucket)?.vpc_only.write() = vpc_only;
        Ok(())
    }
}

/// Compare ETags ignoring surrounding quotes.
fn etags_equal(a: &str, b: &str) -> bool {
    a.trim_matches('"') == b.trim_matches('"')
}

/// Basic S3 bucket-name validation.
fn validate_bucket_name(name: &str) -> Result<(), S3Error> {
    let valid_len = (3..=63).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric());

    if valid_len && valid_chars && valid_edges {
        Ok(())
    } else {
        Err(S3Error::with_message(
            S3ErrorCode::InvalidBucketName,
            "The specified bucket is not valid",
        )
        .with_resource(name))
    }
}
