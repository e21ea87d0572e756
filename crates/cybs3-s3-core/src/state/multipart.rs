//! Multipart upload bookkeeping.

use chrono::{DateTime, Utc};
use cybs3_s3_model::{CannedAcl, ObjectMetadata};

/// Highest part number S3 accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// An in-progress multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    /// The upload ID.
    pub upload_id: String,
    /// The key being assembled.
    pub key: String,
    /// When the upload was initiated.
    pub initiated: DateTime<Utc>,
    /// The principal that initiated the upload.
    pub initiator: String,
    /// Metadata captured at initiation, applied to the final object.
    pub metadata: ObjectMetadata,
    /// Canned ACL captured at initiation.
    pub acl: CannedAcl,
    /// KMS key for SSE-KMS, captured at initiation.
    pub sse_kms_key_id: Option<String>,
    /// Uploaded parts, keyed by part number.
    pub parts: std::collections::BTreeMap<u32, UploadPart>,
}

impl MultipartUpload {
    /// Start a new upload.
    #[must_use]
    pub fn new(
        upload_id: String,
        key: String,
        initiator: String,
        metadata: ObjectMetadata,
        acl: CannedAcl,
        sse_kms_key_id: Option<String>,
    ) -> Self {
        Self {
            upload_id,
            key,
            initiated: Utc::now(),
            initiator,
            metadata,
            acl,
            sse_kms_key_id,
            parts: std::collections::BTreeMap::new(),
        }
    }

    /// Insert or replace a part.
    pub fn put_part(&mut self, part: UploadPart) {
        self.parts.insert(part.part_number, part);
    }
}

/// One uploaded part.
#[derive(Debug, Clone)]
pub struct UploadPart {
    /// The 1-based part number.
    pub part_number: u32,
    /// Quoted ETag of the part body.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
    /// When the part was uploaded.
    pub last_modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> MultipartUpload {
        MultipartUpload::new(
            "upload-1".to_owned(),
            "key".to_owned(),
            "alice".to_owned(),
            ObjectMetadata::default(),
            CannedAcl::Private,
            None,
        )
    }

    fn part(number: u32, etag: &str, size: u64) -> UploadPart {
        UploadPart {
            part_number: number,
            etag: etag.to_owned(),
            size,
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_should_track_parts_in_order() {
        let mut up = upload();
        up.put_part(part(2, "\"b\"", 20));
        up.put_part(part(1, "\"a\"", 10));

        let numbers: Vec<u32> = up.parts.keys().copied().collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_should_replace_reuploaded_part() {
        let mut up = upload();
        up.put_part(part(1, "\"old\"", 10));
        up.put_part(part(1, "\"new\"", 20));

        assert_eq!(up.parts.len(), 1);
        assert_eq!(up.parts.get(&1).map(|p| p.etag.as_str()), Some("\"new\""));
    }
}
