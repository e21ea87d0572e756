//! In-memory storage for object and part bodies.
//!
//! Metadata lives in [`crate::state`]; the bytes live here, keyed by
//! `(bucket, key, version_id)` for objects and `(bucket, upload_id,
//! part_number)` for multipart parts. `DashMap` makes the store safe for
//! concurrent access without external locking.

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tracing::trace;

type ObjectKey = (String, String, String);
type PartKey = (String, String, u32);

/// Body storage for every bucket.
#[derive(Debug, Default)]
pub struct BlobStore {
    objects: DashMap<ObjectKey, Bytes>,
    parts: DashMap<PartKey, Bytes>,
}

impl BlobStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object body.
    pub fn write_object(&self, bucket: &str, key: &str, version_id: &str, data: Bytes) {
        trace!(bucket, key, version_id, size = data.len(), "stored object bytes");
        self.objects.insert(
            (bucket.to_owned(), key.to_owned(), version_id.to_owned()),
            data,
        );
    }

    /// Fetch an object body.
    #[must_use]
    pub fn read_object(&self, bucket: &str, key: &str, version_id: &str) -> Option<Bytes> {
        self.objects
            .get(&(bucket.to_owned(), key.to_owned(), version_id.to_owned()))
            .map(|entry| entry.value().clone())
    }

    /// Drop an object body. No-op when absent.
    pub fn delete_object(&self, bucket: &str, key: &str, version_id: &str) {
        self.objects
            .remove(&(bucket.to_owned(), key.to_owned(), version_id.to_owned()));
    }

    /// Store a part body.
    pub fn write_part(&self, bucket: &str, upload_id: &str, part_number: u32, data: Bytes) {
        trace!(bucket, upload_id, part_number, size = data.len(), "stored part bytes");
        self.parts.insert(
            (bucket.to_owned(), upload_id.to_owned(), part_number),
            data,
        );
    }

    /// Fetch a part body.
    #[must_use]
    pub fn read_part(&self, bucket: &str, upload_id: &str, part_number: u32) -> Option<Bytes> {
        self.parts
            .get(&(bucket.to_owned(), upload_id.to_owned(), part_number))
            .map(|entry| entry.value().clone())
    }

    /// Concatenate parts in the given order into one body.
    ///
    /// Returns `None` if any part is missing.
    #[must_use]
    pub fn assemble_parts(
        &self,
        bucket: &str,
        upload_id: &str,
        part_numbers: &[u32],
    ) -> Option<Bytes> {
        let mut combined = BytesMut::new();
        for &number in part_numbers {
            let part = self.read_part(bucket, upload_id, number)?;
            combined.extend_from_slice(&part);
        }
        Some(combined.freeze())
    }

    /// Remove all parts of one upload.
    pub fn drop_upload(&self, bucket: &str, upload_id: &str) {
        self.parts
            .retain(|(b, u, _), _| !(b == bucket && u == upload_id));
    }

    /// Remove every object and part belonging to a bucket.
    pub fn drop_bucket(&self, bucket: &str) {
        self.objects.retain(|(b, _, _), _| b != bucket);
        self.parts.retain(|(b, _, _), _| b != bucket);
    }
}
