//! Top-level service state: the bucket map.

use chrono::{DateTime, Utc};
use cybs3_s3_model::{Owner, S3Error};
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use tracing::info;

use super::bucket::S3Bucket;

/// All buckets, keyed by their globally unique names.
pub struct S3ServiceState {
    buckets: DashMap<String, S3Bucket>,
}

impl std::fmt::Debug for S3ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ServiceState")
            .field("bucket_count", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl Default for S3ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

impl S3ServiceState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Create a bucket.
    ///
    /// # Errors
    ///
    /// `BucketAlreadyOwnedByYou` / `BucketAlreadyExists` when the name is
    /// taken.
    pub fn create_bucket(&self, name: &str, region: &str, owner: Owner) -> Result<(), S3Error> {
        if let Some(existing) = self.buckets.get(name) {
            return Err(if existing.owner.id == owner.id {
                S3Error::with_message(
                    cybs3_s3_model::S3ErrorCode::BucketAlreadyOwnedByYou,
                    "Your previous request to create the named bucket succeeded and you already own it",
                )
                .with_resource(name)
            } else {
                S3Error::with_message(
                    cybs3_s3_model::S3ErrorCode::BucketAlreadyExists,
                    "The requested bucket name is not available",
                )
                .with_resource(name)
            });
        }

        self.buckets.insert(
            name.to_owned(),
            S3Bucket::new(name.to_owned(), region.to_owned(), owner),
        );
        info!(bucket = %name, "bucket created");
        Ok(())
    }

    /// Delete a bucket, requiring it to be empty.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` or `BucketNotEmpty`.
    pub fn delete_bucket(&self, name: &str) -> Result<(), S3Error> {
        let bucket = self
            .buckets
            .get(name)
            .ok_or_else(|| S3Error::no_such_bucket(name))?;

        if !bucket.is_empty() {
            return Err(S3Error::with_message(
                cybs3_s3_model::S3ErrorCode::BucketNotEmpty,
                "The bucket you tried to delete is not empty",
            )
            .with_resource(name));
        }
        drop(bucket);

        self.buckets.remove(name);
        info!(bucket = %name, "bucket deleted");
        Ok(())
    }

    /// Borrow a bucket.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`.
    pub fn bucket(&self, name: &str) -> Result<Ref<'_, String, S3Bucket>, S3Error> {
        self.buckets
            .get(name)
            .ok_or_else(|| S3Error::no_such_bucket(name))
    }

    /// Whether a bucket exists.
    #[must_use]
    pub fn bucket_exists(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// `(name, creation_date, owner_id)` for all buckets, sorted by name.
    #[must_use]
    pub fn list_buckets(&self) -> Vec<(String, DateTime<Utc>, String)> {
        let mut buckets: Vec<(String, DateTime<Utc>, String)> = self
            .buckets
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().creation_date,
                    entry.value().owner.id.clone(),
                )
            })
            .collect();
        buckets.sort_by(|a, b| a.0.cmp(&b.0));
        buckets
    }
}

#[cfg(test)]
mod tests {
    use cybs3_s3_model::S3ErrorCode;

    use super::*;

    #[test]
    fn test_should_create_and_find_bucket() {
        let state = S3ServiceState::new();
        state
            .create_bucket("b", "us-east-1", Owner::new("alice"))
            .expect("create");
        assert!(state.bucket_exists("b"));
        assert_eq!(state.bucket("b").expect("get").region, "us-east-1");
    }

    #[test]
    fn test_should_reject_duplicate_same_owner() {
        let state = S3ServiceState::new();
        state
            .create_bucket("dup", "us-east-1", Owner::new("alice"))
            .expect("create");
        let err = state
            .create_bucket("dup", "us-east-1", Owner::new("alice"))
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketAlreadyOwnedByYou);
    }

    #[test]
    fn test_should_reject_duplicate_other_owner() {
        let state = S3ServiceState::new();
        state
            .create_bucket("shared", "us-east-1", Owner::new("alice"))
            .expect("create");
        let err = state
            .create_bucket("shared", "eu-west-1", Owner::new("bob"))
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketAlreadyExists);
    }

    #[test]
    fn test_should_delete_empty_bucket() {
        let state = S3ServiceState::new();
        state
            .create_bucket("gone", "us-east-1", Owner::new("alice"))
            .expect("create");
        state.delete_bucket("gone").expect("delete");
        assert!(!state.bucket_exists("gone"));
    }

    #[test]
    fn test_should_error_on_missing_bucket() {
        let state = S3ServiceState::new();
        assert_eq!(
            state.delete_bucket("ghost").unwrap_err().code,
            S3ErrorCode::NoSuchBucket
        );
        assert_eq!(
            state.bucket("ghost").unwrap_err().code,
            S3ErrorCode::NoSuchBucket
        );
    }

    #[test]
    fn test_should_list_buckets_sorted() {
        let state = S3ServiceState::new();
        for name in ["c", "a", "b"] {
            state
                .create_bucket(name, "us-east-1", Owner::new("alice"))
                .expect("create");
        }
        let names: Vec<String> = state.list_buckets().into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
