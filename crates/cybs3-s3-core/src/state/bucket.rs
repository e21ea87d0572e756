//! The per-bucket state container.
//!
//! Interior mutability follows the usual split: `parking_lot::RwLock` for
//! single-valued configuration and the object store, `DashMap` for the
//! multipart upload table.

use chrono::{DateTime, Utc};
use cybs3_s3_model::{AccessControlPolicy, BucketPolicy, Owner, VersioningStatus};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::multipart::MultipartUpload;
use super::objectstore::ObjectStore;

/// A bucket and everything it owns.
pub struct S3Bucket {
    /// Bucket name.
    pub name: String,
    /// Region the bucket was created in.
    pub region: String,
    /// Creation time.
    pub creation_date: DateTime<Utc>,
    /// The owning principal.
    pub owner: Owner,

    /// Object records (versioned or not).
    pub objects: RwLock<ObjectStore>,
    /// In-progress multipart uploads by upload ID.
    pub multipart_uploads: DashMap<String, MultipartUpload>,

    /// Versioning status.
    pub versioning: RwLock<VersioningStatus>,
    /// The bucket ACL.
    pub acl: RwLock<AccessControlPolicy>,
    /// Parsed bucket policy, if set.
    pub policy: RwLock<Option<BucketPolicy>>,
    /// Bucket tags.
    pub tags: RwLock<Vec<(String, String)>>,
    /// Lifecycle configuration, stored as validated opaque JSON.
    pub lifecycle: RwLock<Option<serde_json::Value>>,
    /// Notification configuration, stored as validated opaque JSON.
    pub notification: RwLock<Option<serde_json::Value>>,
    /// Whether access is restricted to VPC endpoints.
    pub vpc_only: RwLock<bool>,
}

impl std::fmt::Debug for S3Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Bucket")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("owner", &self.owner.id)
            .field("versioning", &*self.versioning.read())
            .finish_non_exhaustive()
    }
}

impl S3Bucket {
    /// Create a bucket with default configuration.
    #[must_use]
    pub fn new(name: String, region: String, owner: Owner) -> Self {
        let acl = AccessControlPolicy::private(owner.clone());
        Self {
            name,
            region,
            creation_date: Utc::now(),
            owner,
            objects: RwLock::new(ObjectStore::default()),
            multipart_uploads: DashMap::new(),
            versioning: RwLock::new(VersioningStatus::default()),
            acl: RwLock::new(acl),
            policy: RwLock::new(None),
            tags: RwLock::new(Vec::new()),
            lifecycle: RwLock::new(None),
            notification: RwLock::new(None),
            vpc_only: RwLock::new(false),
        }
    }

    /// Whether the bucket holds no current objects, no version history,
    /// and no in-progress uploads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty() && self.multipart_uploads.is_empty()
    }

    /// Current versioning status.
    #[must_use]
    pub fn versioning_status(&self) -> VersioningStatus {
        *self.versioning.read()
    }

    /// Enable versioning; transitions the object store on first enable.
    pub fn enable_versioning(&self) {
        let mut status = self.versioning.write();
        if *status != VersioningStatus::Enabled {
            debug!(bucket = %self.name, "enabling versioning");
            self.objects.write().transition_to_versioned();
            *status = VersioningStatus::Enabled;
        }
    }

    /// Suspend versioning. The version history is retained.
    pub fn suspend_versioning(&self) {
        let mut status = self.versioning.write();
        if *status == VersioningStatus::Enabled {
            debug!(bucket = %self.name, "suspending versioning");
            *status = VersioningStatus::Suspended;
        }
    }
}

#[cfg(test)]
mod tests {
    use cybs3_s3_model::ObjectMetadata;

    use super::*;

    fn bucket() -> S3Bucket {
        S3Bucket::new(
            "test-bucket".to_owned(),
            "us-east-1".to_owned(),
            Owner::new("alice"),
        )
    }

    #[test]
    fn test_should_create_bucket_with_private_acl() {
        let b = bucket();
        assert!(b.is_empty());
        assert_eq!(b.versioning_status(), VersioningStatus::Unversioned);
        assert_eq!(b.acl.read().owner.id, "alice");
        assert!(b.acl.read().grants.is_empty());
        assert!(b.policy.read().is_none());
        assert!(!*b.vpc_only.read());
    }

    #[test]
    fn test_should_enable_and_suspend_versioning() {
        let b = bucket();
        b.enable_versioning();
        assert_eq!(b.versioning_status(), VersioningStatus::Enabled);
        assert!(b.objects.read().is_versioned());

        b.suspend_versioning();
        assert_eq!(b.versioning_status(), VersioningStatus::Suspended);
        // The store stays versioned: history is retained.
        assert!(b.objects.read().is_versioned());
    }

    #[test]
    fn test_should_not_suspend_if_never_enabled() {
        let b = bucket();
        b.suspend_versioning();
        assert_eq!(b.versioning_status(), VersioningStatus::Unversioned);
    }

    #[test]
    fn test_should_count_multipart_uploads_toward_emptiness() {
        let b = bucket();
        b.multipart_uploads.insert(
            "up-1".to_owned(),
            MultipartUpload::new(
                "up-1".to_owned(),
                "key".to_owned(),
                "alice".to_owned(),
                ObjectMetadata::default(),
                cybs3_s3_model::CannedAcl::Private,
                None,
            ),
        );
        assert!(!b.is_empty());
    }
}
