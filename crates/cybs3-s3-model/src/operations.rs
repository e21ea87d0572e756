//! The routed operation set and its mapping to policy actions.

use std::fmt;

/// Every operation the HTTP layer can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3Operation {
    // Service-level
    /// `GET /`
    ListBuckets,

    // Bucket-level
    /// `PUT /:bucket`
    CreateBucket,
    /// `DELETE /:bucket`
    DeleteBucket,
    /// `HEAD /:bucket`
    HeadBucket,
    /// `GET /:bucket?list-type=2`
    ListObjectsV2,
    /// `GET /:bucket?versions`
    ListObjectVersions,
    /// `GET /:bucket?policy`
    GetBucketPolicy,
    /// `PUT /:bucket?policy`
    PutBucketPolicy,
    /// `DELETE /:bucket?policy`
    DeleteBucketPolicy,
    /// `GET /:bucket?acl`
    GetBucketAcl,
    /// `PUT /:bucket?acl`
    PutBucketAcl,
    /// `GET /:bucket?versioning`
    GetBucketVersioning,
    /// `PUT /:bucket?versioning`
    PutBucketVersioning,
    /// `GET /:bucket?tagging`
    GetBucketTagging,
    /// `PUT /:bucket?tagging`
    PutBucketTagging,
    /// `DELETE /:bucket?tagging`
    DeleteBucketTagging,
    /// `GET /:bucket?lifecycle`
    GetBucketLifecycle,
    /// `PUT /:bucket?lifecycle`
    PutBucketLifecycle,
    /// `DELETE /:bucket?lifecycle`
    DeleteBucketLifecycle,
    /// `GET /:bucket?notification`
    GetBucketNotification,
    /// `PUT /:bucket?notification`
    PutBucketNotification,
    /// `PUT /:bucket?vpc`
    PutBucketVpcConfig,
    /// `DELETE /:bucket?vpc`
    DeleteBucketVpcConfig,

    // Object-level
    /// `PUT /:bucket/*key`
    PutObject,
    /// `PUT /:bucket/*key` with `x-amz-copy-source`
    CopyObject,
    /// `GET /:bucket/*key`
    GetObject,
    /// `HEAD /:bucket/*key`
    HeadObject,
    /// `DELETE /:bucket/*key`
    DeleteObject,
    /// `GET /:bucket/*key?acl`
    GetObjectAcl,
    /// `PUT /:bucket/*key?acl`
    PutObjectAcl,

    // Multipart
    /// `POST /:bucket/*key?uploads`
    CreateMultipartUpload,
    /// `PUT /:bucket/*key?partNumber=&uploadId=`
    UploadPart,
    /// `POST /:bucket/*key?uploadId=`
    CompleteMultipartUpload,
    /// `DELETE /:bucket/*key?uploadId=`
    AbortMultipartUpload,
}

impl S3Operation {
    /// The policy action string evaluated by the access-control engine.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::ListBuckets => "s3:ListAllMyBuckets",
            Self::CreateBucket => "s3:CreateBucket",
            Self::DeleteBucket => "s3:DeleteBucket",
            Self::HeadBucket | Self::ListObjectsV2 => "s3:ListBucket",
            Self::ListObjectVersions => "s3:ListBucketVersions",
            Self::GetBucketPolicy => "s3:GetBucketPolicy",
            Self::PutBucketPolicy => "s3:PutBucketPolicy",
            Self::DeleteBucketPolicy => "s3:DeleteBucketPolicy",
            Self::GetBucketAcl => "s3:GetBucketAcl",
            Self::PutBucketAcl => "s3:PutBucketAcl",
            Self::GetBucketVersioning => "s3:GetBucketVersioning",
            Self::PutBucketVersioning => "s3:PutBucketVersioning",
            Self::GetBucketTagging => "s3:GetBucketTagging",
            Self::PutBucketTagging => "s3:PutBucketTagging",
            Self::DeleteBucketTagging => "s3:DeleteBucketTagging",
            Self::GetBucketLifecycle => "s3:GetLifecycleConfiguration",
            Self::PutBucketLifecycle => "s3:PutLifecycleConfiguration",
            Self::DeleteBucketLifecycle => "s3:PutLifecycleConfiguration",
            Self::GetBucketNotification => "s3:GetBucketNotification",
            Self::PutBucketNotification => "s3:PutBucketNotification",
            Self::PutBucketVpcConfig | Self::DeleteBucketVpcConfig => "s3:PutBucketVpcConfig",
            Self::PutObject | Self::CopyObject => "s3:PutObject",
            Self::GetObject => "s3:GetObject",
            Self::HeadObject => "s3:GetObject",
            Self::DeleteObject => "s3:DeleteObject",
            Self::GetObjectAcl => "s3:GetObjectAcl",
            Self::PutObjectAcl => "s3:PutObjectAcl",
            Self::CreateMultipartUpload
            | Self::UploadPart
            | Self::CompleteMultipartUpload => "s3:PutObject",
            Self::AbortMultipartUpload => "s3:AbortMultipartUpload",
        }
    }

    /// Whether the operation targets an object (as opposed to a bucket or
    /// the service root).
    #[must_use]
    pub fn is_object_operation(&self) -> bool {
        matches!(
            self,
            Self::PutObject
                | Self::CopyObject
                | Self::GetObject
                | Self::HeadObject
                | Self::DeleteObject
                | Self::GetObjectAcl
                | Self::PutObjectAcl
                | Self::CreateMultipartUpload
                | Self::UploadPart
                | Self::CompleteMultipartUpload
                | Self::AbortMultipartUpload
        )
    }
}

impl fmt::Display for S3Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_operations_to_policy_actions() {
        assert_eq!(S3Operation::GetObject.action(), "s3:GetObject");
        assert_eq!(S3Operation::HeadObject.action(), "s3:GetObject");
        assert_eq!(S3Operation::PutObject.action(), "s3:PutObject");
        assert_eq!(S3Operation::CopyObject.action(), "s3:PutObject");
        assert_eq!(S3Operation::DeleteObject.action(), "s3:DeleteObject");
        assert_eq!(S3Operation::ListObjectsV2.action(), "s3:ListBucket");
        assert_eq!(S3Operation::CreateBucket.action(), "s3:CreateBucket");
    }

    #[test]
    fn test_should_classify_object_operations() {
        assert!(S3Operation::GetObject.is_object_operation());
        assert!(S3Operation::UploadPart.is_object_operation());
        assert!(!S3Operation::ListBuckets.is_object_operation());
        assert!(!S3Operation::CreateBucket.is_object_operation());
    }

    #[test]
    fn test_should_display_operation_names() {
        assert_eq!(S3Operation::GetObject.to_string(), "GetObject");
        assert_eq!(
            S3Operation::CompleteMultipartUpload.to_string(),
            "CompleteMultipartUpload"
        );
    }
}
