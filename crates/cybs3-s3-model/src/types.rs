//! Shared server-side types: versioning status and object metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-bucket versioning status.
///
/// A bucket starts unversioned; once versioning has been enabled it can
/// only toggle between `Enabled` and `Suspended`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning was never enabled.
    #[default]
    Unversioned,
    /// Writes create new versions.
    Enabled,
    /// Writes overwrite the `null` version; history is retained.
    Suspended,
}

impl VersioningStatus {
    /// The wire form used in `VersioningConfiguration` XML (empty for an
    /// unversioned bucket).
    #[must_use]
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Unversioned => "",
            Self::Enabled => "Enabled",
            Self::Suspended => "Suspended",
        }
    }
}

/// Metadata carried by an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// User metadata from `x-amz-meta-*` headers.
    #[serde(default)]
    pub user_metadata: HashMap<String, String>,
    /// Object tags.
    #[serde(default)]
    pub tags: Vec<(String, String)>,
    /// Server-side encryption algorithm (`aws:kms` when SSE-KMS applied).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sse_algorithm: Option<String>,
    /// The KMS key that wrapped this object, when SSE-KMS applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sse_kms_key_id: Option<String>,
}
