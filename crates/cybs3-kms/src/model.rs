//! KMS wire model: key metadata and the request/response DTOs.
//!
//! Field names follow the AWS KMS JSON protocol (PascalCase); binary fields
//! (`Plaintext`, `CiphertextBlob`) are base64 strings on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a KMS key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// Key is usable for cryptographic operations.
    Enabled,
    /// Key exists but is administratively disabled.
    Disabled,
    /// Key is scheduled for deletion and unusable.
    PendingDeletion,
    /// Key material has not been imported yet.
    PendingImport,
    /// Key is in an unusable region state.
    Unavailable,
}

/// Metadata describing a key. Never includes key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMetadata {
    /// The key's UUID.
    pub key_id: String,
    /// Full ARN of the key.
    pub arn: String,
    /// Caller-supplied description.
    #[serde(default)]
    pub description: String,
    /// Intended usage (always `ENCRYPT_DECRYPT` here).
    pub key_usage: String,
    /// Key spec (always `SYMMETRIC_DEFAULT` here).
    pub key_spec: String,
    /// Current lifecycle state.
    pub key_state: KeyState,
    /// When the key was created.
    pub creation_date: DateTime<Utc>,
    /// Whether the key is enabled.
    pub enabled: bool,
    /// When the key will be destroyed, if deletion is scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `CreateKey` request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateKeyRequest {
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Requested usage; only `ENCRYPT_DECRYPT` is accepted.
    #[serde(default)]
    pub key_usage: Option<String>,
    /// Requested spec; only `SYMMETRIC_DEFAULT` is accepted.
    #[serde(default)]
    pub key_spec: Option<String>,
}

/// Request carrying only a key ID (`DescribeKey`, `EnableKey`,
/// `DisableKey`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyIdRequest {
    /// The target key ID or ARN.
    pub key_id: String,
}

/// `ScheduleKeyDeletion` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleKeyDeletionRequest {
    /// The target key ID.
    pub key_id: String,
    /// Days before the material is destroyed; minimum 7, default 30.
    #[serde(default)]
    pub pending_window_in_days: Option<u32>,
}

/// `Encrypt` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptRequest {
    /// The key to encrypt under.
    pub key_id: String,
    /// Base64 plaintext.
    pub plaintext: String,
    /// Optional encryption context (carried, not enforced).
    #[serde(default)]
    pub encryption_context: Option<serde_json::Value>,
    /// Optional grant tokens (accepted, unused).
    #[serde(default)]
    pub grant_tokens: Option<Vec<String>>,
}

/// `Decrypt` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecryptRequest {
    /// Base64 ciphertext blob.
    pub ciphertext_blob: String,
    /// Restrict decryption to this key, if set.
    #[serde(default)]
    pub key_id: Option<String>,
    /// Optional encryption context (carried, not enforced).
    #[serde(default)]
    pub encryption_context: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response wrapping key metadata (`CreateKey`, `DescribeKey`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMetadataResponse {
    /// The described key.
    pub key_metadata: KeyMetadata,
}

/// One entry of a `ListKeys` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyListEntry {
    /// The key's UUID.
    pub key_id: String,
    /// The key's ARN.
    pub key_arn: String,
}

/// `ListKeys` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListKeysResponse {
    /// All keys in the keystore.
    pub keys: Vec<KeyListEntry>,
    /// Pagination marker (never set; the store is small).
    pub truncated: bool,
}

/// `ScheduleKeyDeletion` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleKeyDeletionResponse {
    /// The affected key ID.
    pub key_id: String,
    /// When the material will be destroyed.
    pub deletion_date: DateTime<Utc>,
    /// The key's new state.
    pub key_state: KeyState,
    /// The pending window that was applied.
    pub pending_window_in_days: u32,
}

/// `Encrypt` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptResponse {
    /// Base64 `nonce ‖ ciphertext ‖ tag` blob.
    pub ciphertext_blob: String,
    /// The key that encrypted the plaintext.
    pub key_id: String,
    /// The key's ARN.
    pub arn: String,
    /// The algorithm used.
    pub encryption_algorithm: String,
}

/// `Decrypt` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecryptResponse {
    /// Base64 plaintext.
    pub plaintext: String,
    /// The key that opened the blob.
    pub key_id: String,
    /// The key's ARN.
    pub arn: String,
    /// The algorithm used.
    pub encryption_algorithm: String,
}
