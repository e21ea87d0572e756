//! The KMS operation layer.
//!
//! [`KmsService`] implements the AWS-KMS-compatible key lifecycle and
//! envelope crypto over a [`Keystore`]. Ciphertext blobs are
//! `nonce(12) ‖ AES-256-GCM(plaintext) ‖ tag(16)` bound to the key's
//! material; the blob intentionally carries no key ID, so `Decrypt`
//! without an explicit key iterates the enabled keys and returns the first
//! successful open.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{KmsError, KmsResult};
use crate::keystore::{KeyRecord, Keystore, MATERIAL_LEN};
use crate::model::{
    CreateKeyRequest, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse,
    KeyListEntry, KeyMetadata, KeyState, ListKeysResponse, ScheduleKeyDeletionRequest,
    ScheduleKeyDeletionResponse,
};

/// AES-GCM nonce length.
const NONCE_LEN: usize = 12;

/// AES-GCM tag length.
const TAG_LEN: usize = 16;

/// The only encryption algorithm this service speaks.
const ALGORITHM: &str = "SYMMETRIC_DEFAULT";

/// Minimum and default pending-deletion windows, in days.
const MIN_PENDING_WINDOW_DAYS: u32 = 7;
const DEFAULT_PENDING_WINDOW_DAYS: u32 = 30;

/// The KMS service.
#[derive(Debug)]
pub struct KmsService {
    keystore: Keystore,
    region: String,
}

impl KmsService {
    /// Create a service over an opened keystore.
    #[must_use]
    pub fn new(keystore: Keystore, region: impl Into<String>) -> Self {
        Self {
            keystore,
            region: region.into(),
        }
    }

    /// `CreateKey`: mint a fresh 256-bit key and persist it.
    ///
    /// # Errors
    ///
    /// - [`KmsError::InvalidKeyUsage`] for usages other than
    ///   `ENCRYPT_DECRYPT` or specs other than `SYMMETRIC_DEFAULT`.
    /// - Keystore persistence failures.
    pub async fn create_key(&self, request: CreateKeyRequest) -> KmsResult<KeyMetadata> {
        if let Some(usage) = request.key_usage.as_deref() {
            if usage != "ENCRYPT_DECRYPT" {
                return Err(KmsError::InvalidKeyUsage(usage.to_owned()));
            }
        }
        if let Some(spec) = request.key_spec.as_deref() {
            if spec != "SYMMETRIC_DEFAULT" {
                return Err(KmsError::InvalidKeyUsage(spec.to_owned()));
            }
        }

        let key_id = Uuid::new_v4().to_string();
        let mut material = [0u8; MATERIAL_LEN];
        OsRng.fill_bytes(&mut material);

        let metadata = KeyMetadata {
            key_id: key_id.clone(),
            arn: self.arn_for(&key_id),
            description: request.description.unwrap_or_default(),
            key_usage: "ENCRYPT_DECRYPT".to_owned(),
            key_spec: "SYMMETRIC_DEFAULT".to_owned(),
            key_state: KeyState::Enabled,
            creation_date: Utc::now(),
            enabled: true,
            deletion_date: None,
        };

        self.keystore
            .insert(KeyRecord {
                metadata: metadata.clone(),
                material_base64: BASE64.encode(material),
            })
            .await?;

        info!(key_id = %metadata.key_id, "created KMS key");
        Ok(metadata)
    }

    /// `DescribeKey`: fetch metadata.
    ///
    /// # Errors
    ///
    /// [`KmsError::NotFound`] for unknown keys.
    pub async fn describe_key(&self, key_id: &str) -> KmsResult<KeyMetadata> {
        let record = self.keystore.get(&normalize_key_id(key_id)?).await?;
        Ok(record.metadata)
    }

    /// `ListKeys`: all key IDs and ARNs.
    pub async fn list_keys(&self) -> ListKeysResponse {
        let keys = self
            .keystore
            .list()
            .await
            .into_iter()
            .map(|r| KeyListEntry {
                key_id: r.metadata.key_id,
                key_arn: r.metadata.arn,
            })
            .collect();
        ListKeysResponse {
            keys,
            truncated: false,
        }
    }

    /// `EnableKey`: re-enable a disabled key.
    ///
    /// # Errors
    ///
    /// - [`KmsError::NotFound`] for unknown keys.
    /// - [`KmsError::KeyUnavailable`] for keys pending deletion.
    pub async fn enable_key(&self, key_id: &str) -> KmsResult<KeyMetadata> {
        let key_id = normalize_key_id(key_id)?;
        let current = self.keystore.get(&key_id).await?;
        if current.metadata.key_state == KeyState::PendingDeletion {
            return Err(KmsError::KeyUnavailable { key_id });
        }

        let record = self
            .keystore
            .update(&key_id, |r| {
                r.metadata.enabled = true;
                r.metadata.key_state = KeyState::Enabled;
            })
            .await?;
        debug!(%key_id, "key enabled");
        Ok(record.metadata)
    }

    /// `DisableKey`.
    ///
    /// # Errors
    ///
    /// Same as [`KmsService::enable_key`].
    pub async fn disable_key(&self, key_id: &str) -> KmsResult<KeyMetadata> {
        let key_id = normalize_key_id(key_id)?;
        let current = self.keystore.get(&key_id).await?;
        if current.metadata.key_state == KeyState::PendingDeletion {
            return Err(KmsError::KeyUnavailable { key_id });
        }

        let record = self
            .keystore
            .update(&key_id, |r| {
                r.metadata.enabled = false;
                r.metadata.key_state = KeyState::Disabled;
            })
            .await?;
        debug!(%key_id, "key disabled");
        Ok(record.metadata)
    }

    /// `ScheduleKeyDeletion`: disable the key and stamp a deletion date.
    ///
    /// Material destruction itself is deferred to an external scheduler;
    /// this call only transitions the state.
    ///
    /// # Errors
    ///
    /// - [`KmsError::NotFound`] for unknown keys.
    /// - [`KmsError::InvalidKeyId`] for windows below 7 days.
    pub async fn schedule_key_deletion(
        &self,
        request: ScheduleKeyDeletionRequest,
    ) -> KmsResult<ScheduleKeyDeletionResponse> {
        let key_id = normalize_key_id(&request.key_id)?;
        let window = request
            .pending_window_in_days
            .unwrap_or(DEFAULT_PENDING_WINDOW_DAYS);
        if window < MIN_PENDING_WINDOW_DAYS {
            return Err(KmsError::InvalidKeyId(format!(
                "pending window must be at least {MIN_PENDING_WINDOW_DAYS} days, got {window}"
            )));
        }

        let deletion_date = Utc::now() + Duration::days(i64::from(window));
        let record = self
            .keystore
            .update(&key_id, |r| {
                r.metadata.enabled = false;
                r.metadata.key_state = KeyState::PendingDeletion;
                r.metadata.deletion_date = Some(deletion_date);
            })
            .await?;

        warn!(%key_id, %deletion_date, "key scheduled for deletion");
        Ok(ScheduleKeyDeletionResponse {
            key_id: record.metadata.key_id,
            deletion_date,
            key_state: KeyState::PendingDeletion,
            pending_window_in_days: window,
        })
    }

    /// `Encrypt`: seal plaintext under an enabled key.
    ///
    /// # Errors
    ///
    /// - [`KmsError::NotFound`] for unknown keys.
    /// - [`KmsError::KeyUnavailable`] for disabled keys.
    /// - [`KmsError::InvalidCiphertext`] for undecodable base64 input.
    pub async fn encrypt(&self, request: EncryptRequest) -> KmsResult<EncryptResponse> {
        let key_id = normalize_key_id(&request.key_id)?;
        let record = self.keystore.get(&key_id).await?;
        if !record.metadata.enabled {
            return Err(KmsError::KeyUnavailable { key_id });
        }

        let plaintext = BASE64
            .decode(&request.plaintext)
            .map_err(|_| KmsError::InvalidCiphertext)?;

        let blob = seal(&record.material()?, &plaintext)?;

        Ok(EncryptResponse {
            ciphertext_blob: BASE64.encode(blob),
            key_id: record.metadata.key_id,
            arn: record.metadata.arn,
            encryption_algorithm: ALGORITHM.to_owned(),
        })
    }

    /// `Decrypt`: open a ciphertext blob.
    ///
    /// With a `key_id`, only that key is tried. Without one, every enabled
    /// key is tried in listing order and the first that opens the blob
    /// wins, since the blob format carries no key ID.
    ///
    /// # Errors
    ///
    /// - [`KmsError::NotFound`] / [`KmsError::KeyUnavailable`] for an
    ///   explicit key that is absent or disabled.
    /// - [`KmsError::InvalidCiphertext`] when nothing opens the blob.
    pub async fn decrypt(&self, request: DecryptRequest) -> KmsResult<DecryptResponse> {
        let blob = BASE64
            .decode(&request.ciphertext_blob)
            .map_err(|_| KmsError::InvalidCiphertext)?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(KmsError::InvalidCiphertext);
        }

        if let Some(key_id) = request.key_id.as_deref() {
            let key_id = normalize_key_id(key_id)?;
            let record = self.keystore.get(&key_id).await?;
            if !record.metadata.enabled {
                return Err(KmsError::KeyUnavailable { key_id });
            }
            let plaintext = open(&record.material()?, &blob)?;
            return Ok(DecryptResponse {
                plaintext: BASE64.encode(plaintext),
                key_id: record.metadata.key_id,
                arn: record.metadata.arn,
                encryption_algorithm: ALGORITHM.to_owned(),
            });
        }

        for record in self.keystore.list().await {
            if !record.metadata.enabled {
                continue;
            }
            if let Ok(plaintext) = open(&record.material()?, &blob) {
                return Ok(DecryptResponse {
                    plaintext: BASE64.encode(plaintext),
                    key_id: record.metadata.key_id,
                    arn: record.metadata.arn,
                    encryption_algorithm: ALGORITHM.to_owned(),
                });
            }
        }

        Err(KmsError::InvalidCiphertext)
    }

    /// Envelope-encrypt raw bytes under a key (in-process callers, SSE-KMS).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`KmsService::encrypt`].
    pub async fn encrypt_raw(&self, key_id: &str, plaintext: &[u8]) -> KmsResult<Vec<u8>> {
        let key_id = normalize_key_id(key_id)?;
        let record = self.keystore.get(&key_id).await?;
        if !record.metadata.enabled {
            return Err(KmsError::KeyUnavailable { key_id });
        }
        seal(&record.material()?, plaintext)
    }

    /// Envelope-decrypt raw bytes under a key (in-process callers, SSE-KMS).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`KmsService::decrypt`].
    pub async fn decrypt_raw(&self, key_id: &str, blob: &[u8]) -> KmsResult<Vec<u8>> {
        let key_id = normalize_key_id(key_id)?;
        let record = self.keystore.get(&key_id).await?;
        if !record.metadata.enabled {
            return Err(KmsError::KeyUnavailable { key_id });
        }
        open(&record.material()?, blob)
    }

    fn arn_for(&self, key_id: &str) -> String {
        format!("arn:aws:kms:{}:000000000000:key/{key_id}", self.region)
    }
}

/// Accept bare UUIDs or full key ARNs; reject anything else early.
fn normalize_key_id(input: &str) -> KmsResult<String> {
    let id = input
        .rsplit_once("key/")
        .map_or(input, |(_, id)| id)
        .trim()
        .to_owned();
    if id.is_empty() {
        return Err(KmsError::InvalidKeyId(input.to_owned()));
    }
    Ok(id)
}

fn seal(material: &[u8; MATERIAL_LEN], plaintext: &[u8]) -> KmsResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), Payload::from(plaintext))
        .map_err(|_| KmsError::Internal("encryption failed".to_owned()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

fn open(material: &[u8; MATERIAL_LEN], blob: &[u8]) -> KmsResult<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(KmsError::InvalidCiphertext);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material));
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload::from(ciphertext))
        .map_err(|_| KmsError::InvalidCiphertext)
}
