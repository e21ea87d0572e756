//! Persistent JSON keystore.
//!
//! One file maps `key_id → { metadata, material_base64 }`. The whole map is
//! loaded at open and rewritten atomically (temp file + rename, owner-only
//! permissions) after every mutation. A single `tokio::sync::Mutex` guards
//! the map, so mutations serialize: the keystore is the only writer of its
//! file.
//!
//! Key material stays inside this module and [`crate::service`]; no API
//! hands it out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{KmsError, KmsResult};
use crate::model::KeyMetadata;

/// Length of key material in bytes (256-bit symmetric keys).
pub const MATERIAL_LEN: usize = 32;

/// One persisted key record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// The key's metadata (what `DescribeKey` returns).
    pub metadata: KeyMetadata,
    /// Base64-encoded 256-bit key material.
    pub material_base64: String,
}

impl KeyRecord {
    /// Decode the key material.
    ///
    /// # Errors
    ///
    /// [`KmsError::Internal`] if the stored material is not valid base64 of
    /// the right length.
    pub fn material(&self) -> KmsResult<[u8; MATERIAL_LEN]> {
        let bytes = BASE64
            .decode(&self.material_base64)
            .map_err(|e| KmsError::Internal(format!("corrupt key material: {e}")))?;
        <[u8; MATERIAL_LEN]>::try_from(bytes.as_slice())
            .map_err(|_| KmsError::Internal("key material is not 32 bytes".to_owned()))
    }
}

/// The keystore: an in-memory map backed by one JSON file.
#[derive(Debug)]
pub struct Keystore {
    path: PathBuf,
    keys: Mutex<HashMap<String, KeyRecord>>,
}

impl Keystore {
    /// Open (or create) the keystore at `path`.
    ///
    /// # Errors
    ///
    /// [`KmsError::Internal`] if the file exists but cannot be read or
    /// parsed.
    pub async fn open(path: impl Into<PathBuf>) -> KmsResult<Self> {
        let path = path.into();
        let keys = if path.exists() {
            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| KmsError::Internal(format!("cannot read keystore: {e}")))?;
            serde_json::from_slice(&raw)
                .map_err(|e| KmsError::Internal(format!("cannot parse keystore: {e}")))?
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), "keystore opened");
        Ok(Self {
            path,
            keys: Mutex::new(keys),
        })
    }

    /// Insert a record and persist.
    ///
    /// # Errors
    ///
    /// Propagates persistence failures.
    pub async fn insert(&self, record: KeyRecord) -> KmsResult<()> {
        let mut keys = self.keys.lock().await;
        keys.insert(record.metadata.key_id.clone(), record);
        self.persist(&keys).await
    }

    /// Fetch a record by key ID.
    ///
    /// # Errors
    ///
    /// [`KmsError::NotFound`] for unknown IDs.
    pub async fn get(&self, key_id: &str) -> KmsResult<KeyRecord> {
        self.keys
            .lock()
            .await
            .get(key_id)
            .cloned()
            .ok_or_else(|| KmsError::NotFound {
                key_id: key_id.to_owned(),
            })
    }

    /// All records, sorted by creation date then key ID for stable listings.
    pub async fn list(&self) -> Vec<KeyRecord> {
        let keys = self.keys.lock().await;
        let mut records: Vec<KeyRecord> = keys.values().cloned().collect();
        records.sort_by(|a, b| {
            a.metadata
                .creation_date
                .cmp(&b.metadata.creation_date)
                .then_with(|| a.metadata.key_id.cmp(&b.metadata.key_id))
        });
        records
    }

    /// Apply a mutation to one record and persist.
    ///
    /// # Errors
    ///
    /// [`KmsError::NotFound`] for unknown IDs; persistence failures.
    pub async fn update<F>(&self, key_id: &str, mutate: F) -> KmsResult<KeyRecord>
    where
        F: FnOnce(&mut KeyRecord),
    {
        let mut keys = self.keys.lock().await;
        let record = keys.get_mut(key_id).ok_or_else(|| KmsError::NotFound {
            key_id: key_id.to_owned(),
        })?;
        mutate(record);
        let updated = record.clone();
        self.persist(&keys).await?;
        Ok(updated)
    }

    /// Write the whole map out atomically.
    async fn persist(&self, keys: &HashMap<String, KeyRecord>) -> KmsResult<()> {
        let payload = serde_json::to_vec_pretty(keys)
            .map_err(|e| KmsError::Internal(format!("cannot serialize keystore: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| KmsError::Internal(format!("cannot create keystore dir: {e}")))?;
            }
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let temp = tempfile::NamedTempFile::new_in(dir)?;
            std::fs::write(temp.path(), &payload)?;
            set_owner_only(temp.path())?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| KmsError::Internal(format!("persist task failed: {e}")))?
        .map_err(|e| KmsError::Internal(format!("cannot write keystore: {e}")))?;

        debug!(path = %self.path.display(), "keystore persisted");
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
