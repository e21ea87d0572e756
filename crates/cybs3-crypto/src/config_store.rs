//! Encrypted configuration store.
//!
//! All client configuration (vaults, default settings, and the data key)
//! persists in a single file sealed under the master key:
//!
//! ```text
//! HMAC-SHA256(master, sealed)(32) ‖ sealed
//! sealed = nonce(12) ‖ AES-256-GCM(serde_json(EncryptedConfig)) ‖ tag(16)
//! ```
//!
//! The HMAC is verified **before** any decryption attempt, so a corrupted
//! or foreign file is rejected cheaply and with a precise error. Saves are
//! atomic (temp file in the same directory, then rename) and enforce
//! owner-only permissions. All mutation goes through a single
//! `tokio::sync::Mutex`, giving the store single-writer semantics per
//! process.
//!
//! Rotating the mnemonic re-seals the file under the new master key but
//! copies the data key verbatim, so every object encrypted before the
//! rotation stays readable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{self, DataKey, KEY_LEN, MasterKey};
use crate::mnemonic::Mnemonic;

/// Current configuration format version.
pub const CONFIG_VERSION: u32 = 2;

/// Configuration file name inside the config directory.
const CONFIG_FILE: &str = "config.enc";

/// Legacy (v1) vaults file name, pre-dating the unified config format.
const LEGACY_VAULTS_FILE: &str = ".cybs3.vaults";

/// Length of the HMAC prefix on the config file.
const HMAC_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Config model
// ---------------------------------------------------------------------------

/// Connection settings for one named vault (an endpoint + credential set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault name.
    pub name: String,
    /// The S3 endpoint URL.
    pub endpoint: String,
    /// Access key ID for this vault.
    pub access_key: String,
    /// Secret access key for this vault.
    pub secret_key: String,
    /// Region for SigV4 signing.
    pub region: String,
    /// Default bucket, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

/// Default settings applied when no vault or explicit argument overrides
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Default endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Default region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Default bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Default access key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    /// Default secret access key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

/// The decrypted configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedConfig {
    /// Format version (currently 2).
    pub version: u32,
    /// The data key, base64 inside the sealed JSON.
    #[serde(with = "base64_key")]
    pub data_key: [u8; KEY_LEN],
    /// Name of the vault operations default to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_vault_name: Option<String>,
    /// Configured vaults, in insertion order.
    #[serde(default)]
    pub vaults: Vec<VaultConfig>,
    /// Default settings.
    #[serde(default)]
    pub settings: Settings,
}

impl EncryptedConfig {
    /// A fresh configuration with a newly generated data key.
    #[must_use]
    pub fn new_with_random_key() -> Self {
        Self {
            version: CONFIG_VERSION,
            data_key: *DataKey::generate().as_bytes(),
            active_vault_name: None,
            vaults: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Look up a vault by name.
    #[must_use]
    pub fn vault(&self, name: &str) -> Option<&VaultConfig> {
        self.vaults.iter().find(|v| v.name == name)
    }

    /// The active vault, if one is set and still exists.
    #[must_use]
    pub fn active_vault(&self) -> Option<&VaultConfig> {
        self.active_vault_name
            .as_deref()
            .and_then(|name| self.vault(name))
    }

    /// The data key as a typed handle.
    #[must_use]
    pub fn data_key(&self) -> DataKey {
        DataKey::from_bytes(self.data_key)
    }
}

/// Base64 serde adapter for the 32-byte data key.
mod base64_key {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::keys::KEY_LEN;

    pub fn serialize<S: Serializer>(key: &[u8; KEY_LEN], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; KEY_LEN], D::Error> {
        let encoded = String::deserialize(de)?;
        let bytes = STANDARD
            .decode(&encoded)
            .map_err(serde::de::Error::custom)?;
        <[u8; KEY_LEN]>::try_from(bytes.as_slice())
            .map_err(|_| serde::de::Error::custom("data key must be 32 bytes"))
    }
}

// ---------------------------------------------------------------------------
// Legacy v1 vaults file
// ---------------------------------------------------------------------------

/// The payload of the legacy `.cybs3.vaults` file (sealed without an HMAC
/// prefix, directly under the master key).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LegacyVaults {
    #[serde(default)]
    vaults: Vec<VaultConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_vault_name: Option<String>,
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// Handle to the on-disk encrypted configuration.
///
/// Cheap to clone is not a goal here; create one per process and share it.
/// All operations that touch the file serialize on an internal mutex.
#[derive(Debug)]
pub struct ConfigStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// A store rooted at the given directory (created on first use).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// A store rooted at the conventional `~/.cybs3` directory.
    ///
    /// # Errors
    ///
    /// Fails when no home directory can be determined.
    pub fn default_location() -> CryptoResult<Self> {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| CryptoError::Corrupted("cannot determine home directory".to_owned()))?;
        Ok(Self::new(home.join(".cybs3")))
    }

    /// Path of the config file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Path of the legacy vaults file.
    #[must_use]
    pub fn legacy_path(&self) -> PathBuf {
        self.dir.join(LEGACY_VAULTS_FILE)
    }

    /// Load (or initialize) the configuration with the given mnemonic.
    ///
    /// - Missing config file, legacy file present: run the one-shot
    ///   migration.
    /// - Both absent: create a fresh config with a random data key, save
    ///   it, and return it.
    /// - Otherwise: verify the HMAC, decrypt, check the version.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::DecryptionFailed`] for a wrong mnemonic.
    /// - [`CryptoError::UnsupportedVersion`] for files from a newer format.
    /// - [`CryptoError::Corrupted`] for structurally broken files.
    pub async fn load(&self, mnemonic: &Mnemonic) -> CryptoResult<EncryptedConfig> {
        let master = mnemonic.derive_master_key()?;
        let _guard = self.write_lock.lock().await;
        self.load_locked(&master).await
    }

    /// Persist the configuration sealed under the given mnemonic.
    ///
    /// # Errors
    ///
    /// Propagates I/O and serialization failures.
    pub async fn save(&self, mnemonic: &Mnemonic, config: &EncryptedConfig) -> CryptoResult<()> {
        let master = mnemonic.derive_master_key()?;
        let _guard = self.write_lock.lock().await;
        self.save_locked(&master, config).await
    }

    /// Re-seal the configuration under a new mnemonic.
    ///
    /// The data key is preserved verbatim, so ciphertext on storage remains
    /// readable after rotation.
    ///
    /// # Errors
    ///
    /// Fails if the old mnemonic cannot open the current file.
    pub async fn rotate_key(
        &self,
        old_mnemonic: &Mnemonic,
        new_mnemonic: &Mnemonic,
    ) -> CryptoResult<()> {
        let old_master = old_mnemonic.derive_master_key()?;
        let new_master = new_mnemonic.derive_master_key()?;

        let _guard = self.write_lock.lock().await;
        let config = self.load_locked(&old_master).await?;
        self.save_locked(&new_master, &config).await?;
        info!("configuration re-sealed under new mnemonic");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals (called with the write lock held)
    // -----------------------------------------------------------------------

    async fn load_locked(&self, master: &MasterKey) -> CryptoResult<EncryptedConfig> {
        self.ensure_dir().await?;

        let path = self.config_path();
        if !path.exists() {
            if self.legacy_path().exists() {
                return self.migrate_legacy(master).await;
            }
            debug!(path = %path.display(), "no configuration, creating fresh");
            let config = EncryptedConfig::new_with_random_key();
            self.save_locked(master, &config).await?;
            return Ok(config);
        }

        let raw = tokio::fs::read(&path).await?;
        if raw.len() <= HMAC_LEN {
            return Err(CryptoError::Corrupted(
                "config file shorter than its HMAC prefix".to_owned(),
            ));
        }

        let (tag, sealed) = raw.split_at(HMAC_LEN);
        let payload = if keys::hmac_verify(master.as_bytes(), sealed, tag) {
            keys::open(master.as_bytes(), sealed)?
        } else {
            // Not the v2 layout under this key. A v1 file has no HMAC
            // prefix; try the whole file as a sealed blob before giving up.
            warn!("config HMAC mismatch, attempting legacy v1 layout");
            keys::open(master.as_bytes(), &raw)?
        };

        let mut config: EncryptedConfig = serde_json::from_slice(&payload)?;
        if config.version > CONFIG_VERSION {
            return Err(CryptoError::UnsupportedVersion(config.version));
        }
        if config.version < CONFIG_VERSION {
            info!(
                from = config.version,
                to = CONFIG_VERSION,
                "upgrading configuration version"
            );
            config.version = CONFIG_VERSION;
            self.save_locked(master, &config).await?;
        }

        Ok(config)
    }

    async fn save_locked(&self, master: &MasterKey, config: &EncryptedConfig) -> CryptoResult<()> {
        self.ensure_dir().await?;

        let payload = serde_json::to_vec(config)?;
        let sealed = keys::seal(master.as_bytes(), &payload)?;
        let tag = keys::hmac_sha256(master.as_bytes(), &sealed);

        let mut out = Vec::with_capacity(HMAC_LEN + sealed.len());
        out.extend_from_slice(&tag);
        out.extend_from_slice(&sealed);

        // Write to a temp file in the same directory, fix permissions, then
        // rename over the target so readers never observe a torn file.
        let dir = self.dir.clone();
        let path = self.config_path();
        tokio::task::spawn_blocking(move || -> CryptoResult<()> {
            let temp = tempfile::NamedTempFile::new_in(&dir)?;
            std::fs::write(temp.path(), &out)?;
            set_file_permissions(temp.path())?;
            temp.persist(&path)
                .map_err(|e| CryptoError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| CryptoError::Corrupted(format!("save task failed: {e}")))??;

        debug!(path = %self.config_path().display(), "configuration saved");
        Ok(())
    }

    /// One-shot migration from the legacy `.cybs3.vaults` layout.
    ///
    /// The legacy file is sealed directly under the master key with no HMAC
    /// prefix. Its vaults are copied into a fresh v2 config whose data key
    /// is **the legacy master key itself**: objects uploaded before the
    /// split between master and data keys were encrypted directly with the
    /// master key, and only this assignment keeps them readable.
    async fn migrate_legacy(&self, master: &MasterKey) -> CryptoResult<EncryptedConfig> {
        let legacy_path = self.legacy_path();
        info!(path = %legacy_path.display(), "migrating legacy vaults file");

        let raw = tokio::fs::read(&legacy_path).await?;
        let payload = keys::open(master.as_bytes(), &raw)?;
        let legacy: LegacyVaults = serde_json::from_slice(&payload)?;

        let config = EncryptedConfig {
            version: CONFIG_VERSION,
            data_key: *master.as_bytes(),
            active_vault_name: legacy.active_vault_name,
            vaults: legacy.vaults,
            settings: Settings::default(),
        };

        self.save_locked(master, &config).await?;

        let backup = PathBuf::from(format!("{}.bak", legacy_path.display()));
        tokio::fs::rename(&legacy_path, &backup).await?;
        info!(backup = %backup.display(), "legacy vaults file renamed");

        Ok(config)
    }

    async fn ensure_dir(&self) -> CryptoResult<()> {
        if !self.dir.exists() {
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        set_dir_permissions(&self.dir)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const M1: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const M2: &str =
        "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn mnemonic(phrase: &str) -> Mnemonic {
        Mnemonic::parse(phrase).expect("valid test mnemonic")
    }

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("cfg"));
        (dir, store)
    }

    fn sample_vault(name: &str) -> VaultConfig {
        VaultConfig {
            name: name.to_owned(),
            endpoint: "https://s3.example.com".to_owned(),
            access_key: "AKID".to_owned(),
            secret_key: "SECRET".to_owned(),
            region: "us-east-1".to_owned(),
            bucket: Some("data".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_should_create_fresh_config_when_absent() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);

        let config = store.load(&m).await.expect("load");
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.vaults.is_empty());
        assert!(config.active_vault_name.is_none());
        assert!(store.config_path().exists());
    }

    #[tokio::test]
    async fn test_should_roundtrip_config() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);

        let mut config = store.load(&m).await.expect("initial load");
        config.vaults.push(sample_vault("prod"));
        config.active_vault_name = Some("prod".to_owned());
        store.save(&m, &config).await.expect("save");

        let reloaded = store.load(&m).await.expect("reload");
        assert_eq!(reloaded.vaults.len(), 1);
        assert_eq!(reloaded.active_vault().map(|v| v.name.as_str()), Some("prod"));
        assert_eq!(reloaded.data_key, config.data_key);
    }

    #[tokio::test]
    async fn test_should_reject_wrong_mnemonic() {
        let (_tmp, store) = store();
        store.load(&mnemonic(M1)).await.expect("create");

        let result = store.load(&mnemonic(M2)).await;
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_should_keep_data_key_stable_across_loads() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);

        let first = store.load(&m).await.expect("first");
        let second = store.load(&m).await.expect("second");
        assert_eq!(first.data_key, second.data_key);
    }

    #[tokio::test]
    async fn test_should_preserve_data_key_across_rotation() {
        let (_tmp, store) = store();
        let m1 = mnemonic(M1);
        let m2 = mnemonic(M2);

        let mut config = store.load(&m1).await.expect("create");
        config.vaults.push(sample_vault("prod"));
        store.save(&m1, &config).await.expect("save");

        store.rotate_key(&m1, &m2).await.expect("rotate");

        // Old mnemonic no longer opens the file.
        assert!(matches!(
            store.load(&m1).await,
            Err(CryptoError::DecryptionFailed)
        ));

        // New mnemonic sees the same data key and vaults.
        let rotated = store.load(&m2).await.expect("load with new mnemonic");
        assert_eq!(rotated.data_key, config.data_key);
        assert_eq!(rotated.vaults.len(), 1);
    }

    #[tokio::test]
    async fn test_should_keep_object_ciphertext_readable_after_rotation() {
        use crate::stream::{decrypt_bytes, encrypt_bytes};

        let (_tmp, store) = store();
        let m1 = mnemonic(M1);
        let m2 = mnemonic(M2);

        // Encrypt an object body with the data key under M1.
        let config = store.load(&m1).await.expect("create");
        let body = vec![0x61u8; 100];
        let blob = encrypt_bytes(&config.data_key(), 64, &body).expect("encrypt");

        store.rotate_key(&m1, &m2).await.expect("rotate");

        // The blob on storage is untouched and still opens under the
        // (unchanged) data key loaded through M2.
        let rotated = store.load(&m2).await.expect("load");
        let decrypted = decrypt_bytes(&rotated.data_key(), 64, &blob).expect("decrypt");
        assert_eq!(decrypted, body);
    }

    #[tokio::test]
    async fn test_should_reject_corrupted_file() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);
        store.load(&m).await.expect("create");

        // Flip a byte inside the sealed payload: HMAC fails, and the legacy
        // fallback cannot open it either.
        let path = store.config_path();
        let mut raw = std::fs::read(&path).expect("read");
        let mid = raw.len() / 2;
        raw[mid] ^= 0xFF;
        std::fs::write(&path, &raw).expect("write");

        let result = store.load(&m).await;
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_should_reject_truncated_file() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);
        store.load(&m).await.expect("create");

        let path = store.config_path();
        std::fs::write(&path, [0u8; HMAC_LEN]).expect("write");

        let result = store.load(&m).await;
        assert!(matches!(result, Err(CryptoError::Corrupted(_))));
    }

    #[tokio::test]
    async fn test_should_reject_newer_version() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);
        let master = m.derive_master_key().expect("derive");

        // Hand-craft a config claiming a future version.
        let mut config = EncryptedConfig::new_with_random_key();
        config.version = CONFIG_VERSION + 1;
        let payload = serde_json::to_vec(&config).expect("serialize");
        let sealed = keys::seal(master.as_bytes(), &payload).expect("seal");
        let tag = keys::hmac_sha256(master.as_bytes(), &sealed);
        let mut raw = tag.to_vec();
        raw.extend_from_slice(&sealed);
        std::fs::create_dir_all(store.config_path().parent().expect("parent")).expect("mkdir");
        std::fs::write(store.config_path(), &raw).expect("write");

        let result = store.load(&m).await;
        assert!(matches!(
            result,
            Err(CryptoError::UnsupportedVersion(v)) if v == CONFIG_VERSION + 1
        ));
    }

    #[tokio::test]
    async fn test_should_migrate_legacy_vaults_file() {
        let (_tmp, store) = store();
        let m = mnemonic(M1);
        let master = m.derive_master_key().expect("derive");

        // Seed a legacy file: sealed JSON, no HMAC prefix.
        let legacy = LegacyVaults {
            vaults: vec![sample_vault("legacy-vault")],
            active_vault_name: Some("legacy-vault".to_owned()),
        };
        let payload = serde_json::to_vec(&legacy).expect("serialize");
        let sealed = keys::seal(master.as_bytes(), &payload).expect("seal");
        std::fs::create_dir_all(store.legacy_path().parent().expect("parent")).expect("mkdir");
        std::fs::write(store.legacy_path(), &sealed).expect("write legacy");

        let config = store.load(&m).await.expect("migrate");

        // Vaults carried over; the data key equals the legacy master key.
        assert_eq!(config.vaults.len(), 1);
        assert_eq!(config.vaults[0].name, "legacy-vault");
        assert_eq!(config.active_vault_name.as_deref(), Some("legacy-vault"));
        assert_eq!(&config.data_key, master.as_bytes());

        // Legacy file renamed to .bak; new config in place and loadable.
        assert!(!store.legacy_path().exists());
        let backup = PathBuf::from(format!("{}.bak", store.legacy_path().display()));
        assert!(backup.exists());
        let reloaded = store.load(&m).await.expect("reload");
        assert_eq!(&reloaded.data_key, master.as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_should_set_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, store) = store();
        store.load(&mnemonic(M1)).await.expect("create");

        let file_mode = std::fs::metadata(store.config_path())
            .expect("file metadata")
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);

        let dir_mode = std::fs::metadata(store.config_path().parent().expect("parent"))
            .expect("dir metadata")
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn test_should_find_vault_by_name() {
        let mut config = EncryptedConfig::new_with_random_key();
        config.vaults.push(sample_vault("a"));
        config.vaults.push(sample_vault("b"));

        assert!(config.vault("a").is_some());
        assert!(config.vault("missing").is_none());

        config.active_vault_name = Some("b".to_owned());
        assert_eq!(config.active_vault().map(|v| v.name.as_str()), Some("b"));

        config.active_vault_name = Some("gone".to_owned());
        assert!(config.active_vault().is_none());
    }
}
