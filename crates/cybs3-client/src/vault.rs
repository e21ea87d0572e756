//! Settings resolution: explicit arguments, environment, vault, defaults.
//!
//! Precedence, highest first: values the caller passed explicitly, the
//! process environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! `AWS_REGION`, `AWS_BUCKET`), the active vault from the encrypted
//! configuration, and finally the configuration's default settings.

use cybs3_core::error::{ClientError, ClientResult};
use cybs3_core::types::{Credentials, Region};
use cybs3_crypto::EncryptedConfig;

/// Explicit overrides supplied by the caller (e.g. command-line flags).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Endpoint URL.
    pub endpoint: Option<String>,
    /// Region name.
    pub region: Option<String>,
    /// Bucket name.
    pub bucket: Option<String>,
    /// Access key ID.
    pub access_key: Option<String>,
    /// Secret access key.
    pub secret_key: Option<String>,
    /// Vault to use instead of the active one.
    pub vault: Option<String>,
}

/// A snapshot of the process environment relevant to resolution.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    /// `AWS_ACCESS_KEY_ID`.
    pub access_key: Option<String>,
    /// `AWS_SECRET_ACCESS_KEY`.
    pub secret_key: Option<String>,
    /// `AWS_REGION`.
    pub region: Option<String>,
    /// `AWS_BUCKET`.
    pub bucket: Option<String>,
}

impl EnvSettings {
    /// Capture the relevant environment variables.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            region: std::env::var("AWS_REGION").ok(),
            bucket: std::env::var("AWS_BUCKET").ok(),
        }
    }
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    /// Endpoint URL.
    pub endpoint: String,
    /// Region.
    pub region: Region,
    /// Credentials.
    pub credentials: Credentials,
    /// Default bucket, if any source provided one.
    pub bucket: Option<String>,
}

/// Resolve effective settings.
///
/// # Errors
///
/// - [`ClientError::VaultNotFound`] if an explicitly named vault is
///   absent.
/// - [`ClientError::InvalidInput`] if no source provides an endpoint or
///   credentials.
pub fn resolve(
    overrides: &Overrides,
    env: &EnvSettings,
    config: &EncryptedConfig,
) -> ClientResult<EffectiveSettings> {
    let vault = match overrides.vault.as_deref() {
        Some(name) => Some(config.vault(name).ok_or_else(|| ClientError::VaultNotFound {
            name: name.to_owned(),
        })?),
        None => config.active_vault(),
    };

    let endpoint = overrides
        .endpoint
        .clone()
        .or_else(|| vault.map(|v| v.endpoint.clone()))
        .or_else(|| config.settings.endpoint.clone())
        .ok_or_else(|| ClientError::InvalidInput("no endpoint configured".to_owned()))?;

    let region = overrides
        .region
        .clone()
        .or_else(|| env.region.clone())
        .or_else(|| vault.map(|v| v.region.clone()))
        .or_else(|| config.settings.region.clone())
        .map_or_else(Region::default, Region::new);

    let access_key = overrides
        .access_key
        .clone()
        .or_else(|| env.access_key.clone())
        .or_else(|| vault.map(|v| v.access_key.clone()))
        .or_else(|| config.settings.access_key.clone())
        .ok_or_else(|| ClientError::InvalidInput("no access key configured".to_owned()))?;

    let secret_key = overrides
        .secret_key
        .clone()
        .or_else(|| env.secret_key.clone())
        .or_else(|| vault.map(|v| v.secret_key.clone()))
        .or_else(|| config.settings.secret_key.clone())
        .ok_or_else(|| ClientError::InvalidInput("no secret key configured".to_owned()))?;

    let bucket = overrides
        .bucket
        .clone()
        .or_else(|| env.bucket.clone())
        .or_else(|| vault.and_then(|v| v.bucket.clone()))
        .or_else(|| config.settings.bucket.clone());

    Ok(EffectiveSettings {
        endpoint,
        region,
        credentials: Credentials::new(access_key, secret_key),
        bucket,
    })
}
