//! KMS-API-compatible key management for CybS3.
//!
//! The service owns symmetric key material that never leaves its process:
//! callers get key IDs and metadata, and hand plaintext/ciphertext across
//! the API boundary for envelope encryption. Three layers:
//!
//! - [`keystore`]: the persistent JSON keystore, one file, single-writer,
//!   rewritten atomically after every mutation.
//! - [`service`]: the operation layer (`CreateKey`, `Encrypt`, …) with the
//!   AWS-style failure taxonomy.
//! - [`http`]: a minimal `POST /{Operation}` JSON-over-HTTP surface for
//!   remote callers.

pub mod error;
pub mod http;
pub mod keystore;
pub mod model;
pub mod service;

pub use error::{KmsError, KmsResult};
pub use keystore::Keystore;
pub use model::{KeyMetadata, KeyState};
pub use service::KmsService;
