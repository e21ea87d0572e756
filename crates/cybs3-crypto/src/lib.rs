//! Client-side cryptography for CybS3.
//!
//! Three layers live here, bottom-up:
//!
//! 1. **Key hierarchy** ([`mnemonic`], [`keys`]): a BIP-39 mnemonic is the
//!    only user-visible secret. It deterministically derives a 256-bit
//!    master key; a random 256-bit data key does the actual object-body
//!    encryption and is persisted only inside the encrypted configuration.
//! 2. **Chunked AEAD** ([`chunk`], [`stream`]): object bodies travel as a
//!    concatenation of independently sealed AES-256-GCM chunks
//!    (`nonce(12) ‖ ciphertext ‖ tag(16)`), so uploads and downloads stream
//!    with bounded memory and per-chunk authenticity.
//! 3. **Encrypted configuration store** ([`config_store`]): vaults,
//!    settings, and the data key persist in a single HMAC-protected,
//!    AEAD-sealed file. Rotating the mnemonic re-wraps the file without
//!    touching the data key, so stored ciphertext stays readable.

pub mod chunk;
pub mod config_store;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod stream;

pub use chunk::{CHUNK_OVERHEAD, DEFAULT_CHUNK_SIZE, encrypted_size, optimal_chunk_size};
pub use config_store::{ConfigStore, EncryptedConfig, Settings, VaultConfig};
pub use error::{CryptoError, CryptoResult};
pub use keys::{DataKey, KEY_LEN, MasterKey};
pub use mnemonic::Mnemonic;
pub use stream::{DecryptStream, EncryptStream, decrypt_bytes, encrypt_bytes};
