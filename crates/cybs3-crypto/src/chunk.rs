//! Chunk geometry for the streaming AEAD pipeline.
//!
//! Every chunk on the wire is `nonce(12) ‖ ciphertext(N) ‖ tag(16)`, so the
//! per-chunk overhead is a fixed 28 bytes. The chunk size is chosen at
//! encryption time and is **not** carried in the stream: readers reconstruct
//! frames by consuming exactly `chunk_size + 28` bytes at a time, with the
//! final frame allowed to be shorter.

use crate::error::CryptoResult;
use crate::keys::{self, DataKey, NONCE_LEN, TAG_LEN};

/// Fixed per-chunk overhead: 12-byte nonce + 16-byte tag.
pub const CHUNK_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Exact ciphertext size for a plaintext of `plaintext_size` bytes encrypted
/// at `chunk_size`.
///
/// Empty plaintext yields empty ciphertext. Otherwise every full chunk costs
/// `chunk_size + 28` and a non-empty remainder costs `rem + 28`.
#[must_use]
pub fn encrypted_size(plaintext_size: u64, chunk_size: usize) -> u64 {
    if plaintext_size == 0 {
        return 0;
    }
    let chunk = chunk_size as u64;
    let overhead = CHUNK_OVERHEAD as u64;
    let full = plaintext_size / chunk;
    let rem = plaintext_size % chunk;
    full * (chunk + overhead) + if rem == 0 { 0 } else { rem + overhead }
}

/// Pick a chunk size for a file of the given size.
///
/// Small files use small chunks to keep per-request latency low; large
/// files use large chunks to amortize the per-chunk overhead.
#[must_use]
pub fn optimal_chunk_size(file_size: u64) -> usize {
    if file_size < 10 * MIB {
        (256 * KIB) as usize
    } else if file_size < 100 * MIB {
        MIB as usize
    } else if file_size < GIB {
        (5 * MIB) as usize
    } else {
        (16 * MIB) as usize
    }
}

/// Seal one plaintext chunk under the data key.
///
/// # Errors
///
/// Propagates [`crate::CryptoError::EncryptionFailed`] from the cipher.
pub fn seal_chunk(key: &DataKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    keys::seal(key.as_bytes(), plaintext)
}

/// Open one ciphertext frame produced by [`seal_chunk`].
///
/// # Errors
///
/// - [`crate::CryptoError::InvalidCiphertext`] on a frame shorter than the
///   overhead.
/// - [`crate::CryptoError::DecryptionFailed`] on tag mismatch.
pub fn open_chunk(key: &DataKey, frame: &[u8]) -> CryptoResult<Vec<u8>> {
    keys::open(key.as_bytes(), frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_report_zero_size_for_empty_plaintext() {
        assert_eq!(encrypted_size(0, DEFAULT_CHUNK_SIZE), 0);
    }

    #[test]
    fn test_should_compute_size_for_exact_multiple() {
        // 5 MiB at 1 MiB chunks: five full frames.
        let size = encrypted_size(5 * MIB, MIB as usize);
        assert_eq!(size, 5 * (MIB + 28));
    }

    #[test]
    fn test_should_compute_size_with_remainder() {
        // 1 MiB + 100 bytes: one full frame plus a short frame.
        let size = encrypted_size(MIB + 100, MIB as usize);
        assert_eq!(size, (MIB + 28) + (100 + 28));
    }

    #[test]
    fn test_should_compute_size_for_sub_chunk_plaintext() {
        assert_eq!(encrypted_size(1, DEFAULT_CHUNK_SIZE), 29);
        assert_eq!(encrypted_size(100, DEFAULT_CHUNK_SIZE), 128);
    }

    #[test]
    fn test_should_pick_optimal_chunk_size_by_tier() {
        assert_eq!(optimal_chunk_size(0), (256 * KIB) as usize);
        assert_eq!(optimal_chunk_size(10 * MIB - 1), (256 * KIB) as usize);
        assert_eq!(optimal_chunk_size(10 * MIB), MIB as usize);
        assert_eq!(optimal_chunk_size(100 * MIB - 1), MIB as usize);
        assert_eq!(optimal_chunk_size(100 * MIB), (5 * MIB) as usize);
        assert_eq!(optimal_chunk_size(GIB - 1), (5 * MIB) as usize);
        assert_eq!(optimal_chunk_size(GIB), (16 * MIB) as usize);
        assert_eq!(optimal_chunk_size(100 * GIB), (16 * MIB) as usize);
    }

    #[test]
    fn test_should_roundtrip_single_chunk() {
        let key = DataKey::generate();
        let frame = seal_chunk(&key, b"chunk payload").expect("seal");
        assert_eq!(frame.len(), 13 + CHUNK_OVERHEAD);
        assert_eq!(open_chunk(&key, &frame).expect("open"), b"chunk payload");
    }

    #[test]
    fn test_should_predict_frame_sizes_exactly() {
        // The size helper must agree with what seal_chunk actually emits.
        let key = DataKey::generate();
        for (plaintext_len, chunk_size) in [(0usize, 64usize), (10, 64), (64, 64), (65, 64), (200, 64)] {
            let plaintext = vec![0x5A; plaintext_len];
            let mut total = 0usize;
            for piece in plaintext.chunks(chunk_size) {
                total += seal_chunk(&key, piece).expect("seal").len();
            }
            assert_eq!(
                total as u64,
                encrypted_size(plaintext_len as u64, chunk_size),
                "mismatch for plaintext {plaintext_len} at chunk {chunk_size}"
            );
        }
    }
}
