//! Streaming chunked-AEAD encryption and decryption.
//!
//! [`EncryptStream`] and [`DecryptStream`] adapt an arbitrary upstream
//! `Stream<Item = Result<Bytes, CryptoError>>` into its sealed (or opened)
//! counterpart, independent of how the upstream fragments its bytes:
//!
//! - The encryptor accumulates plaintext until a full chunk is buffered,
//!   seals it, and emits `nonce(12) ‖ ciphertext ‖ tag(16)`. At end of
//!   stream any residual bytes become one final short chunk. Empty input
//!   emits nothing.
//! - The decryptor accumulates ciphertext until a full frame
//!   (`chunk_size + 28` bytes) is buffered, opens it, and emits the
//!   plaintext. At end of stream the residual is the final short frame; a
//!   residual shorter than 29 bytes cannot contain a sealed chunk and is
//!   rejected as invalid ciphertext.
//!
//! Memory is bounded by one chunk (plus one upstream fragment) per adapter.
//! Errors are terminal: once an item yields `Err`, the stream fuses.
//! Neither adapter spawns tasks, so dropping the consumer releases every
//! buffer immediately.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;

use crate::chunk::{self, CHUNK_OVERHEAD};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::DataKey;

pin_project! {
    /// Stream adapter sealing plaintext into AEAD chunks.
    #[derive(Debug)]
    pub struct EncryptStream<S> {
        #[pin]
        upstream: S,
        key: DataKey,
        chunk_size: usize,
        buffer: BytesMut,
        upstream_done: bool,
        finished: bool,
    }
}

impl<S> EncryptStream<S> {
    /// Wrap `upstream`, sealing under `key` at `chunk_size`.
    #[must_use]
    pub fn new(upstream: S, key: DataKey, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            upstream,
            key,
            chunk_size,
            buffer: BytesMut::new(),
            upstream_done: false,
            finished: false,
        }
    }
}

impl<S> Stream for EncryptStream<S>
where
    S: Stream<Item = Result<Bytes, CryptoError>>,
{
    type Item = Result<Bytes, CryptoError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        loop {
            // A full chunk is ready: seal and emit it.
            if this.buffer.len() >= *this.chunk_size {
                let plain = this.buffer.split_to(*this.chunk_size);
                return match chunk::seal_chunk(this.key, &plain) {
                    Ok(frame) => Poll::Ready(Some(Ok(Bytes::from(frame)))),
                    Err(e) => {
                        *this.finished = true;
                        Poll::Ready(Some(Err(e)))
                    }
                };
            }

            if *this.upstream_done {
                *this.finished = true;
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let plain = this.buffer.split();
                return Poll::Ready(Some(
                    chunk::seal_chunk(this.key, &plain).map(Bytes::from),
                ));
            }

            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

pin_project! {
    /// Stream adapter opening AEAD chunks back into plaintext.
    #[derive(Debug)]
    pub struct DecryptStream<S> {
        #[pin]
        upstream: S,
        key: DataKey,
        frame_size: usize,
        buffer: BytesMut,
        upstream_done: bool,
        finished: bool,
    }
}

impl<S> DecryptStream<S> {
    /// Wrap `upstream`, opening frames sealed at `chunk_size` under `key`.
    #[must_use]
    pub fn new(upstream: S, key: DataKey, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            upstream,
            key,
            frame_size: chunk_size + CHUNK_OVERHEAD,
            buffer: BytesMut::new(),
            upstream_done: false,
            finished: false,
        }
    }
}

impl<S> Stream for DecryptStream<S>
where
    S: Stream<Item = Result<Bytes, CryptoError>>,
{
    type Item = Result<Bytes, CryptoError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        loop {
            // A full frame is ready: open and emit its plaintext.
            if this.buffer.len() >= *this.frame_size {
                let frame = this.buffer.split_to(*this.frame_size);
                return match chunk::open_chunk(this.key, &frame) {
                    Ok(plain) => Poll::Ready(Some(Ok(Bytes::from(plain)))),
                    Err(e) => {
                        *this.finished = true;
                        Poll::Ready(Some(Err(e)))
                    }
                };
            }

            if *this.upstream_done {
                *this.finished = true;
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                // The residual must still be a complete sealed chunk.
                if this.buffer.len() <= CHUNK_OVERHEAD {
                    return Poll::Ready(Some(Err(CryptoError::InvalidCiphertext(
                        "final chunk shorter than nonce + tag",
                    ))));
                }
                let frame = this.buffer.split();
                return Poll::Ready(Some(
                    chunk::open_chunk(this.key, &frame).map(Bytes::from),
                ));
            }

            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.upstream_done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Encrypt an in-memory plaintext as a chunked ciphertext.
///
/// # Errors
///
/// Propagates cipher failures.
pub fn encrypt_bytes(key: &DataKey, chunk_size: usize, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    assert!(chunk_size > 0, "chunk size must be positive");
    let mut out = Vec::with_capacity(
        usize::try_from(chunk::encrypted_size(plaintext.len() as u64, chunk_size))
            .unwrap_or_default(),
    );
    for piece in plaintext.chunks(chunk_size) {
        out.extend_from_slice(&chunk::seal_chunk(key, piece)?);
    }
    Ok(out)
}

/// Decrypt an in-memory chunked ciphertext.
///
/// # Errors
///
/// - [`CryptoError::InvalidCiphertext`] on truncated framing.
/// - [`CryptoError::DecryptionFailed`] on tag mismatch.
pub fn decrypt_bytes(key: &DataKey, chunk_size: usize, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    assert!(chunk_size > 0, "chunk size must be positive");
    let frame_size = chunk_size + CHUNK_OVERHEAD;
    let mut out = Vec::new();
    let mut rest = ciphertext;
    while !rest.is_empty() {
        let take = rest.len().min(frame_size);
        if take <= CHUNK_OVERHEAD {
            return Err(CryptoError::InvalidCiphertext(
                "final chunk shorter than nonce + tag",
            ));
        }
        let (frame, tail) = rest.split_at(take);
        out.extend_from_slice(&chunk::open_chunk(key, frame)?);
        rest = tail;
    }
    Ok(out)
}
