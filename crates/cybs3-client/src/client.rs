//! The S3 client.
//!
//! Every operation follows the same shape: build the URL, sign the
//! request, pass the endpoint's circuit breaker, exchange, map error
//! bodies to [`ClientError`]. Buffered exchanges additionally run inside
//! the retry policy; streaming uploads are single-shot because a consumed
//! body stream cannot be replayed at the request boundary.
//!
//! Object bodies are always client-side encrypted: the upload path wraps
//! the caller's byte stream in [`EncryptStream`] and declares
//! `UNSIGNED-PAYLOAD`; the download path wraps the response stream in
//! [`DecryptStream`]. The chunk size is chosen from the plaintext size at
//! upload time and recorded in object metadata so downloads (and other
//! clients holding the same data key) can reframe the ciphertext.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cybs3_core::{BreakerConfig, CircuitBreaker, ClientError, Credentials, Region, RetryPolicy};
use cybs3_crypto::{
    CryptoError, DataKey, DecryptStream, EncryptStream, chunk, encrypt_bytes,
};
use cybs3_sigv4::{SigningParams, UNSIGNED_PAYLOAD, hash_payload, sign_request};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info};

use crate::wire;

/// Metadata header recording the chunk size an object was sealed with.
const CHUNK_SIZE_HEADER: &str = "x-amz-meta-cybs3-chunk";

/// Characters encoded in URL path segments (AWS unreserved set).
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Client configuration.
#[derive(Debug, Clone)]
pub struct S3ClientConfig {
    /// Endpoint base URL, e.g. `http://localhost:4566`.
    pub endpoint: String,
    /// Region for SigV4 signing.
    pub region: Region,
    /// Signing credentials.
    pub credentials: Credentials,
    /// Fixed chunk size override; `None` picks per-object sizes.
    pub chunk_size: Option<usize>,
    /// Retry schedule for buffered exchanges.
    pub retry: RetryPolicy,
    /// Circuit-breaker configuration for this endpoint.
    pub breaker: BreakerConfig,
}

impl S3ClientConfig {
    /// A config with default resilience settings.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, region: Region, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            region,
            credentials,
            chunk_size: None,
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// The object key.
    pub key: String,
    /// Size of the stored ciphertext.
    pub ciphertext_size: u64,
    /// Size of the plaintext after decryption.
    pub plaintext_size: u64,
    /// Quoted ETag of the ciphertext.
    pub etag: String,
    /// Last modification time, when the server provided one.
    pub last_modified: Option<DateTime<Utc>>,
    /// The chunk size the object was sealed with.
    pub chunk_size: usize,
}

/// One entry of a listing.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    /// The object key.
    pub key: String,
    /// Size of the stored ciphertext.
    pub ciphertext_size: u64,
    /// Quoted ETag.
    pub etag: String,
}

/// The S3 client.
#[derive(Debug)]
pub struct S3Client {
    http: reqwest::Client,
    config: S3ClientConfig,
    data_key: DataKey,
    breaker: CircuitBreaker,
}

impl S3Client {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// [`ClientError::Internal`] if the HTTP connector cannot be built.
    pub fn new(config: S3ClientConfig, data_key: DataKey) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ClientError::Internal(format!("cannot build HTTP client: {e}")))?;
        let breaker = CircuitBreaker::new(config.breaker);
        Ok(Self {
            http,
            config,
            data_key,
            breaker,
        })
    }

    /// The endpoint's circuit breaker (observable state, manual resets).
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    /// Create a bucket.
    ///
    /// # Errors
    ///
    /// Mapped S3 errors; transport failures after retries.
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), ClientError> {
        let body = if self.config.region.as_str() == "us-east-1" {
            Bytes::new()
        } else {
            Bytes::from(format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                self.config.region
            ))
        };
        self.exchange("PUT", &self.url(bucket, None), &[], body, bucket, None, DEFAULT_TIMEOUT)
            .await?;
        info!(bucket, "bucket created");
        Ok(())
    }

    /// Delete a bucket (must be empty).
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), ClientError> {
        self.exchange(
            "DELETE",
            &self.url(bucket, None),
            &[],
            Bytes::new(),
            bucket,
            None,
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    /// Whether a bucket exists and is accessible.
    pub async fn head_bucket(&self, bucket: &str) -> Result<(), ClientError> {
        self.exchange(
            "HEAD",
            &self.url(bucket, None),
            &[],
            Bytes::new(),
            bucket,
            None,
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Upload a plaintext stream as encrypted chunks.
    ///
    /// `plaintext_len` must be exact: it selects the chunk size and
    /// declares the ciphertext `Content-Length`. The exchange is
    /// single-shot (a consumed stream cannot be replayed); the circuit
    /// breaker still applies.
    ///
    /// # Errors
    ///
    /// Crypto failures from the pipeline, mapped S3 errors, transport
    /// failures.
    pub async fn put_object<S>(
        &self,
        bucket: &str,
        key: &str,
        plaintext: S,
        plaintext_len: u64,
    ) -> Result<String, ClientError>
    where
        S: Stream<Item = Result<Bytes, CryptoError>> + Send + 'static,
    {
        self.breaker.check().await?;

        let chunk_size = self.chunk_size_for(plaintext_len);
        let ciphertext_len = chunk::encrypted_size(plaintext_len, chunk_size);
        let url = self.url(bucket, Some(key));

        let extra = vec![
            (CHUNK_SIZE_HEADER.to_owned(), chunk_size.to_string()),
            ("content-length".to_owned(), ciphertext_len.to_string()),
        ];
        let headers = self.sign(
            "PUT",
            &url,
            UNSIGNED_PAYLOAD,
            &extra,
        );

        let encrypted = EncryptStream::new(plaintext, self.data_key.clone(), chunk_size);
        let body = reqwest::Body::wrap_stream(encrypted);

        debug!(bucket, key, plaintext_len, ciphertext_len, chunk_size, "streaming upload");

        let mut request = self
            .http
            .request(reqwest::Method::PUT, &url)
            .timeout(upload_timeout(ciphertext_len))
            .body(body);
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let result = self
            .complete_exchange(request, bucket, Some(key))
            .await;
        self.record(&result).await;
        let response = result?;

        Ok(etag_of(&response))
    }

    /// Upload an in-memory plaintext (retryable).
    pub async fn put_object_buffered(
        &self,
        bucket: &str,
        key: &str,
        plaintext: &[u8],
    ) -> Result<String, ClientError> {
        let chunk_size = self.chunk_size_for(plaintext.len() as u64);
        let ciphertext = encrypt_bytes(&self.data_key, chunk_size, plaintext)
            .map_err(crypto_error)?;

        let extra = vec![(CHUNK_SIZE_HEADER.to_owned(), chunk_size.to_string())];
        let response = self
            .exchange(
                "PUT",
                &self.url(bucket, Some(key)),
                &extra,
                Bytes::from(ciphertext),
                bucket,
                Some(key),
                upload_timeout(chunk::encrypted_size(plaintext.len() as u64, chunk_size)),
            )
            .await?;
        Ok(etag_of(&response))
    }

    /// Download an object as a decrypted byte stream.
    ///
    /// # Errors
    ///
    /// Mapped S3 errors on the request; crypto errors surface as items of
    /// the returned stream.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(ObjectInfo, BoxStream<'static, Result<Bytes, ClientError>>), ClientError> {
        let response = self
            .exchange(
                "GET",
                &self.url(bucket, Some(key)),
                &[],
                Bytes::new(),
                bucket,
                Some(key),
                DEFAULT_TIMEOUT,
            )
            .await?;

        let info = self.object_info(key, &response)?;
        let chunk_size = info.chunk_size;

        let upstream = response
            .bytes_stream()
            .map_err(|e| CryptoError::Upstream(e.to_string()));
        let decrypted = DecryptStream::new(upstream, self.data_key.clone(), chunk_size)
            .map_err(crypto_error);

        Ok((info, decrypted.boxed()))
    }

    /// Download an object fully into memory.
    pub async fn get_object_buffered(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let (info, mut stream) = self.get_object(bucket, key).await?;

        let mut out = Vec::with_capacity(usize::try_from(info.plaintext_size).unwrap_or(0));
        while let Some(piece) = stream.next().await {
            out.extend_from_slice(&piece?);
        }
        Ok(out)
    }

    /// Fetch object metadata.
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, ClientError> {
        let response = self
            .exchange(
                "HEAD",
                &self.url(bucket, Some(key)),
                &[],
                Bytes::new(),
                bucket,
                Some(key),
                DEFAULT_TIMEOUT,
            )
            .await?;
        self.object_info(key, &response)
    }

    /// Delete an object.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ClientError> {
        self.exchange(
            "DELETE",
            &self.url(bucket, Some(key)),
            &[],
            Bytes::new(),
            bucket,
            Some(key),
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    /// List all objects under a prefix, following continuation tokens.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectEntry>, ClientError> {
        let mut entries = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = String::from("list-type=2");
            if let Some(prefix) = prefix {
                query.push_str("&prefix=");
                query.push_str(&encode_component(prefix));
            }
            if let Some(token) = token.as_deref() {
                query.push_str("&continuation-token=");
                query.push_str(&encode_component(token));
            }
            let url = format!("{}?{query}", self.url(bucket, None));

            let response = self
                .exchange("GET", &url, &[], Bytes::new(), bucket, None, DEFAULT_TIMEOUT)
                .await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            let page = wire::parse_list_page(&body)?;

            entries.extend(page.objects.into_iter().map(|o| ObjectEntry {
                key: o.key,
                ciphertext_size: o.size,
                etag: o.etag,
            }));

            if !page.is_truncated {
                return Ok(entries);
            }
            token = page.next_continuation_token;
            if token.is_none() {
                return Err(ClientError::InvalidResponse(
                    "truncated listing without continuation token".to_owned(),
                ));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Multipart
    // -----------------------------------------------------------------------

    /// Initiate a multipart upload.
    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, ClientError> {
        let url = format!("{}?uploads", self.url(bucket, Some(key)));
        let response = self
            .exchange("POST", &url, &[], Bytes::new(), bucket, Some(key), DEFAULT_TIMEOUT)
            .await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        wire::parse_upload_id(&body)
    }

    /// Upload one part; returns its ETag.
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String, ClientError> {
        let url = format!(
            "{}?partNumber={part_number}&uploadId={}",
            self.url(bucket, Some(key)),
            encode_component(upload_id),
        );
        let response = self
            .exchange(
                "PUT",
                &url,
                &[],
                body.clone(),
                bucket,
                Some(key),
                upload_timeout(body.len() as u64),
            )
            .await?;
        Ok(etag_of(&response))
    }

    /// Complete a multipart upload from `(part_number, etag)` pairs.
    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[(u32, String)],
    ) -> Result<String, ClientError> {
        let url = format!(
            "{}?uploadId={}",
            self.url(bucket, Some(key)),
            encode_component(upload_id),
        );
        let body = wire::complete_multipart_body(parts);
        let response = self
            .exchange(
                "POST",
                &url,
                &[],
                Bytes::from(body),
                bucket,
                Some(key),
                Duration::from_secs(60),
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        wire::parse_complete_etag(&bytes)
    }

    /// Abort a multipart upload.
    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}?uploadId={}",
            self.url(bucket, Some(key)),
            encode_component(upload_id),
        );
        self.exchange("DELETE", &url, &[], Bytes::new(), bucket, Some(key), DEFAULT_TIMEOUT)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// One resilient buffered exchange: breaker gate and retry loop
    /// around a rebuildable request.
    async fn exchange(
        &self,
        method: &str,
        url: &str,
        extra_headers: &[(String, String)],
        body: Bytes,
        bucket: &str,
        key: Option<&str>,
        timeout: Duration,
    ) -> Result<reqwest::Response, ClientError> {
        let result = self
            .config
            .retry
            .run(ClientError::is_retryable, || {
                let body = body.clone();
                async move {
                    self.breaker.check().await?;

                    let body_hash = hash_payload(&body);
                    let headers = self.sign(method, url, &body_hash, extra_headers);

                    let reqwest_method = reqwest::Method::from_bytes(method.as_bytes())
                        .map_err(|_| ClientError::InvalidInput(format!("bad method {method}")))?;
                    let mut request = self
                        .http
                        .request(reqwest_method, url)
                        .timeout(timeout)
                        .body(body);
                    for (name, value) in &headers {
                        request = request.header(name, value);
                    }

                    let attempt = self.complete_exchange(request, bucket, key).await;
                    self.record(&attempt).await;
                    attempt
                }
            })
            .await?;
        Ok(result)
    }

    /// Send one request and map the outcome.
    async fn complete_exchange(
        &self,
        request: reqwest::RequestBuilder,
        bucket: &str,
        key: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(wire::parse_error_body(&body, status.as_u16(), bucket, key))
    }

    /// Feed the breaker from one attempt's outcome. Application-level
    /// errors (4xx) say nothing about endpoint health and do not count.
    async fn record(&self, outcome: &Result<reqwest::Response, ClientError>) {
        match outcome {
            Ok(_) => self.breaker.record_success().await,
            Err(err) if err.is_retryable() => self.breaker.record_failure().await,
            Err(_) => {}
        }
    }

    fn sign(
        &self,
        method: &str,
        url: &str,
        body_hash: &str,
        extra_headers: &[(String, String)],
    ) -> Vec<(String, String)> {
        let params = SigningParams {
            access_key: &self.config.credentials.access_key,
            secret_key: &self.config.credentials.secret_key,
            region: self.config.region.as_str(),
            service: "s3",
        };
        sign_request(&params, method, url, body_hash, extra_headers, Utc::now())
    }

    fn url(&self, bucket: &str, key: Option<&str>) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        match key {
            Some(key) => {
                let encoded: Vec<String> =
                    key.split('/').map(|seg| encode_component(seg)).collect();
                format!("{endpoint}/{bucket}/{}", encoded.join("/"))
            }
            None => format!("{endpoint}/{bucket}"),
        }
    }

    fn chunk_size_for(&self, plaintext_len: u64) -> usize {
        self.config
            .chunk_size
            .unwrap_or_else(|| chunk::optimal_chunk_size(plaintext_len))
    }

    /// Build an [`ObjectInfo`] from response headers.
    fn object_info(
        &self,
        key: &str,
        response: &reqwest::Response,
    ) -> Result<ObjectInfo, ClientError> {
        let ciphertext_size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let chunk_size = response
            .headers()
            .get(CHUNK_SIZE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .or_else(|| chunk_size_for_ciphertext(ciphertext_size))
            .ok_or_else(|| {
                ClientError::InvalidResponse(
                    "cannot determine chunk size for object".to_owned(),
                )
            })?;

        let plaintext_size = plaintext_size_for(ciphertext_size, chunk_size)
            .ok_or(ClientError::InvalidCiphertext)?;

        Ok(ObjectInfo {
            key: key.to_owned(),
            ciphertext_size,
            plaintext_size,
            etag: etag_of(response),
            last_modified: response
                .headers()
                .get("last-modified")
                .and_then(|v| v.to_str().ok())
                .and_then(wire::parse_last_modified),
            chunk_size,
        })
    }
}

/// Default timeout for metadata operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upload deadline scaling with the ciphertext size: two seconds per MiB,
/// floored at five minutes.
fn upload_timeout(ciphertext_len: u64) -> Duration {
    let mib = ciphertext_len.div_ceil(1024 * 1024);
    Duration::from_secs(300.max(mib.saturating_mul(2)))
}

/// Recover the chunk size of a ciphertext produced under the
/// `optimal_chunk_size` policy.
///
/// Each candidate size is checked for structural validity (the final
/// frame must hold at least one byte of plaintext) and for consistency
/// (the recovered plaintext size must select that candidate). Objects
/// uploaded with a custom chunk size carry it in metadata instead.
fn chunk_size_for_ciphertext(ciphertext_len: u64) -> Option<usize> {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    for candidate in [256 * KIB, MIB, 5 * MIB, 16 * MIB] {
        let Some(plaintext) = plaintext_size_for(ciphertext_len, candidate) else {
            continue;
        };
        if chunk::optimal_chunk_size(plaintext) == candidate {
            return Some(candidate);
        }
    }
    None
}

/// Invert [`chunk::encrypted_size`] for a known chunk size.
fn plaintext_size_for(ciphertext_len: u64, chunk_size: usize) -> Option<u64> {
    if ciphertext_len == 0 {
        return Some(0);
    }
    let overhead = chunk::CHUNK_OVERHEAD as u64;
    let frame = chunk_size as u64 + overhead;
    let full = ciphertext_len / frame;
    let rem = ciphertext_len % frame;
    if rem == 0 {
        Some(full * chunk_size as u64)
    } else if rem > overhead {
        Some(full * chunk_size as u64 + (rem - overhead))
    } else {
        None
    }
}

fn etag_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, PATH_ENCODE_SET).to_string()
}

fn crypto_error(err: CryptoError) -> ClientError {
    match err {
        CryptoError::DecryptionFailed => ClientError::DecryptionFailed,
        CryptoError::EncryptionFailed => ClientError::EncryptionFailed,
        CryptoError::InvalidCiphertext(_) => ClientError::InvalidCiphertext,
        CryptoError::Upstream(detail) => ClientError::Transport(detail),
        other => ClientError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_scale_upload_timeout() {
        assert_eq!(upload_timeout(0), Duration::from_secs(300));
        assert_eq!(upload_timeout(10 * 1024 * 1024), Duration::from_secs(300));
        // 200 MiB at 2 s/MiB exceeds the floor.
        assert_eq!(
            upload_timeout(200 * 1024 * 1024),
            Duration::from_secs(400)
        );
    }

    #[test]
    fn test_should_invert_encrypted_size() {
        for (plaintext, chunk_size) in [
            (0u64, 1024usize),
            (1, 1024),
            (1024, 1024),
            (1025, 1024),
            (5 * 1024 * 1024, 1024 * 1024),
        ] {
            let ciphertext = chunk::encrypted_size(plaintext, chunk_size);
            assert_eq!(
                plaintext_size_for(ciphertext, chunk_size),
                Some(plaintext),
                "plaintext {plaintext} at chunk {chunk_size}"
            );
        }
    }

    #[test]
    fn test_should_reject_impossible_ciphertext_sizes() {
        // A final frame of 10 bytes cannot hold nonce + tag.
        assert_eq!(plaintext_size_for(10, 1024), None);
    }

    #[test]
    fn test_should_recover_chunk_size_from_ciphertext_length() {
        for plaintext in [1u64, 100, 9 * 1024 * 1024, 50 * 1024 * 1024, 500 * 1024 * 1024] {
            let chunk_size = chunk::optimal_chunk_size(plaintext);
            let ciphertext = chunk::encrypted_size(plaintext, chunk_size);
            assert_eq!(
                chunk_size_for_ciphertext(ciphertext),
                Some(chunk_size),
                "plaintext {plaintext}"
            );
        }
    }

    #[test]
    fn test_should_map_crypto_errors() {
        assert!(matches!(
            crypto_error(CryptoError::DecryptionFailed),
            ClientError::DecryptionFailed
        ));
        assert!(matches!(
            crypto_error(CryptoError::InvalidCiphertext("x")),
            ClientError::InvalidCiphertext
        ));
        assert!(matches!(
            crypto_error(CryptoError::Upstream("reset".to_owned())),
            ClientError::Transport(_)
        ));
    }

    #[test]
    fn test_should_encode_url_components() {
        assert_eq!(encode_component("plain.txt"), "plain.txt");
        assert_eq!(encode_component("with space"), "with%20space");
        assert_eq!(encode_component("a/b"), "a%2Fb");
    }

    fn test_client() -> S3Client {
        S3Client::new(
            S3ClientConfig::new(
                "http://localhost:4566",
                Region::default(),
                Credentials::new("AKID", "SECRET"),
            ),
            DataKey::generate(),
        )
        .expect("client")
    }

    #[test]
    fn test_should_build_object_urls() {
        let client = test_client();
        assert_eq!(client.url("b", None), "http://localhost:4566/b");
        assert_eq!(
            client.url("b", Some("path/to/my file.txt")),
            "http://localhost:4566/b/path/to/my%20file.txt"
        );
    }

    #[test]
    fn test_should_respect_chunk_size_override() {
        let mut config = S3ClientConfig::new(
            "http://localhost:4566",
            Region::default(),
            Credentials::new("AKID", "SECRET"),
        );
        config.chunk_size = Some(4096);
        let client = S3Client::new(config, DataKey::generate()).expect("client");
        assert_eq!(client.chunk_size_for(1024 * 1024 * 1024), 4096);

        let client = test_client();
        assert_eq!(client.chunk_size_for(1), 256 * 1024);
        assert_eq!(client.chunk_size_for(50 * 1024 * 1024), 1024 * 1024);
    }
}
