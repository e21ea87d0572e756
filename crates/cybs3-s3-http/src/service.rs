//! The hyper service tying the S3 pipeline together.
//!
//! Request lifecycle:
//!
//! 1. Health-check interception (`GET /health`).
//! 2. Routing ([`crate::router`]).
//! 3. Body collection.
//! 4. SigV4 verification (skippable for development; requests without an
//!    `Authorization` header pass through as `anonymous`).
//! 5. Access-control check via the backend.
//! 6. Operation dispatch ([`crate::dispatch`]).
//! 7. Error rendering and common response headers.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use cybs3_s3_core::{AccessRequest, StorageBackend};
use cybs3_s3_model::{S3Error, S3ErrorCode};
use cybs3_sigv4::CredentialProvider;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::S3ResponseBody;
use crate::dispatch::dispatch_operation;
use crate::router::S3Router;
use crate::xml;

/// Principal used for unauthenticated requests.
const ANONYMOUS: &str = "anonymous";

/// Service configuration.
#[derive(Clone)]
pub struct S3HttpConfig {
    /// Base domain for virtual-hosted-style addressing.
    pub domain: String,
    /// Whether virtual hosting is enabled.
    pub virtual_hosting: bool,
    /// Skip SigV4 verification (development only).
    pub skip_signature_validation: bool,
    /// Region reported by the service.
    pub region: String,
    /// Credential source for SigV4 verification.
    pub credential_provider: Option<Arc<dyn CredentialProvider>>,
}

impl std::fmt::Debug for S3HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3HttpConfig")
            .field("domain", &self.domain)
            .field("virtual_hosting", &self.virtual_hosting)
            .field("skip_signature_validation", &self.skip_signature_validation)
            .field("region", &self.region)
            .field(
                "credential_provider",
                &self.credential_provider.as_ref().map(|_| "..."),
            )
            .finish()
    }
}

impl Default for S3HttpConfig {
    fn default() -> Self {
        Self {
            domain: "s3.localhost".to_owned(),
            virtual_hosting: true,
            skip_signature_validation: true,
            region: "us-east-1".to_owned(),
            credential_provider: None,
        }
    }
}

/// The S3 HTTP service over a storage backend.
#[derive(Debug)]
pub struct S3HttpService<B: StorageBackend> {
    backend: Arc<B>,
    router: S3Router,
    config: Arc<S3HttpConfig>,
}

impl<B: StorageBackend> S3HttpService<B> {
    /// Create a service over a shared backend.
    #[must_use]
    pub fn new(backend: Arc<B>, config: S3HttpConfig) -> Self {
        let router = S3Router::new(&config.domain, config.virtual_hosting);
        Self {
            backend,
            router,
            config: Arc::new(config),
        }
    }
}

impl<B: StorageBackend> Clone for S3HttpService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: StorageBackend + 'static> Service<http::Request<Incoming>> for S3HttpService<B> {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let backend = Arc::clone(&self.backend);
        let router = self.router.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response =
                process_request(req, backend.as_ref(), &router, &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<B: StorageBackend>(
    req: http::Request<Incoming>,
    backend: &B,
    router: &S3Router,
    config: &S3HttpConfig,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    if method == http::Method::GET && (uri.path() == "/health" || uri.path() == "/_health") {
        return health_response();
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_response(&err, request_id);
        }
    };

    info!(
        operation = %ctx.operation,
        bucket = ?ctx.bucket,
        key = ?ctx.key,
        request_id,
        "routed request"
    );

    let (parts, incoming) = req.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(error = %err, request_id, "failed to collect request body");
            let err = S3Error::internal("failed to read request body");
            return error_response(&err, request_id);
        }
    };

    // Authentication: resolve the principal.
    let principal = match authenticate(&parts, &body, config) {
        Ok(principal) => principal,
        Err(err) => {
            warn!(error = %err, request_id, "authentication failed");
            return error_response(&err, request_id);
        }
    };

    // Access control.
    let access = AccessRequest {
        principal: &principal,
        operation: ctx.operation,
        bucket: ctx.bucket.as_deref().unwrap_or(""),
        key: ctx.key.as_deref(),
        version_id: ctx.query("versionId"),
        source_ip: parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok()),
        prefix: ctx.query("prefix"),
    };
    if let Err(err) = backend.check_access(&access).await {
        debug!(principal = %principal, error = %err, request_id, "access check failed");
        return error_response(&err, request_id);
    }

    match dispatch_operation(backend, &parts, body, &ctx, &principal).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "operation returned error");
            error_response(&err, request_id)
        }
    }
}

/// Resolve the request principal.
///
/// With signature validation enabled, a present `Authorization` header
/// must verify (the verified access key becomes the principal) and an
/// absent one makes the request anonymous. With validation skipped, the
/// access key is taken from the `Authorization` header on trust.
fn authenticate(
    parts: &http::request::Parts,
    body: &Bytes,
    config: &S3HttpConfig,
) -> Result<String, S3Error> {
    if !parts.headers.contains_key(http::header::AUTHORIZATION) {
        return Ok(ANONYMOUS.to_owned());
    }

    let provider = match config.credential_provider.as_deref() {
        Some(provider) if !config.skip_signature_validation => provider,
        // Trust the claimed identity in development setups.
        _ => return Ok(claimed_access_key(parts).unwrap_or_else(|| ANONYMOUS.to_owned())),
    };

    let body_hash = declared_body_hash(parts)
        .unwrap_or_else(|| cybs3_sigv4::hash_payload(body));

    cybs3_sigv4::verify_request(parts, &body_hash, provider)
        .map(|auth| auth.access_key_id)
        .map_err(|err| match err {
            cybs3_sigv4::AuthError::AccessKeyNotFound(_) => S3Error::with_message(
                S3ErrorCode::InvalidAccessKeyId,
                "The AWS Access Key Id you provided does not exist in our records",
            ),
            cybs3_sigv4::AuthError::SignatureDoesNotMatch => S3Error::with_message(
                S3ErrorCode::SignatureDoesNotMatch,
                "The request signature we calculated does not match the signature you provided",
            ),
            other => S3Error::with_message(S3ErrorCode::AccessDenied, other.to_string()),
        })
}

/// The payload hash the client declared, honored for streaming uploads
/// where the signature was computed over `UNSIGNED-PAYLOAD`.
fn declared_body_hash(parts: &http::request::Parts) -> Option<String> {
    let declared = parts
        .headers
        .get("x-amz-content-sha256")?
        .to_str()
        .ok()?;
    (declared == cybs3_sigv4::UNSIGNED_PAYLOAD).then(|| declared.to_owned())
}

/// Pull the access key out of an `Authorization` header without
/// verifying it.
fn claimed_access_key(parts: &http::request::Parts) -> Option<String> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let credential = header.split("Credential=").nth(1)?;
    Some(credential.split('/').next()?.to_owned())
}

fn health_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(S3ResponseBody::from_string(
            r#"{"status":"running","service":"s3"}"#,
        ))
        .expect("static health response is valid")
}

fn error_response(error: &S3Error, request_id: &str) -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(error.http_status())
        .header("Content-Type", "application/xml")
        .body(S3ResponseBody::from_bytes(xml::error_xml(error, request_id)))
        .unwrap_or_else(|_| {
            http::Response::builder()
                .status(500)
                .body(S3ResponseBody::empty())
                .expect("fallback response is valid")
        })
}

fn add_common_headers(
    mut response: http::Response<S3ResponseBody>,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();
    if let Ok(value) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", value.clone());
        headers.insert("x-amz-id-2", value);
    }
    headers.insert(
        "Server",
        http::header::HeaderValue::from_static("CybS3"),
    );
    response
}
