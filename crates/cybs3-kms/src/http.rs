//! JSON-over-HTTP surface for the KMS service.
//!
//! Operations are routed by path: `POST /CreateKey`, `POST /Encrypt`, and
//! so on. Requests and responses are the AWS-KMS-style JSON DTOs from
//! [`crate::model`]; errors come back as
//! `{"__type": "...", "message": "..."}` with a matching HTTP status.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::KmsError;
use crate::model::{
    CreateKeyRequest, DecryptRequest, EncryptRequest, KeyIdRequest, KeyMetadataResponse,
    ScheduleKeyDeletionRequest,
};
use crate::service::KmsService;

/// Hyper service exposing a [`KmsService`] over HTTP.
#[derive(Debug, Clone)]
pub struct KmsHttpService {
    service: Arc<KmsService>,
}

impl KmsHttpService {
    /// Wrap a KMS service.
    #[must_use]
    pub fn new(service: Arc<KmsService>) -> Self {
        Self { service }
    }
}

impl Service<http::Request<Incoming>> for KmsHttpService {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = Arc::clone(&self.service);
        Box::pin(async move { Ok(handle(service.as_ref(), req).await) })
    }
}

/// Route one request.
async fn handle(service: &KmsService, req: http::Request<Incoming>) -> http::Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_owned();

    if method == http::Method::GET && path == "health" {
        return json_response(200, &serde_json::json!({ "status": "running", "service": "kms" }));
    }

    if method != http::Method::POST {
        return error_response(&KmsError::InvalidKeyId(format!(
            "unsupported method {method}"
        )));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to collect KMS request body");
            return error_response(&KmsError::Internal("failed to read body".to_owned()));
        }
    };

    debug!(operation = %path, body_len = body.len(), "KMS request");
    dispatch(service, &path, &body).await
}

/// Dispatch one operation by name.
async fn dispatch(service: &KmsService, operation: &str, body: &[u8]) -> http::Response<Full<Bytes>> {
    match operation {
        "CreateKey" => match parse_body::<CreateKeyRequest>(body) {
            Ok(req) => respond(service.create_key(req).await.map(|key_metadata| {
                KeyMetadataResponse { key_metadata }
            })),
            Err(resp) => resp,
        },
        "DescribeKey" => match parse_body::<KeyIdRequest>(body) {
            Ok(req) => respond(
                service
                    .describe_key(&req.key_id)
                    .await
                    .map(|key_metadata| KeyMetadataResponse { key_metadata }),
            ),
            Err(resp) => resp,
        },
        "ListKeys" => json_response(200, &service.list_keys().await),
        "EnableKey" => match parse_body::<KeyIdRequest>(body) {
            Ok(req) => respond(
                service
                    .enable_key(&req.key_id)
                    .await
                    .map(|key_metadata| KeyMetadataResponse { key_metadata }),
            ),
            Err(resp) => resp,
        },
        "DisableKey" => match parse_body::<KeyIdRequest>(body) {
            Ok(req) => respond(
                service
                    .disable_key(&req.key_id)
                    .await
                    .map(|key_metadata| KeyMetadataResponse { key_metadata }),
            ),
            Err(resp) => resp,
        },
        "ScheduleKeyDeletion" => match parse_body::<ScheduleKeyDeletionRequest>(body) {
            Ok(req) => respond(service.schedule_key_deletion(req).await),
            Err(resp) => resp,
        },
        "Encrypt" => match parse_body::<EncryptRequest>(body) {
            Ok(req) => respond(service.encrypt(req).await),
            Err(resp) => resp,
        },
        "Decrypt" => match parse_body::<DecryptRequest>(body) {
            Ok(req) => respond(service.decrypt(req).await),
            Err(resp) => resp,
        },
        other => error_response(&KmsError::InvalidKeyId(format!(
            "unknown operation: {other}"
        ))),
    }
}

/// Parse a JSON request body, producing the error response on failure.
fn parse_body<T: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<T, http::Response<Full<Bytes>>> {
    // An empty body is an empty JSON object: several operations take no
    // required fields.
    let effective = if body.is_empty() { b"{}".as_slice() } else { body };
    serde_json::from_slice(effective).map_err(|e| {
        error_response(&KmsError::InvalidKeyId(format!("malformed request: {e}")))
    })
}

fn respond<T: Serialize>(result: Result<T, KmsError>) -> http::Response<Full<Bytes>> {
    match result {
        Ok(value) => json_response(200, &value),
        Err(err) => error_response(&err),
    }
}

fn json_response<T: Serialize>(status: u16, value: &T) -> http::Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    http::Response::builder()
        .status(status)
        .header("Content-Type", "application/x-amz-json-1.1")
        .body(Full::new(Bytes::from(body)))
        .expect("static response parts are valid")
}

fn error_response(err: &KmsError) -> http::Response<Full<Bytes>> {
    let body = serde_json::json!({
        "__type": err.wire_type(),
        "message": err.to_string(),
    });
    json_response(err.http_status(), &body)
}
