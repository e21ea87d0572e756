//! Operation dispatch: parsed request → backend call → HTTP response.

use bytes::Bytes;
use cybs3_s3_core::{ListObjectsQuery, PutObjectParams, StorageBackend};
use cybs3_s3_model::{CannedAcl, S3Error, S3ErrorCode, S3Operation};
use http::request::Parts;
use percent_encoding::percent_decode_str;

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;
use crate::xml;

type HttpResponse = http::Response<S3ResponseBody>;

/// Dispatch one routed operation.
///
/// `principal` is the authenticated access key, or `anonymous`. The
/// access-control check has already passed by the time this runs.
///
/// # Errors
///
/// Any [`S3Error`] the operation produces; the caller renders it as the
/// XML error document.
pub async fn dispatch_operation<B: StorageBackend>(
    backend: &B,
    parts: &Parts,
    body: Bytes,
    ctx: &RoutingContext,
    principal: &str,
) -> Result<HttpResponse, S3Error> {
    let bucket = ctx.bucket.as_deref();
    let key = ctx.key.as_deref();

    match ctx.operation {
        S3Operation::ListBuckets => {
            let buckets = backend.list_buckets(principal).await?;
            xml_response(200, xml::list_buckets_xml(principal, &buckets)?)
        }

        // -- bucket lifecycle --
        S3Operation::CreateBucket => {
            let bucket = require_bucket(bucket)?;
            let location = xml::parse_create_bucket_location(&body)?;
            backend
                .create_bucket(bucket, location.as_deref(), principal)
                .await?;
            Ok(empty_response(200))
        }
        S3Operation::DeleteBucket => {
            backend.delete_bucket(require_bucket(bucket)?).await?;
            Ok(empty_response(204))
        }
        S3Operation::HeadBucket => {
            backend.head_bucket(require_bucket(bucket)?).await?;
            Ok(empty_response(200))
        }

        // -- listings --
        S3Operation::ListObjectsV2 => {
            let bucket = require_bucket(bucket)?;
            let query = ListObjectsQuery {
                prefix: ctx.query("prefix").map(ToOwned::to_owned),
                delimiter: ctx.query("delimiter").map(ToOwned::to_owned),
                continuation_token: ctx.query("continuation-token").map(ToOwned::to_owned),
                max_keys: ctx.query("max-keys").and_then(|v| v.parse().ok()),
            };
            let max_keys = query.max_keys.unwrap_or(1000);
            let result = backend.list_objects(bucket, query.clone()).await?;
            xml_response(
                200,
                xml::list_objects_xml(
                    bucket,
                    query.prefix.as_deref(),
                    query.delimiter.as_deref(),
                    max_keys,
                    &result,
                )?,
            )
        }
        S3Operation::ListObjectVersions => {
            let bucket = require_bucket(bucket)?;
            let prefix = ctx.query("prefix");
            let versions = backend.list_object_versions(bucket, prefix).await?;
            xml_response(200, xml::list_versions_xml(bucket, prefix, &versions)?)
        }

        // -- objects --
        S3Operation::PutObject => {
            let result = backend
                .put_object(
                    require_bucket(bucket)?,
                    require_key(key)?,
                    body,
                    put_params(parts)?,
                    principal,
                )
                .await?;
            let mut response = http::Response::builder()
                .status(200)
                .header("ETag", &result.etag);
            if let Some(version_id) = &result.version_id {
                response = response.header("x-amz-version-id", version_id);
            }
            if let Some(algorithm) = &result.sse_algorithm {
                response = response.header("x-amz-server-side-encryption", algorithm);
            }
            build(response, S3ResponseBody::empty())
        }
        S3Operation::CopyObject => {
            let (src_bucket, src_key) = parse_copy_source(parts)?;
            let result = backend
                .copy_object(
                    &src_bucket,
                    &src_key,
                    require_bucket(bucket)?,
                    require_key(key)?,
                    put_params(parts)?,
                    principal,
                )
                .await?;
            let xml_body = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><CopyObjectResult xmlns="{}"><ETag>{}</ETag></CopyObjectResult>"#,
                xml::S3_NAMESPACE,
                quick_xml::escape::escape(&result.etag),
            );
            xml_response(200, xml_body.into_bytes())
        }
        S3Operation::GetObject => {
            let result = backend
                .get_object(require_bucket(bucket)?, require_key(key)?, ctx.query("versionId"))
                .await?;
            let mut response = http::Response::builder()
                .status(200)
                .header("ETag", &result.etag)
                .header("Content-Length", result.size.to_string())
                .header(
                    "Content-Type",
                    result
                        .metadata
                        .content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream"),
                )
                .header("Last-Modified", result.last_modified.to_rfc2822());
            if let Some(version_id) = &result.version_id {
                response = response.header("x-amz-version-id", version_id);
            }
            for (name, value) in &result.metadata.user_metadata {
                response = response.header(format!("x-amz-meta-{name}"), value);
            }
            build(response, S3ResponseBody::from_bytes(result.body))
        }
        S3Operation::HeadObject => {
            let result = backend
                .head_object(require_bucket(bucket)?, require_key(key)?, ctx.query("versionId"))
                .await?;
            let mut response = http::Response::builder()
                .status(200)
                .header("ETag", &result.etag)
                .header("Content-Length", result.size.to_string())
                .header("Last-Modified", result.last_modified.to_rfc2822());
            if let Some(content_type) = &result.metadata.content_type {
                response = response.header("Content-Type", content_type);
            }
            if let Some(version_id) = &result.version_id {
                response = response.header("x-amz-version-id", version_id);
            }
            for (name, value) in &result.metadata.user_metadata {
                response = response.header(format!("x-amz-meta-{name}"), value);
            }
            build(response, S3ResponseBody::empty())
        }
        S3Operation::DeleteObject => {
            let result = backend
                .delete_object(
                    require_bucket(bucket)?,
                    require_key(key)?,
                    ctx.query("versionId"),
                    principal,
                )
                .await?;
            let mut response = http::Response::builder().status(204);
            if result.delete_marker {
                response = response.header("x-amz-delete-marker", "true");
            }
            if let Some(version_id) = &result.version_id {
                response = response.header("x-amz-version-id", version_id);
            }
            build(response, S3ResponseBody::empty())
        }

        // -- object / bucket ACLs --
        S3Operation::GetObjectAcl => {
            let acl = backend
                .get_object_acl(require_bucket(bucket)?, require_key(key)?, ctx.query("versionId"))
                .await?;
            xml_response(200, xml::acl_xml(&acl)?)
        }
        S3Operation::PutObjectAcl => {
            let bucket_name = require_bucket(bucket)?;
            let key = require_key(key)?;
            let acl = acl_from_request(parts, &body, backend, bucket_name).await?;
            backend.put_object_acl(bucket_name, key, acl).await?;
            Ok(empty_response(200))
        }
        S3Operation::GetBucketAcl => {
            let acl = backend.get_bucket_acl(require_bucket(bucket)?).await?;
            xml_response(200, xml::acl_xml(&acl)?)
        }
        S3Operation::PutBucketAcl => {
            let bucket_name = require_bucket(bucket)?;
            let acl = acl_from_request(parts, &body, backend, bucket_name).await?;
            backend.put_bucket_acl(bucket_name, acl).await?;
            Ok(empty_response(200))
        }

        // -- bucket configuration --
        S3Operation::GetBucketVersioning => {
            let status = backend.get_versioning(require_bucket(bucket)?).await?;
            xml_response(200, xml::versioning_xml(status)?)
        }
        S3Operation::PutBucketVersioning => {
            let status = xml::parse_versioning_status(&body)?;
            backend.put_versioning(require_bucket(bucket)?, status).await?;
            Ok(empty_response(200))
        }
        S3Operation::GetBucketTagging => {
            let tags = backend.get_bucket_tagging(require_bucket(bucket)?).await?;
            xml_response(200, xml::tagging_xml(&tags)?)
        }
        S3Operation::PutBucketTagging => {
            let tags = xml::parse_tagging(&body)?;
            backend.put_bucket_tagging(require_bucket(bucket)?, tags).await?;
            Ok(empty_response(200))
        }
        S3Operation::DeleteBucketTagging => {
            backend.delete_bucket_tagging(require_bucket(bucket)?).await?;
            Ok(empty_response(204))
        }
        S3Operation::GetBucketLifecycle => {
            let config = backend.get_lifecycle(require_bucket(bucket)?).await?;
            json_stored_response(config)
        }
        S3Operation::PutBucketLifecycle => {
            let config = xml::xml_to_json(&body)?;
            backend.put_lifecycle(require_bucket(bucket)?, config).await?;
            Ok(empty_response(200))
        }
        S3Operation::DeleteBucketLifecycle => {
            backend.delete_lifecycle(require_bucket(bucket)?).await?;
            Ok(empty_response(204))
        }
        S3Operation::GetBucketNotification => {
            let config = backend.get_notification(require_bucket(bucket)?).await?;
            json_stored_response(config)
        }
        S3Operation::PutBucketNotification => {
            let config = xml::xml_to_json(&body)?;
            backend.put_notification(require_bucket(bucket)?, config).await?;
            Ok(empty_response(200))
        }
        S3Operation::GetBucketPolicy => {
            let policy = backend.get_bucket_policy(require_bucket(bucket)?).await?;
            let response = http::Response::builder()
                .status(200)
                .header("Content-Type", "application/json");
            build(response, S3ResponseBody::from_string(policy))
        }
        S3Operation::PutBucketPolicy => {
            let policy = std::str::from_utf8(&body).map_err(|_| {
                S3Error::with_message(S3ErrorCode::MalformedPolicy, "policy is not UTF-8")
            })?;
            backend.put_bucket_policy(require_bucket(bucket)?, policy).await?;
            Ok(empty_response(204))
        }
        S3Operation::DeleteBucketPolicy => {
            backend.delete_bucket_policy(require_bucket(bucket)?).await?;
            Ok(empty_response(204))
        }
        S3Operation::PutBucketVpcConfig => {
            backend.put_vpc_config(require_bucket(bucket)?, true).await?;
            Ok(empty_response(200))
        }
        S3Operation::DeleteBucketVpcConfig => {
            backend.put_vpc_config(require_bucket(bucket)?, false).await?;
            Ok(empty_response(204))
        }

        // -- multipart --
        S3Operation::CreateMultipartUpload => {
            let bucket = require_bucket(bucket)?;
            let key = require_key(key)?;
            let upload_id = backend
                .create_multipart_upload(bucket, key, put_params(parts)?, principal)
                .await?;
            xml_response(200, xml::initiate_multipart_xml(bucket, key, &upload_id)?)
        }
        S3Operation::UploadPart => {
            let upload_id = require_query(ctx, "uploadId")?;
            let part_number: u32 = require_query(ctx, "partNumber")?
                .parse()
                .map_err(|_| {
                    S3Error::with_message(S3ErrorCode::InvalidArgument, "invalid partNumber")
                })?;
            let etag = backend
                .upload_part(
                    require_bucket(bucket)?,
                    require_key(key)?,
                    upload_id,
                    part_number,
                    body,
                )
                .await?;
            let response = http::Response::builder().status(200).header("ETag", etag);
            build(response, S3ResponseBody::empty())
        }
        S3Operation::CompleteMultipartUpload => {
            let bucket = require_bucket(bucket)?;
            let key = require_key(key)?;
            let upload_id = require_query(ctx, "uploadId")?;
            let parts_list = xml::parse_complete_multipart(&body)?;
            let result = backend
                .complete_multipart_upload(bucket, key, upload_id, parts_list, principal)
                .await?;
            let location = format!("/{bucket}/{key}");
            xml_response(
                200,
                xml::complete_multipart_xml(&location, bucket, key, &result.etag)?,
            )
        }
        S3Operation::AbortMultipartUpload => {
            backend
                .abort_multipart_upload(
                    require_bucket(bucket)?,
                    require_key(key)?,
                    require_query(ctx, "uploadId")?,
                )
                .await?;
            Ok(empty_response(204))
        }
    }
}

// ---------------------------------------------------------------------------
// Request extraction helpers
// ---------------------------------------------------------------------------

fn require_bucket(bucket: Option<&str>) -> Result<&str, S3Error> {
    bucket.ok_or_else(|| {
        S3Error::with_message(S3ErrorCode::InvalidRequest, "bucket name is required")
    })
}

fn require_key(key: Option<&str>) -> Result<&str, S3Error> {
    key.ok_or_else(|| S3Error::with_message(S3ErrorCode::InvalidRequest, "object key is required"))
}

fn require_query<'a>(ctx: &'a RoutingContext, name: &str) -> Result<&'a str, S3Error> {
    ctx.query(name).ok_or_else(|| {
        S3Error::with_message(
            S3ErrorCode::InvalidArgument,
            format!("missing query parameter: {name}"),
        )
    })
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Build [`PutObjectParams`] from the request headers.
fn put_params(parts: &Parts) -> Result<PutObjectParams, S3Error> {
    let acl = match header(parts, "x-amz-acl") {
        Some(value) => value.parse::<CannedAcl>().map_err(|e| {
            S3Error::with_message(S3ErrorCode::InvalidArgument, e)
        })?,
        None => CannedAcl::default(),
    };

    let mut user_metadata = std::collections::HashMap::new();
    for (name, value) in &parts.headers {
        if let Some(meta_key) = name.as_str().strip_prefix("x-amz-meta-") {
            if let Ok(value) = value.to_str() {
                user_metadata.insert(meta_key.to_owned(), value.to_owned());
            }
        }
    }

    let tags = match header(parts, "x-amz-tagging") {
        Some(encoded) => parse_tagging_header(encoded)?,
        None => Vec::new(),
    };

    Ok(PutObjectParams {
        content_type: header(parts, "content-type").map(ToOwned::to_owned),
        user_metadata,
        tags,
        acl,
        sse_kms_key_id: sse_kms_key(parts),
    })
}

/// The KMS key to use, honoring the `x-amz-server-side-encryption`
/// header pair.
fn sse_kms_key(parts: &Parts) -> Option<String> {
    let algorithm = header(parts, "x-amz-server-side-encryption")?;
    if algorithm != "aws:kms" {
        return None;
    }
    header(parts, "x-amz-server-side-encryption-aws-kms-key-id").map(ToOwned::to_owned)
}

/// Parse the `x-amz-tagging` header (`k1=v1&k2=v2`, URL-encoded).
fn parse_tagging_header(encoded: &str) -> Result<Vec<(String, String)>, S3Error> {
    let mut tags = Vec::new();
    for pair in encoded.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            S3Error::with_message(S3ErrorCode::InvalidArgument, "malformed x-amz-tagging")
        })?;
        tags.push((
            percent_decode_str(key).decode_utf8_lossy().into_owned(),
            percent_decode_str(value).decode_utf8_lossy().into_owned(),
        ));
    }
    Ok(tags)
}

/// Parse `x-amz-copy-source` (`/bucket/key` or `bucket/key`).
fn parse_copy_source(parts: &Parts) -> Result<(String, String), S3Error> {
    let raw = header(parts, "x-amz-copy-source").ok_or_else(|| {
        S3Error::with_message(S3ErrorCode::InvalidArgument, "missing x-amz-copy-source")
    })?;
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let trimmed = decoded.strip_prefix('/').unwrap_or(&decoded);
    let (bucket, key) = trimmed.split_once('/').ok_or_else(|| {
        S3Error::with_message(
            S3ErrorCode::InvalidArgument,
            "x-amz-copy-source must be bucket/key",
        )
    })?;
    if bucket.is_empty() || key.is_empty() {
        return Err(S3Error::with_message(
            S3ErrorCode::InvalidArgument,
            "x-amz-copy-source must be bucket/key",
        ));
    }
    Ok((bucket.to_owned(), key.to_owned()))
}

/// Resolve the ACL for a put-ACL request: XML body if present, canned
/// header otherwise (defaulting to private under the bucket owner).
async fn acl_from_request<B: StorageBackend>(
    parts: &Parts,
    body: &Bytes,
    backend: &B,
    bucket: &str,
) -> Result<cybs3_s3_model::AccessControlPolicy, S3Error> {
    if !body.is_empty() {
        return xml::parse_acl(body);
    }
    let owner = backend.get_bucket_acl(bucket).await?.owner;
    let canned = match header(parts, "x-amz-acl") {
        Some(value) => value
            .parse::<CannedAcl>()
            .map_err(|e| S3Error::with_message(S3ErrorCode::InvalidArgument, e))?,
        None => CannedAcl::Private,
    };
    Ok(canned.expand(owner.clone(), Some(&owner)))
}

// ---------------------------------------------------------------------------
// Response builders
// ---------------------------------------------------------------------------

fn build(
    builder: http::response::Builder,
    body: S3ResponseBody,
) -> Result<HttpResponse, S3Error> {
    builder
        .body(body)
        .map_err(|e| S3Error::internal(format!("cannot build response: {e}")))
}

fn empty_response(status: u16) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .body(S3ResponseBody::empty())
        .expect("static response parts are valid")
}

fn xml_response(status: u16, body: Vec<u8>) -> Result<HttpResponse, S3Error> {
    build(
        http::Response::builder()
            .status(status)
            .header("Content-Type", "application/xml"),
        S3ResponseBody::from_bytes(body),
    )
}

/// Serve a stored opaque configuration back as JSON.
fn json_stored_response(config: serde_json::Value) -> Result<HttpResponse, S3Error> {
    let body = serde_json::to_vec(&config)
        .map_err(|e| S3Error::internal(format!("cannot serialize configuration: {e}")))?;
    build(
        http::Response::builder()
            .status(200)
            .header("Content-Type", "application/json"),
        S3ResponseBody::from_bytes(body),
    )
}
