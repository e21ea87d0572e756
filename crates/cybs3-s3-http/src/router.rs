//! Request routing: bucket/key resolution and operation identification.
//!
//! Both path-style (`/bucket/key`) and virtual-hosted-style
//! (`bucket.domain/key`) addressing are accepted. The operation is
//! identified from the method, the presence of a bucket and key,
//! sub-resource query parameters (`?policy`, `?versioning`, `?uploads`,
//! …), and headers (`x-amz-copy-source` turns a `PUT` into a copy).

use cybs3_s3_model::{S3Error, S3ErrorCode, S3Operation};
use http::Method;
use percent_encoding::percent_decode_str;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// Base domain for virtual-hosted-style addressing.
    pub domain: String,
    /// Whether virtual hosting is enabled.
    pub virtual_hosting: bool,
}

/// The routed request.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Resolved bucket, if any.
    pub bucket: Option<String>,
    /// Resolved key, if any.
    pub key: Option<String>,
    /// The identified operation.
    pub operation: S3Operation,
    /// Decoded query parameters.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// Query parameter value by name.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl S3Router {
    /// Create a router.
    #[must_use]
    pub fn new(domain: impl Into<String>, virtual_hosting: bool) -> Self {
        Self {
            domain: domain.into(),
            virtual_hosting,
        }
    }

    /// Resolve a request to its routing context.
    ///
    /// # Errors
    ///
    /// `MethodNotAllowed` / `InvalidRequest` for requests that do not map
    /// to any operation.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, S3Error> {
        let query_params = parse_query_params(req.uri().query().unwrap_or(""));

        let virtual_bucket = if self.virtual_hosting {
            extract_virtual_host_bucket(req.headers(), &self.domain)
        } else {
            None
        };

        let path = req.uri().path();
        let (bucket, key) = if let Some(vhost_bucket) = virtual_bucket {
            let raw_key = path.strip_prefix('/').unwrap_or(path);
            let key = (!raw_key.is_empty()).then(|| decode_component(raw_key));
            (Some(vhost_bucket), key)
        } else {
            parse_path(path)
        };

        let operation = identify_operation(
            req.method(),
            bucket.is_some(),
            key.is_some(),
            &query_params,
            req.headers(),
        )?;

        Ok(RoutingContext {
            bucket,
            key,
            operation,
            query_params,
        })
    }
}

/// Extract the bucket from a virtual-hosted-style Host header.
fn extract_virtual_host_bucket(headers: &http::HeaderMap, domain: &str) -> Option<String> {
    let host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())?;
    let host = host.split(':').next().unwrap_or(host);

    let suffix = format!(".{domain}");
    let bucket = host.strip_suffix(&suffix)?;
    (!bucket.is_empty()).then(|| bucket.to_owned())
}

/// Split a path-style URI into bucket and key.
fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, None);
    }

    match trimmed.split_once('/') {
        Some((bucket, key)) => {
            let key = (!key.is_empty()).then(|| decode_component(key));
            (Some(decode_component(bucket)), key)
        }
        None => (Some(decode_component(trimmed)), None),
    }
}

fn decode_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into decoded pairs (`?versioning` becomes
/// `("versioning", "")`).
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn has(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn identify_operation(
    method: &Method,
    has_bucket: bool,
    has_key: bool,
    params: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, S3Error> {
    match (method, has_bucket, has_key) {
        (&Method::GET, false, false) => Ok(S3Operation::ListBuckets),
        (method, true, false) => identify_bucket_operation(method, params),
        (method, true, true) => identify_object_operation(method, params, headers),
        (_, false, true) => Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Object key specified without bucket",
        )),
        (_, false, false) => Err(S3Error::method_not_allowed(method.as_str())),
    }
}

fn identify_bucket_operation(
    method: &Method,
    params: &[(String, String)],
) -> Result<S3Operation, S3Error> {
    match *method {
        Method::GET => Ok(identify_bucket_get(params)),
        Method::PUT => Ok(identify_bucket_put(params)),
        Method::DELETE => Ok(identify_bucket_delete(params)),
        Method::HEAD => Ok(S3Operation::HeadBucket),
        _ => Err(S3Error::method_not_allowed(method.as_str())),
    }
}

fn identify_bucket_get(params: &[(String, String)]) -> S3Operation {
    if value(params, "list-type") == Some("2") {
        return S3Operation::ListObjectsV2;
    }
    if has(params, "versions") {
        return S3Operation::ListObjectVersions;
    }
    if has(params, "policy") {
        return S3Operation::GetBucketPolicy;
    }
    if has(params, "acl") {
        return S3Operation::GetBucketAcl;
    }
    if has(params, "versioning") {
        return S3Operation::GetBucketVersioning;
    }
    if has(params, "tagging") {
        return S3Operation::GetBucketTagging;
    }
    if has(params, "lifecycle") {
        return S3Operation::GetBucketLifecycle;
    }
    if has(params, "notification") {
        return S3Operation::GetBucketNotification;
    }
    // Plain bucket GET lists objects (V2 semantics).
    S3Operation::ListObjectsV2
}

fn identify_bucket_put(params: &[(String, String)]) -> S3Operation {
    if has(params, "policy") {
        return S3Operation::PutBucketPolicy;
    }
    if has(params, "acl") {
        return S3Operation::PutBucketAcl;
    }
    if has(params, "versioning") {
        return S3Operation::PutBucketVersioning;
    }
    if has(params, "tagging") {
        return S3Operation::PutBucketTagging;
    }
    if has(params, "lifecycle") {
        return S3Operation::PutBucketLifecycle;
    }
    if has(params, "notification") {
        return S3Operation::PutBucketNotification;
    }
    if has(params, "vpc") {
        return S3Operation::PutBucketVpcConfig;
    }
    S3Operation::CreateBucket
}

fn identify_bucket_delete(params: &[(String, String)]) -> S3Operation {
    if has(params, "policy") {
        return S3Operation::DeleteBucketPolicy;
    }
    if has(params, "tagging") {
        return S3Operation::DeleteBucketTagging;
    }
    if has(params, "lifecycle") {
        return S3Operation::DeleteBucketLifecycle;
    }
    if has(params, "vpc") {
        return S3Operation::DeleteBucketVpcConfig;
    }
    S3Operation::DeleteBucket
}

fn identify_object_operation(
    method: &Method,
    params: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, S3Error> {
    let has_copy_source = headers.contains_key("x-amz-copy-source");

    match *method {
        Method::GET => {
            if has(params, "acl") {
                Ok(S3Operation::GetObjectAcl)
            } else {
                Ok(S3Operation::GetObject)
            }
        }
        Method::HEAD => Ok(S3Operation::HeadObject),
        Method::PUT => {
            if has(params, "acl") {
                return Ok(S3Operation::PutObjectAcl);
            }
            if has(params, "partNumber") && has(params, "uploadId") {
                return Ok(S3Operation::UploadPart);
            }
            if has_copy_source {
                return Ok(S3Operation::CopyObject);
            }
            Ok(S3Operation::PutObject)
        }
        Method::DELETE => {
            if has(params, "uploadId") {
                Ok(S3Operation::AbortMultipartUpload)
            } else {
                Ok(S3Operation::DeleteObject)
            }
        }
        Method::POST => {
            if has(params, "uploads") {
                Ok(S3Operation::CreateMultipartUpload)
            } else if has(params, "uploadId") {
                Ok(S3Operation::CompleteMultipartUpload)
            } else {
                Err(S3Error::method_not_allowed("POST"))
            }
        }
        _ => Err(S3Error::method_not_allowed(method.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    fn router() -> S3Router {
        S3Router::new("s3.localhost", true)
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Host", "s3.localhost:4566")
            .body(())
            .expect("valid request")
    }

    fn resolve(method: Method, uri: &str) -> RoutingContext {
        router().resolve(&request(method, uri)).expect("resolves")
    }

    #[test]
    fn test_should_route_list_buckets() {
        let ctx = resolve(Method::GET, "/");
        assert!(ctx.bucket.is_none());
        assert_eq!(ctx.operation, S3Operation::ListBuckets);
    }

    #[test]
    fn test_should_route_bucket_crud() {
        assert_eq!(resolve(Method::PUT, "/b").operation, S3Operation::CreateBucket);
        assert_eq!(resolve(Method::DELETE, "/b").operation, S3Operation::DeleteBucket);
        assert_eq!(resolve(Method::HEAD, "/b").operation, S3Operation::HeadBucket);
    }

    #[test]
    fn test_should_route_listing_variants() {
        assert_eq!(resolve(Method::GET, "/b").operation, S3Operation::ListObjectsV2);
        assert_eq!(
            resolve(Method::GET, "/b?list-type=2&prefix=photos%2F").operation,
            S3Operation::ListObjectsV2
        );
        assert_eq!(
            resolve(Method::GET, "/b?versions").operation,
            S3Operation::ListObjectVersions
        );
    }

    #[test]
    fn test_should_route_bucket_subresources() {
        assert_eq!(resolve(Method::GET, "/b?policy").operation, S3Operation::GetBucketPolicy);
        assert_eq!(resolve(Method::PUT, "/b?policy").operation, S3Operation::PutBucketPolicy);
        assert_eq!(
            resolve(Method::DELETE, "/b?policy").operation,
            S3Operation::DeleteBucketPolicy
        );
        assert_eq!(resolve(Method::GET, "/b?acl").operation, S3Operation::GetBucketAcl);
        assert_eq!(resolve(Method::PUT, "/b?acl").operation, S3Operation::PutBucketAcl);
        assert_eq!(
            resolve(Method::GET, "/b?versioning").operation,
            S3Operation::GetBucketVersioning
        );
        assert_eq!(
            resolve(Method::PUT, "/b?versioning").operation,
            S3Operation::PutBucketVersioning
        );
        assert_eq!(resolve(Method::GET, "/b?tagging").operation, S3Operation::GetBucketTagging);
        assert_eq!(
            resolve(Method::DELETE, "/b?tagging").operation,
            S3Operation::DeleteBucketTagging
        );
        assert_eq!(
            resolve(Method::GET, "/b?lifecycle").operation,
            S3Operation::GetBucketLifecycle
        );
        assert_eq!(
            resolve(Method::GET, "/b?notification").operation,
            S3Operation::GetBucketNotification
        );
        assert_eq!(
            resolve(Method::PUT, "/b?vpc").operation,
            S3Operation::PutBucketVpcConfig
        );
        assert_eq!(
            resolve(Method::DELETE, "/b?vpc").operation,
            S3Operation::DeleteBucketVpcConfig
        );
    }

    #[test]
    fn test_should_route_object_operations() {
        let ctx = resolve(Method::GET, "/b/path/to/key");
        assert_eq!(ctx.bucket.as_deref(), Some("b"));
        assert_eq!(ctx.key.as_deref(), Some("path/to/key"));
        assert_eq!(ctx.operation, S3Operation::GetObject);

        assert_eq!(resolve(Method::PUT, "/b/k").operation, S3Operation::PutObject);
        assert_eq!(resolve(Method::HEAD, "/b/k").operation, S3Operation::HeadObject);
        assert_eq!(resolve(Method::DELETE, "/b/k").operation, S3Operation::DeleteObject);
        assert_eq!(resolve(Method::GET, "/b/k?acl").operation, S3Operation::GetObjectAcl);
        assert_eq!(resolve(Method::PUT, "/b/k?acl").operation, S3Operation::PutObjectAcl);
    }

    #[test]
    fn test_should_route_copy_object_via_header() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/b/k")
            .header("Host", "s3.localhost")
            .header("x-amz-copy-source", "/src/key")
            .body(())
            .expect("valid request");
        let ctx = router().resolve(&req).expect("resolves");
        assert_eq!(ctx.operation, S3Operation::CopyObject);
    }

    #[test]
    fn test_should_route_multipart_operations() {
        assert_eq!(
            resolve(Method::POST, "/b/k?uploads").operation,
            S3Operation::CreateMultipartUpload
        );
        assert_eq!(
            resolve(Method::PUT, "/b/k?partNumber=1&uploadId=u").operation,
            S3Operation::UploadPart
        );
        assert_eq!(
            resolve(Method::POST, "/b/k?uploadId=u").operation,
            S3Operation::CompleteMultipartUpload
        );
        assert_eq!(
            resolve(Method::DELETE, "/b/k?uploadId=u").operation,
            S3Operation::AbortMultipartUpload
        );
    }

    #[test]
    fn test_should_resolve_virtual_hosted_bucket() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/my/key")
            .header("Host", "photos.s3.localhost:4566")
            .body(())
            .expect("valid request");
        let ctx = router().resolve(&req).expect("resolves");
        assert_eq!(ctx.bucket.as_deref(), Some("photos"));
        assert_eq!(ctx.key.as_deref(), Some("my/key"));
    }

    #[test]
    fn test_should_ignore_virtual_hosting_when_disabled() {
        let path_router = S3Router::new("s3.localhost", false);
        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header("Host", "photos.s3.localhost")
            .body(())
            .expect("valid request");
        let ctx = path_router.resolve(&req).expect("resolves");
        assert!(ctx.bucket.is_none());
        assert_eq!(ctx.operation, S3Operation::ListBuckets);
    }

    #[test]
    fn test_should_decode_percent_encoded_keys() {
        let ctx = resolve(Method::GET, "/b/my%20file%2Bplus.txt");
        assert_eq!(ctx.key.as_deref(), Some("my file+plus.txt"));
    }

    #[test]
    fn test_should_expose_query_values() {
        let ctx = resolve(Method::GET, "/b?list-type=2&prefix=a%2Fb&max-keys=5");
        assert_eq!(ctx.query("prefix"), Some("a/b"));
        assert_eq!(ctx.query("max-keys"), Some("5"));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn test_should_reject_unroutable_requests() {
        let err = router()
            .resolve(&request(Method::PATCH, "/b"))
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MethodNotAllowed);

        let err = router().resolve(&request(Method::POST, "/b/k")).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MethodNotAllowed);
    }
}
