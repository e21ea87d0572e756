//! The XML wire codec: exactly the documents the S3 surface needs.
//!
//! Serialization follows the AWS RestXml conventions: the
//! `http://s3.amazonaws.com/doc/2006-03-01/` namespace on root elements,
//! lowercase booleans, ISO-8601 timestamps with milliseconds, and an XML
//! declaration on every document.
//!
//! Parsing is lenient about unknown elements (they are skipped), strict
//! about structure (`MalformedXML` on anything that does not parse).

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use cybs3_s3_model::{
    AccessControlPolicy, Grant, Grantee, Owner, Permission, S3Error, S3ErrorCode,
    VersioningStatus,
};
use cybs3_s3_core::{ListObjectsResult, VersionSummary};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

type XmlResult = Result<Vec<u8>, S3Error>;

fn malformed(detail: impl std::fmt::Display) -> S3Error {
    S3Error::with_message(S3ErrorCode::MalformedXML, format!("{detail}"))
}

fn internal(err: impl std::fmt::Display) -> S3Error {
    S3Error::internal(format!("XML serialization failed: {err}"))
}

/// Format a timestamp the way S3 does.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Build a document: declaration, namespaced root, inner content.
fn document<F>(root: &str, write_inner: F) -> XmlResult
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(internal)?;
    writer
        .create_element(root)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(write_inner)
        .map_err(internal)?;

    Ok(buf)
}

fn text<W: Write>(writer: &mut Writer<W>, tag: &str, value: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// `<Error>` response body.
#[must_use]
pub fn error_xml(error: &S3Error, request_id: &str) -> Vec<u8> {
    document("Error", |w| {
        text(w, "Code", error.code.as_str())?;
        text(w, "Message", &error.message)?;
        if let Some(resource) = error.resource.as_deref() {
            text(w, "Resource", resource)?;
        }
        text(w, "RequestId", request_id)?;
        Ok(())
    })
    // A static document over an in-memory buffer cannot fail; fall back
    // to a bare code if it somehow does.
    .unwrap_or_else(|_| format!("<Error><Code>{}</Code></Error>", error.code).into_bytes())
}

/// `ListAllMyBucketsResult`.
pub fn list_buckets_xml(
    owner_id: &str,
    buckets: &[cybs3_s3_core::BucketSummary],
) -> XmlResult {
    document("ListAllMyBucketsResult", |w| {
        w.create_element("Owner").write_inner_content(|w| {
            text(w, "ID", owner_id)?;
            text(w, "DisplayName", owner_id)
        })?;
        w.create_element("Buckets").write_inner_content(|w| {
            for bucket in buckets {
                w.create_element("Bucket").write_inner_content(|w| {
                    text(w, "Name", &bucket.name)?;
                    text(w, "CreationDate", &format_timestamp(bucket.creation_date))
                })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

/// `ListBucketResult` (ListObjectsV2).
pub fn list_objects_xml(
    bucket: &str,
    prefix: Option<&str>,
    delimiter: Option<&str>,
    max_keys: u32,
    result: &ListObjectsResult,
) -> XmlResult {
    document("ListBucketResult", |w| {
        text(w, "Name", bucket)?;
        text(w, "Prefix", prefix.unwrap_or(""))?;
        if let Some(delimiter) = delimiter {
            text(w, "Delimiter", delimiter)?;
        }
        text(w, "KeyCount", &result.objects.len().to_string())?;
        text(w, "MaxKeys", &max_keys.to_string())?;
        text(w, "IsTruncated", if result.is_truncated { "true" } else { "false" })?;
        if let Some(token) = result.next_continuation_token.as_deref() {
            text(w, "NextContinuationToken", token)?;
        }
        for object in &result.objects {
            w.create_element("Contents").write_inner_content(|w| {
                text(w, "Key", &object.key)?;
                text(w, "LastModified", &format_timestamp(object.last_modified))?;
                text(w, "ETag", &object.etag)?;
                text(w, "Size", &object.size.to_string())?;
                text(w, "StorageClass", "STANDARD")?;
                w.create_element("Owner").write_inner_content(|w| {
                    text(w, "ID", &object.owner_id)?;
                    text(w, "DisplayName", &object.owner_id)
                })?;
                Ok(())
            })?;
        }
        for common_prefix in &result.common_prefixes {
            w.create_element("CommonPrefixes")
                .write_inner_content(|w| text(w, "Prefix", common_prefix))?;
        }
        Ok(())
    })
}

/// `ListVersionsResult`.
pub fn list_versions_xml(
    bucket: &str,
    prefix: Option<&str>,
    versions: &[VersionSummary],
) -> XmlResult {
    document("ListVersionsResult", |w| {
        text(w, "Name", bucket)?;
        text(w, "Prefix", prefix.unwrap_or(""))?;
        for version in versions {
            let element = if version.is_delete_marker {
                "DeleteMarker"
            } else {
                "Version"
            };
            w.create_element(element).write_inner_content(|w| {
                text(w, "Key", &version.key)?;
                text(w, "VersionId", &version.version_id)?;
                text(w, "IsLatest", if version.is_latest { "true" } else { "false" })?;
                text(w, "LastModified", &format_timestamp(version.last_modified))?;
                if !version.is_delete_marker {
                    text(w, "ETag", &version.etag)?;
                    text(w, "Size", &version.size.to_string())?;
                    text(w, "StorageClass", "STANDARD")?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// `InitiateMultipartUploadResult`.
pub fn initiate_multipart_xml(bucket: &str, key: &str, upload_id: &str) -> XmlResult {
    document("InitiateMultipartUploadResult", |w| {
        text(w, "Bucket", bucket)?;
        text(w, "Key", key)?;
        text(w, "UploadId", upload_id)
    })
}

/// `CompleteMultipartUploadResult`.
pub fn complete_multipart_xml(
    location: &str,
    bucket: &str,
    key: &str,
    etag: &str,
) -> XmlResult {
    document("CompleteMultipartUploadResult", |w| {
        text(w, "Location", location)?;
        text(w, "Bucket", bucket)?;
        text(w, "Key", key)?;
        text(w, "ETag", etag)
    })
}

/// `VersioningConfiguration`.
pub fn versioning_xml(status: VersioningStatus) -> XmlResult {
    document("VersioningConfiguration", |w| {
        if status != VersioningStatus::Unversioned {
            text(w, "Status", status.as_wire_str())?;
        }
        Ok(())
    })
}

/// `Tagging`.
pub fn tagging_xml(tags: &[(String, String)]) -> XmlResult {
    document("Tagging", |w| {
        w.create_element("TagSet").write_inner_content(|w| {
            for (key, value) in tags {
                w.create_element("Tag").write_inner_content(|w| {
                    text(w, "Key", key)?;
                    text(w, "Value", value)
                })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

/// `AccessControlPolicy`.
pub fn acl_xml(acl: &AccessControlPolicy) -> XmlResult {
    document("AccessControlPolicy", |w| {
        w.create_element("Owner").write_inner_content(|w| {
            text(w, "ID", &acl.owner.id)?;
            text(w, "DisplayName", &acl.owner.display_name)
        })?;
        w.create_element("AccessControlList").write_inner_content(|w| {
            for grant in &acl.grants {
                w.create_element("Grant").write_inner_content(|w| {
                    match &grant.grantee {
                        Grantee::CanonicalUser { id } => {
                            w.create_element("Grantee")
                                .with_attribute(("xsi:type", "CanonicalUser"))
                                .write_inner_content(|w| text(w, "ID", id))?;
                        }
                        Grantee::Group { uri } => {
                            w.create_element("Grantee")
                                .with_attribute(("xsi:type", "Group"))
                                .write_inner_content(|w| text(w, "URI", uri))?;
                        }
                    }
                    text(w, "Permission", grant.permission.as_str())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// A flat `(path, text)` view of an XML document, where `path` joins
/// element names with `/`. Enough structure for every body this server
/// accepts.
fn flatten_xml(body: &[u8]) -> Result<Vec<(String, String)>, S3Error> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.push(name);
            }
            Event::End(_) => {
                // Record element boundaries so repeated containers (e.g.
                // multiple <Part> blocks) can be split downstream.
                out.push((path.join("/"), String::new()));
                path.pop();
            }
            Event::Text(e) => {
                let decoded = e.decode().map_err(malformed)?;
                let unescaped =
                    quick_xml::escape::unescape(&decoded).map_err(malformed)?;
                if !unescaped.trim().is_empty() {
                    out.push((path.join("/"), unescaped.trim().to_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(malformed("unclosed element"));
    }
    Ok(out)
}

/// Extract `LocationConstraint` from a `CreateBucketConfiguration` body.
/// An empty body means the default region.
pub fn parse_create_bucket_location(body: &[u8]) -> Result<Option<String>, S3Error> {
    if body.is_empty() {
        return Ok(None);
    }
    let flat = flatten_xml(body)?;
    Ok(flat
        .into_iter()
        .find(|(path, value)| path.ends_with("LocationConstraint") && !value.is_empty())
        .map(|(_, value)| value))
}

/// Parse a `VersioningConfiguration` body.
pub fn parse_versioning_status(body: &[u8]) -> Result<VersioningStatus, S3Error> {
    let flat = flatten_xml(body)?;
    let status = flat
        .iter()
        .find(|(path, value)| path.ends_with("Status") && !value.is_empty())
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| malformed("VersioningConfiguration without Status"))?;

    match status {
        "Enabled" => Ok(VersioningStatus::Enabled),
        "Suspended" => Ok(VersioningStatus::Suspended),
        other => Err(malformed(format!("unknown versioning status: {other}"))),
    }
}

/// Parse a `Tagging` body into `(key, value)` pairs.
pub fn parse_tagging(body: &[u8]) -> Result<Vec<(String, String)>, S3Error> {
    let flat = flatten_xml(body)?;
    let mut tags = Vec::new();
    let mut key: Option<String> = None;
    let mut value: Option<String> = None;

    for (path, content) in flat {
        if path.ends_with("Tag/Key") && !content.is_empty() {
            key = Some(content);
        } else if path.ends_with("Tag/Value") && !content.is_empty() {
            value = Some(content);
        } else if path.ends_with("Tag") && content.is_empty() {
            // Element boundary: one <Tag> block closed.
            match (key.take(), value.take()) {
                (Some(k), Some(v)) => tags.push((k, v)),
                (Some(k), None) => tags.push((k, String::new())),
                _ => return Err(malformed("Tag without Key")),
            }
        }
    }
    Ok(tags)
}

/// Parse a `CompleteMultipartUpload` body into `(part_number, etag)`
/// pairs, in document order.
pub fn parse_complete_multipart(body: &[u8]) -> Result<Vec<(u32, String)>, S3Error> {
    let flat = flatten_xml(body)?;
    let mut parts = Vec::new();
    let mut number: Option<u32> = None;
    let mut etag: Option<String> = None;

    for (path, content) in flat {
        if path.ends_with("Part/PartNumber") && !content.is_empty() {
            number = Some(
                content
                    .parse()
                    .map_err(|_| malformed("PartNumber is not a number"))?,
            );
        } else if path.ends_with("Part/ETag") && !content.is_empty() {
            etag = Some(content);
        } else if path.ends_with("Part") && content.is_empty() {
            match (number.take(), etag.take()) {
                (Some(n), Some(e)) => parts.push((n, e)),
                _ => return Err(malformed("Part without PartNumber and ETag")),
            }
        }
    }

    if parts.is_empty() {
        return Err(malformed("CompleteMultipartUpload without parts"));
    }
    Ok(parts)
}

/// Parse an `AccessControlPolicy` body.
pub fn parse_acl(body: &[u8]) -> Result<AccessControlPolicy, S3Error> {
    let flat = flatten_xml(body)?;

    let mut owner_id: Option<String> = None;
    let mut grants = Vec::new();
    let mut grantee_id: Option<String> = None;
    let mut grantee_uri: Option<String> = None;
    let mut permission: Option<Permission> = None;

    for (path, content) in flat {
        if path.ends_with("Owner/ID") && !content.is_empty() {
            owner_id = Some(content);
        } else if path.ends_with("Grantee/ID") && !content.is_empty() {
            grantee_id = Some(content);
        } else if path.ends_with("Grantee/URI") && !content.is_empty() {
            grantee_uri = Some(content);
        } else if path.ends_with("Grant/Permission") && !content.is_empty() {
            permission = Some(
                content
                    .parse()
                    .map_err(|e: String| malformed(e))?,
            );
        } else if path.ends_with("Grant") && content.is_empty() {
            let grantee = match (grantee_id.take(), grantee_uri.take()) {
                (Some(id), _) => Grantee::CanonicalUser { id },
                (None, Some(uri)) => Grantee::Group { uri },
                (None, None) => return Err(malformed("Grant without Grantee")),
            };
            let permission =
                permission.take().ok_or_else(|| malformed("Grant without Permission"))?;
            grants.push(Grant {
                grantee,
                permission,
            });
        }
    }

    let owner_id = owner_id.ok_or_else(|| malformed("AccessControlPolicy without Owner"))?;
    Ok(AccessControlPolicy {
        owner: Owner::new(owner_id),
        grants,
    })
}

/// Convert an arbitrary XML body into JSON for opaque storage (lifecycle
/// and notification configurations).
///
/// Elements become objects keyed by child name; repeated children become
/// arrays; text-only elements become strings.
pub fn xml_to_json(body: &[u8]) -> Result<serde_json::Value, S3Error> {
    let flat = flatten_xml(body)?;
    let mut root = serde_json::Map::new();

    for (path, content) in flat {
        if content.is_empty() {
            continue;
        }
        insert_path(&mut root, path.split('/').collect::<Vec<_>>().as_slice(), content);
    }

    Ok(serde_json::Value::Object(root))
}

fn insert_path(map: &mut serde_json::Map<String, serde_json::Value>, path: &[&str], value: String) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match map.get_mut(*head) {
            Some(serde_json::Value::Array(items)) => {
                items.push(serde_json::Value::String(value));
            }
            Some(existing) => {
                let first = existing.take();
                *existing =
                    serde_json::Value::Array(vec![first, serde_json::Value::String(value)]);
            }
            None => {
                map.insert((*head).to_owned(), serde_json::Value::String(value));
            }
        }
        return;
    }

    let entry = map
        .entry((*head).to_owned())
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    if let serde_json::Value::Object(child) = entry {
        insert_path(child, rest, value);
    }
}
