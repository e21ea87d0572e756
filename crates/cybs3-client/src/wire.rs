//! Minimal wire parsing for the client: error documents and
//! `ListBucketResult` pages.

use chrono::{DateTime, Utc};
use cybs3_core::error::{ClientError, from_s3_code};
use quick_xml::Reader;
use quick_xml::events::Event;

/// One object from a `ListBucketResult` page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    /// The object key.
    pub key: String,
    /// Size in bytes (of the stored ciphertext).
    pub size: u64,
    /// Quoted ETag.
    pub etag: String,
}

/// A parsed `ListBucketResult` page.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects on this page.
    pub objects: Vec<ListedObject>,
    /// Delimiter-grouped prefixes.
    pub common_prefixes: Vec<String>,
    /// Whether another page follows.
    pub is_truncated: bool,
    /// Continuation token for the next page.
    pub next_continuation_token: Option<String>,
}

/// Walk an XML document, yielding `(path, text)` pairs.
fn texts(xml: &[u8]) -> Result<Vec<(String, String)>, ClientError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?
        {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                out.push((path.join("/"), String::new()));
                path.pop();
            }
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
                if !unescaped.trim().is_empty() {
                    out.push((path.join("/"), unescaped.trim().to_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Map an error-response body to a [`ClientError`].
///
/// Falls back to [`ClientError::HttpStatus`] when the body carries no
/// recognizable `<Error><Code>`.
#[must_use]
pub fn parse_error_body(
    body: &[u8],
    status: u16,
    bucket: &str,
    key: Option<&str>,
) -> ClientError {
    let code = texts(body).ok().and_then(|flat| {
        flat.into_iter()
            .find(|(path, value)| path.ends_with("Error/Code") && !value.is_empty())
            .map(|(_, value)| value)
    });

    match code {
        Some(code) => from_s3_code(&code, status, bucket, key),
        None => ClientError::HttpStatus(status),
    }
}

/// Parse one `ListBucketResult` page.
pub fn parse_list_page(body: &[u8]) -> Result<ListPage, ClientError> {
    let flat = texts(body)?;
    let mut page = ListPage::default();

    let mut key: Option<String> = None;
    let mut size: Option<u64> = None;
    let mut etag: Option<String> = None;

    for (path, value) in flat {
        if path.ends_with("Contents/Key") && !value.is_empty() {
            key = Some(value);
        } else if path.ends_with("Contents/Size") && !value.is_empty() {
            size = value.parse().ok();
        } else if path.ends_with("Contents/ETag") && !value.is_empty() {
            etag = Some(value);
        } else if path.ends_with("Contents") && value.is_empty() {
            if let Some(key) = key.take() {
                page.objects.push(ListedObject {
                    key,
                    size: size.take().unwrap_or(0),
                    etag: etag.take().unwrap_or_default(),
                });
            }
        } else if path.ends_with("CommonPrefixes/Prefix") && !value.is_empty() {
            page.common_prefixes.push(value);
        } else if path.ends_with("IsTruncated") && !value.is_empty() {
            page.is_truncated = value == "true";
        } else if path.ends_with("NextContinuationToken") && !value.is_empty() {
            page.next_continuation_token = Some(value);
        }
    }
    Ok(page)
}

/// Extract the `UploadId` from an `InitiateMultipartUploadResult`.
pub fn parse_upload_id(body: &[u8]) -> Result<String, ClientError> {
    texts(body)?
        .into_iter()
        .find(|(path, value)| path.ends_with("UploadId") && !value.is_empty())
        .map(|(_, value)| value)
        .ok_or_else(|| ClientError::InvalidResponse("no UploadId in response".to_owned()))
}

/// Extract the `ETag` from a `CompleteMultipartUploadResult`.
pub fn parse_complete_etag(body: &[u8]) -> Result<String, ClientError> {
    texts(body)?
        .into_iter()
        .find(|(path, value)| path.ends_with("ETag") && !value.is_empty())
        .map(|(_, value)| value)
        .ok_or_else(|| ClientError::InvalidResponse("no ETag in response".to_owned()))
}

/// Build a `CompleteMultipartUpload` request body.
#[must_use]
pub fn complete_multipart_body(parts: &[(u32, String)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><CompleteMultipartUpload>"#,
    );
    for (number, etag) in parts {
        let escaped = quick_xml::escape::escape(etag);
        body.push_str(&format!(
            "<Part><PartNumber>{number}</PartNumber><ETag>{escaped}</ETag></Part>"
        ));
    }
    body.push_str("</CompleteMultipartUpload>");
    body
}

/// Parse an RFC 2822 `Last-Modified` header value.
#[must_use]
pub fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_error_code() {
        let body = br"<Error><Code>NoSuchKey</Code><Message>gone</Message></Error>";
        let err = parse_error_body(body, 404, "b", Some("k"));
        assert!(matches!(err, ClientError::NoSuchKey { .. }));
    }

    #[test]
    fn test_should_fall_back_to_status_on_unparseable_body() {
        let err = parse_error_body(b"not xml", 500, "b", None);
        assert!(matches!(err, ClientError::HttpStatus(500)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_should_parse_list_page() {
        let body = br#"<ListBucketResult>
            <IsTruncated>true</IsTruncated>
            <NextContinuationToken>b.txt</NextContinuationToken>
            <Contents><Key>a.txt</Key><Size>128</Size><ETag>"e1"</ETag></Contents>
            <Contents><Key>b.txt</Key><Size>256</Size><ETag>"e2"</ETag></Contents>
            <CommonPrefixes><Prefix>docs/</Prefix></CommonPrefixes>
        </ListBucketResult>"#;
        let page = parse_list_page(body).expect("parse");
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[0].key, "a.txt");
        assert_eq!(page.objects[1].size, 256);
        assert_eq!(page.common_prefixes, vec!["docs/"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_should_parse_upload_id_and_etag() {
        let body = br"<InitiateMultipartUploadResult><UploadId>up-1</UploadId></InitiateMultipartUploadResult>";
        assert_eq!(parse_upload_id(body).expect("parse"), "up-1");

        let body = br#"<CompleteMultipartUploadResult><ETag>"abc-2"</ETag></CompleteMultipartUploadResult>"#;
        assert_eq!(parse_complete_etag(body).expect("parse"), "\"abc-2\"");

        assert!(parse_upload_id(b"<Empty></Empty>").is_err());
    }

    #[test]
    fn test_should_build_complete_multipart_body() {
        let body = complete_multipart_body(&[(2, "\"e2\"".to_owned()), (1, "\"e1\"".to_owned())]);
        assert!(body.contains("<PartNumber>2</PartNumber>"));
        assert!(body.contains("<ETag>&quot;e1&quot;</ETag>"));
        assert!(body.starts_with("<?xml"));
    }

    #[test]
    fn test_should_parse_last_modified() {
        let parsed = parse_last_modified("Tue, 15 Nov 1994 08:12:31 GMT").expect("parse");
        assert_eq!(parsed.timestamp(), 784887151);
        assert!(parse_last_modified("not a date").is_none());
    }
}
