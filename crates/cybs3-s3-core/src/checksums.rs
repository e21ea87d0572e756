//! ETag computation.
//!
//! Plain objects get a quoted hex MD5. Multipart objects get the AWS
//! composite form: the MD5 of the concatenated raw part digests, suffixed
//! with `-{part_count}`.

use md5::{Digest, Md5};

/// Hex MD5 of `data` (unquoted).
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Quoted ETag for a plain object.
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", compute_md5(data))
}

/// Composite ETag for a multipart object.
///
/// `part_md5_hexes` are the unquoted hex digests of the individual parts,
/// in part order.
#[must_use]
pub fn compute_multipart_etag(part_md5_hexes: &[String], part_count: usize) -> String {
    let mut concatenated = Vec::with_capacity(part_md5_hexes.len() * 16);
    for hex_digest in part_md5_hexes {
        if let Ok(raw) = hex::decode(hex_digest) {
            concatenated.extend_from_slice(&raw);
        }
    }
    format!("\"{}-{part_count}\"", compute_md5(&concatenated))
}
