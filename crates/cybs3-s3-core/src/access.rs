//! The access-control decision engine.
//!
//! Answers "may principal P perform action A on resource R?" from the
//! bucket policy and the ACLs, with a strict evaluation order:
//!
//! 1. **Existence gate**: every action except `s3:CreateBucket` requires
//!    the bucket to exist (`NoSuchBucket`, not `AccessDenied`).
//! 2. **Bucket policy**: a matching `Deny` statement ends evaluation with
//!    403; a matching `Allow` permits the request; no match falls through.
//! 3. **ACL**: the object ACL (or the bucket ACL for bucket actions and
//!    for `PutObject` to a missing key). The owner is always allowed;
//!    otherwise grants are checked against the permission → action table.
//! 4. Anything left is `AccessDenied`.
//!
//! The engine is read-only: it borrows state, evaluates, and returns. An
//! explicit `Deny` can never be overridden by any combination of `Allow`
//! statements or ACL grants.

use cybs3_s3_model::policy::{BucketPolicy, Effect};
use cybs3_s3_model::{AccessControlPolicy, Permission, S3Error, S3Operation};
use tracing::debug;

use crate::state::S3ServiceState;

/// Principal name used for unauthenticated requests.
pub const ANONYMOUS: &str = "anonymous";

/// One access question.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    /// The authenticated access key, or [`ANONYMOUS`].
    pub principal: &'a str,
    /// The routed operation.
    pub operation: S3Operation,
    /// Target bucket.
    pub bucket: &'a str,
    /// Target key, for object operations.
    pub key: Option<&'a str>,
    /// Target version, when addressed explicitly.
    pub version_id: Option<&'a str>,
    /// Source address, for `aws:SourceIp` conditions.
    pub source_ip: Option<&'a str>,
    /// The `prefix` query parameter, for `s3:prefix` conditions.
    pub prefix: Option<&'a str>,
}

/// Outcome of the bucket-policy stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyDecision {
    Allow,
    Deny,
    ImplicitDeny,
}

/// Evaluate an access request against the service state.
///
/// # Errors
///
/// - `NoSuchBucket` when the bucket is absent (and the action is not
///   `CreateBucket`).
/// - `NoSuchKey` when a read addresses a missing object (404, not 403).
/// - `AccessDenied` otherwise.
pub fn evaluate(state: &S3ServiceState, request: &AccessRequest<'_>) -> Result<(), S3Error> {
    // 1. Existence gate.
    if request.operation == S3Operation::CreateBucket {
        return Ok(());
    }
    if request.operation == S3Operation::ListBuckets {
        // Service-level listing is scoped to the caller's own buckets by
        // the operation itself.
        return Ok(());
    }
    let bucket = state.bucket(request.bucket)?;

    let action = request.operation.action();
    let resource_arn = match request.key {
        Some(key) => format!("arn:aws:s3:::{}/{key}", request.bucket),
        None => format!("arn:aws:s3:::{}", request.bucket),
    };

    // 2. Bucket policy.
    if let Some(policy) = bucket.policy.read().as_ref() {
        match evaluate_policy(policy, request, action, &resource_arn) {
            PolicyDecision::Deny => {
                debug!(
                    principal = request.principal,
                    action, resource_arn, "explicit policy deny"
                );
                return Err(S3Error::access_denied().with_resource(&resource_arn));
            }
            PolicyDecision::Allow => return Ok(()),
            PolicyDecision::ImplicitDeny => {}
        }
    }

    // 3. ACL.
    let acl = match request.key {
        None => Some(bucket.acl.read().clone()),
        Some(key) => {
            let objects = bucket.objects.read();
            let record = match request.version_id {
                Some(version) => objects.version(key, version),
                None => objects.current(key),
            };
            match record {
                Some(record) => Some(record.acl.clone()),
                None => match request.operation {
                    // Writes to a new key are governed by the bucket ACL.
                    S3Operation::PutObject
                    | S3Operation::CopyObject
                    | S3Operation::CreateMultipartUpload
                    | S3Operation::UploadPart
                    | S3Operation::CompleteMultipartUpload
                    | S3Operation::AbortMultipartUpload
                    | S3Operation::DeleteObject => Some(bucket.acl.read().clone()),
                    // Reads of a missing key are a 404, not a 403.
                    S3Operation::GetObject | S3Operation::HeadObject => {
                        return Err(S3Error::no_such_key(key));
                    }
                    _ => None,
                },
            }
        }
    };

    if let Some(acl) = acl {
        if acl_allows(&acl, request.principal, action) {
            return Ok(());
        }
    }

    debug!(
        principal = request.principal,
        action, resource_arn, "access denied"
    );
    Err(S3Error::access_denied().with_resource(&resource_arn))
}

/// Evaluate the policy statements; `Deny` wins over any `Allow`.
fn evaluate_policy(
    policy: &BucketPolicy,
    request: &AccessRequest<'_>,
    action: &str,
    resource_arn: &str,
) -> PolicyDecision {
    let mut allowed = false;
    for statement in &policy.statement {
        if !statement.covers(request.principal, action, resource_arn) {
            continue;
        }
        if !condition_holds(statement.condition.as_ref(), request) {
            continue;
        }
        match statement.effect {
            Effect::Deny => return PolicyDecision::Deny,
            Effect::Allow => allowed = true,
        }
    }
    if allowed {
        PolicyDecision::Allow
    } else {
        PolicyDecision::ImplicitDeny
    }
}

/// Evaluate a condition block against the request.
///
/// Supported operators: `IpAddress` / `NotIpAddress` over `aws:SourceIp`
/// (prefix match covering exact addresses and simple CIDR prefixes) and
/// `StringEquals` over `s3:prefix`. Unknown operators fail closed: the
/// statement does not match.
fn condition_holds(condition: Option<&serde_json::Value>, request: &AccessRequest<'_>) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let Some(operators) = condition.as_object() else {
        return false;
    };

    for (operator, keys) in operators {
        let Some(keys) = keys.as_object() else {
            return false;
        };
        for (key, expected) in keys {
            let holds = match (operator.as_str(), key.as_str()) {
                ("IpAddress", "aws:SourceIp") => ip_matches(expected, request.source_ip),
                ("NotIpAddress", "aws:SourceIp") => !ip_matches(expected, request.source_ip),
                ("StringEquals", "s3:prefix") => string_equals(expected, request.prefix),
                _ => false,
            };
            if !holds {
                return false;
            }
        }
    }
    true
}

fn condition_values(expected: &serde_json::Value) -> Vec<&str> {
    match expected {
        serde_json::Value::String(s) => vec![s.as_str()],
        serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn ip_matches(expected: &serde_json::Value, source_ip: Option<&str>) -> bool {
    let Some(ip) = source_ip else {
        return false;
    };
    condition_values(expected).iter().any(|pattern| {
        // "10.0.0.0/8" matches by prefix of the network part; a bare
        // address matches exactly.
        match pattern.split_once('/') {
            Some((network, _bits)) => {
                let prefix = network.trim_end_matches(|c: char| c == '0' || c == '.');
                ip.starts_with(prefix)
            }
            None => ip == *pattern,
        }
    })
}

fn string_equals(expected: &serde_json::Value, actual: Option<&str>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    condition_values(expected).contains(&actual)
}

/// Whether `acl` lets `principal` perform `action`.
fn acl_allows(acl: &AccessControlPolicy, principal: &str, action: &str) -> bool {
    if acl.owner.id == principal {
        return true;
    }
    acl.grants.iter().any(|grant| {
        grant.grantee.matches(principal) && permission_covers(grant.permission, action)
    })
}

/// The permission → action table.
fn permission_covers(permission: Permission, action: &str) -> bool {
    match permission {
        Permission::FullControl => true,
        Permission::Read => matches!(
            action,
            "s3:GetObject" | "s3:ListBucket" | "s3:ListBucketVersions"
        ),
        Permission::Write => matches!(
            action,
            "s3:PutObject" | "s3:DeleteObject" | "s3:AbortMultipartUpload"
        ),
        Permission::ReadAcp => matches!(action, "s3:GetObjectAcl" | "s3:GetBucketAcl"),
        Permission::WriteAcp => matches!(action, "s3:PutObjectAcl" | "s3:PutBucketAcl"),
    }
}
