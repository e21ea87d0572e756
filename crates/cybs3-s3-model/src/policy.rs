//! Bucket-policy JSON model.
//!
//! Parses the AWS policy grammar this server evaluates: `Statement[]` with
//! `Effect`, `Principal`, `Action`, `Resource`, and an optional
//! `Condition`. AWS JSON allows most list-valued fields to be written as a
//! single string; [`OneOrMany`] absorbs both forms.
//!
//! Matching rules live here next to the data they interpret:
//! action wildcards (`s3:*`, `s3:Get*`), resource wildcards
//! (`arn:aws:s3:::bucket/*`), and principal forms (`"*"`,
//! `{"AWS": [...]}`).

use serde::{Deserialize, Serialize};

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// The statement permits matching requests.
    Allow,
    /// The statement forbids matching requests; deny always wins.
    Deny,
}

/// A string or a list of strings, as AWS policy JSON allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single value.
    One(String),
    /// List of values.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Iterate the values regardless of form.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::One(s) => std::slice::from_ref(s).iter().map(String::as_str),
            Self::Many(v) => v.as_slice().iter().map(String::as_str),
        }
    }
}

/// The `Principal` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    /// `"Principal": "*"`, covering everyone.
    Wildcard(String),
    /// `"Principal": {"AWS": ...}`, listing specific principals.
    Aws {
        /// The AWS principal list.
        #[serde(rename = "AWS")]
        aws: OneOrMany,
    },
}

impl Principal {
    /// Whether `principal` is covered by this element.
    #[must_use]
    pub fn matches(&self, principal: &str) -> bool {
        match self {
            Self::Wildcard(s) => s == "*",
            Self::Aws { aws } => aws.iter().any(|p| p == "*" || p == principal),
        }
    }
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Optional statement ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Allow or deny.
    pub effect: Effect,
    /// Who the statement applies to.
    pub principal: Principal,
    /// Actions, e.g. `s3:GetObject` (wildcards allowed).
    pub action: OneOrMany,
    /// Resources as `arn:aws:s3:::bucket[/key]` (wildcards allowed).
    pub resource: OneOrMany,
    /// Optional condition block: operator → key → value(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Statement {
    /// Whether the statement covers the `(principal, action, resource)`
    /// triple. Conditions are evaluated separately by the decision engine.
    #[must_use]
    pub fn covers(&self, principal: &str, action: &str, resource_arn: &str) -> bool {
        self.principal.matches(principal)
            && self.action.iter().any(|a| action_matches(a, action))
            && self.resource.iter().any(|r| resource_matches(r, resource_arn))
    }
}

/// A parsed bucket policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    /// Policy language version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The statements, evaluated in order.
    pub statement: Vec<Statement>,
}

impl BucketPolicy {
    /// Parse a policy document.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error for malformed JSON or a policy
    /// that does not fit the grammar.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Match a policy action pattern against a concrete action.
///
/// Patterns are case-insensitive and support a trailing `*` (`s3:*`,
/// `s3:Get*`).
#[must_use]
pub fn action_matches(pattern: &str, action: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let action = action.to_ascii_lowercase();
    match pattern.strip_suffix('*') {
        Some(prefix) => action.starts_with(prefix),
        None => pattern == action,
    }
}

/// Match a policy resource pattern against a concrete resource ARN.
///
/// Supports a trailing `*` (`arn:aws:s3:::bucket/*`, `arn:aws:s3:::*`).
#[must_use]
pub fn resource_matches(pattern: &str, resource: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => resource.starts_with(prefix),
        None => pattern == resource,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DENY_SECRET: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "DenySecret",
            "Effect": "Deny",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": "arn:aws:s3:::b/secret.txt"
        }]
    }"#;

    #[test]
    fn test_should_parse_single_statement_policy() {
        let policy = BucketPolicy::parse(DENY_SECRET).expect("parse");
        assert_eq!(policy.statement.len(), 1);
        assert_eq!(policy.statement[0].effect, Effect::Deny);
        assert_eq!(policy.statement[0].sid.as_deref(), Some("DenySecret"));
    }

    #[test]
    fn test_should_parse_list_valued_fields() {
        let json = r#"{
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": ["alice", "bob"]},
                "Action": ["s3:GetObject", "s3:ListBucket"],
                "Resource": ["arn:aws:s3:::b", "arn:aws:s3:::b/*"]
            }]
        }"#;
        let policy = BucketPolicy::parse(json).expect("parse");
        let stmt = &policy.statement[0];
        assert!(stmt.principal.matches("alice"));
        assert!(stmt.principal.matches("bob"));
        assert!(!stmt.principal.matches("carol"));
        assert_eq!(stmt.action.iter().count(), 2);
    }

    #[test]
    fn test_should_reject_malformed_policy() {
        assert!(BucketPolicy::parse("{not json").is_err());
        assert!(BucketPolicy::parse(r#"{"Statement": "nope"}"#).is_err());
    }

    #[test]
    fn test_should_match_wildcard_principal() {
        let policy = BucketPolicy::parse(DENY_SECRET).expect("parse");
        let stmt = &policy.statement[0];
        assert!(stmt.principal.matches("anonymous"));
        assert!(stmt.principal.matches("anyone-at-all"));
    }

    #[test]
    fn test_should_match_actions_with_wildcards() {
        assert!(action_matches("s3:GetObject", "s3:GetObject"));
        assert!(action_matches("s3:getobject", "s3:GetObject"));
        assert!(action_matches("s3:*", "s3:DeleteObject"));
        assert!(action_matches("s3:Get*", "s3:GetObject"));
        assert!(!action_matches("s3:Get*", "s3:PutObject"));
        assert!(!action_matches("s3:GetObject", "s3:GetObjectAcl"));
    }

    #[test]
    fn test_should_match_resources_with_wildcards() {
        assert!(resource_matches("arn:aws:s3:::b/secret.txt", "arn:aws:s3:::b/secret.txt"));
        assert!(resource_matches("arn:aws:s3:::b/*", "arn:aws:s3:::b/any/key"));
        assert!(resource_matches("arn:aws:s3:::*", "arn:aws:s3:::other"));
        assert!(!resource_matches("arn:aws:s3:::b/*", "arn:aws:s3:::other/key"));
        assert!(!resource_matches("arn:aws:s3:::b", "arn:aws:s3:::b/key"));
    }

    #[test]
    fn test_should_cover_triple() {
        let policy = BucketPolicy::parse(DENY_SECRET).expect("parse");
        let stmt = &policy.statement[0];
        assert!(stmt.covers("anonymous", "s3:GetObject", "arn:aws:s3:::b/secret.txt"));
        assert!(!stmt.covers("anonymous", "s3:GetObject", "arn:aws:s3:::b/other.txt"));
        assert!(!stmt.covers("anonymous", "s3:PutObject", "arn:aws:s3:::b/secret.txt"));
    }

    #[test]
    fn test_should_roundtrip_policy_serialization() {
        let policy = BucketPolicy::parse(DENY_SECRET).expect("parse");
        let json = serde_json::to_string(&policy).expect("serialize");
        let reparsed = BucketPolicy::parse(&json).expect("reparse");
        assert_eq!(policy, reparsed);
    }
}
