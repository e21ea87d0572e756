//! Access-control-list grammar.
//!
//! [`AccessControlPolicy`] is the canonical form every ACL lives in on the
//! server. Canned ACLs are named presets expanded into that form at
//! put-time by [`CannedAcl::expand`]; the decision engine only ever sees
//! the expanded policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Group URI granting access to everyone, authenticated or not.
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Group URI granting access to any authenticated principal.
pub const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// The owner of a bucket or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// The canonical owner ID (the account's access key in this stack).
    pub id: String,
    /// Display name for listings.
    #[serde(default)]
    pub display_name: String,
}

impl Owner {
    /// An owner identified by `id` with a matching display name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
        }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new("cybs3-root")
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Grantee {
    /// A specific principal by canonical ID.
    CanonicalUser {
        /// The principal's ID.
        id: String,
    },
    /// A predefined group by URI (`AllUsers`, `AuthenticatedUsers`).
    Group {
        /// The group URI.
        uri: String,
    },
}

impl Grantee {
    /// Whether this grantee matches `principal` (`"anonymous"` for
    /// unauthenticated requests).
    #[must_use]
    pub fn matches(&self, principal: &str) -> bool {
        match self {
            Self::CanonicalUser { id } => id == principal,
            Self::Group { uri } => match uri.as_str() {
                ALL_USERS_URI => true,
                AUTHENTICATED_USERS_URI => principal != "anonymous",
                _ => false,
            },
        }
    }
}

/// A permission granted to a grantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Everything.
    FullControl,
    /// Read object data / list the bucket.
    Read,
    /// Write objects into the bucket.
    Write,
    /// Read the ACL itself.
    ReadAcp,
    /// Write the ACL itself.
    WriteAcp,
}

impl Permission {
    /// Wire form (`FULL_CONTROL`, `READ`, …).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullControl => "FULL_CONTROL",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::ReadAcp => "READ_ACP",
            Self::WriteAcp => "WRITE_ACP",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_CONTROL" => Ok(Self::FullControl),
            "READ" => Ok(Self::Read),
            "WRITE" => Ok(Self::Write),
            "READ_ACP" => Ok(Self::ReadAcp),
            "WRITE_ACP" => Ok(Self::WriteAcp),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

/// One grant: a grantee paired with a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Who receives the permission.
    pub grantee: Grantee,
    /// What they may do.
    pub permission: Permission,
}

/// A full access-control policy: the owner plus a list of grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    /// The resource owner (always implicitly FullControl).
    pub owner: Owner,
    /// Explicit grants.
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl AccessControlPolicy {
    /// A private policy: the owner and nothing else.
    #[must_use]
    pub fn private(owner: Owner) -> Self {
        Self {
            owner,
            grants: Vec::new(),
        }
    }
}

/// Named ACL presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CannedAcl {
    /// Owner only (default).
    #[default]
    Private,
    /// Owner plus `AllUsers: READ`.
    PublicRead,
    /// Owner plus `AllUsers: READ` and `AllUsers: WRITE`.
    PublicReadWrite,
    /// Owner plus `AuthenticatedUsers: READ`.
    AuthenticatedRead,
    /// Object owner plus bucket owner `READ`.
    BucketOwnerRead,
    /// Object owner plus bucket owner `FULL_CONTROL`.
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// The header form (`private`, `public-read`, …).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }

    /// Expand into the canonical [`AccessControlPolicy`].
    ///
    /// `bucket_owner` is only consulted by the `bucket-owner-*` presets.
    #[must_use]
    pub fn expand(&self, owner: Owner, bucket_owner: Option<&Owner>) -> AccessControlPolicy {
        let mut grants = Vec::new();
        match self {
            Self::Private => {}
            Self::PublicRead => {
                grants.push(group_grant(ALL_USERS_URI, Permission::Read));
            }
            Self::PublicReadWrite => {
                grants.push(group_grant(ALL_USERS_URI, Permission::Read));
                grants.push(group_grant(ALL_USERS_URI, Permission::Write));
            }
            Self::AuthenticatedRead => {
                grants.push(group_grant(AUTHENTICATED_USERS_URI, Permission::Read));
            }
            Self::BucketOwnerRead => {
                if let Some(bucket_owner) = bucket_owner {
                    grants.push(user_grant(&bucket_owner.id, Permission::Read));
                }
            }
            Self::BucketOwnerFullControl => {
                if let Some(bucket_owner) = bucket_owner {
                    grants.push(user_grant(&bucket_owner.id, Permission::FullControl));
                }
            }
        }
        AccessControlPolicy { owner, grants }
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CannedAcl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            "bucket-owner-read" => Ok(Self::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Self::BucketOwnerFullControl),
            other => Err(format!("unknown canned ACL: {other}")),
        }
    }
}

fn group_grant(uri: &str, permission: Permission) -> Grant {
    Grant {
        grantee: Grantee::Group {
            uri: uri.to_owned(),
        },
        permission,
    }
}

fn user_grant(id: &str, permission: Permission) -> Grant {
    Grant {
        grantee: Grantee::CanonicalUser { id: id.to_owned() },
        permission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_match_canonical_user_grantee() {
        let grantee = Grantee::CanonicalUser {
            id: "alice".to_owned(),
        };
        assert!(grantee.matches("alice"));
        assert!(!grantee.matches("bob"));
        assert!(!grantee.matches("anonymous"));
    }

    #[test]
    fn test_should_match_all_users_group_for_everyone() {
        let grantee = Grantee::Group {
            uri: ALL_USERS_URI.to_owned(),
        };
        assert!(grantee.matches("alice"));
        assert!(grantee.matches("anonymous"));
    }

    #[test]
    fn test_should_match_authenticated_users_only_when_signed() {
        let grantee = Grantee::Group {
            uri: AUTHENTICATED_USERS_URI.to_owned(),
        };
        assert!(grantee.matches("alice"));
        assert!(!grantee.matches("anonymous"));
    }

    #[test]
    fn test_should_not_match_unknown_group() {
        let grantee = Grantee::Group {
            uri: "http://acs.amazonaws.com/groups/s3/LogDelivery".to_owned(),
        };
        assert!(!grantee.matches("alice"));
    }

    #[test]
    fn test_should_expand_private_to_owner_only() {
        let acl = CannedAcl::Private.expand(Owner::new("alice"), None);
        assert!(acl.grants.is_empty());
        assert_eq!(acl.owner.id, "alice");
    }

    #[test]
    fn test_should_expand_public_read() {
        let acl = CannedAcl::PublicRead.expand(Owner::new("alice"), None);
        assert_eq!(acl.grants.len(), 1);
        assert_eq!(acl.grants[0].permission, Permission::Read);
        assert!(acl.grants[0].grantee.matches("anonymous"));
    }

    #[test]
    fn test_should_expand_public_read_write() {
        let acl = CannedAcl::PublicReadWrite.expand(Owner::new("alice"), None);
        let perms: Vec<Permission> = acl.grants.iter().map(|g| g.permission).collect();
        assert_eq!(perms, vec![Permission::Read, Permission::Write]);
    }

    #[test]
    fn test_should_expand_bucket_owner_full_control() {
        let acl = CannedAcl::BucketOwnerFullControl
            .expand(Owner::new("writer"), Some(&Owner::new("bucket-owner")));
        assert_eq!(acl.grants.len(), 1);
        assert!(acl.grants[0].grantee.matches("bucket-owner"));
        assert_eq!(acl.grants[0].permission, Permission::FullControl);
    }

    #[test]
    fn test_should_roundtrip_canned_acl_strings() {
        for canned in [
            CannedAcl::Private,
            CannedAcl::PublicRead,
            CannedAcl::PublicReadWrite,
            CannedAcl::AuthenticatedRead,
            CannedAcl::BucketOwnerRead,
            CannedAcl::BucketOwnerFullControl,
        ] {
            let parsed: CannedAcl = canned.as_str().parse().expect("parse");
            assert_eq!(parsed, canned);
        }
        assert!("log-delivery-write".parse::<CannedAcl>().is_err());
    }

    #[test]
    fn test_should_parse_permissions() {
        assert_eq!(
            "FULL_CONTROL".parse::<Permission>(),
            Ok(Permission::FullControl)
        );
        assert_eq!("READ".parse::<Permission>(), Ok(Permission::Read));
        assert!("OWN".parse::<Permission>().is_err());
    }
}
