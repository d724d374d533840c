//! Read model for memberships and sessions
//!
//! These entities are owned by the organization and session services; the
//! authorization core only reads them through the traits in [`crate::store`].

use crate::gid::Gid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an identity inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipRole {
    Owner,
    Admin,
    Viewer,
    Auditor,
    Employee,
}

impl MembershipRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipRole::Owner => "OWNER",
            MembershipRole::Admin => "ADMIN",
            MembershipRole::Viewer => "VIEWER",
            MembershipRole::Auditor => "AUDITOR",
            MembershipRole::Employee => "EMPLOYEE",
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipRole {
    type Err = crate::error::AuthzError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s {
            "OWNER" => Ok(MembershipRole::Owner),
            "ADMIN" => Ok(MembershipRole::Admin),
            "VIEWER" => Ok(MembershipRole::Viewer),
            "AUDITOR" => Ok(MembershipRole::Auditor),
            "EMPLOYEE" => Ok(MembershipRole::Employee),
            other => Err(crate::error::AuthzError::InvalidInput(format!(
                "unknown membership role {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipState {
    Active,
    Inactive,
}

/// How the membership was provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipSource {
    Manual,
    Scim,
}

/// Link between an identity and an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Gid,
    pub identity_id: Gid,
    pub organization_id: Gid,
    pub role: MembershipRole,
    pub state: MembershipState,
    pub source: MembershipSource,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.state == MembershipState::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationMethod {
    Password,
    Saml,
    MagicLink,
    Oidc,
}

/// Why a session was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionExitReason {
    Logout,
    Revoked,
    Expired,
}

/// Session bound to one membership under a root session
///
/// The existence of a valid child session is the proof that the identity
/// assumed the membership's organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSession {
    pub id: Gid,
    pub membership_id: Gid,
    pub root_session_id: Gid,
    pub authentication_method: AuthenticationMethod,
    pub expires_at: DateTime<Utc>,
    pub root_expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<SessionExitReason>,
}

impl ChildSession {
    /// Expired when the session or its root is past expiry, or it was closed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exit_reason.is_some() || self.expires_at <= now || self.root_expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::gid::TenantId;
    use chrono::Duration;

    fn session(expires_in: Duration, root_expires_in: Duration) -> ChildSession {
        let tenant = TenantId::new_random();
        let now = Utc::now();
        ChildSession {
            id: Gid::new(tenant, EntityType::Session),
            membership_id: Gid::new(tenant, EntityType::Membership),
            root_session_id: Gid::new(tenant, EntityType::Session),
            authentication_method: AuthenticationMethod::Password,
            expires_at: now + expires_in,
            root_expires_at: now + root_expires_in,
            exit_reason: None,
        }
    }

    #[test]
    fn test_child_session_expiry() {
        assert!(!session(Duration::hours(1), Duration::hours(2)).is_expired());
        assert!(session(Duration::hours(-1), Duration::hours(2)).is_expired());
    }

    #[test]
    fn test_root_expiry_invalidates_child() {
        assert!(session(Duration::hours(1), Duration::minutes(-1)).is_expired());
    }

    #[test]
    fn test_exit_reason_invalidates_child() {
        let mut s = session(Duration::hours(1), Duration::hours(1));
        s.exit_reason = Some(SessionExitReason::Logout);
        assert!(s.is_expired());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(MembershipRole::Owner.to_string(), "OWNER");
        assert_eq!("AUDITOR".parse::<MembershipRole>().unwrap(), MembershipRole::Auditor);
        assert!("owner".parse::<MembershipRole>().is_err());
        assert_eq!(
            serde_json::to_string(&MembershipRole::Employee).unwrap(),
            "\"EMPLOYEE\""
        );
    }
}
