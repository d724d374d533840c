//! Authorization call parameters

use crate::entity::Attributes;
use crate::gid::Gid;

/// One authorization call
#[derive(Debug, Clone)]
pub struct AuthorizeParams {
    /// Acting identity
    pub principal: Gid,

    /// Target entity
    pub resource: Gid,

    /// `service:resource:operation`
    pub action: String,

    /// Current root session, if the call is session-authenticated
    pub session: Option<Gid>,

    /// Attributes only the caller can cheaply compute; they override the
    /// resource's own attributes on collision
    pub resource_attributes: Attributes,
}

impl AuthorizeParams {
    pub fn new(principal: Gid, resource: Gid, action: impl Into<String>) -> Self {
        Self {
            principal,
            resource,
            action: action.into(),
            session: None,
            resource_attributes: Attributes::new(),
        }
    }

    /// Set the current root session
    pub fn with_session(mut self, session: Gid) -> Self {
        self.session = Some(session);
        self
    }

    /// Add a caller-supplied resource attribute
    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.insert(key.into(), value.into());
        self
    }
}
