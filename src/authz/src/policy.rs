//! Policy definitions
//!
//! A [`Policy`] is a named, ordered list of [`Statement`]s. Statements are
//! assembled with the [`allow`] / [`deny`] builders:
//!
//! ```rust
//! use gatekeep_authz::condition::equals;
//! use gatekeep_authz::policy::{allow, deny, Policy};
//!
//! let policy = Policy::new(
//!     "identity-self-service",
//!     "Identities manage their own profile",
//!     vec![
//!         allow(["iam:identity:update"])
//!             .with_sid("update-self")
//!             .when([equals("principal.id", ["resource.id"])]),
//!         deny(["iam:identity:delete"]).with_sid("no-self-delete"),
//!     ],
//! );
//! assert_eq!(policy.statements.len(), 2);
//! ```

use crate::condition::{Condition, ConditionContext};
use crate::entity::EntityType;
use crate::gid::{Gid, TenantId};
use serde::{Deserialize, Serialize};

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

/// Predicate over a resource identifier
///
/// Every field that is set must equal the corresponding property of the
/// identifier. A pattern with no fields set matches every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
}

impl ResourcePattern {
    /// Match any resource
    pub fn any() -> Self {
        Self::default()
    }

    /// Match resources owned by `tenant_id`
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            entity_type: None,
        }
    }

    /// Match resources of `entity_type`
    pub fn entity_type(entity_type: EntityType) -> Self {
        Self {
            tenant_id: None,
            entity_type: Some(entity_type),
        }
    }

    /// Narrow to a tenant
    pub fn in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn matches(&self, resource: &Gid) -> bool {
        if let Some(tenant_id) = self.tenant_id {
            if resource.tenant_id() != tenant_id {
                return false;
            }
        }
        if let Some(entity_type) = self.entity_type {
            if resource.entity_tag() != entity_type.tag() {
                return false;
            }
        }
        true
    }
}

/// A single allow or deny rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Optional identifier, reported in decisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    pub effect: Effect,

    /// Action patterns; at least one must match
    pub actions: Vec<String>,

    /// Resource patterns; empty means any resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourcePattern>,

    /// Conditions; all must hold
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Statement {
    pub fn new<I, S>(effect: Effect, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sid: None,
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Set the statement identifier
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Restrict the statement to resources matching any of `patterns`
    pub fn with_resources(mut self, patterns: impl IntoIterator<Item = ResourcePattern>) -> Self {
        self.resources.extend(patterns);
        self
    }

    /// Attach conditions that must all hold
    pub fn with_conditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Alias for [`Statement::with_conditions`]
    pub fn when(self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.with_conditions(conditions)
    }

    /// Whether the statement applies to `action` on `resource` under `ctx`
    pub fn applies(&self, action: &str, resource: &Gid, ctx: &ConditionContext) -> bool {
        if !crate::action::matches_any(&self.actions, action) {
            return false;
        }

        if !self.resources.is_empty() && !self.resources.iter().any(|p| p.matches(resource)) {
            return false;
        }

        self.conditions.iter().all(|c| c.evaluate(ctx))
    }
}

/// Allow statement for `actions`
pub fn allow<I, S>(actions: I) -> Statement
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Statement::new(Effect::Allow, actions)
}

/// Deny statement for `actions`
pub fn deny<I, S>(actions: I) -> Statement
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Statement::new(Effect::Deny, actions)
}

/// Named collection of statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub statements: Vec<Statement>,
}

impl Policy {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            statements,
        }
    }
}
