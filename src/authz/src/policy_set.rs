//! Policy set registry
//!
//! Feature modules contribute a [`PolicySet`] each at startup. Sets are merged
//! into one and handed to the [`Authorizer`](crate::authorizer::Authorizer);
//! nothing is registered globally.
//!
//! Role-scoped policies apply only when the principal holds that role in the
//! resource's organization (and has assumed it). Identity-scoped policies
//! apply to every authenticated identity.

use crate::action::validate_pattern;
use crate::condition::is_reference;
use crate::error::{AuthzError, Result};
use crate::model::MembershipRole;
use crate::policy::Policy;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    role_policies: HashMap<MembershipRole, Vec<Arc<Policy>>>,
    identity_scoped: Vec<Arc<Policy>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append policies for `role`
    pub fn add_role_policy<I, P>(&mut self, role: MembershipRole, policies: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Arc<Policy>>,
    {
        self.role_policies
            .entry(role)
            .or_default()
            .extend(policies.into_iter().map(Into::into));
        self
    }

    /// Append policies that apply to every identity
    pub fn add_identity_scoped_policy<I, P>(&mut self, policies: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Arc<Policy>>,
    {
        self.identity_scoped
            .extend(policies.into_iter().map(Into::into));
        self
    }

    /// Append the contents of `other`
    ///
    /// Lists are concatenated per role; merge order only changes which allow
    /// statement gets reported, never the decision.
    pub fn merge(&mut self, other: &PolicySet) -> &mut Self {
        for (role, policies) in &other.role_policies {
            self.role_policies
                .entry(*role)
                .or_default()
                .extend(policies.iter().cloned());
        }
        self.identity_scoped
            .extend(other.identity_scoped.iter().cloned());
        self
    }

    /// Merge a sequence of sets in order
    pub fn merge_all<'a>(sets: impl IntoIterator<Item = &'a PolicySet>) -> PolicySet {
        let mut merged = PolicySet::new();
        for set in sets {
            merged.merge(set);
        }
        merged
    }

    /// Policies registered for `role`
    pub fn policies_for_role(&self, role: MembershipRole) -> &[Arc<Policy>] {
        self.role_policies
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn identity_scoped_policies(&self) -> &[Arc<Policy>] {
        &self.identity_scoped
    }

    /// Roles with at least one registration, sorted
    pub fn roles(&self) -> Vec<MembershipRole> {
        let mut roles: Vec<_> = self.role_policies.keys().copied().collect();
        roles.sort();
        roles
    }

    pub fn is_empty(&self) -> bool {
        self.identity_scoped.is_empty() && self.role_policies.values().all(Vec::is_empty)
    }

    /// Policies applicable to a principal with `role` (identity-scoped first)
    pub fn applicable(&self, role: Option<MembershipRole>) -> Vec<Arc<Policy>> {
        let mut policies = self.identity_scoped.clone();
        if let Some(role) = role {
            policies.extend(self.policies_for_role(role).iter().cloned());
        }
        policies
    }

    /// Check action patterns and condition keys of every statement
    pub fn validate(&self) -> Result<()> {
        let all = self
            .identity_scoped
            .iter()
            .chain(self.role_policies.values().flatten());

        for policy in all {
            validate_policy(policy)?;
        }
        Ok(())
    }
}

fn validate_policy(policy: &Policy) -> Result<()> {
    for (index, statement) in policy.statements.iter().enumerate() {
        let label = statement
            .sid
            .clone()
            .unwrap_or_else(|| format!("#{}", index));

        if statement.actions.is_empty() {
            return Err(AuthzError::InvalidPolicy(format!(
                "policy '{}' statement {} has no actions",
                policy.name, label
            )));
        }

        for action in &statement.actions {
            validate_pattern(action).map_err(|e| {
                AuthzError::InvalidPolicy(format!(
                    "policy '{}' statement {}: {}",
                    policy.name, label, e
                ))
            })?;
        }

        for condition in &statement.conditions {
            if !is_reference(&condition.key) {
                return Err(AuthzError::InvalidPolicy(format!(
                    "policy '{}' statement {}: condition key {:?} must start with principal. or resource.",
                    policy.name, label, condition.key
                )));
            }
        }
    }
    Ok(())
}
