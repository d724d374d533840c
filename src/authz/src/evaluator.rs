//! Policy evaluation
//!
//! Explicit deny beats explicit allow beats implicit deny. Statements are
//! scanned in input order; the first matching deny ends the scan, the first
//! matching allow is remembered while scanning continues. The decision does
//! not depend on input order, only the reported allow statement does.

use crate::condition::ConditionContext;
use crate::gid::Gid;
use crate::policy::{Effect, Policy, Statement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Evaluation request
#[derive(Debug, Clone)]
pub struct Request {
    pub principal: Gid,
    pub resource: Gid,
    pub action: String,
    pub context: ConditionContext,
}

/// Outcome of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    /// No statement applied (implicit deny)
    NoMatch,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::NoMatch => "no_match",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision plus the statement and policy that produced it
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub decision: Decision,
    pub statement: Option<Statement>,
    pub policy: Option<Arc<Policy>>,
}

impl EvaluationResult {
    fn no_match() -> Self {
        Self {
            decision: Decision::NoMatch,
            statement: None,
            policy: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }

    /// SID of the matched statement, if any
    pub fn sid(&self) -> Option<&str> {
        self.statement.as_ref().and_then(|s| s.sid.as_deref())
    }

    /// Name of the matched policy, if any
    pub fn policy_name(&self) -> Option<&str> {
        self.policy.as_ref().map(|p| p.name.as_str())
    }
}

/// Stateless policy evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `request` against `policies`
    pub fn evaluate(&self, request: &Request, policies: &[Arc<Policy>]) -> EvaluationResult {
        let mut first_allow: Option<(&Statement, &Arc<Policy>)> = None;

        for policy in policies {
            for statement in &policy.statements {
                if !statement.applies(&request.action, &request.resource, &request.context) {
                    continue;
                }

                match statement.effect {
                    Effect::Deny => {
                        debug!(
                            action = %request.action,
                            policy = %policy.name,
                            sid = ?statement.sid,
                            "explicit deny"
                        );
                        return EvaluationResult {
                            decision: Decision::Deny,
                            statement: Some(statement.clone()),
                            policy: Some(Arc::clone(policy)),
                        };
                    }
                    Effect::Allow => {
                        if first_allow.is_none() {
                            first_allow = Some((statement, policy));
                        }
                    }
                }
            }
        }

        match first_allow {
            Some((statement, policy)) => {
                debug!(
                    action = %request.action,
                    policy = %policy.name,
                    sid = ?statement.sid,
                    "allow"
                );
                EvaluationResult {
                    decision: Decision::Allow,
                    statement: Some(statement.clone()),
                    policy: Some(Arc::clone(policy)),
                }
            }
            None => {
                debug!(action = %request.action, "no statement matched");
                EvaluationResult::no_match()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::equals;
    use crate::entity::EntityType;
    use crate::gid::TenantId;
    use crate::policy::{allow, deny};

    fn request(action: &str, context: ConditionContext) -> Request {
        let tenant = TenantId::new_random();
        Request {
            principal: Gid::new(tenant, EntityType::Identity),
            resource: Gid::new(tenant, EntityType::Organization),
            action: action.to_string(),
            context,
        }
    }

    fn policy(name: &str, statements: Vec<Statement>) -> Arc<Policy> {
        Arc::new(Policy::new(name, "", statements))
    }

    #[test]
    fn test_empty_policies_no_match() {
        let result = Evaluator::new().evaluate(
            &request("iam:organization:get", ConditionContext::default()),
            &[],
        );
        assert_eq!(result.decision, Decision::NoMatch);
        assert!(result.statement.is_none());
        assert!(result.policy.is_none());
    }

    #[test]
    fn test_deny_overrides_wildcard_allow() {
        let policies = vec![policy(
            "owner",
            vec![
                allow(["iam:*:*"]),
                deny(["iam:organization:delete"]).with_sid("deny-org-delete"),
            ],
        )];

        let result = Evaluator::new().evaluate(
            &request("iam:organization:delete", ConditionContext::default()),
            &policies,
        );
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.sid(), Some("deny-org-delete"));
        assert_eq!(result.policy_name(), Some("owner"));
    }

    #[test]
    fn test_deny_in_later_policy_wins() {
        let policies = vec![
            policy("a", vec![allow(["iam:*"]).with_sid("allow-all")]),
            policy("b", vec![deny(["iam:organization:delete"]).with_sid("deny")]),
        ];

        let result = Evaluator::new().evaluate(
            &request("iam:organization:delete", ConditionContext::default()),
            &policies,
        );
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.policy_name(), Some("b"));
    }

    #[test]
    fn test_first_allow_is_reported() {
        let policies = vec![
            policy("a", vec![allow(["iam:organization:get"]).with_sid("first")]),
            policy("b", vec![allow(["iam:*"]).with_sid("second")]),
        ];

        let result = Evaluator::new().evaluate(
            &request("iam:organization:get", ConditionContext::default()),
            &policies,
        );
        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(result.sid(), Some("first"));
        assert_eq!(result.policy_name(), Some("a"));
    }

    #[test]
    fn test_self_update_condition() {
        let policies = vec![policy(
            "self",
            vec![allow(["iam:identity:update"]).when([equals("principal.id", ["resource.id"])])],
        )];
        let evaluator = Evaluator::new();

        let same = ConditionContext::default()
            .with_principal("id", "user_123")
            .with_resource("id", "user_123");
        assert_eq!(
            evaluator.evaluate(&request("iam:identity:update", same), &policies).decision,
            Decision::Allow
        );

        let other = ConditionContext::default()
            .with_principal("id", "user_123")
            .with_resource("id", "user_456");
        assert_eq!(
            evaluator.evaluate(&request("iam:identity:update", other), &policies).decision,
            Decision::NoMatch
        );
    }

    #[test]
    fn test_non_matching_deny_does_not_block() {
        let policies = vec![policy(
            "p",
            vec![
                deny(["iam:organization:delete"]),
                allow(["iam:organization:get"]),
            ],
        )];

        let result = Evaluator::new().evaluate(
            &request("iam:organization:get", ConditionContext::default()),
            &policies,
        );
        assert!(result.is_allowed());
    }
}
