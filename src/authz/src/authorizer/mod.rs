//! Authorizer
//!
//! Orchestrates one authorization call:
//!
//! ```text
//! principal check → resource attributes → membership + assumption → principal attributes
//!                 → policy selection → evaluation → outcome (+ metrics, audit)
//! ```
//!
//! Organization-scoped (role) policies only apply when the principal holds an
//! active membership in the resource's organization. When the call carries a
//! root session, that membership must also have been assumed: a live child
//! session must exist for it, otherwise the call fails with
//! [`AuthzError::AssumptionRequired`].

mod params;

pub use params::AuthorizeParams;

use crate::audit::{AuditOutcome, AuditSink, DecisionRecord, TracingAuditSink};
use crate::condition::ConditionContext;
use crate::config::AuthorizerConfig;
use crate::entity::{Attributes, EntityRegistry, EntityType};
use crate::error::{AuthzError, BoxError, Result};
use crate::evaluator::{Decision, EvaluationResult, Evaluator, Request};
use crate::gid::Gid;
use crate::metrics::{AuthorizerMetrics, MetricsCollector};
use crate::model::Membership;
use crate::policy_set::PolicySet;
use crate::store::{MembershipReader, SessionReader};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resource attribute holding the owning organization
pub const ORGANIZATION_ID_ATTRIBUTE: &str = "organization_id";

/// Policy-based authorizer
///
/// Immutable after construction; share it behind an `Arc` and call it from
/// any number of tasks concurrently.
pub struct Authorizer {
    policies: PolicySet,
    entities: EntityRegistry,
    memberships: Arc<dyn MembershipReader>,
    sessions: Arc<dyn SessionReader>,
    evaluator: Evaluator,
    metrics: Option<Arc<MetricsCollector>>,
    audit: Option<Arc<dyn AuditSink>>,
    config: AuthorizerConfig,
}

impl Authorizer {
    /// Create an authorizer over a merged policy set
    ///
    /// Fails with [`AuthzError::InvalidPolicy`] when policy validation is
    /// enabled and the set contains malformed statements.
    pub fn new(
        config: AuthorizerConfig,
        policies: PolicySet,
        entities: EntityRegistry,
        memberships: Arc<dyn MembershipReader>,
        sessions: Arc<dyn SessionReader>,
    ) -> Result<Self> {
        if config.validate_policies {
            policies.validate()?;
        }

        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new()));
        let audit = config
            .enable_audit
            .then(|| Arc::new(TracingAuditSink) as Arc<dyn AuditSink>);

        info!(
            roles = policies.roles().len(),
            identity_scoped = policies.identity_scoped_policies().len(),
            metrics = config.enable_metrics,
            audit = config.enable_audit,
            "authorizer initialized"
        );

        Ok(Self {
            policies,
            entities,
            memberships,
            sessions,
            evaluator: Evaluator::new(),
            metrics,
            audit,
            config,
        })
    }

    /// Replace the audit destination; has no effect when audit is disabled
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        if self.config.enable_audit {
            self.audit = Some(sink);
        }
        self
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Metrics snapshot, if metrics are enabled
    pub async fn metrics(&self) -> Option<AuthorizerMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.snapshot().await),
            None => None,
        }
    }

    /// Metrics in Prometheus text format, if metrics are enabled
    pub async fn export_metrics(&self) -> Option<String> {
        match &self.metrics {
            Some(metrics) => Some(metrics.export_prometheus().await),
            None => None,
        }
    }

    /// Clear counters and latency samples
    pub async fn reset_metrics(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.reset().await;
        }
    }

    /// Authorize a call
    ///
    /// `Ok(())` only for an explicit allow. Explicit and implicit denies both
    /// map to [`AuthzError::InsufficientPermissions`].
    pub async fn authorize(&self, params: AuthorizeParams) -> Result<()> {
        let result = self.evaluate(&params).await?;

        match result.decision {
            Decision::Allow => Ok(()),
            Decision::Deny | Decision::NoMatch => {
                info!(
                    principal = %params.principal,
                    resource = %params.resource,
                    action = %params.action,
                    "insufficient permissions"
                );
                Err(AuthzError::InsufficientPermissions {
                    principal_id: params.principal.to_string(),
                    resource_id: params.resource.to_string(),
                    action: params.action,
                })
            }
        }
    }

    /// Run the full pipeline and return the raw evaluation result
    pub async fn evaluate(&self, params: &AuthorizeParams) -> Result<EvaluationResult> {
        let start = Instant::now();
        let outcome = self.decide(params).await;
        self.finalize(params, &outcome, start).await;
        outcome
    }

    async fn decide(&self, params: &AuthorizeParams) -> Result<EvaluationResult> {
        debug!(
            principal = %params.principal,
            resource = %params.resource,
            action = %params.action,
            "authorization request"
        );

        self.check_principal(&params.principal)?;

        let resource_attributes = self.resource_attributes(params).await?;

        let membership = self
            .resolve_membership(
                &params.principal,
                resource_attributes
                    .get(ORGANIZATION_ID_ATTRIBUTE)
                    .map(String::as_str),
                params.session.as_ref(),
            )
            .await?;

        let principal_attributes = self
            .principal_attributes(&params.principal, membership.as_ref())
            .await?;

        let policies = self.policies.applicable(membership.as_ref().map(|m| m.role));
        debug!(
            role = ?membership.as_ref().map(|m| m.role),
            policies = policies.len(),
            "policies selected"
        );

        let request = Request {
            principal: params.principal,
            resource: params.resource,
            action: params.action.clone(),
            context: ConditionContext::new(principal_attributes, resource_attributes),
        };

        Ok(self.evaluator.evaluate(&request, &policies))
    }

    fn check_principal(&self, principal: &Gid) -> Result<()> {
        match principal.entity_type() {
            Ok(EntityType::Identity) => Ok(()),
            Ok(other) => Err(AuthzError::UnsupportedPrincipalType(other.to_string())),
            Err(_) => Err(AuthzError::UnsupportedPrincipalType(format!(
                "tag {}",
                principal.entity_tag()
            ))),
        }
    }

    /// Provider attributes, overridden by caller attributes, plus `id`
    async fn resource_attributes(&self, params: &AuthorizeParams) -> Result<Attributes> {
        let mut attributes = match self.entities.provider_for(&params.resource)? {
            Some(provider) => {
                self.bounded(
                    "resolve resource attributes",
                    provider.authorization_attributes(&params.resource),
                )
                .await?
            }
            None => Attributes::new(),
        };

        attributes.extend(
            params
                .resource_attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        attributes.insert("id".to_string(), params.resource.to_string());

        Ok(attributes)
    }

    /// Resolve the active membership in `organization_id` and, when a root
    /// session is given, require that the membership was assumed in it
    ///
    /// Role selection and the assumption check must agree on the same
    /// membership, so both happen here.
    async fn resolve_membership(
        &self,
        principal: &Gid,
        organization_id: Option<&str>,
        session: Option<&Gid>,
    ) -> Result<Option<Membership>> {
        let memberships = self
            .bounded(
                "load memberships",
                self.memberships.load_all_memberships(principal),
            )
            .await?;

        let Some(organization_id) = organization_id else {
            return Ok(None);
        };

        let Some(membership) = memberships
            .into_iter()
            .find(|m| m.is_active() && m.organization_id.to_string() == organization_id)
        else {
            debug!(%principal, organization_id, "no active membership");
            return Ok(None);
        };

        if let Some(root_session) = session {
            let child = self
                .bounded(
                    "load child session",
                    self.sessions.load_child_session(root_session, &membership.id),
                )
                .await?;

            let reason = match child {
                Some(child) if !child.is_expired() => None,
                Some(_) => Some("child session expired"),
                None => Some("organization not assumed"),
            };
            if let Some(reason) = reason {
                debug!(%principal, membership = %membership.id, reason, "assumption required");
                return Err(AuthzError::AssumptionRequired {
                    principal_id: principal.to_string(),
                    membership_id: membership.id.to_string(),
                });
            }
        }

        Ok(Some(membership))
    }

    /// `id`, membership attributes, then the identity's own attributes
    ///
    /// `id`, `organization_id` and `role` come from the resolved membership
    /// and are not overridable by the identity provider.
    async fn principal_attributes(
        &self,
        principal: &Gid,
        membership: Option<&Membership>,
    ) -> Result<Attributes> {
        let mut attributes = match self.entities.provider_for(principal)? {
            Some(provider) => {
                self.bounded(
                    "resolve principal attributes",
                    provider.authorization_attributes(principal),
                )
                .await?
            }
            None => Attributes::new(),
        };

        attributes.insert("id".to_string(), principal.to_string());
        if let Some(membership) = membership {
            attributes.insert(
                ORGANIZATION_ID_ATTRIBUTE.to_string(),
                membership.organization_id.to_string(),
            );
            attributes.insert("role".to_string(), membership.role.to_string());
        }

        Ok(attributes)
    }

    /// Await a collaborator read under the configured timeout
    async fn bounded<T, F>(&self, operation: &'static str, read: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, BoxError>>,
    {
        let result = match self.config.store_timeout() {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|elapsed| AuthzError::store(operation, elapsed))?,
            None => read.await,
        };

        result.map_err(|e| AuthzError::store(operation, e))
    }

    async fn finalize(
        &self,
        params: &AuthorizeParams,
        outcome: &Result<EvaluationResult>,
        start: Instant,
    ) {
        let audit_outcome = match outcome {
            Ok(result) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_decision(result.decision).await;
                }
                Some(match result.decision {
                    Decision::Allow => AuditOutcome::Allow,
                    Decision::Deny => AuditOutcome::Deny,
                    Decision::NoMatch => AuditOutcome::NoMatch,
                })
            }
            Err(e) if e.is_assumption_required() => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_assumption_required().await;
                }
                Some(AuditOutcome::AssumptionRequired)
            }
            Err(e) => {
                warn!(
                    principal = %params.principal,
                    resource = %params.resource,
                    action = %params.action,
                    error = %e,
                    "authorization failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_error().await;
                }
                None
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_latency(start.elapsed()).await;
        }

        if let (Some(sink), Some(audit_outcome)) = (&self.audit, audit_outcome) {
            let mut record = DecisionRecord::new(
                params.principal.to_string(),
                params.resource.to_string(),
                params.action.clone(),
                audit_outcome,
            );
            if let Ok(result) = outcome {
                record = record.with_match(result.sid(), result.policy_name());
            }
            sink.record(record).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryMembershipStore, InMemorySessionStore};

    #[test]
    fn test_invalid_policy_set_rejected() {
        let mut policies = PolicySet::new();
        policies.add_identity_scoped_policy([crate::policy::Policy::new(
            "broken",
            "",
            vec![crate::policy::allow(["iam"])],
        )]);

        let result = Authorizer::new(
            AuthorizerConfig::default(),
            policies.clone(),
            EntityRegistry::new(),
            Arc::new(InMemoryMembershipStore::new()),
            Arc::new(InMemorySessionStore::new()),
        );
        assert!(matches!(result, Err(AuthzError::InvalidPolicy(_))));

        let config = AuthorizerConfig {
            validate_policies: false,
            ..AuthorizerConfig::default()
        };
        assert!(Authorizer::new(
            config,
            policies,
            EntityRegistry::new(),
            Arc::new(InMemoryMembershipStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let config = AuthorizerConfig {
            enable_metrics: false,
            ..AuthorizerConfig::default()
        };
        let authorizer = Authorizer::new(
            config,
            PolicySet::new(),
            EntityRegistry::new(),
            Arc::new(InMemoryMembershipStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .unwrap();

        assert!(authorizer.metrics().await.is_none());
        assert!(authorizer.export_metrics().await.is_none());
    }
}
