//! # Gatekeep Authorization Core
//!
//! Policy-based authorization for multi-tenant applications.
//!
//! ## Features
//!
//! - **Declarative policies** built from allow/deny statements with wildcard
//!   actions (`service:resource:operation`), resource patterns and attribute
//!   conditions
//! - **Deterministic evaluation**: explicit deny beats explicit allow beats
//!   implicit deny, independent of statement order
//! - **Role-scoped and identity-scoped policy sets**, merged from independent
//!   feature modules at startup
//! - **Session assumption**: organization-scoped policies apply only once the
//!   identity has assumed the organization in its current session
//! - **Async store seams** for memberships, sessions and entity attributes
//!
//! ## Example
//!
//! ```rust
//! use gatekeep_authz::{
//!     allow, deny, AuthorizeParams, Authorizer, AuthorizerConfig, EntityRegistry,
//!     EntityType, Gid, InMemoryMembershipStore, InMemorySessionStore, MembershipRole,
//!     Policy, PolicySet, TenantId,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut policies = PolicySet::new();
//!     policies.add_role_policy(
//!         MembershipRole::Owner,
//!         [Policy::new(
//!             "owner",
//!             "Full access except deleting the organization",
//!             vec![
//!                 allow(["iam:*:*"]),
//!                 deny(["iam:organization:delete"]).with_sid("deny-org-delete"),
//!             ],
//!         )],
//!     );
//!
//!     let authorizer = Authorizer::new(
//!         AuthorizerConfig::default(),
//!         policies,
//!         EntityRegistry::new(),
//!         Arc::new(InMemoryMembershipStore::new()),
//!         Arc::new(InMemorySessionStore::new()),
//!     )?;
//!
//!     let tenant = TenantId::new_random();
//!     let principal = Gid::new(TenantId::new_random(), EntityType::Identity);
//!     let organization = Gid::new(tenant, EntityType::Organization);
//!
//!     let err = authorizer
//!         .authorize(AuthorizeParams::new(principal, organization, "iam:organization:get"))
//!         .await
//!         .unwrap_err();
//!     assert!(err.is_forbidden());
//!
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod audit;
pub mod authorizer;
pub mod condition;
pub mod config;
pub mod entity;
pub mod error;
pub mod evaluator;
pub mod gid;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod policy_set;
pub mod store;

// Re-export commonly used types
pub use action::{matches, matches_any};
pub use audit::{AuditOutcome, AuditSink, DecisionRecord, InMemoryAuditSink, TracingAuditSink};
pub use authorizer::{AuthorizeParams, Authorizer};
pub use condition::{equals, in_, not_equals, not_in, Condition, ConditionContext, ConditionOperator};
pub use config::AuthorizerConfig;
pub use entity::{AttributeProvider, Attributes, EntityRegistry, EntityType, InMemoryAttributeProvider};
pub use error::{AuthzError, BoxError, Result};
pub use evaluator::{Decision, EvaluationResult, Evaluator, Request};
pub use gid::{Gid, TenantId};
pub use metrics::{AuthorizerMetrics, MetricsCollector};
pub use model::{
    AuthenticationMethod, ChildSession, Membership, MembershipRole, MembershipSource,
    MembershipState, SessionExitReason,
};
pub use policy::{allow, deny, Effect, Policy, ResourcePattern, Statement};
pub use policy_set::PolicySet;
pub use store::{InMemoryMembershipStore, InMemorySessionStore, MembershipReader, SessionReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
