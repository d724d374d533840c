//! Audit records for authorization decisions
//!
//! Every completed decision produces a [`DecisionRecord`]. The matched SID and
//! policy are kept for audit even though the caller-facing error omits them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Outcome as seen by the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allow,
    Deny,
    NoMatch,
    AssumptionRequired,
}

/// One authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub principal_id: String,
    pub resource_id: String,
    pub action: String,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

impl DecisionRecord {
    pub fn new(
        principal_id: impl Into<String>,
        resource_id: impl Into<String>,
        action: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            principal_id: principal_id.into(),
            resource_id: resource_id.into(),
            action: action.into(),
            outcome,
            sid: None,
            policy: None,
        }
    }

    /// Attach the matched statement and policy
    pub fn with_match(mut self, sid: Option<&str>, policy: Option<&str>) -> Self {
        self.sid = sid.map(str::to_string);
        self.policy = policy.map(str::to_string);
        self
    }
}

/// Destination for decision records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: DecisionRecord);
}

/// Emits each record as a JSON `tracing` event on the `authz::audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: DecisionRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => info!(target: "authz::audit", decision = %json, "authorization decision"),
            Err(e) => info!(
                target: "authz::audit",
                id = %record.id,
                error = %e,
                "authorization decision (unserializable)"
            ),
        }
    }
}

/// Keeps records in memory
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<RwLock<Vec<DecisionRecord>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<DecisionRecord> {
        self.records.read().await.clone()
    }

    /// Records for a principal, oldest first
    pub async fn principal_history(&self, principal_id: &str) -> Vec<DecisionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.principal_id == principal_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, record: DecisionRecord) {
        self.records.write().await.push(record);
    }
}
