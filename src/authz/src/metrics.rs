//! Decision metrics with Prometheus text export

use crate::evaluator::Decision;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Authorizer counters and latency summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizerMetrics {
    /// Total number of authorization calls
    pub total_requests: u64,

    pub allowed_decisions: u64,

    /// Explicit denies
    pub denied_decisions: u64,

    /// Implicit denies
    pub no_match_decisions: u64,

    pub assumption_required: u64,

    /// Store failures, unsupported principals and other internal errors
    pub error_count: u64,

    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
    pub avg_latency_ms: f64,
}

impl AuthorizerMetrics {
    /// Share of decisions that allowed the request
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions + self.no_match_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }
}

/// Metrics collector
pub struct MetricsCollector {
    metrics: Arc<RwLock<AuthorizerMetrics>>,

    /// Recent latency samples in milliseconds
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Keep at most `max_samples` latency samples
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(AuthorizerMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(max_samples))),
            max_samples: max_samples.max(1),
        }
    }

    /// Record an evaluated decision
    pub async fn record_decision(&self, decision: Decision) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        match decision {
            Decision::Allow => metrics.allowed_decisions += 1,
            Decision::Deny => metrics.denied_decisions += 1,
            Decision::NoMatch => metrics.no_match_decisions += 1,
        }
    }

    pub async fn record_assumption_required(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        metrics.assumption_required += 1;
    }

    pub async fn record_error(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        metrics.error_count += 1;
    }

    pub async fn record_latency(&self, latency: Duration) {
        let mut samples = self.latency_samples.write().await;
        if samples.len() >= self.max_samples {
            let excess = samples.len() + 1 - self.max_samples;
            samples.drain(0..excess);
        }
        samples.push(latency.as_secs_f64() * 1000.0);
    }

    /// Current snapshot with latency summary
    pub async fn snapshot(&self) -> AuthorizerMetrics {
        let mut snapshot = self.metrics.read().await.clone();

        let mut sorted = self.latency_samples.read().await.clone();
        if !sorted.is_empty() {
            sorted.sort_by(f64::total_cmp);
            snapshot.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
            snapshot.latency_p50_ms = percentile(&sorted, 0.50);
            snapshot.latency_p99_ms = percentile(&sorted, 0.99);
        }

        snapshot
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = AuthorizerMetrics::default();
        self.latency_samples.write().await.clear();
    }

    /// Export in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let m = self.snapshot().await;

        format!(
            r#"# HELP authz_requests_total Total number of authorization calls
# TYPE authz_requests_total counter
authz_requests_total {}

# HELP authz_decisions_total Decisions by outcome
# TYPE authz_decisions_total counter
authz_decisions_total{{decision="allow"}} {}
authz_decisions_total{{decision="deny"}} {}
authz_decisions_total{{decision="no_match"}} {}

# HELP authz_assumption_required_total Calls rejected until an organization is assumed
# TYPE authz_assumption_required_total counter
authz_assumption_required_total {}

# HELP authz_errors_total Internal errors
# TYPE authz_errors_total counter
authz_errors_total {}

# HELP authz_latency_seconds Authorization latency
# TYPE authz_latency_seconds summary
authz_latency_seconds{{quantile="0.5"}} {}
authz_latency_seconds{{quantile="0.99"}} {}
"#,
            m.total_requests,
            m.allowed_decisions,
            m.denied_decisions,
            m.no_match_decisions,
            m.assumption_required,
            m.error_count,
            m.latency_p50_ms / 1000.0,
            m.latency_p99_ms / 1000.0,
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let idx = ((sorted.len() as f64) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
