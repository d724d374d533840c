//! Authorizer configuration
//!
//! Environment variables:
//! - `AUTHZ_STORE_TIMEOUT_MS` - bound on each store read, `0` disables (default: 5000)
//! - `AUTHZ_VALIDATE_POLICIES` - validate the policy set at construction (default: true)
//! - `AUTHZ_ENABLE_METRICS` - collect decision counters (default: true)
//! - `AUTHZ_ENABLE_AUDIT` - emit a record per decision (default: true)

use crate::error::{AuthzError, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    /// Timeout for each store and attribute read, in milliseconds
    pub store_timeout_ms: Option<u64>,

    /// Reject malformed policy sets when building the authorizer
    pub validate_policies: bool,

    /// Collect decision metrics
    pub enable_metrics: bool,

    /// Emit decision audit records
    pub enable_audit: bool,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: Some(5_000),
            validate_policies: true,
            enable_metrics: true,
            enable_audit: true,
        }
    }
}

impl AuthorizerConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AuthzError::InvalidInput(format!("invalid authorizer config: {}", e)))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("AUTHZ_STORE_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AuthzError::InvalidInput(format!("AUTHZ_STORE_TIMEOUT_MS: not a number: {:?}", raw))
            })?;
            config.store_timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        if let Some(raw) = lookup("AUTHZ_VALIDATE_POLICIES") {
            config.validate_policies = parse_bool("AUTHZ_VALIDATE_POLICIES", &raw)?;
        }
        if let Some(raw) = lookup("AUTHZ_ENABLE_METRICS") {
            config.enable_metrics = parse_bool("AUTHZ_ENABLE_METRICS", &raw)?;
        }
        if let Some(raw) = lookup("AUTHZ_ENABLE_AUDIT") {
            config.enable_audit = parse_bool("AUTHZ_ENABLE_AUDIT", &raw)?;
        }

        Ok(config)
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AuthzError::InvalidInput(format!(
            "{}: expected a boolean, got {:?}",
            name, raw
        ))),
    }
}
