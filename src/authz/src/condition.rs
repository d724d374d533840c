//! Attribute conditions
//!
//! A condition compares a subject attribute (`principal.<attr>` or
//! `resource.<attr>`) against one or more values. Values are literals unless
//! they carry one of the same prefixes, in which case they are resolved from
//! the context too, so `equals("principal.id", ["resource.owner_id"])` compares
//! two attributes.
//!
//! A subject that cannot be resolved makes the condition false for every
//! operator. Unresolvable values are skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const PRINCIPAL_PREFIX: &str = "principal.";
const RESOURCE_PREFIX: &str = "resource.";

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
}

/// Per-request attributes conditions are evaluated against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionContext {
    pub principal: HashMap<String, String>,
    pub resource: HashMap<String, String>,
}

impl ConditionContext {
    pub fn new(principal: HashMap<String, String>, resource: HashMap<String, String>) -> Self {
        Self {
            principal,
            resource,
        }
    }

    /// Add a principal attribute
    pub fn with_principal(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.principal.insert(key.into(), value.into());
        self
    }

    /// Add a resource attribute
    pub fn with_resource(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource.insert(key.into(), value.into());
        self
    }

    /// Resolve a `principal.` / `resource.` key; `None` for any other shape
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if let Some(attr) = key.strip_prefix(PRINCIPAL_PREFIX) {
            return self.principal.get(attr).map(String::as_str);
        }
        if let Some(attr) = key.strip_prefix(RESOURCE_PREFIX) {
            return self.resource.get(attr).map(String::as_str);
        }
        None
    }
}

/// Whether `key` addresses the evaluation context rather than a literal
pub fn is_reference(key: &str) -> bool {
    key.starts_with(PRINCIPAL_PREFIX) || key.starts_with(RESOURCE_PREFIX)
}

/// A single attribute condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub key: String,
    pub values: Vec<String>,
}

impl Condition {
    pub fn new<I, V>(operator: ConditionOperator, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            operator,
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Evaluate against `ctx`
    pub fn evaluate(&self, ctx: &ConditionContext) -> bool {
        let Some(subject) = ctx.resolve(&self.key) else {
            return false;
        };

        let mut resolved = self.values.iter().filter_map(|v| resolve_value(ctx, v));

        match self.operator {
            ConditionOperator::Equals => resolved.any(|v| v == subject),
            ConditionOperator::NotEquals => resolved.all(|v| v != subject),
            ConditionOperator::In => resolved.any(|v| in_set(subject, v)),
            ConditionOperator::NotIn => !resolved.any(|v| in_set(subject, v)),
        }
    }
}

fn resolve_value<'a>(ctx: &'a ConditionContext, value: &'a str) -> Option<&'a str> {
    if is_reference(value) {
        ctx.resolve(value)
    } else {
        Some(value)
    }
}

fn in_set(subject: &str, value: &str) -> bool {
    if value == subject {
        return true;
    }
    value.contains(',') && value.split(',').any(|token| token.trim() == subject)
}

/// `key` equals any of `values`
pub fn equals<I, V>(key: impl Into<String>, values: I) -> Condition
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    Condition::new(ConditionOperator::Equals, key, values)
}

/// `key` equals none of `values`
pub fn not_equals<I, V>(key: impl Into<String>, values: I) -> Condition
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    Condition::new(ConditionOperator::NotEquals, key, values)
}

/// `key` is one of `values`; a value may be a comma-separated set
pub fn in_<I, V>(key: impl Into<String>, values: I) -> Condition
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    Condition::new(ConditionOperator::In, key, values)
}

/// `key` is none of `values`; a value may be a comma-separated set
pub fn not_in<I, V>(key: impl Into<String>, values: I) -> Condition
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    Condition::new(ConditionOperator::NotIn, key, values)
}
