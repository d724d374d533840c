//! Action identifiers and wildcard matching
//!
//! Actions are shaped `service:resource:operation` (e.g. `iam:identity:get`).
//! Patterns may replace any segment with `*`:
//!
//! - `*` matches every action
//! - `iam:*` is shorthand for `iam:*:*`
//! - `iam:*:get` matches `get` on any `iam` resource

use crate::error::{AuthzError, Result};

const WILDCARD: &str = "*";

/// Check whether `pattern` matches `action`
pub fn matches(pattern: &str, action: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }

    let mut action_parts = action.split(':');
    let (Some(service), Some(resource), Some(operation), None) = (
        action_parts.next(),
        action_parts.next(),
        action_parts.next(),
        action_parts.next(),
    ) else {
        return false;
    };

    let pattern_parts: Vec<&str> = pattern.split(':').collect();
    match pattern_parts.as_slice() {
        [p_service, p_rest] if *p_rest == WILDCARD => segment_matches(p_service, service),
        [p_service, p_resource, p_operation] => {
            segment_matches(p_service, service)
                && segment_matches(p_resource, resource)
                && segment_matches(p_operation, operation)
        }
        _ => false,
    }
}

/// Check whether any of `patterns` matches `action`
pub fn matches_any<S: AsRef<str>>(patterns: &[S], action: &str) -> bool {
    patterns.iter().any(|p| matches(p.as_ref(), action))
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    pattern == WILDCARD || pattern == segment
}

/// Validate an action pattern: `*`, `service:*` or three non-empty segments
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern == WILDCARD {
        return Ok(());
    }

    let parts: Vec<&str> = pattern.split(':').collect();
    let well_formed = match parts.as_slice() {
        [service, rest] => !service.is_empty() && *rest == WILDCARD,
        [service, resource, operation] => {
            !service.is_empty() && !resource.is_empty() && !operation.is_empty()
        }
        _ => false,
    };

    // Partial wildcards like `get*` are never matched, reject them early.
    let wildcards_whole = parts
        .iter()
        .all(|part| *part == WILDCARD || !part.contains('*'));

    if well_formed && wildcards_whole {
        Ok(())
    } else {
        Err(AuthzError::InvalidPolicy(format!(
            "malformed action pattern {:?}",
            pattern
        )))
    }
}
