//! Error types for the authorization core

use thiserror::Error;

/// Boxed error returned by external collaborators (stores, attribute providers)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Authorization errors
///
/// Callers must keep three groups apart when mapping to transport signals:
/// forbidden ([`AuthzError::InsufficientPermissions`]), assumption required
/// ([`AuthzError::AssumptionRequired`]) and everything else, which is internal.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The principal is not an identity
    #[error("unsupported principal type: {0}")]
    UnsupportedPrincipalType(String),

    /// The principal is a member of the resource's organization but has not
    /// assumed it in the current session
    #[error("principal {principal_id} must assume organization membership {membership_id}")]
    AssumptionRequired {
        principal_id: String,
        membership_id: String,
    },

    /// The decision was an explicit or implicit deny
    #[error("principal {principal_id} is not allowed to perform {action} on {resource_id}")]
    InsufficientPermissions {
        principal_id: String,
        resource_id: String,
        action: String,
    },

    /// A read against an external collaborator failed
    #[error("cannot {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid policy definition
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Identifier carries an entity type tag outside the known set
    #[error("unknown entity type: {0}")]
    UnknownEntityType(u16),
}

impl AuthzError {
    /// Wrap a collaborator failure with the operation that failed
    pub fn store(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    /// True for explicit and implicit denies
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::InsufficientPermissions { .. })
    }

    /// True when the caller should redirect to organization selection
    pub fn is_assumption_required(&self) -> bool {
        matches!(self, Self::AssumptionRequired { .. })
    }

    /// True for anything that is not an authorization decision
    pub fn is_internal(&self) -> bool {
        !self.is_forbidden() && !self.is_assumption_required()
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
