//! Error types for the PeerMatch matching engine.
//!
//! All errors use the `PM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request errors
//! - 2xx: Rule / configuration errors
//! - 3xx: Dependency (collaborator) errors
//! - 9xx: General / internal errors
//!
//! Nothing in the matching pipeline surfaces these to the caller as a hard
//! failure: dependency errors degrade to conservative defaults and invalid
//! queries become a [`NoMatchReason`](crate::NoMatchReason).

use thiserror::Error;

use crate::{RequestId, RequestType, RuleId};

/// Central error enum for all PeerMatch operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeermatchError {
    // =================================================================
    // Request Errors (1xx)
    // =================================================================
    /// The request failed validation (non-positive amount, details for the wrong rail, ...).
    #[error("PM_ERR_100: Invalid request {id}: {reason}")]
    InvalidRequest { id: RequestId, reason: String },

    /// The request was submitted to a search for the other side.
    #[error("PM_ERR_101: Request {id} is a {actual}, expected a {expected}")]
    WrongRequestType {
        id: RequestId,
        expected: RequestType,
        actual: RequestType,
    },

    // =================================================================
    // Rule / Configuration Errors (2xx)
    // =================================================================
    /// A single rule is structurally invalid.
    #[error("PM_ERR_200: Invalid rule {rule}: {reason}")]
    InvalidRule { rule: RuleId, reason: String },

    /// The rule set as a whole is invalid (duplicate ids, ...).
    #[error("PM_ERR_201: Invalid rule set: {reason}")]
    InvalidRuleSet { reason: String },

    /// Configuration error (bad threshold, missing fields, etc.).
    #[error("PM_ERR_202: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Dependency Errors (3xx)
    // =================================================================
    /// A collaborator did not answer within its call budget.
    #[error("PM_ERR_300: {service} timed out after {timeout_ms}ms")]
    ProviderTimeout { service: String, timeout_ms: u64 },

    /// A collaborator failed or is unreachable.
    #[error("PM_ERR_301: {service} unavailable: {reason}")]
    ProviderUnavailable { service: String, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("PM_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl PeermatchError {
    /// Whether this error came from an external collaborator rather than
    /// from the caller's input or configuration.
    #[must_use]
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderTimeout { .. } | Self::ProviderUnavailable { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeermatchError>;

impl From<serde_json::Error> for PeermatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
