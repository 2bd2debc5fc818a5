//! Error types for registration and forwarding operations.
//!
//! Covers the caller-facing failure modes of the registry: authentication,
//! input validation, unknown targets, and capacity exhaustion. Per-target
//! delivery failures are deliberately absent from this taxonomy; they never
//! cross the `forward` boundary and are tracked as delivery outcomes inside
//! the dispatch cycle instead.

use thiserror::Error;

use crate::models::TargetId;

/// Result type alias for registry and dispatcher operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Failure modes surfaced to registration callers.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Shared secret mismatch, or forwarding disabled because the configured
    /// secret is too short to be usable.
    #[error("invalid forwarding secret")]
    Auth,

    /// Malformed registration input (URL or TTL).
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// Renew or deregister referenced an unknown target.
    #[error("forwarding target {id} not found")]
    NotFound {
        /// The id that was not present in the registry.
        id: TargetId,
    },

    /// Registry full and no entry was evictable.
    #[error("forwarding registry at capacity ({max_targets} targets)")]
    Capacity {
        /// Configured upper bound on live targets.
        max_targets: usize,
    },

    /// Invalid static configuration or client construction failure.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl RelayError {
    /// Creates a validation error from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates a not-found error for a target id.
    pub fn not_found(id: TargetId) -> Self {
        Self::NotFound { id }
    }

    /// Creates a capacity error.
    pub fn capacity(max_targets: usize) -> Self {
        Self::Capacity { max_targets }
    }

    /// Creates a configuration error from a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether this error should map to an authentication failure response.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}
