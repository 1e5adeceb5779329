//! Domain error types

use thiserror::Error;

/// Domain-level errors for field engine operations
#[derive(Debug, Error)]
pub enum FieldError {
    /// Issue, definition, option or context not found
    #[error("{0}")]
    NotFound(String),

    /// Malformed input, failed coercion or constraint violation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Operation would break a reference or uniqueness rule
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error (wraps storage errors, collaborator failures, etc.)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FieldError {
    /// Wrap an adapter error that converts into [anyhow::Error]
    pub fn internal<E>(e: E) -> Self
    where
        anyhow::Error: From<E>,
    {
        FieldError::Internal(anyhow::Error::from(e))
    }
}

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, FieldError>;
