//! Domain-level error types.

use thiserror::Error;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A backing service could not serve a read; callers should retry later.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Document could not be decoded: {0}")]
    Serialization(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        DomainError::Internal(err.to_string())
    }
}
