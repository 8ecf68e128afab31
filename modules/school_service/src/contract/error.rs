//! Contract error types for school service
//!
//! These errors are transport-agnostic; the REST layer maps them to
//! problem responses.

use std::fmt::Display;

/// School service domain errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchoolError {
    /// Record missing or outside the caller's scope
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind (grade, homework, ...)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Input rejected, including uniqueness violations
    #[error("Validation error: {message}")]
    Validation { message: String },
    /// Caller's role or ownership does not allow the operation
    #[error("Permission denied: {reason}")]
    Forbidden { reason: String },
    /// Missing, unknown or expired credentials
    #[error("Authentication failed: {reason}")]
    Unauthenticated { reason: String },
    /// Storage or other unexpected failure, already logged
    #[error("Internal error")]
    Internal,
}

impl SchoolError {
    pub fn not_found(resource: &str, id: impl Display) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }
}
