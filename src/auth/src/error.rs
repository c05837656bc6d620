//! Error types for the authorization engine

use thiserror::Error;

use crate::expr::ExprError;

/// Authorization engine errors
///
/// "Unauthenticated" is deliberately not represented here: extraction
/// yielding no identity is a normal outcome and the request proceeds with
/// guards evaluating against the anonymous identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A policy marker's condition evaluated to false
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A marker declaration defect (e.g. an unresolvable parameter selector)
    #[error("Invalid security configuration: {0}")]
    Configuration(String),

    /// A declared resource type has no registered validator
    #[error("No access validator registered for resource type: {0}")]
    MissingValidator(String),

    /// Expression compilation or evaluation failed
    #[error("Expression evaluation failed: {0}")]
    Evaluation(#[from] ExprError),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;
