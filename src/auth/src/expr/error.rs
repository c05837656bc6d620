//! Error types for expression operations

use thiserror::Error;

/// Expression language errors
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("Parse error at offset {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function execution error: {0}")]
    Function(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Expression did not produce a boolean result")]
    NonBooleanResult,
}

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExprError>;
