//! # Query Errors
//!
//! Error types for filter validation and query compilation.
//!
//! Every variant is raised before any request reaches the backend.

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query-shape errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Filter or sort key is not a known field
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Malformed filter (operator suffix, range arity, date value, ...)
    #[error("Invalid filter: {key}; {reason}")]
    InvalidFilter { key: String, reason: String },
}

impl QueryError {
    /// Create an unknown field error
    pub fn unknown_field(key: impl Into<String>) -> Self {
        Self::UnknownField(key.into())
    }

    /// Create an invalid filter error
    pub fn invalid_filter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownField(_) => "PEDS_QUERY_UNKNOWN_FIELD",
            Self::InvalidFilter { .. } => "PEDS_QUERY_INVALID_FILTER",
        }
    }

    /// The offending key
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownField(key) => key,
            Self::InvalidFilter { key, .. } => key,
        }
    }
}
