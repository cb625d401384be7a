//! Error types for the anchor core

use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the pure collection and hash-link logic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Page size must be at least one
    #[error("Invalid page size: {0}, must be at least 1")]
    InvalidPageSize(u64),

    /// Hash-link could not be parsed
    #[error("Invalid hash link '{link}': {reason}")]
    InvalidHashLink { link: String, reason: String },

    /// IRI could not be built or parsed
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Unknown reference type name
    #[error("Unknown reference type: {0}")]
    UnknownReferenceType(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::InvalidIri(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}
