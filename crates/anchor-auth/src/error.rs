//! Error types for the authorization chain

use thiserror::Error;

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while authorizing a request.
///
/// A request that simply fails authorization is *not* an error; it yields
/// [`Authorization::Unauthorized`](crate::Authorization::Unauthorized). These
/// variants cover misconfiguration and requests that could not be evaluated.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Auth-token configuration is invalid (fatal at startup)
    #[error("Invalid authorization configuration: {0}")]
    InvalidConfig(String),

    /// Signature header is present but unusable
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Signature names a key nobody knows
    #[error("Unknown public key: {0}")]
    UnknownKey(String),

    /// Key lookup failed for a reason other than absence
    #[error("Key resolution failed: {0}")]
    KeyResolution(String),

    /// Relationship check could not be completed
    #[error("Relationship check failed: {0}")]
    Relationship(String),

    /// Signing an outbound request failed
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl From<regex::Error> for AuthError {
    fn from(err: regex::Error) -> Self {
        AuthError::InvalidConfig(format!("invalid endpoint expression: {}", err))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::KeyResolution(err.to_string())
    }
}

impl From<base64::DecodeError> for AuthError {
    fn from(err: base64::DecodeError) -> Self {
        AuthError::MalformedSignature(format!("invalid base64 encoding: {}", err))
    }
}
