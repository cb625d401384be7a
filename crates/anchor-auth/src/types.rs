//! Core types for the authorization chain

use http::{header, HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use url::Url;

/// Bearer tokens required for endpoints matching an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenDef {
    /// Regular expression matched against the endpoint path
    #[serde(rename = "endpoint")]
    pub endpoint_expression: String,

    /// Token ids accepted for reads
    #[serde(default, rename = "read")]
    pub read_tokens: Vec<String>,

    /// Token ids accepted for writes
    #[serde(default, rename = "write")]
    pub write_tokens: Vec<String>,
}

impl AuthTokenDef {
    /// Create a definition with no tokens
    pub fn new(endpoint_expression: impl Into<String>) -> Self {
        Self {
            endpoint_expression: endpoint_expression.into(),
            read_tokens: Vec::new(),
            write_tokens: Vec::new(),
        }
    }

    /// Set the read token ids
    pub fn with_read(mut self, tokens: &[&str]) -> Self {
        self.read_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Set the write token ids
    pub fn with_write(mut self, tokens: &[&str]) -> Self {
        self.write_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Whether a request reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

impl From<&Method> for AccessMode {
    fn from(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            AccessMode::Read
        } else {
            AccessMode::Write
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
        }
    }
}

/// Verdict of a single authorization strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Authorized as the given actor; stop evaluating
    Allow(Url),
    /// Rejected; stop evaluating
    Deny,
    /// No opinion; try the next strategy
    Inconclusive,
}

/// Final outcome of an authorization chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The request may proceed on behalf of this actor
    Authorized(Url),
    /// The request must be rejected
    Unauthorized,
}

impl Authorization {
    /// Whether the request may proceed
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized(_))
    }

    /// The authorized actor, if any
    pub fn actor(&self) -> Option<&Url> {
        match self {
            Authorization::Authorized(actor) => Some(actor),
            Authorization::Unauthorized => None,
        }
    }
}

/// The parts of an inbound request the chain inspects
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
}

impl<'a> AuthRequest<'a> {
    pub fn new(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self { method, uri, headers }
    }

    /// Borrow from request parts
    pub fn from_parts(parts: &'a http::request::Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers)
    }

    /// Token from an `Authorization: Bearer <token>` header
    pub fn bearer_token(&self) -> Option<&'a str> {
        let value = self.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Value of the `(request-target)` signature pseudo-header
    pub fn request_target(&self) -> String {
        let path = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{} {}", self.method.as_str().to_lowercase(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_from_method() {
        assert_eq!(AccessMode::from(&Method::GET), AccessMode::Read);
        assert_eq!(AccessMode::from(&Method::POST), AccessMode::Write);
        assert_eq!(AccessMode::from(&Method::DELETE), AccessMode::Write);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let method = Method::GET;
        let uri: Uri = "/services/anchor/followers?page=true".parse().unwrap();
        let mut headers = HeaderMap::new();

        assert_eq!(AuthRequest::new(&method, &uri, &headers).bearer_token(), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(AuthRequest::new(&method, &uri, &headers).bearer_token(), None);

        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        let request = AuthRequest::new(&method, &uri, &headers);
        assert_eq!(request.bearer_token(), Some("s3cret"));
        assert_eq!(request.request_target(), "get /services/anchor/followers?page=true");
    }

    #[test]
    fn test_token_def_deserialization() {
        let def: AuthTokenDef = serde_json::from_str(
            r#"{"endpoint": "^/services/anchor/outbox", "read": ["read"], "write": ["admin"]}"#,
        )
        .unwrap();

        assert_eq!(def, AuthTokenDef::new("^/services/anchor/outbox").with_read(&["read"]).with_write(&["admin"]));
    }
}
