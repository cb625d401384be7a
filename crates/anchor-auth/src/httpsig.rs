//! HTTP message signatures (draft-cavage style, Ed25519)
//!
//! Outbound requests are signed over `(request-target) host date`:
//!
//! ```text
//! Signature: keyId="https://node.example/services/anchor/keys/main-key",
//!            algorithm="hs2019",headers="(request-target) host date",
//!            signature="<base64>"
//! ```
//!
//! Verification resolves `keyId` through a [`KeyResolver`] and yields the key's
//! owning actor.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use http::header::{HeaderName, HeaderValue, DATE, HOST};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, Result};
use crate::keys::KeyResolver;
use crate::types::AuthRequest;

/// Name of the signature header
pub const SIGNATURE_HEADER: &str = "signature";

/// Headers covered by outbound signatures
const SIGNED_HEADERS: &str = "(request-target) host date";

const REQUEST_TARGET: &str = "(request-target)";

/// Verifies the HTTP signature on an inbound request
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify the request's signature.
    ///
    /// Returns the signing actor, `Ok(None)` when the request is unsigned or
    /// the signature does not verify, and an error when the signature cannot
    /// be evaluated (malformed header, unknown key, key lookup failure).
    async fn verify(&self, request: &AuthRequest<'_>) -> Result<Option<Url>>;
}

/// Parsed `Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureParams {
    key_id: String,
    headers: Vec<String>,
    signature: String,
}

impl SignatureParams {
    fn parse(value: &str) -> Result<Self> {
        let mut key_id = None;
        let mut headers = None;
        let mut signature = None;

        let mut rest = value.trim();
        while !rest.is_empty() {
            let (name, after) = rest
                .split_once('=')
                .ok_or_else(|| AuthError::MalformedSignature(format!("expected name=value in '{}'", rest)))?;

            let (param, remainder) = match after.strip_prefix('"') {
                Some(quoted) => quoted
                    .split_once('"')
                    .ok_or_else(|| AuthError::MalformedSignature("unterminated quoted value".into()))?,
                None => after.split_once(',').unwrap_or((after, "")),
            };

            match name.trim() {
                "keyId" => key_id = Some(param.to_string()),
                "headers" => headers = Some(param.split_whitespace().map(str::to_lowercase).collect()),
                "signature" => signature = Some(param.to_string()),
                "algorithm" => {
                    if param != "hs2019" && param != "ed25519" {
                        return Err(AuthError::MalformedSignature(format!(
                            "unsupported algorithm '{}'",
                            param
                        )));
                    }
                }
                _ => {}
            }

            rest = remainder.trim_start().trim_start_matches(',').trim_start();
        }

        let key_id = key_id.ok_or_else(|| AuthError::MalformedSignature("missing keyId".into()))?;
        let signature = signature.ok_or_else(|| AuthError::MalformedSignature("missing signature".into()))?;
        let headers: Vec<String> = headers.unwrap_or_else(|| vec!["date".to_string()]);

        for required in [REQUEST_TARGET, "date"] {
            if !headers.iter().any(|h| h == required) {
                return Err(AuthError::MalformedSignature(format!(
                    "signature does not cover '{}'",
                    required
                )));
            }
        }

        Ok(Self {
            key_id,
            headers,
            signature,
        })
    }
}

/// Build the string covered by a signature
fn signing_string(request: &AuthRequest<'_>, headers: &[String]) -> Result<String> {
    let mut lines = Vec::with_capacity(headers.len());
    for name in headers {
        if name == REQUEST_TARGET {
            lines.push(format!("{}: {}", REQUEST_TARGET, request.request_target()));
            continue;
        }

        let value = request
            .headers
            .get(name.as_str())
            .ok_or_else(|| AuthError::MalformedSignature(format!("signed header '{}' is missing", name)))?
            .to_str()
            .map_err(|_| AuthError::MalformedSignature(format!("signed header '{}' is not text", name)))?;
        lines.push(format!("{}: {}", name, value.trim()));
    }
    Ok(lines.join("\n"))
}

fn format_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Verifies Ed25519 HTTP signatures
pub struct HttpSignatureVerifier {
    resolver: Arc<dyn KeyResolver>,
    max_skew: Duration,
}

impl HttpSignatureVerifier {
    /// Create a verifier accepting `Date` headers within five minutes
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            resolver,
            max_skew: Duration::seconds(300),
        }
    }

    /// Set the maximum accepted clock skew
    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = max_skew;
        self
    }

    fn is_fresh(&self, request: &AuthRequest<'_>, now: DateTime<Utc>) -> Result<bool> {
        let value = request
            .headers
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthError::MalformedSignature("missing Date header".into()))?;

        let date = DateTime::parse_from_rfc2822(value)
            .map_err(|e| AuthError::MalformedSignature(format!("invalid Date header: {}", e)))?
            .with_timezone(&Utc);

        Ok((now - date).abs() <= self.max_skew)
    }
}

#[async_trait]
impl SignatureVerifier for HttpSignatureVerifier {
    async fn verify(&self, request: &AuthRequest<'_>) -> Result<Option<Url>> {
        let Some(header) = request.headers.get(SIGNATURE_HEADER) else {
            debug!(path = request.uri.path(), "Request is not signed");
            return Ok(None);
        };

        let header = header
            .to_str()
            .map_err(|_| AuthError::MalformedSignature("signature header is not text".into()))?;
        let params = SignatureParams::parse(header)?;

        let key = self
            .resolver
            .resolve(&params.key_id)
            .await?
            .ok_or_else(|| AuthError::UnknownKey(params.key_id.clone()))?;

        if !self.is_fresh(request, Utc::now())? {
            warn!(key_id = %params.key_id, "Signed Date header outside accepted skew");
            return Ok(None);
        }

        let message = signing_string(request, &params.headers)?;
        let bytes = STANDARD.decode(&params.signature)?;
        let signature = Signature::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedSignature(format!("invalid signature bytes: {}", e)))?;

        if key.public_key.verify(message.as_bytes(), &signature).is_err() {
            debug!(key_id = %params.key_id, "Signature does not verify");
            return Ok(None);
        }

        Ok(Some(key.actor))
    }
}

/// Signs outbound requests with an Ed25519 key
pub struct HttpSigner {
    key_id: String,
    signing_key: SigningKey,
}

impl HttpSigner {
    pub fn new(key_id: impl Into<String>, signing_key: SigningKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign a request now, adding `Host`, `Date` and `Signature` headers
    pub fn sign(&self, parts: &mut http::request::Parts) -> Result<()> {
        self.sign_at(parts, Utc::now())
    }

    /// Sign a request with an explicit `Date`
    pub fn sign_at(&self, parts: &mut http::request::Parts, at: DateTime<Utc>) -> Result<()> {
        if !parts.headers.contains_key(HOST) {
            let authority = parts
                .uri
                .authority()
                .ok_or_else(|| AuthError::Signing("request has neither Host header nor authority".into()))?;
            let host = HeaderValue::from_str(authority.as_str())
                .map_err(|e| AuthError::Signing(format!("invalid host: {}", e)))?;
            parts.headers.insert(HOST, host);
        }

        let date = HeaderValue::from_str(&format_http_date(at))
            .map_err(|e| AuthError::Signing(format!("invalid date: {}", e)))?;
        parts.headers.insert(DATE, date);

        let headers: Vec<String> = SIGNED_HEADERS.split(' ').map(str::to_string).collect();
        let message = signing_string(&AuthRequest::from_parts(parts), &headers)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let signature = STANDARD.encode(self.signing_key.sign(message.as_bytes()).to_bytes());

        let value = format!(
            "keyId=\"{}\",algorithm=\"hs2019\",headers=\"{}\",signature=\"{}\"",
            self.key_id, SIGNED_HEADERS, signature
        );
        let value = HeaderValue::from_str(&value).map_err(|e| AuthError::Signing(format!("invalid header: {}", e)))?;
        parts.headers.insert(HeaderName::from_static(SIGNATURE_HEADER), value);

        Ok(())
    }
}
