//! Bearer token strategy

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use tracing::debug;
use url::Url;

use crate::chain::AuthStrategy;
use crate::error::Result;
use crate::httpsig::SIGNATURE_HEADER;
use crate::types::{AuthDecision, AuthRequest};

/// Authorizes requests carrying one of the endpoint's bearer secrets.
///
/// A successful match authorizes the request as the local service actor.
/// An endpoint with no required secrets is open: every request is allowed,
/// unless signers are identified, in which case a signed request is left to
/// the signature strategy.
pub struct BearerTokenStrategy {
    secrets: Vec<String>,
    service_iri: Url,
    identify_signers: bool,
}

impl BearerTokenStrategy {
    pub fn new(secrets: Vec<String>, service_iri: Url) -> Self {
        Self {
            secrets,
            service_iri,
            identify_signers: false,
        }
    }

    /// On an open endpoint, pass signed requests on instead of allowing them
    /// as the service actor
    pub fn identify_signers(mut self, identify: bool) -> Self {
        self.identify_signers = identify;
        self
    }

    /// Whether the endpoint requires no token
    pub fn is_open(&self) -> bool {
        self.secrets.is_empty()
    }

    fn matches(&self, presented: &str) -> bool {
        // Compare against every secret so timing does not reveal which one matched
        self.secrets
            .iter()
            .fold(false, |found, secret| {
                found | bool::from(secret.as_bytes().ct_eq(presented.as_bytes()))
            })
    }
}

#[async_trait]
impl AuthStrategy for BearerTokenStrategy {
    fn name(&self) -> &str {
        "bearer-token"
    }

    async fn evaluate(&self, request: &AuthRequest<'_>) -> Result<AuthDecision> {
        if self.is_open() {
            if self.identify_signers && request.headers.contains_key(SIGNATURE_HEADER) {
                debug!(path = request.uri.path(), "Open endpoint; identifying signer");
                return Ok(AuthDecision::Inconclusive);
            }
            return Ok(AuthDecision::Allow(self.service_iri.clone()));
        }

        match request.bearer_token() {
            Some(token) if self.matches(token) => Ok(AuthDecision::Allow(self.service_iri.clone())),
            Some(_) => {
                debug!(path = request.uri.path(), "Bearer token did not match");
                Ok(AuthDecision::Inconclusive)
            }
            None => Ok(AuthDecision::Inconclusive),
        }
    }
}
