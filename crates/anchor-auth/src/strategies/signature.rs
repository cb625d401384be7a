//! HTTP signature strategy with relationship check

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::AuthStrategy;
use crate::error::Result;
use crate::httpsig::SignatureVerifier;
use crate::relationship::ActorRelationship;
use crate::types::{AuthDecision, AuthRequest};

/// Authorizes requests signed by an actor that passes the relationship check.
///
/// An invalid signature or a failed relationship check is a denial. Errors from
/// the verifier (malformed header, key lookup failure) propagate.
pub struct SignatureStrategy {
    verifier: Arc<dyn SignatureVerifier>,
    relationship: Arc<dyn ActorRelationship>,
}

impl SignatureStrategy {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, relationship: Arc<dyn ActorRelationship>) -> Self {
        Self { verifier, relationship }
    }
}

#[async_trait]
impl AuthStrategy for SignatureStrategy {
    fn name(&self) -> &str {
        "http-signature"
    }

    async fn evaluate(&self, request: &AuthRequest<'_>) -> Result<AuthDecision> {
        let Some(actor) = self.verifier.verify(request).await? else {
            warn!(path = request.uri.path(), "HTTP signature verification failed");
            return Ok(AuthDecision::Deny);
        };

        if !self.relationship.is_permitted(&actor).await? {
            warn!(
                path = request.uri.path(),
                actor = %actor,
                check = self.relationship.description(),
                "Signing actor failed relationship check"
            );
            return Ok(AuthDecision::Deny);
        }

        debug!(actor = %actor, "HTTP signature accepted");
        Ok(AuthDecision::Allow(actor))
    }
}
