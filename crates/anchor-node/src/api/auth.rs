//! Authorization of the federation endpoints
//!
//! One [`AuthHandler`] is built per (endpoint, method) at startup. Endpoints are
//! named by their route template, e.g. `/services/anchor/{id}/shares`, which is
//! also what auth-token expressions are matched against.

use anchor_auth::{
    ActorRelationship, AnyActor, AuthError, AuthHandler, AuthRequest, AuthTokenManager, Authorization,
    HttpSignatureVerifier, SignatureVerifier,
};
use anchor_core::ReferenceType;
use http::{HeaderMap, Method, Uri};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use url::Url;

use crate::api::error::ApiError;
use crate::config::NodeConfig;
use crate::keys::KeyRegistry;
use crate::relationship::FollowerOrWitness;
use crate::storage::ReferenceStore;

/// Collections served directly under the base path
pub const SERVICE_COLLECTIONS: [ReferenceType; 7] = [
    ReferenceType::Follower,
    ReferenceType::Following,
    ReferenceType::Witness,
    ReferenceType::Witnessing,
    ReferenceType::Liked,
    ReferenceType::Outbox,
    ReferenceType::Inbox,
];

/// Collections served per object under `{base}/{id}/`
pub const OBJECT_COLLECTIONS: [ReferenceType; 2] = [ReferenceType::Share, ReferenceType::Like];

/// `{base}/followers`, `{base}/outbox`, ...
pub fn collection_path(base: &str, reference_type: ReferenceType) -> String {
    format!("{}/{}", base, reference_type.path_segment())
}

/// `{base}/{id}/shares`, `{base}/{id}/likes`
pub fn object_collection_path(base: &str, reference_type: ReferenceType) -> String {
    format!("{}/{{id}}/{}", base, reference_type.path_segment())
}

/// `{base}/activities/{id}`
pub fn activity_path(base: &str) -> String {
    format!("{}/activities/{{id}}", base)
}

/// `{base}/keys/{id}`
pub fn key_path(base: &str) -> String {
    format!("{}/keys/{{id}}", base)
}

/// Authorization handlers keyed by (endpoint template, method)
#[derive(Debug, Default)]
pub struct Authorizers {
    handlers: HashMap<(String, Method), AuthHandler>,
}

impl Authorizers {
    /// Build the handlers for every guarded endpoint.
    ///
    /// Fails on an invalid auth-token configuration.
    pub fn new(
        config: &NodeConfig,
        registry: Arc<KeyRegistry>,
        references: Arc<dyn ReferenceStore>,
    ) -> Result<Self, AuthError> {
        let tokens = AuthTokenManager::new(config.auth_token_defs.clone(), config.auth_tokens.clone())?;
        let base = config.base_path();

        let verifier: Option<Arc<dyn SignatureVerifier>> = config.http_signatures_enabled.then(|| {
            Arc::new(HttpSignatureVerifier::new(registry).with_max_skew(config.signature_max_skew))
                as Arc<dyn SignatureVerifier>
        });

        let restricted: Arc<dyn ActorRelationship> = if config.verify_actor_in_signature {
            Arc::new(FollowerOrWitness::new(references, config.service_iri.clone()))
        } else {
            Arc::new(AnyActor)
        };
        let open: Arc<dyn ActorRelationship> = Arc::new(AnyActor);

        let mut endpoints: Vec<(String, Method, Arc<dyn ActorRelationship>)> = Vec::new();
        for reference_type in SERVICE_COLLECTIONS {
            endpoints.push((collection_path(&base, reference_type), Method::GET, restricted.clone()));
        }
        for reference_type in OBJECT_COLLECTIONS {
            endpoints.push((object_collection_path(&base, reference_type), Method::GET, restricted.clone()));
        }
        endpoints.push((activity_path(&base), Method::GET, restricted.clone()));
        endpoints.push((collection_path(&base, ReferenceType::Outbox), Method::POST, restricted));
        // Any verified actor may deliver to the inbox
        endpoints.push((collection_path(&base, ReferenceType::Inbox), Method::POST, open));

        let inbox = collection_path(&base, ReferenceType::Inbox);
        let mut handlers = HashMap::new();
        for (endpoint, method, relationship) in endpoints {
            let mut builder = AuthHandler::builder(endpoint.clone(), method.clone(), config.service_iri.clone())
                .tokens(&tokens)
                .relationship(relationship);
            if let Some(verifier) = &verifier {
                builder = builder.signature_verifier(verifier.clone());
            }
            // Deliveries act for their signer even when the inbox is open
            if endpoint == inbox && method == Method::POST {
                builder = builder.identify_signers();
            }
            handlers.insert((endpoint, method), builder.build());
        }

        Ok(Self { handlers })
    }

    pub fn get(&self, endpoint: &str, method: &Method) -> Option<&AuthHandler> {
        self.handlers.get(&(endpoint.to_string(), method.clone()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Authorize a request to `endpoint`, returning the authorized actor
    pub async fn authorize(
        &self,
        endpoint: &str,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<Url, ApiError> {
        let handler = self
            .get(endpoint, method)
            .ok_or_else(|| ApiError::Internal(format!("no authorization handler for {} {}", method, endpoint)))?;

        match handler.authorize(&AuthRequest::new(method, uri, headers)).await? {
            Authorization::Authorized(actor) => Ok(actor),
            Authorization::Unauthorized => {
                warn!(endpoint = %endpoint, method = %method, "Request not authorized");
                Err(ApiError::Unauthorized("request is not authorized".into()))
            }
        }
    }
}
