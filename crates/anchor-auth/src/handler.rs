//! Per-endpoint authorization handler

use http::Method;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::chain::AuthChain;
use crate::error::Result;
use crate::httpsig::SignatureVerifier;
use crate::relationship::{ActorRelationship, AnyActor};
use crate::strategies::{BearerTokenStrategy, SignatureStrategy};
use crate::tokens::AuthTokenManager;
use crate::types::{AccessMode, AuthRequest, Authorization};

/// Authorizes requests to one endpoint and method.
///
/// The bearer secrets are resolved once at construction. The chain is the
/// bearer-token strategy followed, when a verifier is configured, by the
/// signature strategy.
#[derive(Debug, Clone)]
pub struct AuthHandler {
    endpoint: String,
    method: Method,
    chain: AuthChain,
}

impl AuthHandler {
    /// Start building a handler for `endpoint` and `method`, authorizing
    /// token holders as `service_iri`
    pub fn builder(endpoint: impl Into<String>, method: Method, service_iri: Url) -> AuthHandlerBuilder<'static> {
        AuthHandlerBuilder {
            endpoint: endpoint.into(),
            method,
            service_iri,
            tokens: None,
            verifier: None,
            relationship: Arc::new(AnyActor),
            identify_signers: false,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Authorize a request
    pub async fn authorize(&self, request: &AuthRequest<'_>) -> Result<Authorization> {
        let authorization = self.chain.authorize(request).await?;
        debug!(
            endpoint = %self.endpoint,
            method = %self.method,
            authorized = authorization.is_authorized(),
            "Authorization decided"
        );
        Ok(authorization)
    }
}

/// Builder for an [`AuthHandler`]
pub struct AuthHandlerBuilder<'a> {
    endpoint: String,
    method: Method,
    service_iri: Url,
    tokens: Option<&'a AuthTokenManager>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    relationship: Arc<dyn ActorRelationship>,
    identify_signers: bool,
}

impl<'a> AuthHandlerBuilder<'a> {
    /// Resolve bearer secrets from a token manager (default: none required)
    pub fn tokens<'b>(self, tokens: &'b AuthTokenManager) -> AuthHandlerBuilder<'b> {
        AuthHandlerBuilder {
            endpoint: self.endpoint,
            method: self.method,
            service_iri: self.service_iri,
            tokens: Some(tokens),
            verifier: self.verifier,
            relationship: self.relationship,
            identify_signers: self.identify_signers,
        }
    }

    /// Accept HTTP-signed requests
    pub fn signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Relationship the signing actor must satisfy (default: any actor)
    pub fn relationship(mut self, relationship: Arc<dyn ActorRelationship>) -> Self {
        self.relationship = relationship;
        self
    }

    /// Authorize signed requests to an open endpoint as their signer rather
    /// than as the service. Needs a signature verifier to take effect.
    pub fn identify_signers(mut self) -> Self {
        self.identify_signers = true;
        self
    }

    pub fn build(self) -> AuthHandler {
        let secrets = self
            .tokens
            .map(|tokens| tokens.resolve(&self.endpoint, AccessMode::from(&self.method)))
            .unwrap_or_default();

        let mut chain = AuthChain::new();
        chain.register_strategy(
            BearerTokenStrategy::new(secrets, self.service_iri)
                .identify_signers(self.identify_signers && self.verifier.is_some()),
        );
        if let Some(verifier) = self.verifier {
            chain.register_strategy(SignatureStrategy::new(verifier, self.relationship));
        }

        AuthHandler {
            endpoint: self.endpoint,
            method: self.method,
            chain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthTokenDef;
    use async_trait::async_trait;
    use http::{header, HeaderMap, Uri};
    use std::collections::HashMap;

    const ENDPOINT: &str = "/services/anchor/outbox";

    struct StaticVerifier(Option<Url>);

    #[async_trait]
    impl SignatureVerifier for StaticVerifier {
        async fn verify(&self, _request: &AuthRequest<'_>) -> Result<Option<Url>> {
            Ok(self.0.clone())
        }
    }

    struct Only(Url);

    #[async_trait]
    impl ActorRelationship for Only {
        async fn is_permitted(&self, actor: &Url) -> Result<bool> {
            Ok(*actor == self.0)
        }
    }

    fn service() -> Url {
        Url::parse("https://node.example/services/anchor").unwrap()
    }

    fn remote() -> Url {
        Url::parse("https://remote.example/services/anchor").unwrap()
    }

    fn manager() -> AuthTokenManager {
        AuthTokenManager::new(
            vec![AuthTokenDef::new("^/services/anchor/outbox").with_read(&["read"]).with_write(&["admin"])],
            HashMap::from([
                ("read".to_string(), "READ".to_string()),
                ("admin".to_string(), "ADMIN".to_string()),
            ]),
        )
        .unwrap()
    }

    async fn authorize(handler: &AuthHandler, token: Option<&str>) -> Result<Authorization> {
        let uri = Uri::from_static(ENDPOINT);
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(header::AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        }
        handler
            .authorize(&AuthRequest::new(handler.method(), &uri, &headers))
            .await
    }

    #[tokio::test]
    async fn test_token_beats_signature() {
        let tokens = manager();
        let handler = AuthHandler::builder(ENDPOINT, Method::GET, service())
            .tokens(&tokens)
            .signature_verifier(Arc::new(StaticVerifier(Some(remote()))))
            .build();

        assert_eq!(
            authorize(&handler, Some("READ")).await.unwrap(),
            Authorization::Authorized(service())
        );
    }

    #[tokio::test]
    async fn test_signature_used_when_token_fails() {
        let tokens = manager();
        let handler = AuthHandler::builder(ENDPOINT, Method::GET, service())
            .tokens(&tokens)
            .signature_verifier(Arc::new(StaticVerifier(Some(remote()))))
            .relationship(Arc::new(Only(remote())))
            .build();

        assert_eq!(
            authorize(&handler, Some("wrong")).await.unwrap(),
            Authorization::Authorized(remote())
        );
    }

    #[tokio::test]
    async fn test_relationship_failure_is_unauthorized() {
        let tokens = manager();
        let handler = AuthHandler::builder(ENDPOINT, Method::GET, service())
            .tokens(&tokens)
            .signature_verifier(Arc::new(StaticVerifier(Some(remote()))))
            .relationship(Arc::new(Only(service())))
            .build();

        assert_eq!(authorize(&handler, None).await.unwrap(), Authorization::Unauthorized);
    }

    #[tokio::test]
    async fn test_no_verifier_and_no_token_is_unauthorized() {
        let tokens = manager();
        let handler = AuthHandler::builder(ENDPOINT, Method::POST, service()).tokens(&tokens).build();

        assert_eq!(authorize(&handler, None).await.unwrap(), Authorization::Unauthorized);
        // read token does not grant writes
        assert_eq!(authorize(&handler, Some("READ")).await.unwrap(), Authorization::Unauthorized);
        assert_eq!(
            authorize(&handler, Some("ADMIN")).await.unwrap(),
            Authorization::Authorized(service())
        );
    }

    #[tokio::test]
    async fn test_open_endpoint_authorizes_as_service() {
        let handler = AuthHandler::builder("/services/anchor/followers", Method::GET, service()).build();
        assert_eq!(authorize(&handler, None).await.unwrap(), Authorization::Authorized(service()));
    }

    #[tokio::test]
    async fn test_open_endpoint_identifies_signers() {
        let handler = AuthHandler::builder("/services/anchor/inbox", Method::POST, service())
            .signature_verifier(Arc::new(StaticVerifier(Some(remote()))))
            .identify_signers()
            .build();

        let uri = Uri::from_static("/services/anchor/inbox");
        let mut headers = HeaderMap::new();
        assert_eq!(
            handler.authorize(&AuthRequest::new(&Method::POST, &uri, &headers)).await.unwrap(),
            Authorization::Authorized(service())
        );

        headers.insert(crate::httpsig::SIGNATURE_HEADER, "keyId=\"k\"".parse().unwrap());
        assert_eq!(
            handler.authorize(&AuthRequest::new(&Method::POST, &uri, &headers)).await.unwrap(),
            Authorization::Authorized(remote())
        );
    }
}
