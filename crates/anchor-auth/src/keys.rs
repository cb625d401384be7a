//! Public key resolution for HTTP signatures

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::VerifyingKey;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, Result};

/// A verified public key and the actor that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorKey {
    /// Key id as it appears in `Signature` headers
    pub key_id: String,
    /// Owning actor
    pub actor: Url,
    /// Ed25519 verification key
    pub public_key: VerifyingKey,
}

/// Looks up the key named by a signature's `keyId`
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Resolve a key id; `Ok(None)` when no such key exists
    async fn resolve(&self, key_id: &str) -> Result<Option<ActorKey>>;
}

/// Published form of a public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyDocument {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub id: Url,
    pub owner: Url,
    /// Base64-encoded 32-byte Ed25519 public key
    pub public_key_base64: String,
}

impl PublicKeyDocument {
    /// Describe `key` as owned by `owner`
    pub fn new(id: Url, owner: Url, key: &VerifyingKey) -> Self {
        Self {
            context: Some("https://w3id.org/security/v1".to_string()),
            id,
            owner,
            public_key_base64: STANDARD.encode(key.to_bytes()),
        }
    }

    /// Decode into an [`ActorKey`]
    pub fn to_actor_key(&self) -> Result<ActorKey> {
        let bytes = STANDARD
            .decode(&self.public_key_base64)
            .map_err(|e| AuthError::KeyResolution(format!("invalid public key encoding: {}", e)))?;

        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AuthError::KeyResolution(format!(
                "invalid public key length: {}, expected 32",
                bytes.len()
            ))
        })?;

        let public_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| AuthError::KeyResolution(format!("invalid public key: {}", e)))?;

        Ok(ActorKey {
            key_id: self.id.to_string(),
            actor: self.owner.clone(),
            public_key,
        })
    }
}

/// Check a fetched document against the key id it was fetched for.
///
/// The document must describe `key_id` and name an owner on the same origin
/// as the key; a host may only vouch for its own actors.
fn accept_document(key_id: &str, document: &PublicKeyDocument) -> Result<ActorKey> {
    if document.id.as_str() != key_id {
        return Err(AuthError::KeyResolution(format!(
            "key document id '{}' does not match key id '{}'",
            document.id, key_id
        )));
    }

    if document.owner.origin() != document.id.origin() {
        warn!(key_id = %key_id, owner = %document.owner, "Key document names an owner on another origin");
        return Err(AuthError::KeyResolution(format!(
            "key '{}' may not be owned by '{}'",
            key_id, document.owner
        )));
    }

    document.to_actor_key()
}

/// Resolves keys by dereferencing their key id over HTTP
pub struct RemoteKeyResolver {
    /// Key cache (key id -> key)
    cache: Cache<String, ActorKey>,
    /// HTTP client for fetching key documents
    http_client: reqwest::Client,
    /// Per-request timeout
    timeout: Duration,
}

impl RemoteKeyResolver {
    /// Create a resolver with a one-hour cache
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(1000)
                .build(),
            http_client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RemoteKeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyResolver for RemoteKeyResolver {
    async fn resolve(&self, key_id: &str) -> Result<Option<ActorKey>> {
        if let Some(cached) = self.cache.get(key_id).await {
            debug!(key_id = %key_id, "Using cached public key");
            return Ok(Some(cached));
        }

        let url = match Url::parse(key_id) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => url,
            _ => {
                debug!(key_id = %key_id, "Key id is not dereferenceable");
                return Ok(None);
            }
        };

        debug!(key_id = %key_id, "Fetching public key document");
        let response = self
            .http_client
            .get(url)
            .header(http::header::ACCEPT, "application/activity+json, application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: PublicKeyDocument = response
            .error_for_status()?
            .json()
            .await
            .map_err(|e| AuthError::KeyResolution(format!("invalid key document: {}", e)))?;

        let key = accept_document(key_id, &document)?;
        self.cache.insert(key_id.to_string(), key.clone()).await;

        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn test_document_round_trip() {
        let signing = SigningKey::generate(&mut OsRng);
        let document = PublicKeyDocument::new(
            Url::parse("https://a.example/services/anchor/keys/main-key").unwrap(),
            Url::parse("https://a.example/services/anchor").unwrap(),
            &signing.verifying_key(),
        );

        let key = document.to_actor_key().unwrap();
        assert_eq!(key.public_key, signing.verifying_key());
        assert_eq!(key.actor.as_str(), "https://a.example/services/anchor");
        assert_eq!(key.key_id, "https://a.example/services/anchor/keys/main-key");
    }

    #[test]
    fn test_document_rejects_bad_key_length() {
        let document = PublicKeyDocument {
            context: None,
            id: Url::parse("https://a.example/keys/1").unwrap(),
            owner: Url::parse("https://a.example").unwrap(),
            public_key_base64: STANDARD.encode([0u8; 16]),
        };
        assert!(matches!(document.to_actor_key(), Err(AuthError::KeyResolution(_))));
    }

    #[tokio::test]
    async fn test_remote_resolver_ignores_non_http_key_ids() {
        let resolver = RemoteKeyResolver::new();
        assert!(resolver.resolve("did:example:123#key-1").await.unwrap().is_none());
        assert!(resolver.resolve("not a url").await.unwrap().is_none());
    }

    #[test]
    fn test_fetched_document_must_match_key_id() {
        let signing = SigningKey::generate(&mut OsRng);
        let document = PublicKeyDocument::new(
            Url::parse("https://a.example/keys/1").unwrap(),
            Url::parse("https://a.example/actor").unwrap(),
            &signing.verifying_key(),
        );

        assert!(accept_document("https://a.example/keys/1", &document).is_ok());
        assert!(matches!(
            accept_document("https://a.example/keys/2", &document),
            Err(AuthError::KeyResolution(_))
        ));
    }

    #[test]
    fn test_fetched_document_owner_must_share_origin() {
        let signing = SigningKey::generate(&mut OsRng);
        let key_id = "http://127.0.0.1:4000/keys/1";
        let spoofed = PublicKeyDocument::new(
            Url::parse(key_id).unwrap(),
            Url::parse("https://follower.example/services/anchor").unwrap(),
            &signing.verifying_key(),
        );
        assert!(matches!(accept_document(key_id, &spoofed), Err(AuthError::KeyResolution(_))));

        // Same host on another port is another origin
        let other_port = PublicKeyDocument::new(
            Url::parse(key_id).unwrap(),
            Url::parse("http://127.0.0.1:4001/actor").unwrap(),
            &signing.verifying_key(),
        );
        assert!(matches!(accept_document(key_id, &other_port), Err(AuthError::KeyResolution(_))));

        let owned = PublicKeyDocument::new(
            Url::parse(key_id).unwrap(),
            Url::parse("http://127.0.0.1:4000/actor").unwrap(),
            &signing.verifying_key(),
        );
        assert_eq!(
            accept_document(key_id, &owned).unwrap().actor.as_str(),
            "http://127.0.0.1:4000/actor"
        );
    }
}
