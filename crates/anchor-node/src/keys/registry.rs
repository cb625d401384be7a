//! Key Registry for the anchor node
//!
//! Holds:
//! - The service actor's Ed25519 signing key, published under `{service}/keys/main-key`
//! - Public keys of remote actors registered out of band
//! - An optional resolver for keys nobody registered

use anchor_auth::{ActorKey, AuthError, HttpSigner, KeyResolver, PublicKeyDocument};
use anchor_core::{child_iri, CoreError};
use async_trait::async_trait;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use url::Url;

/// Name of the service actor's key under `{service}/keys/`
pub const MAIN_KEY_NAME: &str = "main-key";

/// Key Registry for the anchor node
///
/// Resolves signature key ids in order: the service key, registered actor
/// keys, then the remote resolver if one is configured.
pub struct KeyRegistry {
    service_iri: Url,
    key_id: Url,
    signing_key: SigningKey,

    /// Registered actor public keys (key id -> key)
    actor_keys: RwLock<HashMap<String, ActorKey>>,

    remote: Option<Arc<dyn KeyResolver>>,
}

impl KeyRegistry {
    /// Create a registry around the service actor's signing key
    pub fn new(service_iri: Url, signing_key: SigningKey) -> Result<Self, CoreError> {
        let key_id = child_iri(&service_iri, &["keys", MAIN_KEY_NAME])?;
        info!(key_id = %key_id, "Key registry initialized with service key");

        Ok(Self {
            service_iri,
            key_id,
            signing_key,
            actor_keys: RwLock::new(HashMap::new()),
            remote: None,
        })
    }

    /// Generate a registry with a random service key
    pub fn generate(service_iri: Url) -> Result<Self, CoreError> {
        Self::new(service_iri, SigningKey::generate(&mut OsRng))
    }

    /// Create a registry from a fixed 32-byte seed
    pub fn from_seed(service_iri: Url, seed: &[u8; 32]) -> Result<Self, CoreError> {
        Self::new(service_iri, SigningKey::from_bytes(seed))
    }

    /// Fall back to `remote` for unknown key ids
    pub fn with_remote_resolver(mut self, remote: Arc<dyn KeyResolver>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn service_iri(&self) -> &Url {
        &self.service_iri
    }

    /// Id of the service key, as used in outbound `Signature` headers
    pub fn key_id(&self) -> &Url {
        &self.key_id
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Published document for the service key
    pub fn public_key_document(&self) -> PublicKeyDocument {
        PublicKeyDocument::new(self.key_id.clone(), self.service_iri.clone(), &self.public_key())
    }

    /// Signer for outbound requests made on behalf of the service actor
    pub fn signer(&self) -> HttpSigner {
        HttpSigner::new(self.key_id.as_str(), self.signing_key.clone())
    }

    // =========================================================================
    // Actor Key Management
    // =========================================================================

    /// Register a remote actor's public key
    pub fn register_actor_key(&self, key: ActorKey) {
        let mut actor_keys = self.actor_keys.write().unwrap_or_else(|e| e.into_inner());
        info!(key_id = %key.key_id, actor = %key.actor, "Registered actor key");
        actor_keys.insert(key.key_id.clone(), key);
    }

    /// Remove a registered actor key
    pub fn unregister_actor_key(&self, key_id: &str) -> bool {
        let mut actor_keys = self.actor_keys.write().unwrap_or_else(|e| e.into_inner());
        let removed = actor_keys.remove(key_id).is_some();
        if removed {
            info!(key_id = %key_id, "Unregistered actor key");
        }
        removed
    }

    /// Number of registered actor keys
    pub fn actor_key_count(&self) -> usize {
        self.actor_keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn service_key(&self) -> ActorKey {
        ActorKey {
            key_id: self.key_id.to_string(),
            actor: self.service_iri.clone(),
            public_key: self.public_key(),
        }
    }
}

#[async_trait]
impl KeyResolver for KeyRegistry {
    async fn resolve(&self, key_id: &str) -> Result<Option<ActorKey>, AuthError> {
        if key_id == self.key_id.as_str() {
            return Ok(Some(self.service_key()));
        }

        let registered = self
            .actor_keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key_id)
            .cloned();
        if registered.is_some() {
            return Ok(registered);
        }

        match &self.remote {
            Some(remote) => remote.resolve(key_id).await,
            None => {
                debug!(key_id = %key_id, "Key not registered");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Url {
        Url::parse("https://node.example/services/anchor").unwrap()
    }

    fn actor_key(key_id: &str, actor: &str) -> ActorKey {
        ActorKey {
            key_id: key_id.to_string(),
            actor: Url::parse(actor).unwrap(),
            public_key: SigningKey::generate(&mut OsRng).verifying_key(),
        }
    }

    struct Remote(ActorKey);

    #[async_trait]
    impl KeyResolver for Remote {
        async fn resolve(&self, key_id: &str) -> Result<Option<ActorKey>, AuthError> {
            Ok((key_id == self.0.key_id).then(|| self.0.clone()))
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = KeyRegistry::generate(service()).unwrap();
        assert_eq!(
            registry.key_id().as_str(),
            "https://node.example/services/anchor/keys/main-key"
        );
        assert_eq!(registry.actor_key_count(), 0);

        let doc = registry.public_key_document();
        assert_eq!(doc.owner, service());
        assert_eq!(doc.to_actor_key().unwrap().public_key, registry.public_key());
    }

    #[test]
    fn test_seeded_key_is_stable() {
        let a = KeyRegistry::from_seed(service(), &[9u8; 32]).unwrap();
        let b = KeyRegistry::from_seed(service(), &[9u8; 32]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[tokio::test]
    async fn test_resolve_order() {
        let remote_key = actor_key("https://remote.example/keys/1", "https://remote.example/actor");
        let registry = KeyRegistry::generate(service())
            .unwrap()
            .with_remote_resolver(Arc::new(Remote(remote_key.clone())));

        let own = registry.resolve(registry.key_id().as_str()).await.unwrap().unwrap();
        assert_eq!(own.actor, service());

        let registered = actor_key("https://peer.example/keys/a", "https://peer.example/actor");
        registry.register_actor_key(registered.clone());
        assert_eq!(
            registry.resolve("https://peer.example/keys/a").await.unwrap(),
            Some(registered)
        );

        assert_eq!(
            registry.resolve("https://remote.example/keys/1").await.unwrap(),
            Some(remote_key)
        );
        assert!(registry.resolve("https://nobody.example/k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unregister_actor_key() {
        let registry = KeyRegistry::generate(service()).unwrap();
        registry.register_actor_key(actor_key("k1", "https://peer.example/actor"));
        assert_eq!(registry.actor_key_count(), 1);

        assert!(registry.unregister_actor_key("k1"));
        assert!(!registry.unregister_actor_key("k1"));
        assert!(registry.resolve("k1").await.unwrap().is_none());
    }
}
