//! Follower / witness membership check for signing actors

use anchor_auth::{ActorRelationship, AuthError};
use anchor_core::ReferenceType;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::storage::ReferenceStore;

/// Permits actors that follow, or witness for, the object IRI
#[derive(Debug, Clone)]
pub struct FollowerOrWitness {
    store: Arc<dyn ReferenceStore>,
    object_iri: Url,
}

impl FollowerOrWitness {
    pub fn new(store: Arc<dyn ReferenceStore>, object_iri: Url) -> Self {
        Self { store, object_iri }
    }
}

#[async_trait]
impl ActorRelationship for FollowerOrWitness {
    async fn is_permitted(&self, actor: &Url) -> Result<bool, AuthError> {
        for reference_type in [ReferenceType::Follower, ReferenceType::Witness] {
            let found = self
                .store
                .has_reference(reference_type, &self.object_iri, actor)
                .await
                .map_err(|e| AuthError::Relationship(e.to_string()))?;
            if found {
                debug!(actor = %actor, relationship = %reference_type, "Actor permitted");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn description(&self) -> &str {
        "follower or witness"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryReferenceStore;

    fn iri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_followers_and_witnesses_permitted() {
        let service = iri("https://node.example/services/anchor");
        let store = Arc::new(MemoryReferenceStore::new());
        store
            .add_reference(ReferenceType::Follower, &service, &iri("https://a.example/actor"))
            .await
            .unwrap();
        store
            .add_reference(ReferenceType::Witness, &service, &iri("https://b.example/actor"))
            .await
            .unwrap();
        store
            .add_reference(ReferenceType::Following, &service, &iri("https://c.example/actor"))
            .await
            .unwrap();

        let check = FollowerOrWitness::new(store, service);
        assert!(check.is_permitted(&iri("https://a.example/actor")).await.unwrap());
        assert!(check.is_permitted(&iri("https://b.example/actor")).await.unwrap());
        assert!(!check.is_permitted(&iri("https://c.example/actor")).await.unwrap());
    }
}
