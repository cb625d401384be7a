//! Relationship predicate applied to signing actors

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Decides whether a cryptographically verified actor may access the node.
///
/// The node's default checks membership in its follower or witness collections;
/// [`AnyActor`] disables the check.
#[async_trait]
pub trait ActorRelationship: Send + Sync {
    /// Whether `actor` is permitted
    async fn is_permitted(&self, actor: &Url) -> Result<bool>;

    /// Description for logging
    fn description(&self) -> &str {
        "actor relationship"
    }
}

/// Permits every verified actor
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyActor;

#[async_trait]
impl ActorRelationship for AnyActor {
    async fn is_permitted(&self, _actor: &Url) -> Result<bool> {
        Ok(true)
    }

    fn description(&self) -> &str {
        "any actor"
    }
}
