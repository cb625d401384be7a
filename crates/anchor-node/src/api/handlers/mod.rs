//! API request handlers

pub mod activities;
pub mod collections;
pub mod keys;
pub mod params;

pub use activities::{get_activity, post_inbox, post_outbox};
pub use collections::{get_object_collection, get_service_collection, CollectionDocument};
pub use keys::get_key;
pub use params::{PageParams, PageRequest};

use anchor_auth::AuthError;
use std::sync::Arc;

use crate::anchorlink::AnchorLinkStore;
use crate::api::auth::Authorizers;
use crate::collection::Paginator;
use crate::config::NodeConfig;
use crate::keys::KeyRegistry;
use crate::storage::ReferenceStore;

/// Application state shared across handlers
pub struct AppState {
    pub config: NodeConfig,
    pub registry: Arc<KeyRegistry>,
    pub references: Arc<dyn ReferenceStore>,
    pub anchor_links: Arc<AnchorLinkStore>,
    pub paginator: Paginator,
    pub authorizers: Authorizers,
}

impl AppState {
    /// Assemble the state; fails when the auth-token configuration is invalid
    pub fn new(
        config: NodeConfig,
        registry: Arc<KeyRegistry>,
        references: Arc<dyn ReferenceStore>,
        anchor_links: Arc<AnchorLinkStore>,
    ) -> Result<Self, AuthError> {
        let authorizers = Authorizers::new(&config, registry.clone(), references.clone())?;
        let paginator = Paginator::new(references.clone(), config.page_size);

        Ok(Self {
            config,
            registry,
            references,
            anchor_links,
            paginator,
            authorizers,
        })
    }

    /// HTTP base path of the service
    pub fn base_path(&self) -> String {
        self.config.base_path()
    }
}
