//! Anchor Node Server Binary
//!
//! Runs the federation HTTP server and the anchor link expiry sweep.

use anchor_auth::RemoteKeyResolver;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use anchor_node::anchorlink::EXPIRY_TAG;
use anchor_node::{
    create_router, AnchorLinkStore, AppState, ExpiryService, KeyRegistry, MemoryReferenceStore, MemoryStore,
    NodeConfig, ReferenceStore, TagStore,
};

#[tokio::main]
async fn main() {
    let config = NodeConfig::from_env().expect("Invalid configuration");

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Initialize key registry
    let registry = match config.signing_key_seed {
        Some(seed) => KeyRegistry::from_seed(config.service_iri.clone(), &seed),
        None => KeyRegistry::generate(config.service_iri.clone()),
    }
    .expect("Service IRI cannot hold key paths");
    let registry = if config.remote_keys {
        registry.with_remote_resolver(Arc::new(RemoteKeyResolver::new()))
    } else {
        registry
    };
    let registry = Arc::new(registry);

    // Initialize storage
    let tag_store = tag_store(&config).await;
    let references: Arc<dyn ReferenceStore> = Arc::new(MemoryReferenceStore::new());
    let anchor_links = Arc::new(
        AnchorLinkStore::new(tag_store.clone()).with_pending_lifespan(config.pending_link_lifespan),
    );

    // Expiry sweep for pending anchor links
    let mut expiry = ExpiryService::new();
    expiry.register(tag_store, EXPIRY_TAG, anchor_links.clone());
    let _sweeper = Arc::new(expiry).start(config.expiry_interval);

    info!(
        service_iri = %config.service_iri,
        key_id = %registry.key_id(),
        port = config.port,
        page_size = config.page_size.get(),
        verify_actor = config.verify_actor_in_signature,
        "Starting anchor node"
    );

    let port = config.port;

    // Create application state; an invalid auth-token configuration is fatal
    let state = Arc::new(
        AppState::new(config, registry, references, anchor_links)
            .expect("Invalid authorization token configuration"),
    );

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Anchor node listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

#[cfg(feature = "postgres")]
async fn tag_store(config: &NodeConfig) -> Arc<dyn TagStore> {
    match &config.database_url {
        Some(url) => Arc::new(
            anchor_node::PostgresStore::new(url)
                .await
                .expect("Failed to connect to PostgreSQL"),
        ),
        None => Arc::new(MemoryStore::new()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn tag_store(config: &NodeConfig) -> Arc<dyn TagStore> {
    if config.database_url.is_some() {
        tracing::warn!("ANCHOR_NODE_DATABASE_URL is set but the postgres feature is disabled; using memory store");
    }
    Arc::new(MemoryStore::new())
}
