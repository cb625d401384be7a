//! API module for the anchor node

pub mod auth;
pub mod error;
pub mod handlers;

use anchor_core::ReferenceType;
use axum::{
    extract::{Path, Query, State},
    routing::{get, MethodRouter},
    Json, Router,
};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use auth::{activity_path, collection_path, key_path, object_collection_path, OBJECT_COLLECTIONS, SERVICE_COLLECTIONS};
use handlers::{AppState, PageParams};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub service_iri: String,
    pub key_id: String,
    pub follower_count: u64,
    pub witness_count: u64,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
///
/// 503 with `ready: false` when the reference store cannot be read.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    let service_iri = &state.config.service_iri;
    let mut ready = true;
    let mut counts = [0u64; 2];
    for (count, reference_type) in counts.iter_mut().zip([ReferenceType::Follower, ReferenceType::Witness]) {
        match state.paginator.total_items(reference_type.collection_spec(), service_iri).await {
            Ok(total) => *count = total,
            Err(e) => {
                warn!(collection = %reference_type, error = %e, "Readiness count failed");
                ready = false;
            }
        }
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready,
            service_iri: service_iri.to_string(),
            key_id: state.registry.key_id().to_string(),
            follower_count: counts[0],
            witness_count: counts[1],
        }),
    )
}

fn service_collection(reference_type: ReferenceType) -> MethodRouter<Arc<AppState>> {
    get(
        move |state: State<Arc<AppState>>,
              method: Method,
              uri: Uri,
              headers: HeaderMap,
              params: Query<PageParams>| {
            handlers::get_service_collection(reference_type, state, method, uri, headers, params)
        },
    )
}

fn object_collection(reference_type: ReferenceType) -> MethodRouter<Arc<AppState>> {
    get(
        move |state: State<Arc<AppState>>,
              id: Path<String>,
              method: Method,
              uri: Uri,
              headers: HeaderMap,
              params: Query<PageParams>| {
            handlers::get_object_collection(reference_type, state, id, method, uri, headers, params)
        },
    )
}

/// Create the API router.
///
/// Routes are registered under the path of the configured service IRI.
pub fn create_router(state: Arc<AppState>) -> Router {
    let base = state.base_path();

    // CORS configuration for browser-based clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Collections of the service actor; inbox and outbox also accept posts
    for reference_type in SERVICE_COLLECTIONS {
        let mut route = service_collection(reference_type);
        match reference_type {
            ReferenceType::Outbox => route = route.post(handlers::post_outbox),
            ReferenceType::Inbox => route = route.post(handlers::post_inbox),
            _ => {}
        }
        router = router.route(&collection_path(&base, reference_type), route);
    }

    // Per-object shares and likes
    for reference_type in OBJECT_COLLECTIONS {
        router = router.route(
            &object_collection_path(&base, reference_type),
            object_collection(reference_type),
        );
    }

    router
        .route(&activity_path(&base), get(handlers::get_activity))
        .route(&key_path(&base), get(handlers::get_key))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
