//! Public key publication
//!
//! Remote nodes dereference the `keyId` of our signatures here.

use anchor_auth::PublicKeyDocument;
use anchor_core::child_iri;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// Get the service's public key document
///
/// GET {base}/keys/{id}
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicKeyDocument>, ApiError> {
    let key_id = child_iri(&state.config.service_iri, &["keys", &id])?;

    if key_id != *state.registry.key_id() {
        debug!(key_id = %key_id, "Unknown key requested");
        return Err(ApiError::NotFound(format!("public key {}", key_id)));
    }

    Ok(Json(state.registry.public_key_document()))
}
