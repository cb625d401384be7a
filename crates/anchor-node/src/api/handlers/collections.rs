//! Reference collection handlers
//!
//! Every collection endpoint follows the same steps: authorize, work out the
//! object and collection IRIs, then serve a summary or a page.

use anchor_core::{child_iri, CollectionPage, CollectionSummary, ReferenceType};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use http::{HeaderMap, Method, Uri};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::api::auth::{collection_path, object_collection_path};
use crate::api::error::ApiError;
use crate::api::handlers::params::{PageParams, PageRequest};
use crate::api::handlers::AppState;

/// Body of a collection response
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CollectionDocument {
    Summary(CollectionSummary),
    Page(CollectionPage),
}

/// Serve a collection of the service actor
///
/// GET {base}/followers, /following, /witnesses, /witnessing, /liked, /outbox, /inbox
pub async fn get_service_collection(
    reference_type: ReferenceType,
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<CollectionDocument>, ApiError> {
    let endpoint = collection_path(&state.base_path(), reference_type);
    let request = params.parse()?;
    state.authorizers.authorize(&endpoint, &method, &uri, &headers).await?;

    let object_iri = state.config.service_iri.clone();
    let collection_id = child_iri(&object_iri, &[reference_type.path_segment()])?;

    serve(&state, reference_type, &object_iri, &collection_id, request).await
}

/// Serve the shares or likes of an object
///
/// GET {base}/{id}/shares, {base}/{id}/likes
pub async fn get_object_collection(
    reference_type: ReferenceType,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<CollectionDocument>, ApiError> {
    let endpoint = object_collection_path(&state.base_path(), reference_type);
    let request = params.parse()?;
    state.authorizers.authorize(&endpoint, &method, &uri, &headers).await?;

    let object_iri = object_iri(&state.config.service_iri, &id)?;
    let collection_id = child_iri(&state.config.service_iri, &[id.as_str(), reference_type.path_segment()])?;

    serve(&state, reference_type, &object_iri, &collection_id, request).await
}

/// The object named by the `{id}` path parameter: an absolute IRI as given,
/// anything else resolved under the service IRI
fn object_iri(service_iri: &Url, id: &str) -> Result<Url, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest("missing object id".into()));
    }

    match Url::parse(id) {
        Ok(iri) if !iri.cannot_be_a_base() => Ok(iri),
        _ => Ok(child_iri(service_iri, &[id])?),
    }
}

async fn serve(
    state: &AppState,
    reference_type: ReferenceType,
    object_iri: &Url,
    collection_id: &Url,
    request: PageRequest,
) -> Result<Json<CollectionDocument>, ApiError> {
    let spec = reference_type.collection_spec();
    debug!(
        collection = %reference_type,
        object_iri = %object_iri,
        request = ?request,
        "Serving collection"
    );

    let document = match request {
        PageRequest::Summary => CollectionDocument::Summary(
            state.paginator.summary(spec, object_iri, collection_id).await?,
        ),
        PageRequest::Page(page_num) => CollectionDocument::Page(
            state
                .paginator
                .page(spec, object_iri, collection_id, page_num)
                .await?,
        ),
    };

    Ok(Json(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_iri_resolution() {
        let service = Url::parse("https://node.example/services/anchor").unwrap();

        assert_eq!(
            object_iri(&service, "https://b.example/obj/1").unwrap().as_str(),
            "https://b.example/obj/1"
        );
        assert_eq!(
            object_iri(&service, "obj-1").unwrap().as_str(),
            "https://node.example/services/anchor/obj-1"
        );
        assert!(object_iri(&service, " ").is_err());
    }
}
