//! Inbox / outbox submission and activity lookup

use anchor_core::{activity_type, child_iri, Activity, HashLink, ReferenceType};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use http::{HeaderMap, Method, Uri};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::api::auth::{activity_path, collection_path};
use crate::api::error::ApiError;
use crate::api::handlers::AppState;

fn parse_activity(body: &[u8]) -> Result<Activity, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid activity: {}", e)))
}

/// Reject an activity whose declared actor is not the authenticated one
fn check_actor(state: &AppState, authorized: &Url, activity: &Activity) -> Result<(), ApiError> {
    if state.config.verify_actor_in_signature && *authorized != activity.actor {
        warn!(
            authorized = %authorized,
            actor = %activity.actor,
            "Activity actor does not match the authenticated actor"
        );
        return Err(ApiError::Unauthorized(format!(
            "actor {} may not submit activities for {}",
            authorized, activity.actor
        )));
    }
    Ok(())
}

/// Post an activity to the service's outbox
///
/// POST {base}/outbox
///
/// Assigns `id` and `published` when absent. A `Like` also records the liked
/// object in the service's liked collection.
pub async fn post_outbox(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let endpoint = collection_path(&state.base_path(), ReferenceType::Outbox);
    let actor = state.authorizers.authorize(&endpoint, &method, &uri, &headers).await?;

    let mut activity = parse_activity(&body)?;
    check_actor(&state, &actor, &activity)?;

    let service_iri = &state.config.service_iri;
    let id = match &activity.id {
        Some(id) => id.clone(),
        None => {
            let id = child_iri(service_iri, &["activities", &Uuid::new_v4().to_string()])?;
            activity.id = Some(id.clone());
            id
        }
    };
    if activity.published.is_none() {
        activity.published = Some(Utc::now());
    }

    state.references.add_activity(&activity).await?;
    state
        .references
        .add_reference(ReferenceType::Outbox, service_iri, &id)
        .await?;

    if activity.kind == activity_type::LIKE {
        if let Some(object) = activity.object_iri() {
            state
                .references
                .add_reference(ReferenceType::Liked, service_iri, &object)
                .await?;
        }
    }

    info!(activity_id = %id, activity_type = %activity.kind, actor = %activity.actor, "Posted activity to outbox");
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Deliver an activity to the service's inbox
///
/// POST {base}/inbox
///
/// - `Follow` of the service adds the actor to the followers
/// - `Like` / `Announce` are recorded in the object's likes / shares
/// - `Create` of a hash-link stores it as a pending anchor link
pub async fn post_inbox(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let endpoint = collection_path(&state.base_path(), ReferenceType::Inbox);
    let actor = state.authorizers.authorize(&endpoint, &method, &uri, &headers).await?;

    let activity = parse_activity(&body)?;
    check_actor(&state, &actor, &activity)?;

    let id = activity
        .id
        .clone()
        .ok_or_else(|| ApiError::BadRequest("activity id is required".into()))?;
    let service_iri = &state.config.service_iri;

    state.references.add_activity(&activity).await?;
    state
        .references
        .add_reference(ReferenceType::Inbox, service_iri, &id)
        .await?;

    let object = activity.object_iri();
    match (activity.kind.as_str(), object) {
        (activity_type::FOLLOW, Some(object)) if object == *service_iri => {
            state
                .references
                .add_reference(ReferenceType::Follower, service_iri, &activity.actor)
                .await?;
            info!(follower = %activity.actor, "Added follower");
        }
        (activity_type::LIKE, Some(object)) => {
            state.references.add_reference(ReferenceType::Like, &object, &id).await?;
        }
        (activity_type::ANNOUNCE, Some(object)) => {
            state.references.add_reference(ReferenceType::Share, &object, &id).await?;
        }
        (activity_type::CREATE, Some(object)) if object.scheme() == "hl" => {
            let link = HashLink::from_url(&object)?;
            // A confirmed link stays processed
            let processed = state.anchor_links.get_links(link.resource_hash()).await?;
            if !processed.contains(&object) {
                state.anchor_links.put_pending_links(&[object]).await?;
            }
        }
        (kind, _) => {
            debug!(activity_id = %id, activity_type = %kind, "No side effects for activity");
        }
    }

    info!(activity_id = %id, activity_type = %activity.kind, actor = %activity.actor, "Accepted inbox activity");
    Ok(StatusCode::OK)
}

/// Get a stored activity
///
/// GET {base}/activities/{id}
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Activity>, ApiError> {
    let endpoint = activity_path(&state.base_path());
    state.authorizers.authorize(&endpoint, &method, &uri, &headers).await?;

    let activity_id = child_iri(&state.config.service_iri, &["activities", &id])?;
    state
        .references
        .get_activity(&activity_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("activity {}", activity_id)))
}
