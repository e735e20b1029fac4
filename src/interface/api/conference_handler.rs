//! Conference record REST API handlers

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::domain::conference::{Conference, ConferenceUpdate, NewConference};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::{json, Value};
use tracing::info;

/// List conference records, newest first
pub async fn list_conferences(State(state): State<AppState>) -> ApiResult<Json<Vec<Conference>>> {
    Ok(Json(state.conferences.list_conferences().await?))
}

pub async fn get_conference(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Conference>> {
    let Path(id) = id?;
    state
        .conferences
        .get_conference(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Conference"))
}

pub async fn create_conference(
    State(state): State<AppState>,
    payload: Result<Json<NewConference>, JsonRejection>,
) -> ApiResult<Json<Conference>> {
    let Json(conference) = payload?;
    conference.validate()?;

    info!("API: Creating conference record {}", conference.conference_id);
    Ok(Json(state.conferences.create_conference(conference).await?))
}

/// Partial update of a conference record
pub async fn update_conference(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ConferenceUpdate>, JsonRejection>,
) -> ApiResult<Json<Conference>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    update.validate()?;

    info!("API: Updating conference record {}", id);
    state
        .conferences
        .update_conference(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Conference"))
}

pub async fn delete_conference(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if !state.conferences.delete_conference(id).await? {
        return Err(ApiError::not_found("Conference"));
    }
    info!("API: Deleted conference record {}", id);
    Ok(Json(json!({ "success": true })))
}
