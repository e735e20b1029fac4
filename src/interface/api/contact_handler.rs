//! Contact API handlers

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::domain::contact::{Contact, NewContact};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::{json, Value};
use tracing::info;

/// List contacts sorted by name
pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<Vec<Contact>>> {
    Ok(Json(state.contacts.list_contacts().await?))
}

pub async fn get_contact(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Contact>> {
    let Path(id) = id?;
    state
        .contacts
        .get_contact(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact"))
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> ApiResult<Json<Contact>> {
    let Json(contact) = payload?;
    contact.validate()?;

    info!("API: Creating contact {}", contact.name);
    Ok(Json(state.contacts.create_contact(contact).await?))
}

/// Delete a contact; unknown ids succeed too
pub async fn delete_contact(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let removed = state.contacts.delete_contact(id).await?;
    info!("API: Delete contact {} (removed: {})", id, removed);
    Ok(Json(json!({ "success": true })))
}
