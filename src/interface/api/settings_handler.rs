//! Settings API handlers

use super::error::ApiResult;
use super::state::AppState;
use crate::domain::settings::{Settings, SettingsUpdate};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

/// Stored settings, or `{}` when nothing has been saved yet
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let body = match state.settings.get_settings().await? {
        Some(settings) => json!(settings),
        None => json!({}),
    };
    Ok(Json(body))
}

pub async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> ApiResult<Json<Settings>> {
    let Json(update) = payload?;
    update.validate()?;

    info!("API: Updating settings");
    Ok(Json(state.settings.update_settings(update).await?))
}
