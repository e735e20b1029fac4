//! Call history API handlers

use super::error::ApiResult;
use super::state::AppState;
use crate::domain::call_log::{CallLog, NewCallLog};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::info;

/// List call logs, newest first
pub async fn list_call_logs(State(state): State<AppState>) -> ApiResult<Json<Vec<CallLog>>> {
    let logs = state.call_logs.list_call_logs().await?;
    Ok(Json(logs))
}

pub async fn create_call_log(
    State(state): State<AppState>,
    payload: Result<Json<NewCallLog>, JsonRejection>,
) -> ApiResult<Json<CallLog>> {
    let Json(log) = payload?;
    log.validate()?;

    info!("API: Recording call log for {}", log.phone_number);
    let created = state.call_logs.create_call_log(log).await?;
    Ok(Json(created))
}
