//! Softphone command handlers
//!
//! Commands mirror the call client: most return the state snapshot right
//! after the command was issued. Outcomes the vendor reports later reach
//! clients over the event socket.

use super::error::ApiResult;
use super::state::AppState;
use crate::domain::call::{CallState, Credentials};
use crate::domain::shared::value_objects::CallId;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DestinationRequest {
    pub destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialResponse {
    pub call_id: CallId,
    pub state: CallState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceResponse {
    pub conference_id: Option<String>,
    pub state: CallState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub call_id: Option<CallId>,
    pub state: CallState,
}

pub async fn get_state(State(state): State<AppState>) -> Json<CallState> {
    Json(state.softphone.state().await)
}

/// Connect with the posted credentials, or the stored settings without a body
pub async fn connect(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<CallState>> {
    info!("API: Connect requested");
    let credentials = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let Json(credentials) = Json::<Credentials>::from_bytes(&body)?;
        Some(credentials)
    };
    state.softphone.connect(credentials).await?;
    Ok(Json(state.softphone.state().await))
}

pub async fn disconnect(State(state): State<AppState>) -> Json<CallState> {
    info!("API: Disconnect requested");
    state.softphone.disconnect().await;
    Json(state.softphone.state().await)
}

pub async fn dial(
    State(state): State<AppState>,
    payload: Result<Json<DestinationRequest>, JsonRejection>,
) -> ApiResult<Json<DialResponse>> {
    let Json(request) = payload?;
    info!("API: Dial {}", request.destination);
    let call_id = state.softphone.dial(&request.destination).await?;
    Ok(Json(DialResponse {
        call_id,
        state: state.softphone.state().await,
    }))
}

pub async fn answer(State(state): State<AppState>) -> Json<CallState> {
    state.softphone.answer().await;
    Json(state.softphone.state().await)
}

pub async fn decline(State(state): State<AppState>) -> Json<CallState> {
    state.softphone.decline().await;
    Json(state.softphone.state().await)
}

pub async fn hangup(State(state): State<AppState>) -> Json<CallState> {
    state.softphone.hangup().await;
    Json(state.softphone.state().await)
}

pub async fn toggle_mute(State(state): State<AppState>) -> Json<CallState> {
    Json(state.softphone.toggle_mute().await)
}

pub async fn toggle_hold(State(state): State<AppState>) -> Json<CallState> {
    Json(state.softphone.toggle_hold().await)
}

pub async fn transfer(
    State(state): State<AppState>,
    payload: Result<Json<DestinationRequest>, JsonRejection>,
) -> ApiResult<Json<CallState>> {
    let Json(request) = payload?;
    info!("API: Transfer to {}", request.destination);
    state.softphone.transfer(&request.destination).await;
    Ok(Json(state.softphone.state().await))
}

pub async fn create_conference(State(state): State<AppState>) -> Json<ConferenceResponse> {
    let conference_id = state.softphone.create_conference().await;
    Json(ConferenceResponse {
        conference_id: conference_id.map(|id| id.to_string()),
        state: state.softphone.state().await,
    })
}

pub async fn add_participant(
    State(state): State<AppState>,
    payload: Result<Json<ParticipantRequest>, JsonRejection>,
) -> ApiResult<Json<ParticipantResponse>> {
    let Json(request) = payload?;
    info!("API: Adding participant {}", request.phone_number);
    let call_id = state.softphone.add_participant(&request.phone_number).await?;
    Ok(Json(ParticipantResponse {
        call_id,
        state: state.softphone.state().await,
    }))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    call_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<CallState>> {
    let Path(call_id) = call_id?;
    state
        .softphone
        .remove_participant(&CallId::from(call_id))
        .await;
    Ok(Json(state.softphone.state().await))
}

pub async fn end_conference(State(state): State<AppState>) -> Json<CallState> {
    info!("API: Ending conference");
    state.softphone.end_conference().await;
    Json(state.softphone.state().await)
}
