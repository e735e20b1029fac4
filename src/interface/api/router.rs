//! API Router configuration

use super::call_log_handler::{create_call_log, list_call_logs};
use super::conference_handler::{
    create_conference, delete_conference, get_conference, list_conferences, update_conference,
};
use super::contact_handler::{create_contact, delete_contact, get_contact, list_contacts};
use super::metrics_handler::metrics_handler;
use super::settings_handler::{get_settings, update_settings};
use super::softphone_handler as softphone;
use super::state::AppState;
use super::ws_handler::ws_handler;
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new().route("/health", get(health_check));

    // Persisted records
    let record_routes = Router::new()
        .route("/api/call-logs", get(list_call_logs).post(create_call_log))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/:id", get(get_contact).delete(delete_contact))
        .route(
            "/api/conferences",
            get(list_conferences).post(create_conference),
        )
        .route(
            "/api/conferences/:id",
            get(get_conference)
                .put(update_conference)
                .delete(delete_conference),
        );

    // Live softphone commands
    let softphone_routes = Router::new()
        .route("/api/softphone/state", get(softphone::get_state))
        .route("/api/softphone/connect", post(softphone::connect))
        .route("/api/softphone/disconnect", post(softphone::disconnect))
        .route("/api/softphone/dial", post(softphone::dial))
        .route("/api/softphone/answer", post(softphone::answer))
        .route("/api/softphone/decline", post(softphone::decline))
        .route("/api/softphone/hangup", post(softphone::hangup))
        .route("/api/softphone/mute", post(softphone::toggle_mute))
        .route("/api/softphone/hold", post(softphone::toggle_hold))
        .route("/api/softphone/transfer", post(softphone::transfer))
        .route(
            "/api/softphone/conference",
            post(softphone::create_conference).delete(softphone::end_conference),
        )
        .route(
            "/api/softphone/conference/participants",
            post(softphone::add_participant),
        )
        .route(
            "/api/softphone/conference/participants/:call_id",
            delete(softphone::remove_participant),
        )
        .route("/api/softphone/events", get(ws_handler));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(record_routes)
        .merge(softphone_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
