//! WebSocket update streaming handler

use super::state::AppState;
use crate::application::{SoftphoneService, SoftphoneUpdate};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// WebSocket handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state.softphone))
}

fn encode(update: &SoftphoneUpdate) -> Option<Message> {
    match serde_json::to_string(update) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            error!("Failed to serialize update: {}", e);
            None
        }
    }
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, softphone: Arc<SoftphoneService>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = softphone.subscribe_updates();

    info!("WebSocket client connected");

    // Current snapshot first so the client never renders a stale state
    let snapshot = SoftphoneUpdate::State {
        state: softphone.state().await,
    };

    let mut send_task = tokio::spawn(async move {
        if let Some(message) = encode(&snapshot) {
            if sender.send(message).await.is_err() {
                return;
            }
        }
        loop {
            let update = match rx.recv().await {
                Ok(update) => update,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagging, skipped {} updates", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(message) = encode(&update) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                debug!("Failed to send update to WebSocket client");
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    debug!("Received close message");
                    break;
                }
                Message::Text(text) => debug!("Ignoring client text message: {}", text),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("WebSocket client disconnected");
}
