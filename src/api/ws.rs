//! WebSocket push of render model updates.
//!
//! The map surface connects once and receives a fresh render model every
//! time a position fix or route change triggers a pipeline run. The flow is
//! one-directional; the only client messages handled are pings and close.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::RenderModel;

use super::AppState;

/// Server message sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage {
    /// Initial connection acknowledgment
    Connected { message: String },
    /// A freshly built render model
    Render { model: RenderModel },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!(client = %client_id, "Map surface connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.tracker.subscribe();

    if send_message(
        &mut sender,
        &ServerMessage::Connected {
            message: "Connected to courierview render updates".to_string(),
        },
    )
    .await
    .is_err()
    {
        return;
    }

    // Snapshot so a client connecting mid-session does not wait for the
    // next position fix
    if let Some(model) = state.tracker.model().await {
        if send_message(&mut sender, &ServerMessage::Render { model })
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(model) => {
                    if send_message(&mut sender, &ServerMessage::Render { model })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Only the latest model matters; dropped intermediates
                    // are fine
                    debug!(skipped, "WebSocket client lagged behind render updates");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    info!(client = %client_id, "Map surface disconnected");
}

async fn send_message(
    sender: &mut (impl SinkExt<Message> + Unpin),
    message: &ServerMessage,
) -> Result<(), ()> {
    let Ok(text) = serde_json::to_string(message) else {
        return Err(());
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
