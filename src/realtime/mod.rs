//! WebSocket push channel.
//!
//! Every connection subscribes to the broadcast channel and receives each
//! event as a `{"event", "data"}` text frame. Clients may send
//! `chat-message` frames, which are relayed to every other connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::ids::new_id;
use crate::notify::{BroadcastNotifier, Event};
use crate::AppState;

/// Client frame event that gets relayed to the other connections.
const CHAT_RELAY_EVENT: &str = "chat-message";

/// Frame sent by a client.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// GET /ws - Upgrade to the push channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = new_id();
    tracing::info!("Socket connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.broadcaster.subscribe();

    // Forward broadcasts to this client
    let outbound_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let broadcast = match events.recv().await {
                Ok(broadcast) => broadcast,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Socket {} lagged, skipped {} events", outbound_id, skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if broadcast.origin.as_deref() == Some(outbound_id.as_str()) {
                continue;
            }

            let frame = match serde_json::to_string(&broadcast.event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Failed to encode {}: {}", broadcast.event.name(), e);
                    continue;
                }
            };

            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Handle frames from this client
    let broadcaster = state.broadcaster.clone();
    let inbound_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_frame(&broadcaster, &inbound_id, text.as_str()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!("Socket disconnected: {}", connection_id);
}

fn handle_frame(broadcaster: &BroadcastNotifier, origin: &str, text: &str) {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) if frame.event == CHAT_RELAY_EVENT => {
            broadcaster.relay(origin, Event::ChatRelay(frame.data));
        }
        Ok(frame) => tracing::debug!("Ignoring {} from socket {}", frame.event, origin),
        Err(e) => tracing::warn!("Malformed frame from socket {}: {}", origin, e),
    }
}
