use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::time;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::jwt::validate_token;
use crate::realtime::gateway::RealtimeGateway;
use crate::realtime::topic::{feed_topic, notifications_topic};

const HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Query parameters for WebSocket connections
#[derive(Debug, Deserialize)]
pub struct WebSocketParams {
    token: Option<String>,
}

/// Frames a client may send while connected. Topic names are always derived
/// server-side from the authenticated identity; clients only signal intent.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    SubscribeFeed,
    UnsubscribeFeed,
}

/// Handle an invalid socket connection (authentication failure)
async fn handle_invalid_socket(mut socket: WebSocket, error_message: String) {
    if let Err(e) = socket
        .send(Message::Text(format!(
            r#"{{"error": "{}"}}"#,
            error_message
        )))
        .await
    {
        error!("Error sending error message on WS: {}", e);
    }

    let _ = socket.close().await;
}

/// Handle a valid WebSocket connection
async fn handle_valid_connection(socket: WebSocket, user_id: Uuid, gateway: Arc<RealtimeGateway>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (connection_id, mut rx) = gateway.connect(user_id);
    gateway.subscribe(connection_id, &notifications_topic(user_id));
    gateway.subscribe(connection_id, &feed_topic(user_id));

    // One task forwards published payloads and keeps the heartbeat going.
    // The gateway closes our channel if we fall behind; that ends the task.
    let forward_task = tokio::spawn(async move {
        let mut heartbeat = time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECONDS));
        loop {
            tokio::select! {
                maybe_payload = rx.recv() => match maybe_payload {
                    Some(text) => {
                        if let Err(e) = ws_sender.send(Message::Text(text)).await {
                            error!("Error forwarding message to WebSocket: {}", e);
                            break;
                        }
                    }
                    None => {
                        info!("Gateway dropped connection {}", connection_id);
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = ws_sender.send(Message::Ping(vec![])).await {
                        error!("Error sending heartbeat: {}", e);
                        break;
                    }
                }
            }
        }
    });

    // Process incoming WebSocket messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::SubscribeFeed) => {
                    gateway.subscribe(connection_id, &feed_topic(user_id));
                }
                Ok(ClientFrame::UnsubscribeFeed) => {
                    gateway.unsubscribe(connection_id, &feed_topic(user_id));
                }
                Err(e) => {
                    debug!("Ignoring unrecognized client frame: {}", e);
                }
            },
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by client");
                break;
            }
            Ok(Message::Pong(_)) => {
                debug!("Received pong from client");
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    // Clean up
    gateway.disconnect(connection_id);
    forward_task.abort();

    info!("WebSocket connection closed for user: {}", user_id);
}

/// Handle incoming WebSocket connection
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WebSocketParams>,
    State(gateway): State<Arc<RealtimeGateway>>,
) -> impl IntoResponse {
    let token = params.token.unwrap_or_default();

    // Validate token and extract the user ID
    let user_id = match validate_token(&token) {
        Ok(claims) => match Uuid::parse_str(&claims.sub) {
            Ok(uuid) => uuid,
            Err(e) => {
                let error_message = format!("Invalid user ID in token: {}", e);
                return ws.on_upgrade(move |socket| async move {
                    handle_invalid_socket(socket, error_message).await;
                });
            }
        },
        Err(e) => {
            let error_message = format!("Invalid token: {}", e);
            return ws.on_upgrade(move |socket| async move {
                handle_invalid_socket(socket, error_message).await;
            });
        }
    };

    info!("User {} connected to notifications WebSocket", user_id);
    ws.on_upgrade(move |socket| async move {
        handle_valid_connection(socket, user_id, gateway).await;
    })
}
