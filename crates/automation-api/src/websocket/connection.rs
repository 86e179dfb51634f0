//! WebSocket connection handling
//!
//! Runs the auth phase, then feeds every command through the command table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::verify_key;
use crate::AppState;

use super::commands::CommandReply;
use super::types::{
    AuthInvalidMessage, AuthMessage, AuthOkMessage, AuthRequiredMessage, CommandMessage,
    ErrorInfo, OutgoingMessage, PongMessage, ResultMessage,
};

/// Time a client has to authenticate
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Connection State
// =============================================================================

/// Per-connection state
pub struct ActiveConnection {
    pub state: AppState,
    /// Last message ID received
    last_id: AtomicU64,
}

impl ActiveConnection {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            last_id: AtomicU64::new(0),
        }
    }

    /// Validate that the message ID is increasing
    pub fn validate_id(&self, id: u64) -> Result<(), &'static str> {
        let last = self.last_id.load(Ordering::SeqCst);
        if id <= last {
            return Err("id_reuse");
        }
        self.last_id.store(id, Ordering::SeqCst);
        Ok(())
    }

    /// Run one command and build the frame to send back
    pub async fn handle_text(&self, text: &str) -> Option<OutgoingMessage> {
        let message = match CommandMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping WebSocket message: {}", e);
                return None;
            }
        };
        let id = message.id;

        if let Err(code) = self.validate_id(id) {
            return Some(OutgoingMessage::Result(ResultMessage::error(
                id,
                ErrorInfo::new(code, "Identifier values have to increase."),
            )));
        }

        let Some(handler) = self.state.commands.get(&message.command) else {
            warn!("Unknown WebSocket command: {}", message.command);
            return Some(OutgoingMessage::Result(ResultMessage::error(
                id,
                ErrorInfo::new("unknown_command", "Unknown command."),
            )));
        };

        debug!("WS command {} (id {})", message.command, id);
        let reply = match handler(self.state.clone(), message.payload).await {
            Ok(CommandReply::Result(result)) => ResultMessage::success(id, result),
            Ok(CommandReply::Pong) => {
                return Some(OutgoingMessage::Pong(PongMessage {
                    id,
                    msg_type: "pong",
                }))
            }
            Err(e) => {
                warn!("WS command {} failed: {}", message.command, e.message);
                ResultMessage::error(id, e)
            }
        };
        Some(OutgoingMessage::Result(reply))
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// Handle a WebSocket connection
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let version = env!("CARGO_PKG_VERSION").to_string();
    let auth_required = OutgoingMessage::AuthRequired(AuthRequiredMessage {
        msg_type: "auth_required",
        ha_version: version.clone(),
    });
    if let Err(e) = send_message(&mut sender, &auth_required).await {
        error!("Failed to send auth_required: {}", e);
        return;
    }

    let auth_result = tokio::time::timeout(AUTH_TIMEOUT, wait_for_auth(&mut receiver)).await;
    let failure = match auth_result {
        Ok(Ok(token)) if verify_key(token.as_deref(), state.api_key()) => None,
        Ok(Ok(_)) => Some("Invalid access token or password".to_string()),
        Ok(Err(e)) => Some(e),
        Err(_) => Some("Authentication timeout".to_string()),
    };

    if let Some(message) = failure {
        warn!("WebSocket client authentication failed: {}", message);
        let auth_invalid = OutgoingMessage::AuthInvalid(AuthInvalidMessage {
            msg_type: "auth_invalid",
            message,
        });
        let _ = send_message(&mut sender, &auth_invalid).await;
        return;
    }

    let auth_ok = OutgoingMessage::AuthOk(AuthOkMessage {
        msg_type: "auth_ok",
        ha_version: version,
    });
    if let Err(e) = send_message(&mut sender, &auth_ok).await {
        error!("Failed to send auth_ok: {}", e);
        return;
    }
    info!("WebSocket client authenticated");

    let conn = ActiveConnection::new(state);
    let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(256);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if send_message(&mut sender, &msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = conn.handle_text(&text).await {
                    if tx.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket client disconnected");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!("WebSocket connection closed");
}

// =============================================================================
// Authentication
// =============================================================================

/// Wait for the auth message and return its access token
async fn wait_for_auth(receiver: &mut SplitStream<WebSocket>) -> Result<Option<String>, String> {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<AuthMessage>(&text) {
                    Ok(msg) if msg.msg_type == "auth" => Ok(msg.access_token),
                    Ok(_) => Err("Expected auth message".to_string()),
                    Err(e) => Err(format!("Invalid auth message: {}", e)),
                };
            }
            Ok(Message::Close(_)) => return Err("Connection closed".to_string()),
            Err(e) => return Err(format!("WebSocket error: {}", e)),
            _ => {}
        }
    }
    Err("Connection closed".to_string())
}

/// Send a message to the WebSocket
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &OutgoingMessage,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    debug!("Sending: {}", json);
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
