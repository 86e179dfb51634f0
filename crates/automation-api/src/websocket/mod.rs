//! WebSocket command channel
//!
//! Speaks the host's WebSocket framing:
//! - `types` - incoming and outgoing message types
//! - `connection` - auth phase and per-connection message loop
//! - `commands` - the command table
//!
//! Clients authenticate with the plugin's API key as `access_token`.

mod commands;
mod connection;
mod types;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use crate::AppState;

pub use commands::{CommandFuture, CommandHandler, CommandReply, CommandResult, CommandTable};
pub use connection::ActiveConnection;
pub use types::{CommandMessage, ErrorInfo, OutgoingMessage, ResultMessage};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_command_strips_envelope() {
        let msg = CommandMessage::parse(
            r#"{"id": 3, "type": "automation_api/delete", "automation_id": "a1"}"#,
        )
        .unwrap();
        assert_eq!(msg.id, 3);
        assert_eq!(msg.command, "automation_api/delete");
        assert_eq!(msg.payload, json!({"automation_id": "a1"}));
    }

    #[test]
    fn test_parse_command_requires_id_and_type() {
        assert!(CommandMessage::parse(r#"{"type": "ping"}"#).is_err());
        assert!(CommandMessage::parse(r#"{"id": 1}"#).is_err());
        assert!(CommandMessage::parse("not json").is_err());
    }

    #[test]
    fn test_serialize_result() {
        let msg = OutgoingMessage::Result(ResultMessage::success(1, json!({"status": "ok"})));
        let value: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "type": "result", "success": true, "result": {"status": "ok"}})
        );
    }

    #[test]
    fn test_serialize_error() {
        let msg = OutgoingMessage::Result(ResultMessage::error(
            2,
            ErrorInfo::new("unknown_command", "Unknown command."),
        ));
        let value: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "unknown_command");
        assert!(value.get("result").is_none());
    }
}
