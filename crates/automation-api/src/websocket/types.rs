//! WebSocket message types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Incoming Messages
// =============================================================================

/// First message of a connection
#[derive(Debug, Deserialize)]
pub struct AuthMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// A command sent after authentication
///
/// Commands are dispatched by `type` through the command table, so the body
/// stays an untyped map until a handler deserializes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    pub id: u64,
    pub command: String,
    /// Every field except `id` and `type`
    pub payload: Value,
}

impl CommandMessage {
    /// Split a raw message into envelope and payload
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut fields: Map<String, Value> =
            serde_json::from_str(text).map_err(|e| format!("Invalid message format: {}", e))?;

        let id = fields
            .remove("id")
            .and_then(|id| id.as_u64())
            .ok_or_else(|| "Message has no numeric id".to_string())?;
        let command = match fields.remove("type") {
            Some(Value::String(command)) => command,
            _ => return Err(format!("Message {} has no type", id)),
        };

        Ok(Self {
            id,
            command,
            payload: Value::Object(fields),
        })
    }
}

// =============================================================================
// Outgoing Messages
// =============================================================================

/// Outgoing WebSocket message to client
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    AuthRequired(AuthRequiredMessage),
    AuthOk(AuthOkMessage),
    AuthInvalid(AuthInvalidMessage),
    Result(ResultMessage),
    Pong(PongMessage),
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthRequiredMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub ha_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthOkMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub ha_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthInvalidMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultMessage {
    pub id: u64,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ResultMessage {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            msg_type: "result",
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, error: ErrorInfo) -> Self {
        Self {
            id,
            msg_type: "result",
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub id: u64,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

/// Error details of a failed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
