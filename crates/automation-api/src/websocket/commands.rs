//! WebSocket command table
//!
//! Maps a command `type` to its handler. The table is built once and shared
//! read-only by every connection.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use automation_host::ServiceError;
use automation_store::AutomationPayload;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{RecordRef, TriggerTarget};
use crate::error::ApiError;
use crate::AppState;

use super::types::ErrorInfo;

/// What a successful command sends back
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    /// A `result` frame carrying the value
    Result(Value),
    /// A `pong` frame
    Pong,
}

/// Result of a command handler
pub type CommandResult = Result<CommandReply, ErrorInfo>;

/// Future returned by a command handler
pub type CommandFuture = Pin<Box<dyn Future<Output = CommandResult> + Send>>;

/// Command handler: application state and message payload in, reply out
pub type CommandHandler = Arc<dyn Fn(AppState, Value) -> CommandFuture + Send + Sync>;

/// Immutable `type` to handler table
pub struct CommandTable {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The plugin's commands plus `ping` and `call_service`
    pub fn standard() -> Self {
        Self::new()
            .with_command("automation_api/create", |state, payload| async move {
                let payload: AutomationPayload = parse_payload(payload)?;
                reply(state.api.create_or_update(payload).await?)
            })
            .with_command("automation_api/delete", |state, payload| async move {
                let record: RecordRef = parse_payload(payload)?;
                let id = record
                    .into_id()
                    .ok_or_else(|| ErrorInfo::new("invalid_format", "missing automation_id"))?;
                reply(state.api.delete(&id).await?)
            })
            .with_command("automation_api/test", |state, payload| async move {
                let target: TriggerTarget = parse_payload(payload)?;
                reply(state.api.trigger(&target).await?)
            })
            .with_command("ping", |_state, _payload| async move { Ok(CommandReply::Pong) })
            .with_command("call_service", |state, payload| async move {
                let request: CallServiceRequest = parse_payload(payload)?;
                let response = state
                    .services
                    .call(&request.domain, &request.service, request.service_data)
                    .await?;
                Ok(CommandReply::Result(response))
            })
    }

    /// Add a command, replacing any handler of the same type
    pub fn with_command<F, Fut>(mut self, command: &'static str, handler: F) -> Self
    where
        F: Fn(AppState, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        let handler: CommandHandler =
            Arc::new(move |state, payload| Box::pin(handler(state, payload)) as CommandFuture);
        self.handlers.insert(command, handler);
        self
    }

    pub fn get(&self, command: &str) -> Option<CommandHandler> {
        self.handlers.get(command).cloned()
    }

    /// Registered command types, sorted
    pub fn commands(&self) -> Vec<&'static str> {
        let mut commands: Vec<&'static str> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        commands
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
struct CallServiceRequest {
    domain: String,
    service: String,
    #[serde(default = "empty_object")]
    service_data: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, ErrorInfo> {
    serde_json::from_value(payload).map_err(|e| ErrorInfo::new("invalid_format", e.to_string()))
}

fn reply<T: Serialize>(value: T) -> CommandResult {
    serde_json::to_value(value)
        .map(CommandReply::Result)
        .map_err(|e| ErrorInfo::new("unknown_error", e.to_string()))
}

impl From<ApiError> for ErrorInfo {
    fn from(err: ApiError) -> Self {
        let code = match &err {
            ApiError::InvalidJson(_) | ApiError::Validation(_) | ApiError::InvalidRequest(_) => {
                "invalid_format"
            }
            other => other.code(),
        };
        ErrorInfo::new(code, err.to_string())
    }
}

impl From<ServiceError> for ErrorInfo {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::InvalidData(_) => "invalid_format",
            ServiceError::CallFailed(_) => "home_assistant_error",
        };
        ErrorInfo::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_commands() {
        let table = CommandTable::standard();
        assert_eq!(
            table.commands(),
            vec![
                "automation_api/create",
                "automation_api/delete",
                "automation_api/test",
                "call_service",
                "ping",
            ]
        );
        assert!(table.get("automation_api/unknown").is_none());
    }

    #[test]
    fn test_error_codes() {
        let info: ErrorInfo = ApiError::not_found("automation x").into();
        assert_eq!(info.code, "not_found");

        let info: ErrorInfo =
            ApiError::from(automation_store::ValidationError::MissingField("name")).into();
        assert_eq!(info.code, "invalid_format");

        let info: ErrorInfo = ServiceError::NotFound {
            domain: "automation_api".into(),
            service: "nope".into(),
        }
        .into();
        assert_eq!(info.code, "not_found");
    }
}
