//! Automation records and the request payloads that produce them

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::Item;

/// Execution mode of an automation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Ignore new triggers while running
    #[default]
    Single,
    /// Restart from the beginning on a new trigger
    Restart,
    /// Queue new triggers
    Queued,
    /// Run new triggers alongside the current run
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Single => "single",
            ExecutionMode::Restart => "restart",
            ExecutionMode::Queued => "queued",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(ExecutionMode::Single),
            "restart" => Ok(ExecutionMode::Restart),
            "queued" => Ok(ExecutionMode::Queued),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(ValidationError::InvalidField {
                field: "mode",
                reason: format!("unknown mode '{}'", other),
            }),
        }
    }
}

/// A persisted automation definition
///
/// Field order matches what the host writes to `automations.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub id: String,
    pub alias: String,
    #[serde(default)]
    pub description: String,
    pub trigger: Value,
    #[serde(default = "empty_list")]
    pub condition: Value,
    pub action: Value,
    #[serde(default)]
    pub mode: ExecutionMode,
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

impl AutomationRecord {
    /// Raw item as written to the store
    pub fn to_item(&self) -> Result<Item, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Create/update request as received from any entry layer
///
/// Every field is optional at the wire level; [`AutomationPayload::into_record`]
/// enforces which ones are required and applies defaults. The record ID may
/// arrive as `automation_id` (push-channel messages use `id` for their own
/// message counter) or as `id`; `automation_id` wins when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutomationPayload {
    #[serde(default)]
    pub automation_id: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub trigger: Option<Value>,
    #[serde(default)]
    pub condition: Option<Value>,
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub mode: Option<Value>,
}

impl AutomationPayload {
    /// Validate required fields and build the canonical record
    pub fn into_record(self) -> Result<AutomationRecord, ValidationError> {
        let id = match self.automation_id.or(self.id) {
            Some(value) => record_id(value)?,
            None => return Err(ValidationError::MissingField("id")),
        };

        let alias = match self.name {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            Some(Value::String(_)) => {
                return Err(ValidationError::InvalidField {
                    field: "name",
                    reason: "must not be empty".to_string(),
                })
            }
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "name",
                    reason: "must be a string".to_string(),
                })
            }
            None => return Err(ValidationError::MissingField("name")),
        };

        let description = match self.description {
            None => String::new(),
            Some(Value::String(description)) => description,
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "description",
                    reason: "must be a string".to_string(),
                })
            }
        };

        let trigger = match self.trigger {
            Some(value) => spec_list("trigger", value)?,
            None => return Err(ValidationError::MissingField("trigger")),
        };
        let action = match self.action {
            Some(value) => spec_list("action", value)?,
            None => return Err(ValidationError::MissingField("action")),
        };
        let condition = match self.condition {
            Some(value) => spec_list("condition", value)?,
            None => empty_list(),
        };

        let mode = match self.mode {
            None => ExecutionMode::default(),
            Some(Value::String(mode)) => mode.parse()?,
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "mode",
                    reason: "must be a string".to_string(),
                })
            }
        };

        Ok(AutomationRecord {
            id,
            alias,
            description,
            trigger,
            condition,
            action,
            mode,
        })
    }
}

/// Record IDs are strings; numeric IDs are accepted and stored as text
fn record_id(value: Value) -> Result<String, ValidationError> {
    match value {
        Value::String(id) if !id.trim().is_empty() => Ok(id),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(_) => Err(ValidationError::InvalidField {
            field: "id",
            reason: "must not be empty".to_string(),
        }),
        _ => Err(ValidationError::InvalidField {
            field: "id",
            reason: "must be a string".to_string(),
        }),
    }
}

/// Trigger/condition/action specs are opaque lists; a single mapping is wrapped
fn spec_list(field: &'static str, value: Value) -> Result<Value, ValidationError> {
    match value {
        Value::Array(_) => Ok(value),
        Value::Object(_) => Ok(Value::Array(vec![value])),
        _ => Err(ValidationError::InvalidField {
            field,
            reason: "must be a list or a mapping".to_string(),
        }),
    }
}

/// `deserialize_with` for optional record references
///
/// Accepts the same string or numeric IDs as a create payload, so a record
/// created with `1700000000` can be addressed as `1700000000` or `"1700000000"`.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "id must be a string or a number, got {}",
            other
        ))),
    }
}
