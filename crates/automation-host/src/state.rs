//! Live entity state as reported by the host

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The state of an entity at a point in time
///
/// Mirrors the objects returned by the host's `GET /api/states`. Only the
/// fields the plugin reads are modelled; the rest of the payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Full entity ID (`domain.object_id`)
    pub entity_id: String,

    /// The state value (e.g. "on", "off", "unavailable")
    pub state: String,

    /// Attributes associated with the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state value last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<DateTime<Utc>>,

    /// When the state was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl State {
    /// Create a state with no timestamps
    pub fn new(
        entity_id: impl Into<String>,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes,
            last_changed: None,
            last_updated: None,
        }
    }

    /// Domain part of the entity ID
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or("")
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// `friendly_name` attribute, if set
    pub fn friendly_name(&self) -> Option<String> {
        self.attribute("friendly_name")
    }
}
