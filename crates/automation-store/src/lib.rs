//! Automation record persistence
//!
//! Records live either in the host's `automations.yaml` (a flat list, or a
//! mapping with an `automation` key) or in a versioned `.storage/` JSON
//! envelope. Both backends implement [`RecordStore`]; the
//! [`AutomationRepository`] serializes every read-modify-write on top of
//! them.
//!
//! Records that the plugin did not write are kept as raw structured values
//! so that saving the collection never rewrites them.

mod collection;
mod error;
mod json;
mod record;
mod repository;
mod yaml;

pub use collection::{find, item_id, remove, upsert, UpsertOutcome};
pub use error::{StoreError, StoreResult, ValidationError};
pub use json::{JsonStore, DEFAULT_STORAGE_KEY, STORAGE_VERSION};
pub use record::{deserialize_optional_id, AutomationPayload, AutomationRecord, ExecutionMode};
pub use repository::AutomationRepository;
pub use yaml::{YamlStore, DEFAULT_AUTOMATIONS_FILE};

use async_trait::async_trait;

/// A raw persisted item (one automation definition)
pub type Item = serde_json::Value;

/// Backend holding the persisted automation collection
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the full collection, empty when nothing has been persisted yet
    async fn load(&self) -> StoreResult<Vec<Item>>;

    /// Replace the persisted collection
    async fn save(&self, items: &[Item]) -> StoreResult<()>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}
