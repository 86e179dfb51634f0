//! `.storage/` JSON backend

use async_trait::async_trait;
use automation_host::{Storage, StorageFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::{Item, RecordStore};

/// Default storage key for the automation collection
pub const DEFAULT_STORAGE_KEY: &str = "automation_api.automations";

/// Current envelope version
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AutomationsData {
    #[serde(default)]
    items: Vec<Item>,
}

/// Records stored as `{"items": [...]}` inside a versioned envelope
#[derive(Debug, Clone)]
pub struct JsonStore {
    storage: Storage,
    key: String,
}

impl JsonStore {
    pub fn new(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn load(&self) -> StoreResult<Vec<Item>> {
        let file: Option<StorageFile<AutomationsData>> = self.storage.load(&self.key).await?;
        let items = file.map(|f| f.data.items).unwrap_or_default();
        debug!("Loaded {} automations from storage key {}", items.len(), self.key);
        Ok(items)
    }

    async fn save(&self, items: &[Item]) -> StoreResult<()> {
        let data = AutomationsData {
            items: items.to_vec(),
        };
        self.storage
            .save(&StorageFile::new(&self.key, data, STORAGE_VERSION))
            .await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.storage.file_path(&self.key).display().to_string()
    }
}
