//! Serialized access to the persisted automation collection

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::collection::{self, UpsertOutcome};
use crate::error::StoreResult;
use crate::record::AutomationRecord;
use crate::{Item, RecordStore};

/// Upsert/delete/list over a [`RecordStore`]
///
/// Every mutation is a load, modify, save cycle. The cycles run one at a time
/// so two concurrent requests cannot lose each other's writes.
pub struct AutomationRepository {
    store: Arc<dyn RecordStore>,
    lock: Mutex<()>,
}

impl AutomationRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing store
    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// Insert the record, or replace the one with the same ID in place
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub async fn upsert(&self, record: &AutomationRecord) -> StoreResult<UpsertOutcome> {
        let item = record.to_item()?;

        let _guard = self.lock.lock().await;
        let mut items = self.store.load().await?;
        let outcome = collection::upsert(&mut items, item);
        self.store.save(&items).await?;

        info!(
            "{} automation '{}' in {}",
            match outcome {
                UpsertOutcome::Created => "Created",
                UpsertOutcome::Updated => "Updated",
            },
            record.id,
            self.store.describe()
        );
        Ok(outcome)
    }

    /// Remove the record with the ID; nothing is written when it is absent
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        let mut items = self.store.load().await?;
        if !collection::remove(&mut items, id) {
            debug!("Automation '{}' not found, nothing to delete", id);
            return Ok(false);
        }
        self.store.save(&items).await?;

        info!("Deleted automation '{}' from {}", id, self.store.describe());
        Ok(true)
    }

    /// All persisted items, in stored order
    pub async fn list(&self) -> StoreResult<Vec<Item>> {
        let _guard = self.lock.lock().await;
        self.store.load().await
    }

    /// The persisted item with the ID
    pub async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        let items = self.list().await?;
        Ok(collection::find(&items, id).cloned())
    }
}
