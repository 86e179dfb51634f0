//! The plugin's config entry
//!
//! A single entry holds the API key every caller must present. It is
//! persisted in `.storage/automation_api.config_entry` using the host's
//! envelope format and created on first start.

use automation_host::{Storage, StorageFile, StorageResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::DOMAIN;

/// Storage key of the config entry
pub const STORAGE_KEY: &str = "automation_api.config_entry";

/// Current envelope version
pub const STORAGE_VERSION: u32 = 1;

/// Title shown for the entry
pub const ENTRY_TITLE: &str = "Automation API";

/// Config entry data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub api_key: String,
}

/// The plugin's config entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier
    pub entry_id: String,
    /// Always `automation_api`
    pub domain: String,
    pub title: String,
    pub data: EntryData,
}

impl ConfigEntry {
    /// Create an entry with the given key, or a freshly generated one
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4().simple().to_string(),
            domain: DOMAIN.to_string(),
            title: ENTRY_TITLE.to_string(),
            data: EntryData {
                api_key: api_key.unwrap_or_else(generate_api_key),
            },
        }
    }

    pub fn api_key(&self) -> &str {
        &self.data.api_key
    }
}

/// 32 lowercase hex characters (16 random bytes)
pub fn generate_api_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Load the config entry, creating it on first start
///
/// A key given in `configured_key` always wins over the stored one and is
/// written back so the stored entry matches what the server enforces.
pub async fn ensure_entry(
    storage: &Storage,
    configured_key: Option<&str>,
) -> StorageResult<ConfigEntry> {
    let stored = storage
        .load::<ConfigEntry>(STORAGE_KEY)
        .await?
        .map(|file| file.data);

    let entry = match (stored, configured_key) {
        (Some(entry), None) => return Ok(entry),
        (Some(entry), Some(key)) if entry.api_key() == key => return Ok(entry),
        (Some(mut entry), Some(key)) => {
            info!("Replacing stored API key with the configured one");
            entry.data.api_key = key.to_string();
            entry
        }
        (None, key) => {
            let entry = ConfigEntry::new(key.map(String::from));
            info!(
                "Created config entry {} ({})",
                entry.entry_id,
                if key.is_some() {
                    "configured API key"
                } else {
                    "generated API key"
                }
            );
            entry
        }
    };

    storage
        .save(&StorageFile::new(STORAGE_KEY, entry.clone(), STORAGE_VERSION))
        .await?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_api_key());
    }

    #[tokio::test]
    async fn test_first_start_generates_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        let entry = ensure_entry(&storage, None).await.unwrap();
        assert_eq!(entry.domain, "automation_api");
        assert_eq!(entry.title, "Automation API");
        assert_eq!(entry.api_key().len(), 32);

        let again = ensure_entry(&storage, None).await.unwrap();
        assert_eq!(again, entry);
    }

    #[tokio::test]
    async fn test_configured_key_overrides_stored() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        let generated = ensure_entry(&storage, None).await.unwrap();
        let configured = ensure_entry(&storage, Some("fixed-key")).await.unwrap();
        assert_eq!(configured.entry_id, generated.entry_id);
        assert_eq!(configured.api_key(), "fixed-key");

        let reloaded = ensure_entry(&storage, None).await.unwrap();
        assert_eq!(reloaded.api_key(), "fixed-key");
    }
}
