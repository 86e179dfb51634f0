//! Versioned JSON envelopes in the host's `.storage/` directory
//!
//! Every file in `.storage/` wraps its payload the same way:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 1,
//!   "key": "automation_api.automations",
//!   "data": { ... }
//! }
//! ```
//!
//! The registries are read through this module, and the plugin persists its
//! config entry and the JSON-backed automation collection with it.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

fn default_minor_version() -> u32 {
    1
}

/// A `.storage/` file: payload plus version tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    /// Major version - breaking changes
    pub version: u32,
    /// Minor version, absent in older files
    #[serde(default = "default_minor_version")]
    pub minor_version: u32,
    /// Storage key (file name)
    pub key: String,
    /// The payload
    pub data: T,
}

impl<T> StorageFile<T> {
    /// Wrap a payload
    pub fn new(key: impl Into<String>, data: T, version: u32) -> Self {
        Self {
            version,
            minor_version: default_minor_version(),
            key: key.into(),
            data,
        }
    }
}

/// Reader/writer for one `.storage/` directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Storage rooted at `<config_dir>/.storage`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    /// Path of the `.storage/` directory
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path of the file backing `key`
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Load an envelope, `None` when the file does not exist
    pub async fn load<T>(&self, key: &str) -> StorageResult<Option<StorageFile<T>>>
    where
        T: DeserializeOwned,
    {
        let path = self.file_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Storage file not found: {}", key);
                return Ok(None);
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let storage_file: StorageFile<T> =
            serde_json::from_str(&content).map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })?;

        debug!(
            "Loaded storage file: {} (v{}.{})",
            key, storage_file.version, storage_file.minor_version
        );

        Ok(Some(storage_file))
    }

    /// Write an envelope atomically (temp file, then rename)
    pub async fn save<T>(&self, storage_file: &StorageFile<T>) -> StorageResult<()>
    where
        T: Serialize,
    {
        fs::create_dir_all(&self.storage_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.storage_dir.clone(),
                source,
            })?;

        let content =
            serde_json::to_string_pretty(storage_file).map_err(|source| StorageError::Json {
                key: storage_file.key.clone(),
                source,
            })?;

        let path = self.file_path(&storage_file.key);
        write_atomic(&path, content.as_bytes())
            .await
            .map_err(|source| StorageError::Io { path, source })?;

        debug!(
            "Saved storage file: {} (v{}.{})",
            storage_file.key, storage_file.version, storage_file.minor_version
        );

        Ok(())
    }
}

/// Replace `path` with `content` through a sibling `.tmp` file and a rename
pub async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Items {
        items: Vec<String>,
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        let data = Items {
            items: vec!["a".into(), "b".into()],
        };
        storage
            .save(&StorageFile::new("test.items", data.clone(), 1))
            .await
            .unwrap();

        assert!(storage.file_path("test.items").exists());
        assert!(!storage.file_path("test.items.tmp").exists());

        let loaded: StorageFile<Items> = storage.load("test.items").await.unwrap().unwrap();
        assert_eq!(loaded.data, data);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.minor_version, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());

        let loaded: Option<StorageFile<Items>> = storage.load("nothing").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_envelope_without_minor_version() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());
        std::fs::create_dir_all(storage.storage_dir()).unwrap();
        std::fs::write(
            storage.file_path("legacy"),
            r#"{"version": 2, "key": "legacy", "data": {"items": ["x"]}}"#,
        )
        .unwrap();

        let loaded: StorageFile<Items> = storage.load("legacy").await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.minor_version, 1);
        assert_eq!(loaded.data.items, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path());
        std::fs::create_dir_all(storage.storage_dir()).unwrap();
        std::fs::write(storage.file_path("bad"), "{not json").unwrap();

        let result = storage.load::<Items>("bad").await;
        assert!(matches!(result, Err(StorageError::Json { .. })));
    }
}
