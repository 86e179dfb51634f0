//! Read-only views of the host's area, device and entity registries
//!
//! The host persists its registries as `.storage/core.area_registry`,
//! `.storage/core.device_registry` and `.storage/core.entity_registry`.
//! Only the fields needed to list areas and resolve an entity's area are
//! modelled here; everything else in those files is ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{Storage, StorageResult};

/// Storage key of the area registry
pub const AREA_REGISTRY_KEY: &str = "core.area_registry";
/// Storage key of the device registry
pub const DEVICE_REGISTRY_KEY: &str = "core.device_registry";
/// Storage key of the entity registry
pub const ENTITY_REGISTRY_KEY: &str = "core.entity_registry";

/// A registered area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEntry {
    /// Area ID
    pub id: String,
    /// Display name (e.g. "Living Room")
    pub name: String,
}

impl AreaEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A registered device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device ID
    pub id: String,
    /// Area the device is placed in
    #[serde(default)]
    pub area_id: Option<String>,
}

impl DeviceEntry {
    pub fn new(id: impl Into<String>, area_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            area_id: area_id.map(String::from),
        }
    }
}

/// A registered entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Full entity ID (`domain.object_id`)
    pub entity_id: String,
    /// Integration providing the entity
    #[serde(default)]
    pub platform: String,
    /// User-set name
    #[serde(default)]
    pub name: Option<String>,
    /// Name provided by the integration
    #[serde(default)]
    pub original_name: Option<String>,
    /// Parent device
    #[serde(default)]
    pub device_id: Option<String>,
    /// Area set directly on the entity (overrides the device's area)
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
}

impl EntityEntry {
    pub fn new(entity_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            platform: platform.into(),
            name: None,
            original_name: None,
            device_id: None,
            area_id: None,
            disabled_by: None,
        }
    }

    /// Domain part of the entity ID
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or("")
    }

    /// User name, falling back to the integration's name
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.original_name.as_deref())
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
struct AreaRegistryData {
    #[serde(default)]
    areas: Vec<AreaEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DeviceRegistryData {
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct EntityRegistryData {
    #[serde(default)]
    entities: Vec<EntityEntry>,
}

/// Contents of the three registries at one point in time
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub areas: Vec<AreaEntry>,
    pub devices: Vec<DeviceEntry>,
    pub entities: Vec<EntityEntry>,
}

impl RegistrySnapshot {
    /// Get device by ID
    pub fn device(&self, device_id: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    /// Area of an entity: its own area, else the area of its device
    pub fn entity_area<'a>(&'a self, entity: &'a EntityEntry) -> Option<&'a str> {
        entity.area_id.as_deref().or_else(|| {
            entity
                .device_id
                .as_deref()
                .and_then(|id| self.device(id))
                .and_then(|device| device.area_id.as_deref())
        })
    }
}

/// Loads registry snapshots from a `.storage/` directory
#[derive(Debug, Clone)]
pub struct RegistryReader {
    storage: Storage,
}

impl RegistryReader {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Read all three registries; a missing file is an empty registry
    pub async fn snapshot(&self) -> StorageResult<RegistrySnapshot> {
        let areas = self
            .storage
            .load::<AreaRegistryData>(AREA_REGISTRY_KEY)
            .await?
            .map(|f| f.data.areas)
            .unwrap_or_default();
        let devices = self
            .storage
            .load::<DeviceRegistryData>(DEVICE_REGISTRY_KEY)
            .await?
            .map(|f| f.data.devices)
            .unwrap_or_default();
        let entities = self
            .storage
            .load::<EntityRegistryData>(ENTITY_REGISTRY_KEY)
            .await?
            .map(|f| f.data.entities)
            .unwrap_or_default();

        debug!(
            areas = areas.len(),
            devices = devices.len(),
            entities = entities.len(),
            "Loaded registry snapshot"
        );

        Ok(RegistrySnapshot {
            areas,
            devices,
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_storage(dir: &TempDir, key: &str, data: serde_json::Value) {
        let storage_dir = dir.path().join(".storage");
        std::fs::create_dir_all(&storage_dir).unwrap();
        let envelope = serde_json::json!({
            "version": 1,
            "minor_version": 12,
            "key": key,
            "data": data,
        });
        std::fs::write(storage_dir.join(key), envelope.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_reads_host_files() {
        let dir = TempDir::new().unwrap();
        write_storage(
            &dir,
            AREA_REGISTRY_KEY,
            serde_json::json!({"areas": [
                {"id": "kitchen", "name": "Kitchen", "aliases": [], "floor_id": null,
                 "icon": null, "labels": [], "picture": null, "created_at": "2024-01-01T00:00:00+00:00"}
            ]}),
        );
        write_storage(
            &dir,
            DEVICE_REGISTRY_KEY,
            serde_json::json!({"devices": [
                {"id": "dev1", "name": "Hue bulb", "name_by_user": null, "area_id": "kitchen",
                 "identifiers": [["hue", "abc"]], "connections": []}
            ], "deleted_devices": []}),
        );
        write_storage(
            &dir,
            ENTITY_REGISTRY_KEY,
            serde_json::json!({"entities": [
                {"entity_id": "light.kitchen", "id": "x1", "platform": "hue",
                 "device_id": "dev1", "area_id": null, "original_name": "Kitchen light"}
            ], "deleted_entities": []}),
        );

        let reader = RegistryReader::new(Storage::new(dir.path()));
        let snapshot = reader.snapshot().await.unwrap();

        assert_eq!(snapshot.areas.len(), 1);
        assert_eq!(snapshot.devices.len(), 1);
        assert_eq!(snapshot.entities.len(), 1);

        let light = &snapshot.entities[0];
        assert_eq!(light.display_name(), Some("Kitchen light"));
        assert_eq!(snapshot.entity_area(light), Some("kitchen"));
    }

    #[tokio::test]
    async fn test_missing_registries_are_empty() {
        let dir = TempDir::new().unwrap();
        let reader = RegistryReader::new(Storage::new(dir.path()));
        let snapshot = reader.snapshot().await.unwrap();
        assert!(snapshot.areas.is_empty());
        assert!(snapshot.devices.is_empty());
        assert!(snapshot.entities.is_empty());
    }

    #[test]
    fn test_entity_area_prefers_own_area() {
        let snapshot = RegistrySnapshot {
            areas: vec![AreaEntry::new("a", "A"), AreaEntry::new("b", "B")],
            devices: vec![DeviceEntry::new("dev", Some("a"))],
            entities: vec![],
        };
        let mut entity = EntityEntry::new("switch.fan", "demo");
        entity.device_id = Some("dev".into());
        assert_eq!(snapshot.entity_area(&entity), Some("a"));

        entity.area_id = Some("b".into());
        assert_eq!(snapshot.entity_area(&entity), Some("b"));

        entity.device_id = Some("unknown".into());
        entity.area_id = None;
        assert_eq!(snapshot.entity_area(&entity), None);
    }
}
