//! `automations.yaml` backend
//!
//! The host accepts two layouts for its automation file: a flat list of
//! automations, or a mapping whose `automation` key holds the list. Saving
//! keeps the layout found on disk; in the mapping layout every key other
//! than `automation` is written back unchanged.
//!
//! Hand-written records may carry YAML tags (`!secret`, `!include`). They
//! are shown as `"!tag value"` strings, and a record that comes back
//! unchanged is written as the original node with its tags intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_yaml::value::TaggedValue;
use serde_yaml::Value as YamlValue;
use tokio::fs;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::{Item, RecordStore};

/// Default file name, relative to the host configuration directory
pub const DEFAULT_AUTOMATIONS_FILE: &str = "automations.yaml";

const AUTOMATION_KEY: &str = "automation";

/// Records stored in a host automation file
#[derive(Debug, Clone)]
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/automations.yaml`
    pub fn in_config_dir(config_dir: impl AsRef<Path>) -> Self {
        Self::new(config_dir.as_ref().join(DEFAULT_AUTOMATIONS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> StoreResult<YamlValue> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Automation file not found: {}", self.path.display());
                return Ok(YamlValue::Null);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(YamlValue::Null);
        }

        serde_yaml::from_str(&content).map_err(|source| StoreError::Yaml {
            path: self.path.clone(),
            source,
        })
    }

    fn nodes_from(&self, value: YamlValue) -> StoreResult<Vec<YamlValue>> {
        let list = match value {
            YamlValue::Null => return Ok(Vec::new()),
            YamlValue::Sequence(list) => list,
            YamlValue::Mapping(mut map) => match map.remove(AUTOMATION_KEY) {
                Some(YamlValue::Null) | None => return Ok(Vec::new()),
                Some(YamlValue::Sequence(list)) => list,
                Some(_) => {
                    return Err(StoreError::InvalidDocument {
                        path: self.path.clone(),
                        reason: format!("'{}' is not a list", AUTOMATION_KEY),
                    })
                }
            },
            _ => {
                return Err(StoreError::InvalidDocument {
                    path: self.path.clone(),
                    reason: "expected a list or a mapping".to_string(),
                })
            }
        };
        Ok(list)
    }

    fn to_item(&self, node: YamlValue) -> StoreResult<Item> {
        serde_yaml::from_value(untag(node)).map_err(|source| StoreError::Yaml {
            path: self.path.clone(),
            source,
        })
    }
}

/// Replace tagged nodes by a plain rendering of the tag and its value
fn untag(value: YamlValue) -> YamlValue {
    match value {
        YamlValue::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            match value {
                YamlValue::String(s) => YamlValue::String(format!("{} {}", tag, s)),
                YamlValue::Number(n) => YamlValue::String(format!("{} {}", tag, n)),
                YamlValue::Bool(b) => YamlValue::String(format!("{} {}", tag, b)),
                YamlValue::Null => YamlValue::String(tag.to_string()),
                inner => untag(inner),
            }
        }
        YamlValue::Mapping(map) => YamlValue::Mapping(
            map.into_iter()
                .map(|(k, v)| (untag(k), untag(v)))
                .collect(),
        ),
        YamlValue::Sequence(seq) => YamlValue::Sequence(seq.into_iter().map(untag).collect()),
        other => other,
    }
}

#[async_trait]
impl RecordStore for YamlStore {
    async fn load(&self) -> StoreResult<Vec<Item>> {
        let document = self.read_document().await?;
        let items = self
            .nodes_from(document)?
            .into_iter()
            .map(|node| self.to_item(node))
            .collect::<StoreResult<Vec<_>>>()?;
        debug!("Loaded {} automations from {}", items.len(), self.path.display());
        Ok(items)
    }

    async fn save(&self, items: &[Item]) -> StoreResult<()> {
        let existing = self.read_document().await?;

        let mut originals = Vec::new();
        for node in self.nodes_from(existing.clone())? {
            originals.push((self.to_item(node.clone())?, node));
        }

        let mut list = Vec::with_capacity(items.len());
        for item in items {
            match originals.iter().position(|(original, _)| original == item) {
                Some(index) => list.push(originals.remove(index).1),
                None => list.push(serde_yaml::to_value(item).map_err(|source| {
                    StoreError::Yaml {
                        path: self.path.clone(),
                        source,
                    }
                })?),
            }
        }
        let list = YamlValue::Sequence(list);

        let document = match existing {
            YamlValue::Mapping(mut map) => {
                map.insert(YamlValue::from(AUTOMATION_KEY), list);
                YamlValue::Mapping(map)
            }
            _ => list,
        };

        let content = serde_yaml::to_string(&document).map_err(|source| StoreError::Yaml {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        automation_host::storage::write_atomic(&self.path, content.as_bytes())
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!("Saved {} automations to {}", items.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
