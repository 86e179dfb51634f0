//! The facade shared by the HTTP, push-channel and service-call layers

use std::str::FromStr;
use std::sync::Arc;

use automation_host::{Host, RegistrySnapshot, State, AUTOMATION_DOMAIN};
use automation_store::{
    deserialize_optional_id, AutomationPayload, AutomationRepository, UpsertOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::activity_log::ActivityLog;
use crate::error::{ApiError, ApiResult};

/// Which automations the host reloads after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadScope {
    /// Reload only the created or updated record; deletes reload everything
    #[default]
    Record,
    /// Reload everything after every mutation
    All,
}

impl FromStr for ReloadScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record" => Ok(ReloadScope::Record),
            "all" => Ok(ReloadScope::All),
            other => Err(format!("unknown reload scope '{}'", other)),
        }
    }
}

/// Successful mutation of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResponse {
    pub status: String,
    pub id: String,
}

impl RecordResponse {
    fn ok(id: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            id: id.into(),
        }
    }
}

/// Successful trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub entity_id: String,
}

/// Which automation to trigger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerTarget {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub automation_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
}

impl TriggerTarget {
    fn record_id(&self) -> Option<&str> {
        self.automation_id.as_deref().or(self.id.as_deref())
    }
}

/// Reference to a persisted record by ID
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordRef {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub automation_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
}

impl RecordRef {
    /// `automation_id` wins over `id`
    pub fn into_id(self) -> Option<String> {
        self.automation_id.or(self.id).filter(|id| !id.is_empty())
    }
}

/// Live state of an automation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationSummary {
    pub entity_id: String,
    pub id: Option<String>,
    pub name: String,
    pub state: String,
    pub last_triggered: Option<Value>,
    pub attributes: serde_json::Map<String, Value>,
}

impl AutomationSummary {
    fn from_state(state: &State) -> Self {
        let mut attributes: Vec<(&String, &Value)> = state.attributes.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            entity_id: state.entity_id.clone(),
            id: record_id_attribute(state),
            name: state
                .friendly_name()
                .unwrap_or_else(|| state.entity_id.clone()),
            state: state.state.clone(),
            last_triggered: state.attributes.get("last_triggered").cloned(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

fn record_id_attribute(state: &State) -> Option<String> {
    match state.attributes.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Registered area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub area_id: String,
    pub name: String,
}

/// Registered entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub name: Option<String>,
    pub platform: String,
    pub device_id: Option<String>,
    pub area_id: Option<String>,
}

/// Filters for [`AutomationApi::entities`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityFilter {
    /// Entity domain (`light`, `sensor`, ...)
    #[serde(default)]
    pub domain: Option<String>,
    /// Area ID, or area name (case-insensitive)
    #[serde(default)]
    pub area: Option<String>,
    /// Case-insensitive substring of entity ID or name
    #[serde(default)]
    pub search: Option<String>,
}

/// CRUD, trigger and read operations over host automations
pub struct AutomationApi {
    host: Arc<dyn Host>,
    repository: AutomationRepository,
    log: ActivityLog,
    reload_scope: ReloadScope,
}

impl AutomationApi {
    pub fn new(
        host: Arc<dyn Host>,
        repository: AutomationRepository,
        log: ActivityLog,
        reload_scope: ReloadScope,
    ) -> Self {
        Self {
            host,
            repository,
            log,
            reload_scope,
        }
    }

    /// Validate, persist, then ask the host to reload
    #[instrument(skip(self, payload))]
    pub async fn create_or_update(&self, payload: AutomationPayload) -> ApiResult<RecordResponse> {
        let record = payload.into_record()?;

        let outcome = match self.repository.upsert(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log
                    .error(format!("Failed to save automation {}: {}", record.id, e))
                    .await;
                return Err(e.into());
            }
        };
        let verb = match outcome {
            UpsertOutcome::Created => "Created",
            UpsertOutcome::Updated => "Updated",
        };
        self.log
            .info(format!("{} automation {} ({})", verb, record.id, record.alias))
            .await;

        let data = match self.reload_scope {
            ReloadScope::Record => json!({ "id": record.id }),
            ReloadScope::All => json!({}),
        };
        self.reload(data).await?;

        Ok(RecordResponse::ok(record.id))
    }

    /// Remove the record; an unknown ID is not an error
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ApiResult<RecordResponse> {
        if id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("missing automation id".to_string()));
        }

        let removed = match self.repository.delete(id).await {
            Ok(removed) => removed,
            Err(e) => {
                self.log
                    .error(format!("Failed to delete automation {}: {}", id, e))
                    .await;
                return Err(e.into());
            }
        };

        if removed {
            self.log.info(format!("Deleted automation {}", id)).await;
            // The record is gone, so a scoped reload could not find it
            self.reload(json!({})).await?;
        } else {
            info!("Delete of unknown automation '{}' ignored", id);
        }

        Ok(RecordResponse::ok(id))
    }

    /// Run an automation's actions now, skipping its conditions
    #[instrument(skip(self))]
    pub async fn trigger(&self, target: &TriggerTarget) -> ApiResult<TriggerResponse> {
        let entity_id = match self.resolve_entity(target).await {
            Ok(entity_id) => entity_id,
            Err(e) => {
                self.log
                    .warning(format!("Trigger target not resolved: {}", e))
                    .await;
                return Err(e);
            }
        };

        let data = json!({ "entity_id": entity_id, "skip_condition": true });
        if let Err(e) = self
            .host
            .call_service(AUTOMATION_DOMAIN, "trigger", data)
            .await
        {
            warn!("Failed to trigger {}: {}", entity_id, e);
            self.log
                .error(format!("Failed to trigger {}: {}", entity_id, e))
                .await;
            return Err(ApiError::not_found(format!("automation {}", entity_id)));
        }

        self.log.info(format!("Triggered {}", entity_id)).await;
        Ok(TriggerResponse {
            status: "ok".to_string(),
            entity_id,
        })
    }

    async fn resolve_entity(&self, target: &TriggerTarget) -> ApiResult<String> {
        if let Some(entity_id) = target.entity_id.as_deref().filter(|e| !e.is_empty()) {
            return Ok(entity_id.to_string());
        }

        let id = target
            .record_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("missing id or entity_id".to_string()))?;

        if id.starts_with("automation.") {
            return Ok(id.to_string());
        }

        let states = self
            .host
            .domain_states(AUTOMATION_DOMAIN)
            .await
            .map_err(|e| ApiError::NotFound(format!("automation {} not resolved: {}", id, e)))?;

        states
            .iter()
            .find(|s| record_id_attribute(s).as_deref() == Some(id))
            .map(|s| s.entity_id.clone())
            .ok_or_else(|| ApiError::not_found(format!("automation {}", id)))
    }

    /// Live automation states; with an ID, the single matching automation
    pub async fn automations(&self, id: Option<&str>) -> ApiResult<Value> {
        let states = self.host.domain_states(AUTOMATION_DOMAIN).await?;
        let summaries: Vec<AutomationSummary> =
            states.iter().map(AutomationSummary::from_state).collect();

        match id {
            Some(id) => {
                let found = summaries
                    .into_iter()
                    .find(|s| s.id.as_deref() == Some(id) || s.entity_id == id)
                    .ok_or_else(|| ApiError::not_found(format!("automation {}", id)))?;
                Ok(serde_json::to_value(found)?)
            }
            None => Ok(serde_json::to_value(summaries)?),
        }
    }

    /// Persisted definitions; with an ID, the single matching record
    pub async fn definitions(&self, id: Option<&str>) -> ApiResult<Value> {
        match id {
            Some(id) => self
                .repository
                .get(id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("automation {}", id))),
            None => Ok(Value::Array(self.repository.list().await?)),
        }
    }

    /// All areas, sorted by name
    pub async fn areas(&self) -> ApiResult<Vec<AreaSummary>> {
        let snapshot = self.host.registries().await?;
        let mut areas: Vec<AreaSummary> = snapshot
            .areas
            .iter()
            .map(|a| AreaSummary {
                area_id: a.id.clone(),
                name: a.name.clone(),
            })
            .collect();
        areas.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(areas)
    }

    /// Enabled entities matching every given filter
    pub async fn entities(&self, filter: &EntityFilter) -> ApiResult<Vec<EntitySummary>> {
        let snapshot = self.host.registries().await?;
        let states = self.host.states().await?;
        let friendly_name = |entity_id: &str| {
            states
                .iter()
                .find(|s| s.entity_id == entity_id)
                .and_then(State::friendly_name)
        };

        let area_ids = filter.area.as_deref().map(|area| matching_areas(&snapshot, area));
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut entities = Vec::new();
        for entry in snapshot.entities.iter().filter(|e| !e.is_disabled()) {
            if let Some(domain) = filter.domain.as_deref() {
                if entry.domain() != domain {
                    continue;
                }
            }

            let area_id = snapshot.entity_area(entry).map(String::from);
            if let Some(area_ids) = &area_ids {
                match &area_id {
                    Some(area_id) if area_ids.contains(area_id) => {}
                    _ => continue,
                }
            }

            let name = entry
                .display_name()
                .map(String::from)
                .or_else(|| friendly_name(&entry.entity_id));

            if let Some(search) = &search {
                let in_id = entry.entity_id.to_lowercase().contains(search);
                let in_name = name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(search));
                if !in_id && !in_name {
                    continue;
                }
            }

            entities.push(EntitySummary {
                entity_id: entry.entity_id.clone(),
                name,
                platform: entry.platform.clone(),
                device_id: entry.device_id.clone(),
                area_id,
            });
        }
        Ok(entities)
    }

    /// Contents of the activity log file
    pub async fn read_log(&self) -> ApiResult<String> {
        self.log
            .read()
            .await
            .map_err(|source| ApiError::Io {
                path: self.log.path().to_path_buf(),
                source,
            })?
            .ok_or_else(|| ApiError::not_found("log file"))
    }

    async fn reload(&self, data: Value) -> ApiResult<()> {
        if let Err(e) = self
            .host
            .call_service(AUTOMATION_DOMAIN, "reload", data)
            .await
        {
            warn!("Automation reload failed: {}", e);
            self.log
                .error(format!("Automation reload failed: {}", e))
                .await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Area IDs matching a filter value by ID or case-insensitive name
fn matching_areas(snapshot: &RegistrySnapshot, area: &str) -> Vec<String> {
    let wanted = area.to_lowercase();
    snapshot
        .areas
        .iter()
        .filter(|a| a.id == area || a.name.to_lowercase() == wanted)
        .map(|a| a.id.clone())
        .collect()
}
