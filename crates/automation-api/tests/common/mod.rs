//! Common test utilities
//!
//! A mock host that records service calls, plus a fully wired application
//! backed by a temporary config directory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use automation_api::{ActivityLog, AppState, AutomationApi, ConfigEntry, ReloadScope};
use automation_host::{
    AreaEntry, DeviceEntry, EntityEntry, Host, HostError, HostResult, RegistrySnapshot, State,
    Storage,
};
use automation_store::{
    AutomationRepository, JsonStore, RecordStore, YamlStore, DEFAULT_STORAGE_KEY,
};
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// API key used by [`TestApp`]
pub const TEST_API_KEY: &str = "0123456789abcdef0123456789abcdef";

/// A recorded service call
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

/// Host double with canned states and registries
#[derive(Default)]
pub struct MockHost {
    states: Mutex<Vec<State>>,
    registries: Mutex<RegistrySnapshot>,
    calls: Mutex<Vec<CapturedCall>>,
    failing: Mutex<HashSet<String>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live automation entity
    pub fn add_automation(&self, entity_id: &str, id: &str, name: &str, state: &str) {
        let attributes = HashMap::from([
            ("id".to_string(), json!(id)),
            ("friendly_name".to_string(), json!(name)),
            ("last_triggered".to_string(), Value::Null),
        ]);
        self.add_state(State::new(entity_id, state, attributes));
    }

    pub fn add_state(&self, state: State) {
        self.states.lock().unwrap().push(state);
    }

    pub fn set_registries(&self, snapshot: RegistrySnapshot) {
        *self.registries.lock().unwrap() = snapshot;
    }

    /// Make `domain.service` fail with a host error
    pub fn fail_service(&self, domain: &str, service: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(format!("{}.{}", domain, service));
    }

    pub fn captured_calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, domain: &str, service: &str) -> Vec<CapturedCall> {
        self.captured_calls()
            .into_iter()
            .filter(|c| c.domain == domain && c.service == service)
            .collect()
    }
}

#[async_trait]
impl Host for MockHost {
    async fn call_service(&self, domain: &str, service: &str, data: Value) -> HostResult<()> {
        self.calls.lock().unwrap().push(CapturedCall {
            domain: domain.to_string(),
            service: service.to_string(),
            data,
        });

        let key = format!("{}.{}", domain, service);
        if self.failing.lock().unwrap().contains(&key) {
            return Err(HostError::Status {
                status: 500,
                path: format!("/api/services/{}/{}", domain, service),
                message: "service failed".to_string(),
            });
        }
        Ok(())
    }

    async fn states(&self) -> HostResult<Vec<State>> {
        Ok(self.states.lock().unwrap().clone())
    }

    async fn registries(&self) -> HostResult<RegistrySnapshot> {
        Ok(self.registries.lock().unwrap().clone())
    }
}

/// Registries with two areas, a device and a few entities
pub fn sample_registries() -> RegistrySnapshot {
    let mut hall_light = EntityEntry::new("light.hall", "hue");
    hall_light.original_name = Some("Hall Light".to_string());
    hall_light.device_id = Some("dev_hall".to_string());

    let mut kitchen_sensor = EntityEntry::new("sensor.kitchen_temperature", "zha");
    kitchen_sensor.name = Some("Kitchen Temperature".to_string());
    kitchen_sensor.area_id = Some("kitchen".to_string());

    let mut old_switch = EntityEntry::new("switch.old", "tplink");
    old_switch.area_id = Some("kitchen".to_string());
    old_switch.disabled_by = Some("user".to_string());

    let porch = EntityEntry::new("light.porch", "hue");

    RegistrySnapshot {
        areas: vec![
            AreaEntry::new("living_room", "Living Room"),
            AreaEntry::new("kitchen", "Kitchen"),
        ],
        devices: vec![DeviceEntry::new("dev_hall", Some("living_room"))],
        entities: vec![hall_light, kitchen_sensor, old_switch, porch],
    }
}

/// Where a [`TestApp`] persists its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Yaml,
    Json,
}

/// Fully wired application over a temporary config directory
pub struct TestApp {
    pub temp_dir: TempDir,
    pub host: Arc<MockHost>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_scope(ReloadScope::Record)
    }

    pub fn with_scope(scope: ReloadScope) -> Self {
        Self::build(Backend::Yaml, scope, true)
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self::build(backend, ReloadScope::Record, true)
    }

    /// Application without a config entry
    pub fn without_entry() -> Self {
        Self::build(Backend::Yaml, ReloadScope::Record, false)
    }

    fn build(backend: Backend, scope: ReloadScope, entry: bool) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let host = Arc::new(MockHost::new());
        let state = build_state(&temp_dir, Arc::clone(&host), backend, scope, entry);
        Self {
            temp_dir,
            host,
            state,
        }
    }

    pub fn router(&self) -> Router {
        automation_api::create_router(self.state.clone())
    }

    pub fn automations_file(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("automations.yaml")
    }

    /// Send a request with the test API key
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-API-KEY", TEST_API_KEY);
        self.send(builder, body).await
    }

    /// Send a request without any API key
    pub async fn request_anonymous(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.send(Request::builder().method(method).uri(uri), body)
            .await
    }

    pub async fn send(
        &self,
        builder: axum::http::request::Builder,
        body: Option<Value>,
    ) -> Response<Body> {
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }
}

fn build_state(
    temp_dir: &TempDir,
    host: Arc<MockHost>,
    backend: Backend,
    scope: ReloadScope,
    entry: bool,
) -> AppState {
    let store: Arc<dyn RecordStore> = match backend {
        Backend::Yaml => Arc::new(YamlStore::in_config_dir(temp_dir.path())),
        Backend::Json => Arc::new(JsonStore::new(
            Storage::new(temp_dir.path()),
            DEFAULT_STORAGE_KEY,
        )),
    };
    let api = AutomationApi::new(
        host,
        AutomationRepository::new(store),
        ActivityLog::new(temp_dir.path().join("automation_api.log")),
        scope,
    );
    let entry = entry.then(|| ConfigEntry::new(Some(TEST_API_KEY.to_string())));
    AppState::new(Arc::new(api), entry)
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A minimal valid create payload
pub fn automation_payload(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "trigger": [{"platform": "state", "entity_id": "binary_sensor.door", "to": "on"}],
        "action": [{"service": "light.turn_on", "target": {"entity_id": "light.hall"}}],
    })
}
