//! Standalone automation API server
//!
//! Wires the API onto a host instance: settings, config entry, record
//! store, REST client and registry reader.

mod error;
pub mod settings;

pub use error::{SettingsError, SettingsResult};
pub use settings::{settings_path, Settings, StoreKind, SETTINGS_ENV_VAR};

use std::sync::Arc;

use anyhow::Context;
use automation_api::{ensure_entry, ActivityLog, AppState, AutomationApi};
use automation_host::{HassClient, HassHost, RegistryReader, Storage};
use automation_store::{AutomationRepository, JsonStore, RecordStore, YamlStore};
use tracing::info;

/// Build the application state described by `settings`
pub async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let storage = Storage::new(&settings.config_dir);

    let entry = ensure_entry(&storage, settings.api_key.as_deref())
        .await
        .context("failed to load the config entry")?;

    let store: Arc<dyn RecordStore> = match settings.store {
        StoreKind::Yaml => Arc::new(YamlStore::new(settings.automations_path())),
        StoreKind::Json => Arc::new(JsonStore::new(storage.clone(), &settings.storage_key)),
    };
    let repository = AutomationRepository::new(store);
    info!("Automation records stored in {}", repository.describe());

    let client = HassClient::new(
        &settings.hass_url,
        settings.hass_token.clone(),
        settings.request_timeout(),
    )
    .context("failed to create the host client")?;
    let host = HassHost::new(client, RegistryReader::new(storage));

    let api = AutomationApi::new(
        Arc::new(host),
        repository,
        ActivityLog::new(settings.log_path()),
        settings.reload_scope,
    );

    Ok(AppState::new(Arc::new(api), Some(entry)))
}
