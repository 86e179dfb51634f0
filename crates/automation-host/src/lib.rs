//! Host platform seam for the automation API plugin
//!
//! The plugin never reimplements the home-automation host. Everything it
//! needs from the host goes through the [`Host`] trait:
//!
//! - service calls (`automation.reload`, `automation.trigger`)
//! - the current live entity states
//! - a snapshot of the area, device and entity registries
//!
//! [`HassHost`] is the production implementation. It talks to the host's
//! REST API and reads registry files from the host's `.storage/` directory.
//!
//! This crate also provides the `.storage/` envelope reader/writer used by
//! the JSON-backed automation store and the plugin's config entry, and the
//! in-process [`ServiceRegistry`] behind the plugin's own service-call layer.

mod client;
mod error;
mod hass;
pub mod registry;
pub mod service_registry;
mod state;
pub mod storage;

pub use client::HassClient;
pub use error::{HostError, HostResult};
pub use hass::HassHost;
pub use registry::{AreaEntry, DeviceEntry, EntityEntry, RegistryReader, RegistrySnapshot};
pub use service_registry::{ServiceCall, ServiceError, ServiceRegistry, ServiceResult};
pub use state::State;
pub use storage::{Storage, StorageError, StorageFile, StorageResult};

use async_trait::async_trait;

/// Domain of the host's automation entities and services
pub const AUTOMATION_DOMAIN: &str = "automation";

/// Everything the plugin asks of the host platform
#[async_trait]
pub trait Host: Send + Sync {
    /// Call a service on the host's service bus and wait for it to finish
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()>;

    /// All live entity states
    async fn states(&self) -> HostResult<Vec<State>>;

    /// Current contents of the area, device and entity registries
    async fn registries(&self) -> HostResult<RegistrySnapshot>;

    /// Live states of a single domain
    async fn domain_states(&self, domain: &str) -> HostResult<Vec<State>> {
        Ok(self
            .states()
            .await?
            .into_iter()
            .filter(|s| s.domain() == domain)
            .collect())
    }
}
