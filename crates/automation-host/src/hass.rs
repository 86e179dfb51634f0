//! Production [`Host`] backed by the host's REST API and `.storage/` files

use async_trait::async_trait;

use crate::client::HassClient;
use crate::error::HostResult;
use crate::registry::{RegistryReader, RegistrySnapshot};
use crate::state::State;
use crate::Host;

/// A running host instance reached over HTTP
pub struct HassHost {
    client: HassClient,
    registries: RegistryReader,
}

impl HassHost {
    pub fn new(client: HassClient, registries: RegistryReader) -> Self {
        Self { client, registries }
    }
}

#[async_trait]
impl Host for HassHost {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()> {
        self.client.call_service(domain, service, &data).await
    }

    async fn states(&self) -> HostResult<Vec<State>> {
        self.client.states().await
    }

    async fn registries(&self) -> HostResult<RegistrySnapshot> {
        Ok(self.registries.snapshot().await?)
    }
}
