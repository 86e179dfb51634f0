//! HTTP client for the host's REST API

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::error::{HostError, HostResult};
use crate::state::State;

/// REST client authenticated with a long-lived access token
#[derive(Clone)]
pub struct HassClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HassClient {
    /// Create a client for the host at `base_url`
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> HostResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// POST /api/services/{domain}/{service}
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: &serde_json::Value,
    ) -> HostResult<()> {
        let path = format!("/api/services/{}/{}", domain, service);
        let url = format!("{}{}", self.base_url, path);
        debug!(domain = %domain, service = %service, "Calling host service");

        let response = self.authorize(self.client.post(&url)).json(data).send().await?;
        Self::check(path, response).await?;
        Ok(())
    }

    /// GET /api/states
    pub async fn states(&self) -> HostResult<Vec<State>> {
        let path = "/api/states".to_string();
        let url = format!("{}{}", self.base_url, path);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check(path, response).await?;
        Ok(response.json().await?)
    }

    async fn check(path: String, response: Response) -> HostResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), path = %path, "Host request failed");
        Err(HostError::Status {
            status: status.as_u16(),
            path,
            message,
        })
    }
}
